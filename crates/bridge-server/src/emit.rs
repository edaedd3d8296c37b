//! Turns simulation output into client-bound packets.

use std::sync::Arc;

use bridge_nbt::{write_network_nbt, NbtCompound};
use bridge_proto::codec::encode_sub_packet;
use bridge_proto::packets::{id, BlockActorData, MovePlayer, SetEntityMotion, UpdateBlock};
use bridge_world::physics::PlayerPhysics;
use bridge_world::piston::ClientUpdate;
use bytes::{Bytes, BytesMut};
use glam::{DVec3, IVec3};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::mappings::BlockMappings;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("client connection closed")]
    Disconnected,
}

/// Encodes updates for one client and hands them to its connection.
pub struct PacketEmitter {
    mappings: Arc<BlockMappings>,
    tx: mpsc::UnboundedSender<Bytes>,
}

impl PacketEmitter {
    pub fn new(mappings: Arc<BlockMappings>, tx: mpsc::UnboundedSender<Bytes>) -> Self {
        Self { mappings, tx }
    }

    pub fn emit(&self, update: &ClientUpdate, player: &PlayerPhysics) -> Result<(), SessionError> {
        self.send(self.encode(update, player))
    }

    /// Hard position correction, used when the client moved into a block in
    /// flight.
    pub fn correct_position(
        &self,
        player: &PlayerPhysics,
        feet: DVec3,
        on_ground: bool,
    ) -> Result<(), SessionError> {
        let eye = PlayerPhysics::eye_from_feet(feet);
        let packet = MovePlayer::reset(player.runtime_id, eye.into(), on_ground).with_rotation(
            player.pitch,
            player.yaw,
            player.head_yaw,
        );
        self.send(encode_sub_packet(id::MOVE_PLAYER, &packet))
    }

    fn send(&self, packet: Bytes) -> Result<(), SessionError> {
        self.tx.send(packet).map_err(|_| SessionError::Disconnected)
    }

    pub fn encode(&self, update: &ClientUpdate, player: &PlayerPhysics) -> Bytes {
        match update {
            ClientUpdate::Block { position, block } => {
                let packet = UpdateBlock::new((*position).into(), self.mappings.runtime_id(*block));
                encode_sub_packet(id::UPDATE_BLOCK, &packet)
            }
            ClientUpdate::MovingPlaceholder { position } => {
                let packet =
                    UpdateBlock::new((*position).into(), self.mappings.moving_block_runtime_id());
                encode_sub_packet(id::UPDATE_BLOCK, &packet)
            }
            ClientUpdate::MovingBlockData(moving) => {
                let state = self.mappings.get(moving.block).state.clone();
                block_actor_data(moving.position, &moving.to_nbt(state))
            }
            ClientUpdate::PistonArmData(arm) => block_actor_data(arm.position, &arm.to_nbt()),
            ClientUpdate::PlayerPosition { feet, on_ground } => {
                let eye = PlayerPhysics::eye_from_feet(*feet);
                let packet = MovePlayer::normal(player.runtime_id, eye.into(), *on_ground)
                    .with_rotation(player.pitch, player.yaw, player.head_yaw);
                encode_sub_packet(id::MOVE_PLAYER, &packet)
            }
            ClientUpdate::PlayerMotion(motion) => {
                let packet = SetEntityMotion {
                    entity_runtime_id: player.runtime_id,
                    motion: (*motion).into(),
                    tick: 0,
                };
                encode_sub_packet(id::SET_ENTITY_MOTION, &packet)
            }
        }
    }
}

fn block_actor_data(position: IVec3, tag: &NbtCompound) -> Bytes {
    let mut nbt = BytesMut::new();
    write_network_nbt(&mut nbt, "", tag);
    let packet = BlockActorData {
        position: position.into(),
        nbt_data: nbt.to_vec(),
    };
    encode_sub_packet(id::BLOCK_ACTOR_DATA, &packet)
}
