//! Client-bound packets used by the piston bridge.

pub mod block_actor_data;
pub mod move_player;
pub mod set_entity_motion;
pub mod update_block;

pub use block_actor_data::BlockActorData;
pub use move_player::{MoveMode, MovePlayer};
pub use set_entity_motion::SetEntityMotion;
pub use update_block::{UpdateBlock, UPDATE_BLOCK_FLAGS_DEFAULT};

/// Packet ids.
pub mod id {
    pub const SET_ENTITY_MOTION: u32 = 0x12;
    pub const MOVE_PLAYER: u32 = 0x13;
    pub const UPDATE_BLOCK: u32 = 0x15;
    pub const BLOCK_ACTOR_DATA: u32 = 0x38;
}
