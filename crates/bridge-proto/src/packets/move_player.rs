//! MovePlayer (0x13): Server → Client.
//!
//! Moves the local player. Piston displacement is delivered with
//! `Normal` so the client keeps its own motion; `Reset` is a hard
//! correction.

use bytes::{Buf, BufMut};

use crate::codec::{ensure, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;
use crate::types::{VarUInt64, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MoveMode {
    Normal = 0,
    Reset = 1,
    Teleport = 2,
    Rotation = 3,
}

impl TryFrom<u8> for MoveMode {
    type Error = ProtoError;

    fn try_from(v: u8) -> Result<Self, ProtoError> {
        match v {
            0 => Ok(MoveMode::Normal),
            1 => Ok(MoveMode::Reset),
            2 => Ok(MoveMode::Teleport),
            3 => Ok(MoveMode::Rotation),
            _ => Err(ProtoError::UnknownMoveMode(v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovePlayer {
    pub runtime_entity_id: u64,
    /// Eye position.
    pub position: Vec3,
    pub pitch: f32,
    pub yaw: f32,
    pub head_yaw: f32,
    pub mode: MoveMode,
    pub on_ground: bool,
    pub ridden_entity_runtime_id: u64,
    /// Present when mode == Teleport.
    pub teleport: Option<(i32, i32)>,
    pub tick: u64,
}

impl MovePlayer {
    fn with_mode(mode: MoveMode, runtime_entity_id: u64, position: Vec3, on_ground: bool) -> Self {
        Self {
            runtime_entity_id,
            position,
            pitch: 0.0,
            yaw: 0.0,
            head_yaw: 0.0,
            mode,
            on_ground,
            ridden_entity_runtime_id: 0,
            teleport: None,
            tick: 0,
        }
    }

    pub fn normal(runtime_entity_id: u64, position: Vec3, on_ground: bool) -> Self {
        Self::with_mode(MoveMode::Normal, runtime_entity_id, position, on_ground)
    }

    pub fn reset(runtime_entity_id: u64, position: Vec3, on_ground: bool) -> Self {
        Self::with_mode(MoveMode::Reset, runtime_entity_id, position, on_ground)
    }

    pub fn with_rotation(mut self, pitch: f32, yaw: f32, head_yaw: f32) -> Self {
        self.pitch = pitch;
        self.yaw = yaw;
        self.head_yaw = head_yaw;
        self
    }
}

impl ProtoEncode for MovePlayer {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        VarUInt64(self.runtime_entity_id).proto_encode(buf);
        self.position.proto_encode(buf);
        buf.put_f32_le(self.pitch);
        buf.put_f32_le(self.yaw);
        buf.put_f32_le(self.head_yaw);
        buf.put_u8(self.mode as u8);
        buf.put_u8(self.on_ground as u8);
        VarUInt64(self.ridden_entity_runtime_id).proto_encode(buf);
        if self.mode == MoveMode::Teleport {
            let (cause, entity_type) = self.teleport.unwrap_or_default();
            buf.put_i32_le(cause);
            buf.put_i32_le(entity_type);
        }
        VarUInt64(self.tick).proto_encode(buf);
    }
}

impl ProtoDecode for MovePlayer {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let runtime_entity_id = VarUInt64::proto_decode(buf)?.0;
        let position = Vec3::proto_decode(buf)?;
        ensure(buf, 14)?;
        let pitch = buf.get_f32_le();
        let yaw = buf.get_f32_le();
        let head_yaw = buf.get_f32_le();
        let mode = MoveMode::try_from(buf.get_u8())?;
        let on_ground = buf.get_u8() != 0;
        let ridden_entity_runtime_id = VarUInt64::proto_decode(buf)?.0;
        let teleport = if mode == MoveMode::Teleport {
            ensure(buf, 8)?;
            Some((buf.get_i32_le(), buf.get_i32_le()))
        } else {
            None
        };
        let tick = VarUInt64::proto_decode(buf)?.0;
        Ok(Self {
            runtime_entity_id,
            position,
            pitch,
            yaw,
            head_yaw,
            mode,
            on_ground,
            ridden_entity_runtime_id,
            teleport,
            tick,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn roundtrip_normal() {
        let pkt = MovePlayer::normal(1, Vec3::new(0.5, 2.62, 0.5), true).with_rotation(-5.0, 90.0, 90.0);
        let mut buf = BytesMut::new();
        pkt.proto_encode(&mut buf);
        assert_eq!(MovePlayer::proto_decode(&mut buf.freeze()).unwrap(), pkt);
    }

    #[test]
    fn teleport_carries_cause() {
        let mut pkt = MovePlayer::reset(7, Vec3::ZERO, false);
        pkt.mode = MoveMode::Teleport;
        pkt.teleport = Some((2, 0));
        let mut buf = BytesMut::new();
        pkt.proto_encode(&mut buf);
        let decoded = MovePlayer::proto_decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded.teleport, Some((2, 0)));
    }

    #[test]
    fn unknown_mode_rejected() {
        assert!(matches!(MoveMode::try_from(9), Err(ProtoError::UnknownMoveMode(9))));
    }
}
