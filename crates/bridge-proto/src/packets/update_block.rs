//! UpdateBlock (0x15): Server → Client.

use bytes::{Buf, BufMut};

use crate::codec::{ProtoDecode, ProtoEncode};
use crate::error::ProtoError;
use crate::types::{BlockPos, VarUInt32};

/// Flags: Neighbours (0x01) + Network (0x02).
pub const UPDATE_BLOCK_FLAGS_DEFAULT: u32 = 0x03;

/// Replace a single block on the client.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBlock {
    pub position: BlockPos,
    pub runtime_id: u32,
    pub flags: u32,
    pub layer: u32,
}

impl UpdateBlock {
    /// Layer 0 with neighbour + network flags.
    pub fn new(position: BlockPos, runtime_id: u32) -> Self {
        Self {
            position,
            runtime_id,
            flags: UPDATE_BLOCK_FLAGS_DEFAULT,
            layer: 0,
        }
    }
}

impl ProtoEncode for UpdateBlock {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        self.position.proto_encode(buf);
        VarUInt32(self.runtime_id).proto_encode(buf);
        VarUInt32(self.flags).proto_encode(buf);
        VarUInt32(self.layer).proto_encode(buf);
    }
}

impl ProtoDecode for UpdateBlock {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            position: BlockPos::proto_decode(buf)?,
            runtime_id: VarUInt32::proto_decode(buf)?.0,
            flags: VarUInt32::proto_decode(buf)?.0,
            layer: VarUInt32::proto_decode(buf)?.0,
        })
    }
}
