//! BlockActorData (0x38): Server → Client.
//!
//! Carries block entity NBT. The bridge uses it for piston arms and
//! moving blocks.

use bytes::{Buf, BufMut};

use crate::codec::{ProtoDecode, ProtoEncode};
use crate::error::ProtoError;
use crate::types::BlockPos;

#[derive(Debug, Clone, PartialEq)]
pub struct BlockActorData {
    pub position: BlockPos,
    /// Network-encoded NBT compound.
    pub nbt_data: Vec<u8>,
}

impl ProtoEncode for BlockActorData {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        self.position.proto_encode(buf);
        buf.put_slice(&self.nbt_data);
    }
}

impl ProtoDecode for BlockActorData {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let position = BlockPos::proto_decode(buf)?;
        let nbt_data = buf.copy_to_bytes(buf.remaining()).to_vec();
        Ok(Self { position, nbt_data })
    }
}
