//! Encoding/decoding traits and sub-packet framing.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtoError;
use crate::types::VarUInt32;

/// Encode a value onto a buffer.
pub trait ProtoEncode {
    fn proto_encode(&self, buf: &mut impl BufMut);
}

/// Decode a value from a buffer.
pub trait ProtoDecode: Sized {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError>;
}

/// Frame a packet as a batch sub-packet: `VarUInt32(id)` followed by the body.
pub fn encode_sub_packet(packet_id: u32, packet: &impl ProtoEncode) -> Bytes {
    let mut buf = BytesMut::new();
    VarUInt32(packet_id).proto_encode(&mut buf);
    packet.proto_encode(&mut buf);
    buf.freeze()
}

/// Ensure `needed` bytes remain before a fixed-width read.
pub(crate) fn ensure(buf: &impl Buf, needed: usize) -> Result<(), ProtoError> {
    if buf.remaining() < needed {
        return Err(ProtoError::BufferTooShort {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}
