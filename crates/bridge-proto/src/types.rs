//! Base data types used by the client-bound packets.

use std::fmt;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::codec::{ensure, ProtoDecode, ProtoEncode};
use crate::error::ProtoError;

// ---------------------------------------------------------------------------
// LEB128 helpers
// ---------------------------------------------------------------------------

fn put_leb128(buf: &mut impl BufMut, mut value: u64) {
    while value & !0x7F != 0 {
        buf.put_u8((value & 0x7F | 0x80) as u8);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

fn get_leb128(buf: &mut impl Buf, max_bytes: usize) -> Result<u64, ProtoError> {
    let mut result = 0u64;
    for i in 0..max_bytes {
        ensure(buf, 1)?;
        let byte = buf.get_u8();
        result |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(ProtoError::VarIntTooLong { max_bytes })
}

// ---------------------------------------------------------------------------
// Variable-length integers
// ---------------------------------------------------------------------------

macro_rules! varint {
    ($(#[$doc:meta])* $name:ident($inner:ty), max = $max:expr, zigzag = $zz:expr, unzigzag = $uz:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl $name {
            pub const MAX_BYTES: usize = $max;
        }

        impl ProtoEncode for $name {
            fn proto_encode(&self, buf: &mut impl BufMut) {
                let to_wire: fn($inner) -> u64 = $zz;
                put_leb128(buf, to_wire(self.0));
            }
        }

        impl ProtoDecode for $name {
            fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
                let from_wire: fn(u64) -> $inner = $uz;
                Ok($name(from_wire(get_leb128(buf, Self::MAX_BYTES)?)))
            }
        }

        impl From<$inner> for $name {
            fn from(v: $inner) -> Self {
                $name(v)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

varint!(
    /// Signed 32-bit varint (ZigZag + LEB128).
    VarInt(i32),
    max = 5,
    zigzag = |v| u64::from(((v << 1) ^ (v >> 31)) as u32),
    unzigzag = |v| {
        let v = v as u32;
        (v >> 1) as i32 ^ -((v & 1) as i32)
    }
);

varint!(
    /// Signed 64-bit varint (ZigZag + LEB128).
    VarLong(i64),
    max = 10,
    zigzag = |v| ((v << 1) ^ (v >> 63)) as u64,
    unzigzag = |v| (v >> 1) as i64 ^ -((v & 1) as i64)
);

varint!(
    /// Unsigned 32-bit varint. Packet ids and string lengths.
    VarUInt32(u32),
    max = 5,
    zigzag = u64::from,
    unzigzag = |v| v as u32
);

varint!(
    /// Unsigned 64-bit varint. Entity runtime ids and ticks.
    VarUInt64(u64),
    max = 10,
    zigzag = |v| v,
    unzigzag = |v| v
);

// ---------------------------------------------------------------------------
// Vec3 (f32 x, y, z)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<glam::Vec3> for Vec3 {
    fn from(v: glam::Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<glam::DVec3> for Vec3 {
    fn from(v: glam::DVec3) -> Self {
        Self::new(v.x as f32, v.y as f32, v.z as f32)
    }
}

impl ProtoEncode for Vec3 {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        buf.put_f32_le(self.x);
        buf.put_f32_le(self.y);
        buf.put_f32_le(self.z);
    }
}

impl ProtoDecode for Vec3 {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        ensure(buf, 12)?;
        Ok(Self {
            x: buf.get_f32_le(),
            y: buf.get_f32_le(),
            z: buf.get_f32_le(),
        })
    }
}

// ---------------------------------------------------------------------------
// BlockPos (VarInt x, VarUInt32 y, VarInt z)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl From<glam::IVec3> for BlockPos {
    fn from(v: glam::IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl ProtoEncode for BlockPos {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        VarInt(self.x).proto_encode(buf);
        // Bedrock sends y unsigned; negative heights wrap.
        VarUInt32(self.y as u32).proto_encode(buf);
        VarInt(self.z).proto_encode(buf);
    }
}

impl ProtoDecode for BlockPos {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        let x = VarInt::proto_decode(buf)?.0;
        let y = VarUInt32::proto_decode(buf)?.0 as i32;
        let z = VarInt::proto_decode(buf)?.0;
        Ok(Self { x, y, z })
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn encoded(value: &impl ProtoEncode) -> Vec<u8> {
        let mut buf = BytesMut::new();
        value.proto_encode(&mut buf);
        buf.to_vec()
    }

    #[test]
    fn varint_zigzag_bytes() {
        assert_eq!(encoded(&VarInt(0)), [0x00]);
        assert_eq!(encoded(&VarInt(-1)), [0x01]);
        assert_eq!(encoded(&VarInt(1)), [0x02]);
        assert_eq!(encoded(&VarInt(-64)), [0x7F]);
        assert_eq!(encoded(&VarInt(64)), [0x80, 0x01]);
    }

    #[test]
    fn varint_extremes() {
        for v in [i32::MIN, i32::MAX] {
            let bytes = encoded(&VarInt(v));
            assert_eq!(bytes.len(), VarInt::MAX_BYTES);
            assert_eq!(VarInt::proto_decode(&mut &bytes[..]).unwrap(), VarInt(v));
        }
        let bytes = encoded(&VarLong(i64::MIN));
        assert_eq!(VarLong::proto_decode(&mut &bytes[..]).unwrap(), VarLong(i64::MIN));
    }

    #[test]
    fn varuint_plain_leb128() {
        assert_eq!(encoded(&VarUInt32(300)), [0xAC, 0x02]);
        assert_eq!(encoded(&VarUInt64(1)), [0x01]);
    }

    #[test]
    fn varint_too_long() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert!(matches!(
            VarUInt32::proto_decode(&mut &bytes[..]),
            Err(ProtoError::VarIntTooLong { max_bytes: 5 })
        ));
    }

    #[test]
    fn varint_truncated() {
        let bytes = [0x80];
        assert!(matches!(
            VarUInt32::proto_decode(&mut &bytes[..]),
            Err(ProtoError::BufferTooShort { .. })
        ));
    }

    #[test]
    fn block_pos_negative_height() {
        let pos = BlockPos::new(-3, -60, 7);
        let bytes = encoded(&pos);
        assert_eq!(BlockPos::proto_decode(&mut &bytes[..]).unwrap(), pos);
    }

    #[test]
    fn vec3_from_glam() {
        let v: Vec3 = glam::DVec3::new(0.5, -1.0, 2.25).into();
        assert_eq!(v, Vec3::new(0.5, -1.0, 2.25));
        assert_eq!(encoded(&v).len(), 12);
    }
}
