//! Network NBT: ints and array lengths are VarInt, longs are VarLong,
//! string lengths are VarUInt32, everything else little-endian.

use bytes::{Buf, BufMut};
use bridge_proto::codec::{ProtoDecode, ProtoEncode};
use bridge_proto::types::{VarInt, VarLong, VarUInt32};

use crate::error::NbtError;
use crate::tag::{NbtCompound, NbtTag};

/// Maximum nesting depth accepted when reading.
const MAX_DEPTH: usize = 512;

const TAG_END: u8 = 0;
const TAG_COMPOUND: u8 = 10;

// -----------------------------------------------------------------------
// Writing
// -----------------------------------------------------------------------

/// Write a root compound with the given name.
pub fn write_network_nbt(buf: &mut impl BufMut, name: &str, root: &NbtCompound) {
    buf.put_u8(TAG_COMPOUND);
    write_string(buf, name);
    write_compound(buf, root);
}

fn write_string(buf: &mut impl BufMut, s: &str) {
    VarUInt32(s.len() as u32).proto_encode(buf);
    buf.put_slice(s.as_bytes());
}

fn write_len(buf: &mut impl BufMut, len: usize) {
    VarInt(len as i32).proto_encode(buf);
}

fn write_compound(buf: &mut impl BufMut, compound: &NbtCompound) {
    for (name, tag) in compound.iter() {
        buf.put_u8(tag.type_id());
        write_string(buf, name);
        write_payload(buf, tag);
    }
    buf.put_u8(TAG_END);
}

fn write_payload(buf: &mut impl BufMut, tag: &NbtTag) {
    match tag {
        NbtTag::Byte(v) => buf.put_i8(*v),
        NbtTag::Short(v) => buf.put_i16_le(*v),
        NbtTag::Int(v) => VarInt(*v).proto_encode(buf),
        NbtTag::Long(v) => VarLong(*v).proto_encode(buf),
        NbtTag::Float(v) => buf.put_f32_le(*v),
        NbtTag::Double(v) => buf.put_f64_le(*v),
        NbtTag::ByteArray(v) => {
            write_len(buf, v.len());
            for b in v {
                buf.put_i8(*b);
            }
        }
        NbtTag::String(v) => write_string(buf, v),
        NbtTag::List(items) => {
            buf.put_u8(items.first().map_or(TAG_END, NbtTag::type_id));
            write_len(buf, items.len());
            for item in items {
                write_payload(buf, item);
            }
        }
        NbtTag::Compound(c) => write_compound(buf, c),
        NbtTag::IntArray(v) => {
            write_len(buf, v.len());
            for i in v {
                VarInt(*i).proto_encode(buf);
            }
        }
        NbtTag::LongArray(v) => {
            write_len(buf, v.len());
            for l in v {
                VarLong(*l).proto_encode(buf);
            }
        }
    }
}

// -----------------------------------------------------------------------
// Reading
// -----------------------------------------------------------------------

/// Read a root compound, returning its name and contents.
pub fn read_network_nbt(buf: &mut impl Buf) -> Result<(String, NbtCompound), NbtError> {
    let tag_type = get_u8(buf)?;
    if tag_type != TAG_COMPOUND {
        return Err(NbtError::ExpectedCompound { got: tag_type });
    }
    let name = read_string(buf)?;
    let root = read_compound(buf, 0)?;
    Ok((name, root))
}

fn get_u8(buf: &mut impl Buf) -> Result<u8, NbtError> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

fn ensure(buf: &impl Buf, n: usize) -> Result<(), NbtError> {
    if buf.remaining() < n {
        return Err(NbtError::UnexpectedEof);
    }
    Ok(())
}

fn read_string(buf: &mut impl Buf) -> Result<String, NbtError> {
    let len = VarUInt32::proto_decode(buf)?.0 as usize;
    ensure(buf, len)?;
    let bytes = buf.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec()).map_err(|_| NbtError::InvalidUtf8)
}

fn read_len(buf: &mut impl Buf) -> Result<usize, NbtError> {
    let len = VarInt::proto_decode(buf)?.0;
    if len < 0 {
        return Err(NbtError::NegativeLength(len));
    }
    Ok(len as usize)
}

fn read_compound(buf: &mut impl Buf, depth: usize) -> Result<NbtCompound, NbtError> {
    if depth > MAX_DEPTH {
        return Err(NbtError::NestingTooDeep { limit: MAX_DEPTH });
    }
    let mut compound = NbtCompound::new();
    loop {
        let tag_type = get_u8(buf)?;
        if tag_type == TAG_END {
            return Ok(compound);
        }
        let name = read_string(buf)?;
        let tag = read_payload(buf, tag_type, depth + 1)?;
        compound.insert(name, tag);
    }
}

fn read_payload(buf: &mut impl Buf, tag_type: u8, depth: usize) -> Result<NbtTag, NbtError> {
    if depth > MAX_DEPTH {
        return Err(NbtError::NestingTooDeep { limit: MAX_DEPTH });
    }
    Ok(match tag_type {
        1 => NbtTag::Byte(get_u8(buf)? as i8),
        2 => {
            ensure(buf, 2)?;
            NbtTag::Short(buf.get_i16_le())
        }
        3 => NbtTag::Int(VarInt::proto_decode(buf)?.0),
        4 => NbtTag::Long(VarLong::proto_decode(buf)?.0),
        5 => {
            ensure(buf, 4)?;
            NbtTag::Float(buf.get_f32_le())
        }
        6 => {
            ensure(buf, 8)?;
            NbtTag::Double(buf.get_f64_le())
        }
        7 => {
            let len = read_len(buf)?;
            ensure(buf, len)?;
            NbtTag::ByteArray((0..len).map(|_| buf.get_i8()).collect())
        }
        8 => NbtTag::String(read_string(buf)?),
        9 => {
            let element_type = get_u8(buf)?;
            let len = read_len(buf)?;
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(read_payload(buf, element_type, depth + 1)?);
            }
            NbtTag::List(items)
        }
        10 => NbtTag::Compound(read_compound(buf, depth)?),
        11 => {
            let len = read_len(buf)?;
            let mut ints = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                ints.push(VarInt::proto_decode(buf)?.0);
            }
            NbtTag::IntArray(ints)
        }
        12 => {
            let len = read_len(buf)?;
            let mut longs = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                longs.push(VarLong::proto_decode(buf)?.0);
            }
            NbtTag::LongArray(longs)
        }
        other => return Err(NbtError::UnknownTagType(other)),
    })
}
