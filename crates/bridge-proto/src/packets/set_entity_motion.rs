//! SetEntityMotion (0x12): Server → Client.

use bytes::{Buf, BufMut};

use crate::codec::{ProtoDecode, ProtoEncode};
use crate::error::ProtoError;
use crate::types::{VarUInt64, Vec3};

/// Overwrite an entity's velocity. Slime launches go through this.
#[derive(Debug, Clone, PartialEq)]
pub struct SetEntityMotion {
    pub entity_runtime_id: u64,
    pub motion: Vec3,
    pub tick: u64,
}

impl ProtoEncode for SetEntityMotion {
    fn proto_encode(&self, buf: &mut impl BufMut) {
        VarUInt64(self.entity_runtime_id).proto_encode(buf);
        self.motion.proto_encode(buf);
        VarUInt64(self.tick).proto_encode(buf);
    }
}

impl ProtoDecode for SetEntityMotion {
    fn proto_decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        Ok(Self {
            entity_runtime_id: VarUInt64::proto_decode(buf)?.0,
            motion: Vec3::proto_decode(buf)?,
            tick: VarUInt64::proto_decode(buf)?.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_launch() {
        let pkt = SetEntityMotion {
            entity_runtime_id: 3,
            motion: Vec3::new(0.0, 1.0, 0.0),
            tick: 0,
        };
        let mut buf = BytesMut::new();
        pkt.proto_encode(&mut buf);
        // id (1) + vec3 (12) + tick (1)
        assert_eq!(buf.len(), 14);
        assert_eq!(SetEntityMotion::proto_decode(&mut buf.freeze()).unwrap(), pkt);
    }
}
