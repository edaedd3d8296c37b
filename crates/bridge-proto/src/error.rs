//! Protocol-level errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("buffer too short: need {needed} more bytes, have {remaining}")]
    BufferTooShort { needed: usize, remaining: usize },

    #[error("varint is longer than {max_bytes} bytes")]
    VarIntTooLong { max_bytes: usize },

    #[error("unknown move mode: {0}")]
    UnknownMoveMode(u8),

    #[error("unknown packet id: 0x{0:02X}")]
    UnknownPacketId(u32),
}
