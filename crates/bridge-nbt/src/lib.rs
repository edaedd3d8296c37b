//! Network NBT for block actor payloads.
//!
//! Compounds keep insertion order so encoded tags are byte-stable,
//! which keeps tests and packet captures comparable.

pub mod error;
pub mod network;
pub mod tag;

pub use error::NbtError;
pub use network::{read_network_nbt, write_network_nbt};
pub use tag::{NbtCompound, NbtTag};
