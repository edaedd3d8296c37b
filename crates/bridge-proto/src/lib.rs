//! Bedrock wire types and the client-bound packets the bridge emits for
//! block updates, block actor data and player corrections.

pub mod codec;
pub mod error;
pub mod packets;
pub mod types;
