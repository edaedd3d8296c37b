//! Session-side world model for the bridge: geometry, block classification,
//! collision shapes, the sparse block cache and the piston simulation.

pub mod block_registry;
pub mod chunk;
pub mod collision;
pub mod geometry;
pub mod physics;
pub mod piston;
