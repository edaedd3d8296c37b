//! Java block state → client block state translation.
//!
//! The client runs with `block_network_ids_are_hashes`, so a runtime id is
//! the FNV-1a hash of the network NBT of `{name, states, version}`.

use std::collections::HashMap;

use bridge_nbt::{write_network_nbt, NbtCompound};
use bridge_world::block_registry::{BlockId, BlockInfo, BlockRegistry};
use bridge_world::geometry::Direction;
use bytes::BytesMut;

/// FNV-1a 32-bit offset basis.
const FNV1_32_INIT: u32 = 0x811c_9dc5;
/// FNV-1a 32-bit prime.
const FNV1_32_PRIME: u32 = 0x0100_0193;

/// Block state version for 1.21.50 protocol.
const BLOCK_STATE_VERSION: i32 = 18_100_737;

const MOVING_BLOCK: &str = "minecraft:moving_block";

pub fn fnv1a_32(data: &[u8]) -> u32 {
    let mut hash = FNV1_32_INIT;
    for &byte in data {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV1_32_PRIME);
    }
    hash
}

/// A client block state, ready for `movingBlock` tags.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientBlock {
    pub runtime_id: u32,
    pub state: NbtCompound,
}

impl ClientBlock {
    fn new(name: &str, states: NbtCompound) -> Self {
        let state = NbtCompound::new()
            .with_string("name", name)
            .with_compound("states", states)
            .with_int("version", BLOCK_STATE_VERSION);
        let mut buf = BytesMut::new();
        write_network_nbt(&mut buf, "", &state);
        Self {
            runtime_id: fnv1a_32(&buf),
            state,
        }
    }
}

/// Client block states for every registered Java state.
pub struct BlockMappings {
    blocks: HashMap<BlockId, ClientBlock>,
    air: ClientBlock,
    moving_block: ClientBlock,
}

impl BlockMappings {
    pub fn new(registry: &BlockRegistry) -> Self {
        let blocks = registry
            .iter()
            .map(|info| {
                let (name, states) = client_state(info);
                (info.id, ClientBlock::new(&name, states))
            })
            .collect();
        Self {
            blocks,
            air: ClientBlock::new("minecraft:air", NbtCompound::new()),
            moving_block: ClientBlock::new(MOVING_BLOCK, NbtCompound::new()),
        }
    }

    /// Unknown states render as air.
    pub fn get(&self, block: BlockId) -> &ClientBlock {
        self.blocks.get(&block).unwrap_or(&self.air)
    }

    pub fn runtime_id(&self, block: BlockId) -> u32 {
        self.get(block).runtime_id
    }

    /// Placeholder shown while a block is in flight.
    pub fn moving_block_runtime_id(&self) -> u32 {
        self.moving_block.runtime_id
    }
}

fn client_state(info: &BlockInfo) -> (String, NbtCompound) {
    let facing = info
        .property("facing")
        .and_then(Direction::from_name)
        .map(facing_direction);
    let with_facing = |name: &str| {
        let states = match facing {
            Some(f) => NbtCompound::new().with_int("facing_direction", f),
            None => NbtCompound::new(),
        };
        (name.to_string(), states)
    };
    match info.base_name() {
        "minecraft:slime_block" => ("minecraft:slime".into(), NbtCompound::new()),
        "minecraft:cobweb" => ("minecraft:web".into(), NbtCompound::new()),
        "minecraft:moving_piston" => (MOVING_BLOCK.into(), NbtCompound::new()),
        "minecraft:piston_head" if info.property("type") == Some("sticky") => {
            with_facing("minecraft:sticky_piston_arm_collision")
        }
        "minecraft:piston_head" => with_facing("minecraft:piston_arm_collision"),
        name @ ("minecraft:piston" | "minecraft:sticky_piston") => with_facing(name),
        name => (name.to_string(), NbtCompound::new()),
    }
}

/// Bedrock `facing_direction`: same order as the Java 3D value.
fn facing_direction(facing: Direction) -> i32 {
    facing as i32
}
