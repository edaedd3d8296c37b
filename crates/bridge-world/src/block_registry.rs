//! Java block state registry: piston behaviour, hardness, block entity
//! flags, piston metadata and collision shapes.
//!
//! A built-in vanilla subset is always available through
//! [`BlockRegistry::vanilla`]. A full table can be loaded from JSON with
//! [`BlockRegistry::from_json`].

use std::collections::{HashMap, HashSet};
use std::path::Path;

use glam::DVec3;
use serde::Deserialize;
use thiserror::Error;

use crate::collision::{BlockCollision, CollisionTable};
use crate::geometry::{Axis, BoundingBox, Direction};

/// Java block state id.
pub type BlockId = u32;

/// Air is always state 0.
pub const AIR: BlockId = 0;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read block data: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed block data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown piston behavior {behavior:?} on {name}")]
    UnknownPistonBehavior { name: String, behavior: String },

    #[error("collision box on {name} has {len} values, expected 6")]
    BadCollisionBox { name: String, len: usize },

    #[error("duplicate block id {0}")]
    DuplicateId(BlockId),

    #[error("block id 0 must be minecraft:air")]
    AirNotZero,

    #[error("block data has no {0}")]
    MissingBlock(&'static str),
}

/// How a block reacts to being pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PistonBehavior {
    #[default]
    Normal,
    /// Broken by the piston; does not stop the move.
    Destroy,
    /// Immovable.
    Block,
    Ignore,
    /// Pushed but never pulled (glazed terracotta).
    PushOnly,
}

impl PistonBehavior {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(PistonBehavior::Normal),
            "destroy" => Some(PistonBehavior::Destroy),
            "block" => Some(PistonBehavior::Block),
            "ignore" => Some(PistonBehavior::Ignore),
            "push_only" => Some(PistonBehavior::PushOnly),
            _ => None,
        }
    }
}

/// Properties for a single block state.
#[derive(Debug, Clone)]
pub struct BlockInfo {
    pub id: BlockId,
    /// Full state string, e.g. `"minecraft:piston[extended=false,facing=up]"`.
    pub name: String,
    /// `-1.0` = unbreakable (and immovable).
    pub hardness: f32,
    pub piston_behavior: PistonBehavior,
    pub block_entity: bool,
}

impl BlockInfo {
    /// Name without the property list.
    pub fn base_name(&self) -> &str {
        self.name.split('[').next().unwrap_or(&self.name)
    }

    /// Value of a state property, e.g. `property("facing")`.
    pub fn property(&self, key: &str) -> Option<&str> {
        let props = self.name.split_once('[')?.1.strip_suffix(']')?;
        props
            .split(',')
            .filter_map(|kv| kv.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

/// Piston base metadata derived from the state name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PistonInfo {
    pub facing: Direction,
    pub sticky: bool,
    pub extended: bool,
}

/// Read-only block queries the piston simulation needs.
pub trait PistonClassifier {
    fn can_move(&self, block: BlockId, pushing: bool) -> bool;
    fn can_destroy(&self, block: BlockId) -> bool;
    fn is_slime(&self, block: BlockId) -> bool;
    fn is_honey(&self, block: BlockId) -> bool;
    /// The full-length head for a piston facing `facing`, or air if unknown.
    fn piston_head(&self, facing: Direction) -> BlockId;
    fn is_piston_head(&self, block: BlockId) -> bool;
    /// Piston base metadata, `None` for anything that is not a base.
    fn piston(&self, block: BlockId) -> Option<PistonInfo>;

    /// Slime and honey drag their neighbours.
    fn is_sticky(&self, block: BlockId) -> bool {
        self.is_slime(block) || self.is_honey(block)
    }

    /// Whether `b` is dragged along by `a` (or the other way round).
    /// Slime and honey do not stick to each other.
    fn is_attachable(&self, a: BlockId, b: BlockId) -> bool {
        match (self.is_sticky(a), self.is_sticky(b)) {
            (true, true) => a == b,
            (a_sticky, b_sticky) => a_sticky || b_sticky,
        }
    }
}

/// Registry of Java block states.
pub struct BlockRegistry {
    blocks: HashMap<BlockId, BlockInfo>,
    by_name: HashMap<String, BlockId>,
    pistons: HashMap<BlockId, PistonInfo>,
    heads: HashMap<BlockId, Direction>,
    long_heads: HashMap<Direction, BlockId>,
    slime: BlockId,
    honey: BlockId,
    collisions: CollisionTable,
}

// ---------------------------------------------------------------------------
// JSON data
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct BlockEntry {
    id: BlockId,
    name: String,
    #[serde(default)]
    hardness: f32,
    #[serde(default)]
    piston_behavior: Option<String>,
    #[serde(default)]
    block_entity: bool,
    #[serde(default)]
    collision: Vec<Vec<f64>>,
}

impl BlockRegistry {
    /// Parse a JSON block table.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let entries: Vec<BlockEntry> = serde_json::from_str(json)?;
        let mut blocks = Vec::with_capacity(entries.len());
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in entries {
            let piston_behavior = match entry.piston_behavior.as_deref() {
                None => PistonBehavior::Normal,
                Some(s) => PistonBehavior::parse(s).ok_or_else(|| {
                    RegistryError::UnknownPistonBehavior {
                        name: entry.name.clone(),
                        behavior: s.to_string(),
                    }
                })?,
            };
            let mut boxes = Vec::with_capacity(entry.collision.len());
            for values in &entry.collision {
                let &[x0, y0, z0, x1, y1, z1] = values.as_slice() else {
                    return Err(RegistryError::BadCollisionBox {
                        name: entry.name.clone(),
                        len: values.len(),
                    });
                };
                boxes.push(BoundingBox::from_min_max(
                    DVec3::new(x0, y0, z0),
                    DVec3::new(x1, y1, z1),
                ));
            }
            let info = BlockInfo {
                id: entry.id,
                name: entry.name,
                hardness: entry.hardness,
                piston_behavior,
                block_entity: entry.block_entity,
            };
            if !seen.insert(info.id) {
                return Err(RegistryError::DuplicateId(info.id));
            }
            blocks.push((info, boxes));
        }
        let registry = Self::assemble(blocks);
        registry.validate()?;
        Ok(registry)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The built-in vanilla subset.
    pub fn vanilla() -> Self {
        let mut blocks = Vec::new();
        for entry in BLOCK_DATA {
            let id = blocks.len() as BlockId;
            blocks.push((entry.info(id, entry.name.to_string()), entry.shape.boxes()));
        }
        for (name, hardness, behavior, block_entity, shape) in piston_states() {
            let id = blocks.len() as BlockId;
            let info = BlockInfo {
                id,
                name,
                hardness,
                piston_behavior: behavior,
                block_entity,
            };
            blocks.push((info, shape.boxes()));
        }
        Self::assemble(blocks)
    }

    fn assemble(blocks: Vec<(BlockInfo, Vec<BoundingBox>)>) -> Self {
        let mut registry = Self {
            blocks: HashMap::with_capacity(blocks.len()),
            by_name: HashMap::with_capacity(blocks.len()),
            pistons: HashMap::new(),
            heads: HashMap::new(),
            long_heads: HashMap::new(),
            slime: AIR,
            honey: AIR,
            collisions: CollisionTable::default(),
        };
        for (info, boxes) in blocks {
            registry.classify(&info);
            if !boxes.is_empty() {
                registry.collisions.insert(info.id, BlockCollision::new(boxes));
            }
            registry.by_name.insert(info.name.clone(), info.id);
            registry.blocks.insert(info.id, info);
        }
        registry
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.blocks.get(&AIR).map(|info| info.name.as_str()) != Some("minecraft:air") {
            return Err(RegistryError::AirNotZero);
        }
        if self.slime == AIR {
            return Err(RegistryError::MissingBlock("minecraft:slime_block"));
        }
        if self.honey == AIR {
            return Err(RegistryError::MissingBlock("minecraft:honey_block"));
        }
        Ok(())
    }

    fn classify(&mut self, info: &BlockInfo) {
        let facing = info.property("facing").and_then(Direction::from_name);
        match (info.base_name(), facing) {
            ("minecraft:slime_block", _) => self.slime = info.id,
            ("minecraft:honey_block", _) => self.honey = info.id,
            ("minecraft:piston" | "minecraft:sticky_piston", Some(facing)) => {
                let piston = PistonInfo {
                    facing,
                    sticky: info.base_name() == "minecraft:sticky_piston",
                    extended: info.property("extended") == Some("true"),
                };
                self.pistons.insert(info.id, piston);
            }
            ("minecraft:piston_head", Some(facing)) => {
                self.heads.insert(info.id, facing);
                let long = info.property("short") == Some("false");
                if long && info.property("type") == Some("normal") {
                    self.long_heads.insert(facing, info.id);
                }
            }
            _ => {}
        }
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockInfo> {
        self.blocks.get(&id)
    }

    /// Every registered state, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockInfo> {
        self.blocks.values()
    }

    pub fn id_of(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn collisions(&self) -> &CollisionTable {
        &self.collisions
    }

    /// The piston base facing `facing` with the given flags.
    pub fn piston_base(&self, facing: Direction, sticky: bool, extended: bool) -> Option<BlockId> {
        let wanted = PistonInfo {
            facing,
            sticky,
            extended,
        };
        self.pistons
            .iter()
            .find(|(_, info)| **info == wanted)
            .map(|(id, _)| *id)
    }
}

impl PistonClassifier for BlockRegistry {
    fn can_move(&self, block: BlockId, pushing: bool) -> bool {
        if block == AIR {
            return true;
        }
        if let Some(piston) = self.pistons.get(&block) {
            return !piston.extended;
        }
        let Some(info) = self.blocks.get(&block) else {
            return true;
        };
        if info.hardness == -1.0 {
            return false;
        }
        match info.piston_behavior {
            PistonBehavior::Block | PistonBehavior::Destroy => false,
            PistonBehavior::PushOnly => pushing,
            PistonBehavior::Normal | PistonBehavior::Ignore => !info.block_entity,
        }
    }

    fn can_destroy(&self, block: BlockId) -> bool {
        self.blocks
            .get(&block)
            .is_some_and(|info| info.piston_behavior == PistonBehavior::Destroy)
    }

    fn is_slime(&self, block: BlockId) -> bool {
        block == self.slime
    }

    fn is_honey(&self, block: BlockId) -> bool {
        block == self.honey
    }

    fn piston_head(&self, facing: Direction) -> BlockId {
        self.long_heads.get(&facing).copied().unwrap_or(AIR)
    }

    fn is_piston_head(&self, block: BlockId) -> bool {
        self.heads.contains_key(&block)
    }

    fn piston(&self, block: BlockId) -> Option<PistonInfo> {
        self.pistons.get(&block).copied()
    }
}

// ---------------------------------------------------------------------------
// Vanilla data
// ---------------------------------------------------------------------------

/// Collision shape templates, in sixteenths of a block.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Empty,
    Full,
    Honey,
    /// Base of an extended piston: 12/16 deep toward `facing`.
    ExtendedBase(Direction),
    /// Head plate plus the arm reaching 4/16 into the base.
    Head(Direction),
}

impl Shape {
    fn boxes(self) -> Vec<BoundingBox> {
        let px = |x0, y0, z0, x1, y1, z1| {
            BoundingBox::from_min_max(
                DVec3::new(x0, y0, z0) / 16.0,
                DVec3::new(x1, y1, z1) / 16.0,
            )
        };
        match self {
            Shape::Empty => Vec::new(),
            Shape::Full => vec![px(0.0, 0.0, 0.0, 16.0, 16.0, 16.0)],
            Shape::Honey => vec![px(1.0, 0.0, 1.0, 15.0, 15.0, 15.0)],
            Shape::ExtendedBase(facing) => vec![oriented(facing, 0.0, 12.0, 0.0, 16.0)],
            Shape::Head(facing) => vec![
                oriented(facing, 12.0, 16.0, 0.0, 16.0),
                oriented(facing, -4.0, 12.0, 6.0, 10.0),
            ],
        }
    }
}

/// Box spanning `[from, to]` along `facing` (measured from the back face)
/// and `[lo, hi]` on both other axes, in sixteenths.
fn oriented(facing: Direction, from: f64, to: f64, lo: f64, hi: f64) -> BoundingBox {
    let positive = facing.unit_vector().element_sum() > 0;
    let along = |v: f64| if positive { v } else { 16.0 - v };
    let (a, b) = (along(from).min(along(to)), along(from).max(along(to)));
    let (min, max) = match facing.axis() {
        Axis::X => (DVec3::new(a, lo, lo), DVec3::new(b, hi, hi)),
        Axis::Y => (DVec3::new(lo, a, lo), DVec3::new(hi, b, hi)),
        Axis::Z => (DVec3::new(lo, lo, a), DVec3::new(hi, hi, b)),
    };
    BoundingBox::from_min_max(min / 16.0, max / 16.0)
}

struct VanillaBlock {
    name: &'static str,
    hardness: f32,
    behavior: PistonBehavior,
    block_entity: bool,
    shape: Shape,
}

impl VanillaBlock {
    fn info(&self, id: BlockId, name: String) -> BlockInfo {
        BlockInfo {
            id,
            name,
            hardness: self.hardness,
            piston_behavior: self.behavior,
            block_entity: self.block_entity,
        }
    }
}

macro_rules! block {
    ($name:expr, $hardness:expr) => {
        block!($name, $hardness, Normal, false, Full)
    };
    ($name:expr, $hardness:expr, $behavior:ident) => {
        block!($name, $hardness, $behavior, false, Full)
    };
    ($name:expr, $hardness:expr, $behavior:ident, $entity:expr, $shape:ident) => {
        VanillaBlock {
            name: $name,
            hardness: $hardness,
            behavior: PistonBehavior::$behavior,
            block_entity: $entity,
            shape: Shape::$shape,
        }
    };
}

/// Plain blocks; ids are assigned in order starting at air = 0.
static BLOCK_DATA: &[VanillaBlock] = &[
    block!("minecraft:air", 0.0, Normal, false, Empty),
    block!("minecraft:stone", 1.5),
    block!("minecraft:dirt", 0.5),
    block!("minecraft:cobblestone", 2.0),
    block!("minecraft:obsidian", 50.0, Block),
    block!("minecraft:bedrock", -1.0),
    block!("minecraft:slime_block", 0.0),
    block!("minecraft:honey_block", 0.0, Normal, false, Honey),
    block!("minecraft:glass", 0.3),
    block!("minecraft:magenta_glazed_terracotta[facing=north]", 1.4, PushOnly),
    block!("minecraft:chest[facing=north,type=single,waterlogged=false]", 2.5, Normal, true, Full),
    block!("minecraft:cobweb", 4.0, Destroy, false, Empty),
    block!("minecraft:moving_piston[facing=north,type=normal]", -1.0, Block, true, Empty),
];

/// Piston bases and heads for every facing.
fn piston_states() -> Vec<(String, f32, PistonBehavior, bool, Shape)> {
    let mut states = Vec::new();
    for base in ["piston", "sticky_piston"] {
        for facing in Direction::ALL {
            let f = facing_name(facing);
            for extended in [false, true] {
                let shape = if extended {
                    Shape::ExtendedBase(facing)
                } else {
                    Shape::Full
                };
                states.push((
                    format!("minecraft:{base}[extended={extended},facing={f}]"),
                    1.5,
                    PistonBehavior::Normal,
                    false,
                    shape,
                ));
            }
        }
    }
    for facing in Direction::ALL {
        let f = facing_name(facing);
        for short in [false, true] {
            for kind in ["normal", "sticky"] {
                states.push((
                    format!("minecraft:piston_head[facing={f},short={short},type={kind}]"),
                    1.5,
                    PistonBehavior::Block,
                    false,
                    Shape::Head(facing),
                ));
            }
        }
    }
    states
}

fn facing_name(facing: Direction) -> &'static str {
    match facing {
        Direction::Down => "down",
        Direction::Up => "up",
        Direction::North => "north",
        Direction::South => "south",
        Direction::West => "west",
        Direction::East => "east",
    }
}
