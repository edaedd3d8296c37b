//! Client-side piston simulation.
//!
//! The Java server only reports that a piston started moving. Bedrock
//! clients have to be told which blocks are in flight, how the arm is
//! animating and how the local player is shoved, so the session mirrors the
//! server's piston logic tick by tick and emits [`ClientUpdate`]s.

mod cache;
mod push;
mod search;
mod state;
pub mod tags;

use glam::{DVec3, IVec3, Vec3};

use crate::block_registry::{BlockId, BlockRegistry, PistonClassifier};
use crate::chunk::ChunkCache;
use crate::collision::CollisionTable;
use crate::geometry::Direction;
use crate::physics::PlayerPhysics;

pub use cache::{MovingBlocks, PistonCache};
pub use push::PlayerPush;
pub use search::{find_affected_blocks, Immovable};
pub use state::PistonState;
pub use tags::{ArmState, MovingBlock, PistonArm};

/// Most blocks a single piston moves.
pub const PUSH_LIMIT: usize = 12;

/// Ticks a finished piston keeps its moving-block entries.
pub const REMOVAL_DELAY: u32 = 5;

/// Arm progress per tick.
pub const PROGRESS_STEP: f32 = 0.5;

/// Largest distance the player is displaced per axis within one tick.
pub const MAX_DISPLACEMENT: f64 = 0.51;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PistonAction {
    Pushing,
    Pulling,
    CancelledMidPush,
}

impl PistonAction {
    /// Java block event action id.
    pub fn from_id(id: u8) -> Option<PistonAction> {
        match id {
            0 => Some(PistonAction::Pushing),
            1 => Some(PistonAction::Pulling),
            2 => Some(PistonAction::CancelledMidPush),
            _ => None,
        }
    }

    /// Arm progress when the action starts.
    pub fn start_progress(self) -> f32 {
        match self {
            PistonAction::Pushing => 0.0,
            PistonAction::Pulling | PistonAction::CancelledMidPush => 1.0,
        }
    }

    /// Arm progress when the action is complete.
    pub fn end_progress(self) -> f32 {
        match self {
            PistonAction::Pushing => 1.0,
            PistonAction::Pulling | PistonAction::CancelledMidPush => 0.0,
        }
    }

    /// Direction blocks travel for a piston facing `orientation`.
    pub fn movement(self, orientation: Direction) -> IVec3 {
        match self {
            PistonAction::Pulling => orientation.reversed().unit_vector(),
            PistonAction::Pushing | PistonAction::CancelledMidPush => orientation.unit_vector(),
        }
    }
}

/// Something the client must be told.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientUpdate {
    /// A block placed or cleared; already applied to the world cache.
    Block { position: IVec3, block: BlockId },
    /// Swap in the client-only moving-block placeholder.
    MovingPlaceholder { position: IVec3 },
    MovingBlockData(MovingBlock),
    PistonArmData(PistonArm),
    /// Absolute player position (feet).
    PlayerPosition { feet: DVec3, on_ground: bool },
    PlayerMotion(Vec3),
}

/// Static block data the simulation reads.
#[derive(Clone, Copy)]
pub struct BlockData<'a> {
    pub classifier: &'a dyn PistonClassifier,
    pub shapes: &'a CollisionTable,
}

impl<'a> BlockData<'a> {
    pub fn from_registry(registry: &'a BlockRegistry) -> Self {
        Self {
            classifier: registry,
            shapes: registry.collisions(),
        }
    }
}

/// Everything outside the piston cache that a piston update touches.
pub struct PistonEnv<'a> {
    pub world: &'a mut ChunkCache,
    pub data: BlockData<'a>,
    pub player: &'a mut PlayerPhysics,
    pub out: &'a mut Vec<ClientUpdate>,
}

impl PistonEnv<'_> {
    /// Write `block` to the world cache and tell the client.
    pub fn update_block(&mut self, position: IVec3, block: BlockId) {
        self.world.set_block(position, block);
        self.out.push(ClientUpdate::Block { position, block });
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_ids() {
        assert_eq!(PistonAction::from_id(0), Some(PistonAction::Pushing));
        assert_eq!(PistonAction::from_id(2), Some(PistonAction::CancelledMidPush));
        assert_eq!(PistonAction::from_id(3), None);
    }

    #[test]
    fn movement_follows_action() {
        assert_eq!(PistonAction::Pushing.movement(Direction::Up), IVec3::Y);
        assert_eq!(PistonAction::Pulling.movement(Direction::Up), IVec3::NEG_Y);
        assert_eq!(PistonAction::CancelledMidPush.movement(Direction::West), IVec3::NEG_X);
    }

    #[test]
    fn progress_bounds() {
        assert_eq!(PistonAction::Pushing.start_progress(), 0.0);
        assert_eq!(PistonAction::Pushing.end_progress(), 1.0);
        assert_eq!(PistonAction::Pulling.start_progress(), 1.0);
        assert_eq!(PistonAction::CancelledMidPush.end_progress(), 0.0);
    }
}
