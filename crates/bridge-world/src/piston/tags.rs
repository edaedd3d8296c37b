//! Block entity data the client needs to animate pistons.

use bridge_nbt::NbtCompound;
use glam::IVec3;

use crate::block_registry::BlockId;

/// Piston position written into a moving block that has come to rest, which
/// detaches it from its piston on the client.
pub const DETACHED_PISTON_POSITION: IVec3 = IVec3::new(0, -1, 0);

/// Arm animation phase as understood by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArmState {
    Retracted = 0,
    Extending = 1,
    Extended = 2,
    Retracting = 3,
}

/// `PistonArm` block entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PistonArm {
    pub position: IVec3,
    /// Attached block positions flattened to `x, y, z` triples.
    pub attached_blocks: Vec<i32>,
    pub progress: f32,
    pub last_progress: f32,
    pub state: ArmState,
    pub sticky: bool,
}

impl PistonArm {
    /// Arm of a piston that is not moving.
    pub fn resting(position: IVec3, extended: bool, sticky: bool) -> Self {
        let (progress, state) = if extended {
            (1.0, ArmState::Extended)
        } else {
            (0.0, ArmState::Retracted)
        };
        Self {
            position,
            attached_blocks: Vec::new(),
            progress,
            last_progress: progress,
            state,
            sticky,
        }
    }

    pub fn to_nbt(&self) -> NbtCompound {
        let state = self.state as i8;
        NbtCompound::new()
            .with_string("id", "PistonArm")
            .with_int_array("AttachedBlocks", self.attached_blocks.clone())
            .with_float("Progress", self.progress)
            .with_float("LastProgress", self.last_progress)
            .with_byte("NewState", state)
            .with_byte("State", state)
            .with_byte("Sticky", self.sticky as i8)
            .with_byte("isMovable", 0)
            .with_int("x", self.position.x)
            .with_int("y", self.position.y)
            .with_int("z", self.position.z)
    }
}

/// `MovingBlock` block entity: a block rendered in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingBlock {
    pub position: IVec3,
    pub block: BlockId,
    pub piston_position: IVec3,
    /// Set when the moved block is itself a piston base.
    pub moving_entity: Option<PistonArm>,
}

impl MovingBlock {
    pub fn is_detached(&self) -> bool {
        self.piston_position == DETACHED_PISTON_POSITION
    }

    /// `block_state` is the client block state compound of `self.block`.
    pub fn to_nbt(&self, block_state: NbtCompound) -> NbtCompound {
        let mut tag = NbtCompound::new()
            .with_string("id", "MovingBlock")
            .with_compound("movingBlock", block_state)
            .with_byte("isMovable", 1)
            .with_int("pistonPosX", self.piston_position.x)
            .with_int("pistonPosY", self.piston_position.y)
            .with_int("pistonPosZ", self.piston_position.z)
            .with_int("x", self.position.x)
            .with_int("y", self.position.y)
            .with_int("z", self.position.z);
        if let Some(arm) = &self.moving_entity {
            tag = tag.with_compound("movingEntity", arm.to_nbt());
        }
        tag
    }
}
