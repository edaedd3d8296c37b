//! Static block collision shapes and movement correction against them.

use std::collections::HashMap;

use glam::{DVec3, IVec3};

use crate::block_registry::BlockId;
use crate::chunk::BlockView;
use crate::geometry::{Axis, BoundingBox, COLLISION_TOLERANCE};

/// Collision geometry of one block state, relative to the block origin.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockCollision {
    boxes: Vec<BoundingBox>,
}

impl BlockCollision {
    pub fn new(boxes: Vec<BoundingBox>) -> Self {
        Self { boxes }
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    /// Whether the shape placed at `at` intersects `other`.
    pub fn intersects(&self, at: DVec3, other: &BoundingBox) -> bool {
        self.boxes.iter().any(|b| b.intersects(at, other))
    }

    /// Clamp `offset` so `moving` does not enter the shape placed at `at`.
    pub fn compute_collision_offset(
        &self,
        at: DVec3,
        moving: &BoundingBox,
        axis: Axis,
        mut offset: f64,
    ) -> f64 {
        for b in &self.boxes {
            offset = b.max_offset(at, moving, axis, offset);
            if offset.abs() < COLLISION_TOLERANCE {
                return 0.0;
            }
        }
        offset
    }
}

/// Block state → collision shape. States without an entry have no collision.
#[derive(Debug, Default)]
pub struct CollisionTable {
    shapes: HashMap<BlockId, BlockCollision>,
}

impl CollisionTable {
    pub fn insert(&mut self, block: BlockId, shape: BlockCollision) {
        self.shapes.insert(block, shape);
    }

    pub fn get(&self, block: BlockId) -> Option<&BlockCollision> {
        self.shapes.get(&block)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// Collision contributed by blocks that are not (yet) in the world, such
/// as blocks mid-flight on a piston.
pub trait MovingCollision {
    /// Whether anything is moving; widens the scanned block range.
    fn is_active(&self) -> bool;

    /// Clamp `offset` against whatever is moving through `pos`. The flag is
    /// set when a slime block changed the offset.
    fn collision_offset(
        &self,
        pos: IVec3,
        moving: &BoundingBox,
        axis: Axis,
        offset: f64,
    ) -> (f64, bool);
}

/// Inclusive block range around a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub min: IVec3,
    pub max: IVec3,
}

impl BlockRange {
    /// Blocks that could collide with `bbox`. Extends half a block down for
    /// tall shapes like fences, and one more block in every direction (half
    /// downward) when `expand` is set so in-flight blocks are included.
    pub fn around(bbox: &BoundingBox, expand: bool) -> Self {
        let feet = bbox.bottom_center();
        let grow = if expand { 1.0 } else { 0.0 };
        let half_x = bbox.size.x / 2.0 + COLLISION_TOLERANCE + grow;
        let half_z = bbox.size.z / 2.0 + COLLISION_TOLERANCE + grow;
        let min = DVec3::new(
            feet.x - half_x,
            feet.y - 0.5 - COLLISION_TOLERANCE - grow / 2.0,
            feet.z - half_z,
        );
        let max = DVec3::new(feet.x + half_x, feet.y + bbox.size.y + grow, feet.z + half_z);
        Self {
            min: min.floor().as_ivec3(),
            max: max.floor().as_ivec3(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = IVec3> {
        let Self { min, max } = *self;
        (min.x..=max.x).flat_map(move |x| {
            (min.y..=max.y).flat_map(move |y| (min.z..=max.z).map(move |z| IVec3::new(x, y, z)))
        })
    }
}

/// Corrects a movement vector against world blocks and moving blocks.
pub struct MovementCorrector<'a> {
    pub world: &'a dyn BlockView,
    pub shapes: &'a CollisionTable,
    pub moving: Option<&'a dyn MovingCollision>,
    /// Include static world blocks; otherwise only moving blocks are tested.
    pub check_world: bool,
    /// Set when a moving slime block limited the movement.
    pub slime_hit: bool,
}

impl<'a> MovementCorrector<'a> {
    pub fn new(
        world: &'a dyn BlockView,
        shapes: &'a CollisionTable,
        moving: Option<&'a dyn MovingCollision>,
        check_world: bool,
    ) -> Self {
        Self {
            world,
            shapes,
            moving,
            check_world,
            slime_hit: false,
        }
    }

    fn pistons_active(&self) -> bool {
        self.moving.is_some_and(|m| m.is_active())
    }

    /// Full correction with step-up, as applied to player movement.
    pub fn correct_movement(
        &mut self,
        movement: DVec3,
        bbox: &BoundingBox,
        on_ground: bool,
        step_up: f64,
    ) -> DVec3 {
        if !self.check_world && !self.pistons_active() {
            return movement;
        }
        let adjusted = if movement == DVec3::ZERO {
            movement
        } else {
            self.correct_for_collisions(movement, bbox)
        };

        let vertical_collision = adjusted.y != movement.y;
        let horizontal_collision = adjusted.x != movement.x || adjusted.z != movement.z;
        let on_ground = on_ground || (vertical_collision && movement.y < 0.0);
        if !(on_ground && horizontal_collision) {
            return adjusted;
        }

        let horizontal = DVec3::new(movement.x, 0.0, movement.z);
        let mut step = self.correct_for_collisions(horizontal + DVec3::Y * step_up, bbox);

        let stretched = bbox.extended(horizontal);
        let max_step_up = self
            .correct_for_collisions(DVec3::Y * step_up, &stretched)
            .y;
        if max_step_up < step_up {
            // Ceiling above: try stepping only as high as it allows.
            let raised = bbox.translated(DVec3::Y * max_step_up);
            let lower = self.correct_for_collisions(horizontal, &raised);
            if horizontal_len_sq(lower) > horizontal_len_sq(step) {
                step = lower + DVec3::Y * max_step_up;
            }
        }

        if horizontal_len_sq(step) > horizontal_len_sq(adjusted) {
            let stepped = bbox.translated(step);
            let rest = self
                .correct_for_collisions(DVec3::new(0.0, movement.y - step.y, 0.0), &stepped)
                .y;
            return step + DVec3::Y * rest;
        }
        adjusted
    }

    /// Per-axis correction: Y first, then the larger horizontal axis.
    pub fn correct_for_collisions(&mut self, movement: DVec3, bbox: &BoundingBox) -> DVec3 {
        let mut bbox = *bbox;
        let range = BlockRange::around(&bbox.extended(movement), self.pistons_active());
        let mut result = movement;

        let order = if movement.z.abs() > movement.x.abs() {
            [Axis::Y, Axis::Z, Axis::X]
        } else {
            [Axis::Y, Axis::X, Axis::Z]
        };
        for axis in order {
            let wanted = axis.choose(result);
            if wanted.abs() <= COLLISION_TOLERANCE {
                continue;
            }
            let allowed = self.axis_offset(&bbox, axis, wanted, range);
            bbox.translate(axis.vector(allowed));
            result = match axis {
                Axis::X => DVec3::new(allowed, result.y, result.z),
                Axis::Y => DVec3::new(result.x, allowed, result.z),
                Axis::Z => DVec3::new(result.x, result.y, allowed),
            };
        }
        result
    }

    fn axis_offset(&mut self, bbox: &BoundingBox, axis: Axis, mut offset: f64, range: BlockRange) -> f64 {
        for pos in range.iter() {
            if self.check_world {
                if let Some(shape) = self.shapes.get(self.world.block_at(pos)) {
                    offset = shape.compute_collision_offset(pos.as_dvec3(), bbox, axis, offset);
                }
            }
            if let Some(moving) = self.moving {
                let (clamped, slime) = moving.collision_offset(pos, bbox, axis, offset);
                offset = clamped;
                self.slime_hit |= slime;
            }
            if offset.abs() < COLLISION_TOLERANCE {
                return 0.0;
            }
        }
        offset
    }
}

fn horizontal_len_sq(v: DVec3) -> f64 {
    v.x * v.x + v.z * v.z
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_registry::{BlockRegistry, AIR};
    use crate::chunk::ChunkCache;
    use crate::physics::PlayerPhysics;

    fn floor_world(registry: &BlockRegistry) -> ChunkCache {
        let stone = registry.id_of("minecraft:stone").unwrap();
        let mut blocks = Vec::new();
        for x in -3..=3 {
            for z in -3..=3 {
                blocks.push((IVec3::new(x, 63, z), stone));
            }
        }
        ChunkCache::from_blocks(blocks)
    }

    #[test]
    fn shape_offset_snaps_to_zero() {
        let shape = BlockCollision::new(vec![BoundingBox::solid()]);
        let mover = BoundingBox::new(DVec3::new(0.5, 1.9, 0.5), DVec3::new(0.6, 1.8, 0.6));
        assert_eq!(shape.compute_collision_offset(DVec3::ZERO, &mover, Axis::Y, -0.5), 0.0);
    }

    #[test]
    fn range_grows_when_pistons_active() {
        let p = PlayerPhysics::at_feet(1, DVec3::new(0.5, 64.0, 0.5));
        let still = BlockRange::around(&p.bounding_box, false);
        assert_eq!(still.min, IVec3::new(0, 63, 0));
        assert_eq!(still.max, IVec3::new(0, 65, 0));
        let active = BlockRange::around(&p.bounding_box, true);
        assert_eq!(active.min, IVec3::new(-1, 62, -1));
        assert_eq!(active.max, IVec3::new(1, 66, 1));
        assert_eq!(active.iter().count(), 3 * 5 * 3);
    }

    #[test]
    fn falling_stops_on_floor() {
        let registry = BlockRegistry::vanilla();
        let world = floor_world(&registry);
        let p = PlayerPhysics::at_feet(1, DVec3::new(0.5, 64.3, 0.5));
        let mut corrector = MovementCorrector::new(&world, registry.collisions(), None, true);
        let moved = corrector.correct_for_collisions(DVec3::new(0.0, -1.0, 0.0), &p.bounding_box);
        assert!((moved.y + 0.3).abs() < 1e-6);
    }

    #[test]
    fn nothing_to_check_returns_input() {
        let registry = BlockRegistry::vanilla();
        let world = floor_world(&registry);
        let p = PlayerPhysics::at_feet(1, DVec3::new(0.5, 64.3, 0.5));
        let mut corrector = MovementCorrector::new(&world, registry.collisions(), None, false);
        let movement = DVec3::new(0.0, -1.0, 0.0);
        assert_eq!(corrector.correct_movement(movement, &p.bounding_box, false, 0.6), movement);
    }

    #[test]
    fn ledge_above_step_height_blocks() {
        let registry = BlockRegistry::vanilla();
        let mut world = floor_world(&registry);
        // Honey is 15/16 tall, above the 0.6 step height.
        let honey = registry.id_of("minecraft:honey_block").unwrap();
        world.set_block(IVec3::new(1, 64, 0), honey);
        let p = PlayerPhysics::at_feet(1, DVec3::new(0.5, 64.0, 0.5));
        let movement = DVec3::new(0.5, 0.0, 0.0);

        let mut corrector = MovementCorrector::new(&world, registry.collisions(), None, true);
        let moved = corrector.correct_movement(movement, &p.bounding_box, true, 0.6);
        assert!(moved.y.abs() < 1e-6);
        assert!((moved.x - 0.2625).abs() < 1e-6);

        world.set_block(IVec3::new(1, 64, 0), AIR);
        let mut corrector = MovementCorrector::new(&world, registry.collisions(), None, true);
        let moved = corrector.correct_movement(movement, &p.bounding_box, true, 0.6);
        assert!((moved.x - 0.5).abs() < 1e-6);
    }
}
