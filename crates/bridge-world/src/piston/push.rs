//! Shoving the player out of the way of moving blocks.

use glam::{DVec3, IVec3, Vec3};

use super::state::PistonState;
use super::{BlockData, PistonAction, MAX_DISPLACEMENT};
use crate::block_registry::BlockId;
use crate::collision::{BlockCollision, MovementCorrector};
use crate::geometry::{BoundingBox, Direction, COLLISION_TOLERANCE};
use crate::physics::{PlayerPhysics, PLAYER_STEP_UP};

/// What the pistons did to the player this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerPush {
    /// Accumulated displacement, clamped per axis.
    pub displacement: DVec3,
    /// Launch velocity from slime blocks.
    pub motion: Vec3,
    pub collided: bool,
    pub slime_collision: bool,
    /// Riding the side of a moving honey block.
    pub attached_to_honey: bool,
}

impl PlayerPush {
    /// Move the player by `displacement`, keeping the tick total within
    /// [`MAX_DISPLACEMENT`] on every axis and out of solid blocks.
    pub fn displace(
        &mut self,
        displacement: DVec3,
        player: &mut PlayerPhysics,
        corrector: &mut MovementCorrector<'_>,
    ) {
        let total = (self.displacement + displacement)
            .clamp(DVec3::splat(-MAX_DISPLACEMENT), DVec3::splat(MAX_DISPLACEMENT));
        let delta = total - self.displacement;
        let delta =
            corrector.correct_movement(delta, &player.bounding_box, player.on_ground, PLAYER_STEP_UP);
        self.slime_collision |= corrector.slime_hit;
        player.bounding_box.translate(delta);
        self.displacement = total;
    }
}

/// Borrowed state for one piston's push pass.
pub(crate) struct PushFrame<'a, 'w> {
    pub data: BlockData<'w>,
    pub corrector: &'a mut MovementCorrector<'w>,
    pub player: &'a mut PlayerPhysics,
    pub push: &'a mut PlayerPush,
}

/// Collision box for riding a honey block sideways: the band just above the
/// block's top, up to half a block above the full cube.
pub(crate) fn honey_ride_box(honey: &BlockCollision) -> Option<BoundingBox> {
    let shape = honey.boxes().first()?;
    let top = shape.max().y;
    let height = 1.5 - top;
    Some(BoundingBox::new(
        DVec3::new(0.5, top + height / 2.0, 0.5),
        DVec3::new(shape.size.x, height, shape.size.z),
    ))
}

/// Deepest overlap between `player` and the shape placed at `at` and
/// stretched by `extend`, measured along `direction`. Boxes the player is
/// more inside of from the opposite side are ignored.
fn block_intersection(
    shape: &BlockCollision,
    at: DVec3,
    extend: DVec3,
    player: &BoundingBox,
    direction: Direction,
) -> f64 {
    let opposite = direction.reversed();
    shape
        .boxes()
        .iter()
        .map(|b| b.extended(extend).translated(at))
        .filter(|b| b.intersects(DVec3::ZERO, player))
        .filter_map(|b| {
            let inside = player.intersection_size(&b, direction);
            let other_side = player.intersection_size(&b, opposite);
            (inside < other_side).then_some(inside)
        })
        .fold(0.0, f64::max)
}

impl PistonState {
    /// Push the player for this tick's arm movement: head first, then plain
    /// blocks, then slime so a launch wins over a plain push.
    pub(crate) fn push_player(&self, frame: &mut PushFrame<'_, '_>) {
        let block_movement = match self.action() {
            PistonAction::Pushing => self.last_progress() as f64,
            PistonAction::Pulling | PistonAction::CancelledMidPush => {
                1.0 - self.last_progress() as f64
            }
        };
        // Let the player slide along blocks moving past them.
        let shrink = (IVec3::ONE - self.orientation().unit_vector().abs()).as_dvec3()
            * COLLISION_TOLERANCE
            * 2.0;
        frame.player.bounding_box.size -= shrink;

        let head = frame.data.classifier.piston_head(self.orientation());
        self.push_player_block(head, self.head_position(), block_movement, frame);
        let classifier = frame.data.classifier;
        let (slime, other): (Vec<_>, Vec<_>) = self
            .attached_blocks()
            .iter()
            .partition(|(_, block)| classifier.is_slime(*block));
        for &(start, block) in other.into_iter().chain(slime) {
            self.push_player_block(block, start, block_movement, frame);
        }

        frame.player.bounding_box.size += shrink;
    }

    fn push_player_block(
        &self,
        block: BlockId,
        start: IVec3,
        block_movement: f64,
        frame: &mut PushFrame<'_, '_>,
    ) {
        let classifier = frame.data.classifier;
        let movement = self.movement().as_dvec3();
        let is_slime = classifier.is_slime(block);

        let destination = start.as_dvec3() + movement;
        if BoundingBox::solid().intersects(destination, &frame.player.bounding_box) {
            frame.push.collided = true;
            if is_slime {
                frame.push.slime_collision = true;
                let player_middle = frame.player.bounding_box.middle;
                self.apply_slime_motion(destination, player_middle, frame.push);
            }
        }

        let at = start.as_dvec3() + movement * block_movement;
        if classifier.is_honey(block) && self.honey_holds_player(block, at, frame) {
            frame.push.collided = true;
            frame.push.attached_to_honey = true;
            let step = (self.progress() - self.last_progress()).abs() as f64;
            frame.push.displace(movement * step, frame.player, frame.corrector);
            return;
        }

        let Some(shape) = frame.data.shapes.get(block) else {
            return;
        };
        let extend = movement * (1.0 - block_movement).min(0.5);
        let intersection = block_intersection(
            shape,
            at,
            extend,
            &frame.player.bounding_box,
            self.movement_direction(),
        );
        if intersection > 0.0 {
            frame.push.collided = true;
            frame
                .push
                .displace(movement * (intersection + 0.01), frame.player, frame.corrector);
            if is_slime {
                frame.push.slime_collision = true;
                let player_middle = frame.player.bounding_box.middle;
                self.apply_slime_motion(at, player_middle, frame.push);
            }
        }
    }

    /// Honey carries a grounded player standing on it when it moves
    /// sideways.
    fn honey_holds_player(&self, honey: BlockId, at: DVec3, frame: &PushFrame<'_, '_>) -> bool {
        if self.orientation().is_vertical() || !frame.player.on_ground {
            return false;
        }
        frame
            .data
            .shapes
            .get(honey)
            .and_then(honey_ride_box)
            .is_some_and(|ride| ride.intersects(at, &frame.player.bounding_box))
    }

    /// Launch the player when they are on the side of a slime block that
    /// faces its travel direction.
    fn apply_slime_motion(&self, block_at: DVec3, player: DVec3, push: &mut PlayerPush) {
        let movement = self.movement().as_vec3();
        let center = block_at + 0.5;
        let motion = &mut push.motion;
        match self.movement_direction() {
            Direction::Down if player.y < center.y => motion.y = movement.y,
            Direction::Up if player.y > center.y => motion.y = movement.y,
            Direction::North if player.z < center.z => motion.z = movement.z,
            Direction::South if player.z > center.z => motion.z = movement.z,
            Direction::West if player.x < center.x => motion.x = movement.x,
            Direction::East if player.x > center.x => motion.x = movement.x,
            _ => {}
        }
    }
}
