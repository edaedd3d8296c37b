//! Per-session piston bookkeeping and the tick driver.

use std::collections::HashMap;

use glam::{DVec3, IVec3, Vec3};
use tracing::{debug, error};

use super::push::{PlayerPush, PushFrame};
use super::state::{AttachedSource, MovingBlockIndex, PistonState};
use super::{BlockData, ClientUpdate, PistonAction, PistonEnv};
use crate::block_registry::BlockId;
use crate::chunk::BlockView;
use crate::collision::{MovementCorrector, MovingCollision};
use crate::geometry::{Axis, BoundingBox, Direction};
use crate::physics::{PlayerPhysics, PLAYER_STEP_UP};

/// All pistons a session is animating, the index of blocks they have in
/// flight and what they did to the player this tick.
#[derive(Debug, Default)]
pub struct PistonCache {
    pistons: HashMap<IVec3, PistonState>,
    moving_blocks: MovingBlockIndex,
    push: PlayerPush,
}

impl PistonCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pistons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pistons.len()
    }

    pub fn piston(&self, position: IVec3) -> Option<&PistonState> {
        self.pistons.get(&position)
    }

    /// The piston at `position`, created at rest if it is not tracked yet.
    pub fn get_or_create(
        &mut self,
        position: IVec3,
        orientation: Direction,
        sticky: bool,
        extended: bool,
    ) -> &PistonState {
        self.pistons
            .entry(position)
            .or_insert_with(|| PistonState::new(position, orientation, sticky, extended))
    }

    /// Piston moving a block toward `position`, if any.
    pub fn moving_block_owner(&self, position: IVec3) -> Option<IVec3> {
        self.moving_blocks.get(&position).copied()
    }

    pub fn moving_block_count(&self) -> usize {
        self.moving_blocks.len()
    }

    /// What the pistons did to the player since the last tick started.
    pub fn player_push(&self) -> &PlayerPush {
        &self.push
    }

    /// Change the action of the piston at `position`, finding the attached
    /// blocks by search. A repeat of the current action is ignored. Returns
    /// `false` if no piston is tracked there.
    pub fn set_action(
        &mut self,
        position: IVec3,
        action: PistonAction,
        env: &mut PistonEnv<'_>,
    ) -> bool {
        let Some(piston) = self.pistons.get_mut(&position) else {
            return false;
        };
        piston.set_action(action, env, &mut self.moving_blocks, &mut self.push);
        true
    }

    /// Change the action of the piston at `position` with an attached-block
    /// set worked out elsewhere. Repeats are not ignored.
    pub fn set_action_with_blocks(
        &mut self,
        position: IVec3,
        action: PistonAction,
        attached: Vec<(IVec3, BlockId)>,
        env: &mut PistonEnv<'_>,
    ) -> bool {
        let Some(piston) = self.pistons.get_mut(&position) else {
            return false;
        };
        piston.begin_move(
            action,
            AttachedSource::Supplied(attached),
            env,
            &mut self.moving_blocks,
            &mut self.push,
        );
        true
    }

    /// Advance every piston by one tick.
    ///
    /// Arms move first and push the player, then the player is told where
    /// they ended up, and only then do settled blocks land so the player is
    /// never left inside one.
    pub fn tick(&mut self, env: &mut PistonEnv<'_>) {
        self.push = PlayerPush::default();
        if self.pistons.is_empty() {
            return;
        }

        let moved: Vec<IVec3> = self
            .pistons
            .values_mut()
            .filter_map(|piston| piston.update_movement().then(|| piston.position()))
            .collect();
        if !moved.is_empty() {
            let view = MovingBlocks {
                pistons: &self.pistons,
                index: &self.moving_blocks,
                data: env.data,
            };
            let mut corrector =
                MovementCorrector::new(&*env.world, env.data.shapes, Some(&view), true);
            for position in &moved {
                let Some(piston) = self.pistons.get(position) else {
                    continue;
                };
                piston.push_player(&mut PushFrame {
                    data: env.data,
                    corrector: &mut corrector,
                    player: &mut *env.player,
                    push: &mut self.push,
                });
                env.out.push(ClientUpdate::PistonArmData(piston.arm_tag()));
            }
        }

        self.send_player_movement(env);
        self.send_player_motion(env);

        for piston in self.pistons.values_mut() {
            piston.update_blocks(env, &mut self.moving_blocks);
        }
        self.pistons.retain(|position, piston| {
            let keep = !piston.can_be_removed();
            if !keep {
                debug!(piston = %position, "piston settled");
            }
            keep
        });

        if self.pistons.is_empty() && !self.moving_blocks.is_empty() {
            for (position, owner) in &self.moving_blocks {
                error!(%position, piston = %owner, "moving block outlived its piston");
            }
        }
    }

    fn send_player_movement(&self, env: &mut PistonEnv<'_>) {
        if self.push.displacement == DVec3::ZERO || self.push.motion != Vec3::ZERO {
            return;
        }
        let on_ground = self.push.displacement.y > 0.0 || env.player.on_ground;
        env.player.on_ground = on_ground;
        env.out.push(ClientUpdate::PlayerPosition {
            feet: env.player.feet(),
            on_ground,
        });
    }

    fn send_player_motion(&self, env: &mut PistonEnv<'_>) {
        if self.push.motion != Vec3::ZERO {
            env.out.push(ClientUpdate::PlayerMotion(self.push.motion));
        }
    }

    /// Collision view over the blocks currently in flight.
    pub fn moving_collision<'a>(&'a self, data: BlockData<'a>) -> MovingBlocks<'a> {
        MovingBlocks {
            pistons: &self.pistons,
            index: &self.moving_blocks,
            data,
        }
    }

    /// Clamp `offset` against a block moving toward `position`. Notes a slime
    /// collision when a slime block changed the offset.
    pub fn compute_collision_offset(
        &mut self,
        data: BlockData<'_>,
        position: IVec3,
        bbox: &BoundingBox,
        axis: Axis,
        offset: f64,
    ) -> f64 {
        let (adjusted, slime) = self
            .moving_collision(data)
            .collision_offset(position, bbox, axis, offset);
        self.push.slime_collision |= slime;
        adjusted
    }

    /// Whether a block moving toward `position` overlaps `bbox`.
    pub fn check_collision(
        &self,
        data: BlockData<'_>,
        position: IVec3,
        bbox: &BoundingBox,
    ) -> bool {
        self.moving_collision(data).intersects(position, bbox)
    }

    /// Correct a client-requested movement against blocks in flight only.
    /// Returns the movement unchanged when nothing is moving.
    pub fn correct_player_movement(
        &mut self,
        movement: DVec3,
        world: &dyn BlockView,
        data: BlockData<'_>,
        player: &PlayerPhysics,
    ) -> DVec3 {
        let view = self.moving_collision(data);
        let mut corrector = MovementCorrector::new(world, data.shapes, Some(&view), false);
        let adjusted = corrector.correct_movement(
            movement,
            &player.bounding_box,
            player.on_ground,
            PLAYER_STEP_UP,
        );
        self.push.slime_collision |= corrector.slime_hit;
        adjusted
    }

    /// Forget every piston, e.g. on dimension change or disconnect.
    pub fn clear(&mut self) {
        self.pistons.clear();
        self.moving_blocks.clear();
        self.push = PlayerPush::default();
    }
}

/// Borrowed lookup from in-flight destinations to the pistons moving them.
pub struct MovingBlocks<'a> {
    pistons: &'a HashMap<IVec3, PistonState>,
    index: &'a MovingBlockIndex,
    data: BlockData<'a>,
}

impl MovingBlocks<'_> {
    fn owner(&self, position: IVec3) -> Option<&PistonState> {
        self.index
            .get(&position)
            .and_then(|owner| self.pistons.get(owner))
    }

    pub fn intersects(&self, position: IVec3, bbox: &BoundingBox) -> bool {
        self.owner(position)
            .is_some_and(|piston| piston.check_collision(self.data, position, bbox))
    }
}

impl MovingCollision for MovingBlocks<'_> {
    fn is_active(&self) -> bool {
        !self.pistons.is_empty()
    }

    fn collision_offset(
        &self,
        pos: IVec3,
        moving: &BoundingBox,
        axis: Axis,
        offset: f64,
    ) -> (f64, bool) {
        match self.owner(pos) {
            Some(piston) => piston.compute_collision_offset(self.data, pos, moving, axis, offset),
            None => (offset, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_registry::{PistonClassifier, AIR};
    use crate::piston::test_support::Fixture;
    use crate::piston::{ArmState, REMOVAL_DELAY};

    const BASE: IVec3 = IVec3::new(0, 64, 0);

    fn tracked(facing: Direction, sticky: bool, extended: bool) -> PistonCache {
        let mut cache = PistonCache::new();
        cache.get_or_create(BASE, facing, sticky, extended);
        cache
    }

    #[test]
    fn unknown_position_is_reported() {
        let mut f = Fixture::new();
        let mut cache = PistonCache::new();
        assert!(!cache.set_action(BASE, PistonAction::Pushing, &mut f.env()));
        let blocks = Vec::new();
        assert!(!cache.set_action_with_blocks(BASE, PistonAction::Pulling, blocks, &mut f.env()));
        assert!(f.out.is_empty());
    }

    #[test]
    fn piston_is_dropped_after_removal_delay() {
        let mut f = Fixture::new();
        let stone = f.id("minecraft:stone");
        f.set(BASE + IVec3::X, stone);
        let mut cache = tracked(Direction::East, false, false);
        cache.set_action(BASE, PistonAction::Pushing, &mut f.env());
        assert_eq!(cache.moving_block_count(), 2);

        // Three ticks of motion, then the settle countdown.
        for _ in 0..3 {
            cache.tick(&mut f.env());
        }
        assert!(cache.piston(BASE).unwrap().is_done());
        assert_eq!(f.world.block_at(BASE + IVec3::X * 2), stone);

        for _ in 0..REMOVAL_DELAY {
            cache.tick(&mut f.env());
            assert_eq!(cache.len(), 1);
        }
        assert_eq!(cache.moving_block_count(), 0);
        cache.tick(&mut f.env());
        assert!(cache.is_empty());
    }

    #[test]
    fn push_limit_leaves_blocks_and_animates_arm() {
        let mut f = Fixture::new();
        let stone = f.id("minecraft:stone");
        for x in 1..=13 {
            f.set(BASE + IVec3::X * x, stone);
        }
        let mut cache = tracked(Direction::East, false, false);
        assert!(cache.set_action(BASE, PistonAction::Pushing, &mut f.env()));

        let piston = cache.piston(BASE).unwrap();
        assert!(piston.attached_blocks().is_empty());
        assert_eq!(piston.action(), PistonAction::Pushing);
        for x in 1..=13 {
            assert_eq!(f.world.block_at(BASE + IVec3::X * x), stone);
        }
        // Only the head is in flight, and no head block was placed.
        assert_eq!(cache.moving_block_count(), 1);
        assert_eq!(cache.moving_block_owner(BASE + IVec3::X), Some(BASE));
        assert!(!f.out.iter().any(|u| matches!(u, ClientUpdate::MovingPlaceholder { .. })));
        assert!(!f.out.iter().any(|u| matches!(u, ClientUpdate::Block { .. })));

        f.out.clear();
        cache.tick(&mut f.env());
        assert_eq!(cache.piston(BASE).unwrap().progress(), 0.5);
        let arms = f.arm_tags();
        assert_eq!(arms.len(), 1);
        assert_eq!(arms[0].progress, 0.5);
        assert_eq!(arms[0].state, ArmState::Extending);
        assert!(arms[0].attached_blocks.is_empty());
    }

    #[test]
    fn push_clears_lingering_head() {
        let mut f = Fixture::new();
        f.set(BASE + IVec3::X, f.registry.piston_head(Direction::East));
        let mut cache = tracked(Direction::East, false, false);
        cache.set_action(BASE, PistonAction::Pushing, &mut f.env());

        assert_eq!(f.world.block_at(BASE + IVec3::X), AIR);
        assert!(f.out.contains(&ClientUpdate::Block {
            position: BASE + IVec3::X,
            block: AIR,
        }));
        assert!(cache.piston(BASE).unwrap().attached_blocks().is_empty());
    }

    #[test]
    fn arm_tags_follow_progress() {
        let mut f = Fixture::new();
        let mut cache = tracked(Direction::North, false, false);
        cache.set_action(BASE, PistonAction::Pushing, &mut f.env());
        cache.tick(&mut f.env());
        cache.tick(&mut f.env());
        cache.tick(&mut f.env());
        cache.tick(&mut f.env());

        let progress: Vec<_> = f
            .arm_tags()
            .iter()
            .map(|arm| (arm.last_progress, arm.progress))
            .collect();
        assert_eq!(progress, vec![(0.0, 0.0), (0.0, 0.5), (0.5, 1.0), (1.0, 1.0)]);
        assert_eq!(f.arm_tags()[3].state, ArmState::Extended);
    }

    #[test]
    fn pushed_block_shoves_player() {
        let mut f = Fixture::new();
        f.set(BASE + IVec3::X, f.id("minecraft:stone"));
        f.player.set_feet(DVec3::new(2.3, 64.0, 0.5));
        let mut cache = tracked(Direction::East, false, false);
        cache.set_action(BASE, PistonAction::Pushing, &mut f.env());
        // The stone's destination overlaps the player.
        assert!(cache.player_push().collided);
        assert_eq!(cache.moving_block_owner(BASE + IVec3::X * 2), None);

        f.out.clear();
        cache.tick(&mut f.env());

        let push = cache.player_push();
        assert!(push.collided);
        assert!((push.displacement.x - 0.51).abs() < 1e-9);
        let feet = f.player.feet();
        assert!((feet.x - 2.81).abs() < 1e-9);
        let position = f.out.iter().find_map(|u| match u {
            ClientUpdate::PlayerPosition { feet, on_ground } => Some((*feet, *on_ground)),
            _ => None,
        });
        let (sent, on_ground) = position.unwrap();
        assert!((sent.x - 2.81).abs() < 1e-9);
        assert!(on_ground);
        assert!(!f.out.iter().any(|u| matches!(u, ClientUpdate::PlayerMotion(_))));
    }

    #[test]
    fn slime_launches_player_standing_on_it() {
        let mut f = Fixture::new();
        let slime = f.id("minecraft:slime_block");
        f.set(BASE + IVec3::Y, slime);
        f.player.set_feet(DVec3::new(0.5, 66.0, 0.5));
        let mut cache = tracked(Direction::Up, false, false);
        cache.set_action(BASE, PistonAction::Pushing, &mut f.env());
        assert!(cache.player_push().slime_collision);

        f.out.clear();
        cache.tick(&mut f.env());

        let push = cache.player_push();
        assert!(push.slime_collision);
        assert_eq!(push.motion, Vec3::new(0.0, 1.0, 0.0));
        assert!(push.displacement.y > 0.0);
        assert!(f.out.contains(&ClientUpdate::PlayerMotion(Vec3::new(0.0, 1.0, 0.0))));
        assert!(!f.out.iter().any(|u| matches!(u, ClientUpdate::PlayerPosition { .. })));
    }

    #[test]
    fn honey_carries_grounded_player_sideways() {
        let mut f = Fixture::new();
        let honey = f.id("minecraft:honey_block");
        f.set(BASE + IVec3::X, honey);
        f.player.set_feet(DVec3::new(1.5, 65.0, 0.5));
        let mut cache = tracked(Direction::East, false, false);
        cache.set_action(BASE, PistonAction::Pushing, &mut f.env());

        cache.tick(&mut f.env());

        let push = cache.player_push();
        assert!(push.attached_to_honey);
        assert!((push.displacement.x - 0.5).abs() < 1e-9);
        assert!((f.player.feet().x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn collision_queries_see_blocks_in_flight() {
        let mut f = Fixture::new();
        let slime = f.id("minecraft:slime_block");
        f.set(BASE + IVec3::X, slime);
        let mut cache = tracked(Direction::East, false, false);
        cache.set_action(BASE, PistonAction::Pushing, &mut f.env());
        cache.tick(&mut f.env());

        let data = BlockData::from_registry(&f.registry);
        // Halfway out, the slime spans x 1.5..2.5.
        let destination = BASE + IVec3::X * 2;
        let walker = BoundingBox::new(DVec3::new(3.0, 64.9, 0.5), DVec3::new(0.6, 1.8, 0.6));
        let offset = cache.compute_collision_offset(data, destination, &walker, Axis::X, -1.0);
        assert!((offset + 0.2).abs() < 1e-9);
        assert!(cache.player_push().slime_collision);
        assert!(!cache.check_collision(data, destination, &walker));
        let closer = walker.translated(DVec3::new(-0.3, 0.0, 0.0));
        assert!(cache.check_collision(data, destination, &closer));
        assert!(!cache.check_collision(data, BASE + IVec3::Z, &walker));
    }

    #[test]
    fn client_movement_is_untouched_without_pistons() {
        let f = Fixture::new();
        let mut cache = PistonCache::new();
        let data = BlockData::from_registry(&f.registry);
        let movement = DVec3::new(0.2, -0.5, 0.1);
        let corrected = cache.correct_player_movement(movement, &f.world, data, &f.player);
        assert_eq!(corrected, movement);
    }

    #[test]
    fn supplied_blocks_bypass_search() {
        let mut f = Fixture::new();
        let stone = f.id("minecraft:stone");
        f.set(BASE + IVec3::Y * 2, stone);
        let mut cache = tracked(Direction::Up, true, true);
        let blocks = vec![(BASE + IVec3::Y * 2, stone)];
        cache.set_action_with_blocks(BASE, PistonAction::Pulling, blocks.clone(), &mut f.env());
        // Repeats are applied again rather than ignored.
        cache.set_action_with_blocks(BASE, PistonAction::Pulling, blocks, &mut f.env());

        assert_eq!(f.arm_tags().len(), 2);
        let piston = cache.piston(BASE).unwrap();
        assert_eq!(piston.attached_blocks(), &[(BASE + IVec3::Y * 2, stone)]);
        assert_eq!(cache.moving_block_owner(BASE + IVec3::Y), Some(BASE));
        assert_eq!(cache.moving_block_count(), 2);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut f = Fixture::new();
        f.set(BASE + IVec3::Y, f.registry.piston_head(Direction::Up));
        let mut cache = tracked(Direction::Up, false, true);
        cache.set_action(BASE, PistonAction::Pulling, &mut f.env());
        assert_eq!(f.world.block_at(BASE + IVec3::Y), AIR);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.moving_block_count(), 0);
        assert_eq!(cache.player_push(), &PlayerPush::default());
    }
}
