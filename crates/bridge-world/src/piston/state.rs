use std::collections::HashMap;

use glam::{DVec3, IVec3};
use tracing::debug;

use super::push::PlayerPush;
use super::search::find_affected_blocks;
use super::tags::{ArmState, MovingBlock, PistonArm, DETACHED_PISTON_POSITION};
use super::{
    BlockData, ClientUpdate, PistonAction, PistonEnv, PROGRESS_STEP, PUSH_LIMIT, REMOVAL_DELAY,
};
use crate::block_registry::{BlockId, AIR};
use crate::chunk::BlockView;
use crate::collision::BlockCollision;
use crate::geometry::{Axis, BoundingBox, Direction};

/// Destination of an in-flight block → position of the piston moving it.
pub(crate) type MovingBlockIndex = HashMap<IVec3, IVec3>;

/// Where the attached blocks of a new action come from.
pub(crate) enum AttachedSource {
    Search,
    Supplied(Vec<(IVec3, BlockId)>),
}

/// One piston the session is animating.
#[derive(Debug, Clone)]
pub struct PistonState {
    position: IVec3,
    orientation: Direction,
    sticky: bool,
    action: PistonAction,
    /// Blocks in flight, keyed by where they started.
    attached: Vec<(IVec3, BlockId)>,
    placed_final_blocks: bool,
    progress: f32,
    last_progress: f32,
    time_since_completion: u32,
}

impl PistonState {
    /// A piston at rest. Extended pistons count as a finished push,
    /// retracted ones as a finished pull.
    pub fn new(position: IVec3, orientation: Direction, sticky: bool, extended: bool) -> Self {
        let (action, progress) = if extended {
            (PistonAction::Pushing, 1.0)
        } else {
            (PistonAction::Pulling, 0.0)
        };
        Self {
            position,
            orientation,
            sticky,
            action,
            attached: Vec::new(),
            placed_final_blocks: true,
            progress,
            last_progress: progress,
            time_since_completion: 0,
        }
    }

    pub fn position(&self) -> IVec3 {
        self.position
    }

    pub fn orientation(&self) -> Direction {
        self.orientation
    }

    pub fn sticky(&self) -> bool {
        self.sticky
    }

    pub fn action(&self) -> PistonAction {
        self.action
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn last_progress(&self) -> f32 {
        self.last_progress
    }

    pub fn time_since_completion(&self) -> u32 {
        self.time_since_completion
    }

    /// Blocks in flight with their starting positions.
    pub fn attached_blocks(&self) -> &[(IVec3, BlockId)] {
        &self.attached
    }

    /// Direction attached blocks travel.
    pub fn movement(&self) -> IVec3 {
        self.action.movement(self.orientation)
    }

    /// Direction the moving faces push toward: the orientation, reversed
    /// while pulling.
    pub(crate) fn movement_direction(&self) -> Direction {
        match self.action {
            PistonAction::Pulling => self.orientation.reversed(),
            PistonAction::Pushing | PistonAction::CancelledMidPush => self.orientation,
        }
    }

    /// Where the head starts its movement: inside the base when extending,
    /// one block out otherwise.
    pub fn head_position(&self) -> IVec3 {
        match self.action {
            PistonAction::Pushing => self.position,
            PistonAction::Pulling | PistonAction::CancelledMidPush => {
                self.position + self.orientation.unit_vector()
            }
        }
    }

    pub fn is_done(&self) -> bool {
        let end = self.action.end_progress();
        self.progress == end && self.last_progress == end
    }

    pub fn can_be_removed(&self) -> bool {
        self.is_done() && self.time_since_completion > REMOVAL_DELAY
    }

    pub fn arm_state(&self) -> ArmState {
        match self.action {
            PistonAction::Pushing if self.is_done() => ArmState::Extended,
            PistonAction::Pushing => ArmState::Extending,
            PistonAction::Pulling if self.is_done() => ArmState::Retracted,
            PistonAction::Pulling => ArmState::Retracting,
            PistonAction::CancelledMidPush if self.progress == 1.0 => ArmState::Extended,
            PistonAction::CancelledMidPush if self.is_done() => ArmState::Retracted,
            PistonAction::CancelledMidPush => ArmState::Extended,
        }
    }

    /// Fraction of the way from the starting position to the destination.
    pub(crate) fn movement_progress(&self) -> f64 {
        match self.action {
            PistonAction::Pushing => self.progress as f64,
            PistonAction::Pulling | PistonAction::CancelledMidPush => 1.0 - self.progress as f64,
        }
    }

    pub fn arm_tag(&self) -> PistonArm {
        PistonArm {
            position: self.position,
            attached_blocks: self
                .attached
                .iter()
                .flat_map(|(pos, _)| pos.to_array())
                .collect(),
            progress: self.progress,
            last_progress: self.last_progress,
            state: self.arm_state(),
            sticky: self.sticky,
        }
    }

    /// Start `action`. Repeating the current action changes nothing.
    pub(crate) fn set_action(
        &mut self,
        action: PistonAction,
        env: &mut PistonEnv<'_>,
        index: &mut MovingBlockIndex,
        push: &mut PlayerPush,
    ) {
        if self.action == action {
            return;
        }
        self.begin_move(action, AttachedSource::Search, env, index, push);
    }

    /// Tear down the current movement and start `action`.
    pub(crate) fn begin_move(
        &mut self,
        action: PistonAction,
        source: AttachedSource,
        env: &mut PistonEnv<'_>,
        index: &mut MovingBlockIndex,
        push: &mut PlayerPush,
    ) {
        self.place_final_blocks(env);
        self.remove_moving_blocks(index);

        let previous = self.action;
        self.action = action;
        let moves_blocks = match action {
            PistonAction::Pushing => true,
            PistonAction::Pulling => self.sticky,
            PistonAction::CancelledMidPush => false,
        };
        if moves_blocks {
            self.attached = match source {
                AttachedSource::Search => {
                    if action == PistonAction::Pushing {
                        // A head left over from an earlier push.
                        self.remove_piston_head(env);
                    }
                    self.search(env)
                }
                AttachedSource::Supplied(blocks) if blocks.len() <= PUSH_LIMIT => blocks,
                AttachedSource::Supplied(blocks) => {
                    debug!(
                        piston = %self.position,
                        count = blocks.len(),
                        "too many attached blocks supplied"
                    );
                    Vec::new()
                }
            };
            self.remove_blocks(env);
            self.create_moving_blocks(env, index, push);
        } else {
            self.remove_piston_head(env);
        }

        self.placed_final_blocks = false;
        self.progress = action.start_progress();
        self.last_progress = self.progress;
        self.time_since_completion = 0;
        env.out.push(ClientUpdate::PistonArmData(self.arm_tag()));
        debug!(
            piston = %self.position,
            ?previous,
            ?action,
            attached = self.attached.len(),
            "piston action changed"
        );
    }

    fn search(&self, env: &PistonEnv<'_>) -> Vec<(IVec3, BlockId)> {
        find_affected_blocks(
            self.position,
            self.orientation,
            self.action,
            &*env.world,
            env.data.classifier,
        )
        .unwrap_or_else(|reason| {
            debug!(piston = %self.position, %reason, "piston moves no blocks");
            Vec::new()
        })
    }

    /// Advance the arm one tick. Returns `false` once the arm has settled.
    pub(crate) fn update_movement(&mut self) -> bool {
        if self.is_done() {
            self.time_since_completion += 1;
            return false;
        }
        self.time_since_completion = 0;
        self.last_progress = self.progress;
        self.progress = match self.action {
            PistonAction::Pushing => (self.progress + PROGRESS_STEP).min(1.0),
            PistonAction::Pulling | PistonAction::CancelledMidPush => {
                (self.progress - PROGRESS_STEP).max(0.0)
            }
        };
        true
    }

    /// Land the blocks once the arm settles, and drop their collision a few
    /// ticks later.
    pub(crate) fn update_blocks(&mut self, env: &mut PistonEnv<'_>, index: &mut MovingBlockIndex) {
        if !self.is_done() {
            return;
        }
        if self.time_since_completion == 0 {
            self.place_final_blocks(env);
        }
        if self.time_since_completion >= REMOVAL_DELAY {
            self.remove_moving_blocks(index);
        }
    }

    /// Clear the head in front of the base. Air is cleared again so a
    /// client that mispredicted the head gets corrected.
    fn remove_piston_head(&self, env: &mut PistonEnv<'_>) {
        let front = self.position + self.orientation.unit_vector();
        let block = env.world.block_at(front);
        if block == AIR || env.data.classifier.is_piston_head(block) {
            env.update_block(front, AIR);
        }
    }

    fn remove_blocks(&self, env: &mut PistonEnv<'_>) {
        for &(pos, _) in &self.attached {
            env.update_block(pos, AIR);
        }
        if self.action != PistonAction::Pushing {
            self.remove_piston_head(env);
        }
    }

    /// Register every destination in `index` and show the client a
    /// placeholder there. Blocks that start or end inside the player are
    /// left out; they are placed when the move completes.
    fn create_moving_blocks(
        &self,
        env: &mut PistonEnv<'_>,
        index: &mut MovingBlockIndex,
        push: &mut PlayerPush,
    ) {
        let movement = self.movement();
        let mut player_box = env.player.bounding_box;
        if self.orientation == Direction::Up {
            // Catch a player standing anywhere above a rising column.
            player_box.extend(DVec3::new(0.0, -256.0, 0.0));
            player_box.size.x += 0.5;
            player_box.size.z += 0.5;
        }
        let solid = BoundingBox::solid();

        for &(start, block) in &self.attached {
            let destination = start + movement;
            if solid.intersects(start.as_dvec3(), &player_box)
                || solid.intersects(destination.as_dvec3(), &player_box)
            {
                push.collided = true;
                if env.data.classifier.is_slime(block) {
                    push.slime_collision = true;
                }
                continue;
            }
            self.register(index, destination);
            env.out.push(ClientUpdate::MovingPlaceholder {
                position: destination,
            });
            env.out.push(ClientUpdate::MovingBlockData(self.moving_block(
                env.data,
                destination,
                block,
                self.position,
            )));
        }
        // The arm tag animates the head; it only needs collision.
        self.register(index, self.head_position() + movement);
    }

    fn register(&self, index: &mut MovingBlockIndex, destination: IVec3) {
        match index.get(&destination) {
            Some(owner) if *owner != self.position => {
                debug!(
                    piston = %self.position,
                    %destination,
                    %owner,
                    "destination already moving"
                );
            }
            _ => {
                index.insert(destination, self.position);
            }
        }
    }

    /// Put every attached block at its destination unless the player is
    /// standing there, and the head too when extending. Runs once per
    /// action.
    fn place_final_blocks(&mut self, env: &mut PistonEnv<'_>) {
        if self.placed_final_blocks {
            return;
        }
        self.placed_final_blocks = true;
        let movement = self.movement();
        let solid = BoundingBox::solid();

        for &(start, block) in &self.attached {
            let destination = start + movement;
            env.out.push(ClientUpdate::MovingBlockData(self.moving_block(
                env.data,
                destination,
                block,
                DETACHED_PISTON_POSITION,
            )));
            if !solid.intersects(destination.as_dvec3(), &env.player.bounding_box) {
                env.update_block(destination, block);
            }
        }
        if self.action == PistonAction::Pushing {
            let destination = self.head_position() + movement;
            if !solid.intersects(destination.as_dvec3(), &env.player.bounding_box) {
                let head = env.data.classifier.piston_head(self.orientation);
                env.update_block(destination, head);
            }
        }
    }

    /// Drop this piston's entries from `index` and forget the attached
    /// blocks.
    pub(crate) fn remove_moving_blocks(&mut self, index: &mut MovingBlockIndex) {
        let movement = self.movement();
        let destinations = self
            .attached
            .iter()
            .map(|(start, _)| *start + movement)
            .chain(std::iter::once(self.head_position() + movement));
        for destination in destinations {
            if index.get(&destination) == Some(&self.position) {
                index.remove(&destination);
            }
        }
        self.attached.clear();
    }

    fn moving_block(
        &self,
        data: BlockData<'_>,
        position: IVec3,
        block: BlockId,
        piston_position: IVec3,
    ) -> MovingBlock {
        MovingBlock {
            position,
            block,
            piston_position,
            moving_entity: data
                .classifier
                .piston(block)
                .map(|info| PistonArm::resting(position, info.extended, info.sticky)),
        }
    }

    /// The block moving toward `destination`: the head, an attached block,
    /// or air.
    pub(crate) fn block_moving_to(&self, data: BlockData<'_>, destination: IVec3) -> BlockId {
        let start = destination - self.movement();
        if start == self.head_position() {
            return data.classifier.piston_head(self.orientation);
        }
        self.attached
            .iter()
            .find(|(pos, _)| *pos == start)
            .map_or(AIR, |(_, block)| *block)
    }

    /// Current world-space origin and shape of the block moving toward
    /// `destination`.
    fn moving_shape<'d>(
        &self,
        data: BlockData<'d>,
        destination: IVec3,
    ) -> Option<(BlockId, DVec3, &'d BlockCollision)> {
        let block = self.block_moving_to(data, destination);
        let shape = data.shapes.get(block)?;
        let movement = self.movement();
        let start = destination - movement;
        let at = start.as_dvec3() + movement.as_dvec3() * self.movement_progress();
        Some((block, at, shape))
    }

    /// Clamp `offset` against the block moving toward `destination`. The flag
    /// is set when a slime block changed the offset.
    pub fn compute_collision_offset(
        &self,
        data: BlockData<'_>,
        destination: IVec3,
        moving: &BoundingBox,
        axis: Axis,
        offset: f64,
    ) -> (f64, bool) {
        let Some((block, at, shape)) = self.moving_shape(data, destination) else {
            return (offset, false);
        };
        let adjusted = shape.compute_collision_offset(at, moving, axis, offset);
        (adjusted, adjusted != offset && data.classifier.is_slime(block))
    }

    /// Whether the block moving toward `destination` currently overlaps
    /// `bbox`.
    pub fn check_collision(
        &self,
        data: BlockData<'_>,
        destination: IVec3,
        bbox: &BoundingBox,
    ) -> bool {
        self.moving_shape(data, destination)
            .is_some_and(|(_, at, shape)| shape.intersects(at, bbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piston::test_support::Fixture;
    use crate::block_registry::PistonClassifier;

    const BASE: IVec3 = IVec3::new(0, 64, 0);

    fn run(
        piston: &mut PistonState,
        f: &mut Fixture,
        index: &mut MovingBlockIndex,
        action: PistonAction,
    ) -> PlayerPush {
        let mut push = PlayerPush::default();
        piston.set_action(action, &mut f.env(), index, &mut push);
        push
    }

    #[test]
    fn new_piston_is_settled() {
        let extended = PistonState::new(BASE, Direction::Up, false, true);
        assert_eq!(extended.action(), PistonAction::Pushing);
        assert!(extended.is_done());
        assert_eq!(extended.arm_state(), ArmState::Extended);

        let retracted = PistonState::new(BASE, Direction::Up, true, false);
        assert_eq!(retracted.action(), PistonAction::Pulling);
        assert!(retracted.is_done());
        assert_eq!(retracted.arm_state(), ArmState::Retracted);
        assert!(!retracted.can_be_removed());
    }

    #[test]
    fn push_moves_line_and_indexes_destinations() {
        let mut f = Fixture::new();
        let stone = f.id("minecraft:stone");
        f.set(BASE + IVec3::Y, stone);
        f.set(BASE + IVec3::Y * 2, stone);
        let mut index = MovingBlockIndex::new();
        let mut piston = PistonState::new(BASE, Direction::Up, false, false);

        run(&mut piston, &mut f, &mut index, PistonAction::Pushing);

        assert_eq!(piston.attached_blocks().len(), 2);
        assert_eq!(f.world.block_at(BASE + IVec3::Y), AIR);
        assert_eq!(f.world.block_at(BASE + IVec3::Y * 2), AIR);
        for y in 1..=3 {
            assert_eq!(index.get(&(BASE + IVec3::Y * y)), Some(&BASE));
        }
        let placeholders = f
            .out
            .iter()
            .filter(|u| matches!(u, ClientUpdate::MovingPlaceholder { .. }))
            .count();
        assert_eq!(placeholders, 2);
        let arm = f.arm_tags()[0];
        assert_eq!(arm.state, ArmState::Extending);
        assert_eq!(arm.progress, 0.0);
        assert_eq!(arm.attached_blocks, vec![0, 65, 0, 0, 66, 0]);
    }

    #[test]
    fn repeated_action_is_ignored() {
        let mut f = Fixture::new();
        let mut index = MovingBlockIndex::new();
        let mut piston = PistonState::new(BASE, Direction::North, false, true);
        run(&mut piston, &mut f, &mut index, PistonAction::Pushing);
        assert!(f.out.is_empty());
    }

    #[test]
    fn non_sticky_retract_only_clears_head() {
        let mut f = Fixture::new();
        let head = f.registry.piston_head(Direction::East);
        let stone = f.id("minecraft:stone");
        f.set(BASE + IVec3::X, head);
        f.set(BASE + IVec3::X * 2, stone);
        let mut index = MovingBlockIndex::new();
        let mut piston = PistonState::new(BASE, Direction::East, false, true);

        run(&mut piston, &mut f, &mut index, PistonAction::Pulling);

        assert!(piston.attached_blocks().is_empty());
        assert_eq!(f.world.block_at(BASE + IVec3::X), AIR);
        assert_eq!(f.world.block_at(BASE + IVec3::X * 2), stone);
        assert!(f.out.contains(&ClientUpdate::Block {
            position: BASE + IVec3::X,
            block: AIR
        }));
        assert_eq!(piston.progress(), 1.0);
        assert_eq!(f.arm_tags()[0].state, ArmState::Retracting);
    }

    #[test]
    fn sticky_retract_clears_sources_and_head() {
        let mut f = Fixture::new();
        let honey = f.id("minecraft:honey_block");
        let stone = f.id("minecraft:stone");
        let lateral = BASE + IVec3::new(1, 2, 0);
        f.set(BASE + IVec3::Y, f.registry.piston_head(Direction::Up));
        f.set(BASE + IVec3::Y * 2, honey);
        f.set(lateral, stone);
        let mut index = MovingBlockIndex::new();
        let mut piston = PistonState::new(BASE, Direction::Up, true, true);

        run(&mut piston, &mut f, &mut index, PistonAction::Pulling);

        assert_eq!(
            piston.attached_blocks(),
            &[(BASE + IVec3::Y * 2, honey), (lateral, stone)]
        );
        assert_eq!(f.world.block_at(BASE + IVec3::Y * 2), AIR);
        assert_eq!(f.world.block_at(lateral), AIR);
        assert_eq!(f.world.block_at(BASE + IVec3::Y), AIR);
        // Both land one block lower; the head retracts into the base.
        assert_eq!(index.get(&(BASE + IVec3::Y)), Some(&BASE));
        assert_eq!(index.get(&(lateral - IVec3::Y)), Some(&BASE));
        assert_eq!(index.get(&BASE), Some(&BASE));
        let data = BlockData::from_registry(&f.registry);
        assert_eq!(piston.block_moving_to(data, BASE), f.registry.piston_head(Direction::Up));
    }

    #[test]
    fn blocks_land_when_arm_settles() {
        let mut f = Fixture::new();
        let stone = f.id("minecraft:stone");
        f.set(BASE + IVec3::Z, stone);
        let mut index = MovingBlockIndex::new();
        let mut piston = PistonState::new(BASE, Direction::South, false, false);
        run(&mut piston, &mut f, &mut index, PistonAction::Pushing);

        let mut ticks = 0;
        while piston.update_movement() {
            ticks += 1;
            piston.update_blocks(&mut f.env(), &mut index);
        }
        assert_eq!(ticks, 3);
        assert_eq!(f.world.block_at(BASE + IVec3::Z * 2), stone);
        assert_eq!(f.world.block_at(BASE + IVec3::Z), f.registry.piston_head(Direction::South));
        let detached = f.out.iter().any(|u| {
            matches!(u, ClientUpdate::MovingBlockData(b) if b.is_detached() && b.position == BASE + IVec3::Z * 2)
        });
        assert!(detached);
        assert_eq!(piston.arm_state(), ArmState::Extended);
    }

    #[test]
    fn removal_waits_for_delay() {
        let mut f = Fixture::new();
        f.set(BASE + IVec3::X, f.id("minecraft:stone"));
        let mut index = MovingBlockIndex::new();
        let mut piston = PistonState::new(BASE, Direction::East, false, false);
        run(&mut piston, &mut f, &mut index, PistonAction::Pushing);

        while piston.update_movement() {
            piston.update_blocks(&mut f.env(), &mut index);
        }
        // The first idle tick already counted once above.
        assert_eq!(piston.time_since_completion(), 1);
        for _ in 1..REMOVAL_DELAY {
            assert!(!piston.can_be_removed());
            piston.update_blocks(&mut f.env(), &mut index);
            piston.update_movement();
        }
        assert_eq!(piston.time_since_completion(), REMOVAL_DELAY);
        assert!(!piston.can_be_removed());
        piston.update_blocks(&mut f.env(), &mut index);
        assert!(index.is_empty());
        piston.update_movement();
        assert!(piston.can_be_removed());
    }

    #[test]
    fn immediate_reversal_finalizes_first_move() {
        let mut f = Fixture::new();
        let slime = f.id("minecraft:slime_block");
        f.set(BASE + IVec3::X, slime);
        let mut index = MovingBlockIndex::new();
        let mut piston = PistonState::new(BASE, Direction::East, true, false);

        run(&mut piston, &mut f, &mut index, PistonAction::Pushing);
        assert_eq!(index.get(&(BASE + IVec3::X * 2)), Some(&BASE));
        run(&mut piston, &mut f, &mut index, PistonAction::Pulling);

        // The slime landed one block out, then was picked up again.
        assert_eq!(piston.attached_blocks(), &[(BASE + IVec3::X * 2, slime)]);
        assert_eq!(index.get(&(BASE + IVec3::X)), Some(&BASE));
        assert_eq!(index.get(&(BASE + IVec3::X * 2)), None);
        assert_eq!(f.world.block_at(BASE + IVec3::X * 2), AIR);
        assert_eq!(f.arm_tags().len(), 2);
    }

    #[test]
    fn oversized_supplied_set_moves_nothing() {
        let mut f = Fixture::new();
        let stone = f.id("minecraft:stone");
        let blocks: Vec<_> = (1..=13).map(|y| (BASE + IVec3::Y * y, stone)).collect();
        let mut index = MovingBlockIndex::new();
        let mut push = PlayerPush::default();
        let mut piston = PistonState::new(BASE, Direction::Up, false, false);
        piston.begin_move(
            PistonAction::Pushing,
            AttachedSource::Supplied(blocks),
            &mut f.env(),
            &mut index,
            &mut push,
        );
        assert!(piston.attached_blocks().is_empty());
        assert_eq!(index.len(), 1);
        assert_eq!(f.arm_tags().len(), 1);
    }

    #[test]
    fn blocks_inside_player_are_not_indexed() {
        let mut f = Fixture::new();
        let stone = f.id("minecraft:stone");
        f.set(BASE + IVec3::Y, stone);
        f.player.set_feet(DVec3::new(0.5, 66.0, 0.5));
        let mut index = MovingBlockIndex::new();
        let mut piston = PistonState::new(BASE, Direction::Up, false, false);

        let push = run(&mut piston, &mut f, &mut index, PistonAction::Pushing);

        assert!(push.collided);
        assert!(!push.slime_collision);
        assert_eq!(index.get(&(BASE + IVec3::Y * 2)), None);
        assert!(!f.out.iter().any(|u| matches!(u, ClientUpdate::MovingPlaceholder { .. })));
    }

    #[test]
    fn moving_collision_follows_progress() {
        let mut f = Fixture::new();
        f.set(BASE + IVec3::Y, f.id("minecraft:stone"));
        let mut index = MovingBlockIndex::new();
        let mut piston = PistonState::new(BASE, Direction::Up, false, false);
        run(&mut piston, &mut f, &mut index, PistonAction::Pushing);
        piston.update_movement();

        let data = BlockData::from_registry(&f.registry);
        let destination = BASE + IVec3::Y * 2;
        // Halfway: the stone spans y 65.5..66.5.
        let above = BoundingBox::new(DVec3::new(0.5, 67.5, 0.5), DVec3::new(0.6, 1.8, 0.6));
        let (offset, slime) =
            piston.compute_collision_offset(data, destination, &above, Axis::Y, -2.0);
        assert!((offset + 0.1).abs() < 1e-9);
        assert!(!slime);
        let inside = BoundingBox::new(DVec3::new(0.5, 66.4, 0.5), DVec3::new(0.6, 0.1, 0.6));
        assert!(piston.check_collision(data, destination, &inside));
        assert!(!piston.check_collision(data, BASE + IVec3::Y * 5, &inside));
    }

    #[test]
    fn cancelled_push_counts_as_extended_until_settled() {
        let mut f = Fixture::new();
        let mut index = MovingBlockIndex::new();
        let mut piston = PistonState::new(BASE, Direction::West, false, false);
        run(&mut piston, &mut f, &mut index, PistonAction::CancelledMidPush);
        assert_eq!(piston.arm_state(), ArmState::Extended);
        piston.update_movement();
        assert_eq!(piston.arm_state(), ArmState::Extended);
        piston.update_movement();
        piston.update_movement();
        assert!(piston.is_done());
        assert_eq!(piston.arm_state(), ArmState::Retracted);
    }
}
