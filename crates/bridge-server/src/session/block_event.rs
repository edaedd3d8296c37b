//! Piston moves reported by the source server.

use std::collections::HashSet;

use bridge_world::block_registry::{PistonClassifier, AIR};
use bridge_world::chunk::BlockView;
use bridge_world::geometry::Direction;
use bridge_world::piston::PistonAction;
use glam::IVec3;
use tracing::warn;

use super::Session;
use crate::config::EventSource;

impl Session {
    pub(super) fn on_piston_block_event(
        &mut self,
        position: IVec3,
        action: PistonAction,
        facing: Direction,
    ) {
        let Some(base) = self.registry.piston(self.world.block_at(position)) else {
            warn!(%position, ?action, "piston block event on a non-piston");
            return;
        };

        match self.event_source {
            EventSource::Vanilla => {
                let (pistons, mut env) = self.piston_env();
                let extended = action != PistonAction::Pushing;
                pistons.get_or_create(position, facing, base.sticky, extended);
                pistons.set_action(position, action, &mut env);
            }
            EventSource::Plugin => {
                // Everything else arrives through the plugin with its blocks.
                if action == PistonAction::Pushing || !base.sticky {
                    return;
                }
                let front = position + facing.unit_vector();
                if action == PistonAction::Pulling && self.world.block_at(front) != AIR {
                    return;
                }
                let (pistons, mut env) = self.piston_env();
                let current = pistons.get_or_create(position, facing, true, true).action();
                if current != action {
                    pistons.set_action_with_blocks(position, action, Vec::new(), &mut env);
                }
            }
        }
    }

    pub(super) fn on_plugin_piston_event(
        &mut self,
        position: IVec3,
        extending: bool,
        sticky: bool,
        blocks: &[IVec3],
    ) {
        let Some(base) = self.registry.piston(self.world.block_at(position)) else {
            warn!(%position, extending, "plugin piston event on a non-piston");
            return;
        };
        let mut seen = HashSet::with_capacity(blocks.len());
        let attached: Vec<_> = blocks
            .iter()
            .filter(|&&pos| seen.insert(pos))
            .map(|&pos| (pos, self.world.block_at(pos)))
            .filter(|&(_, block)| self.registry.can_move(block, extending))
            .collect();
        let action = if extending {
            PistonAction::Pushing
        } else {
            PistonAction::Pulling
        };

        let (pistons, mut env) = self.piston_env();
        pistons.get_or_create(position, base.facing, sticky, !extending);
        pistons.set_action_with_blocks(position, action, attached, &mut env);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::super::SessionEvent;
    use super::*;

    const ORIGIN: IVec3 = IVec3::new(0, 64, 0);

    fn block_event(h: &mut Harness, action: PistonAction, facing: Direction) {
        h.session
            .handle(SessionEvent::PistonBlockEvent {
                position: ORIGIN,
                action,
                facing,
            })
            .unwrap();
    }

    #[test]
    fn vanilla_push_searches_for_blocks() {
        let mut h = Harness::new(EventSource::Vanilla);
        let stone = h.id("minecraft:stone");
        h.set(ORIGIN, h.piston(Direction::East, false, false));
        h.set(ORIGIN + IVec3::X, stone);

        block_event(&mut h, PistonAction::Pushing, Direction::East);

        let piston = h.session.pistons.piston(ORIGIN).unwrap();
        assert_eq!(piston.action(), PistonAction::Pushing);
        assert_eq!(piston.attached_blocks(), &[(ORIGIN + IVec3::X, stone)]);
        assert_eq!(h.session.world.block_at(ORIGIN + IVec3::X), AIR);
    }

    #[test]
    fn vanilla_retract_of_normal_piston_only_drops_head() {
        let mut h = Harness::new(EventSource::Vanilla);
        let stone = h.id("minecraft:stone");
        let head = h.session.registry.piston_head(Direction::East);
        h.set(ORIGIN, h.piston(Direction::East, false, true));
        h.set(ORIGIN + IVec3::X, head);
        h.set(ORIGIN + IVec3::X * 2, stone);

        block_event(&mut h, PistonAction::Pulling, Direction::East);

        let piston = h.session.pistons.piston(ORIGIN).unwrap();
        assert!(!piston.sticky());
        assert!(piston.attached_blocks().is_empty());
        assert_eq!(h.session.world.block_at(ORIGIN + IVec3::X), AIR);
        assert_eq!(h.session.world.block_at(ORIGIN + IVec3::X * 2), stone);
    }

    #[test]
    fn event_on_non_piston_is_ignored() {
        let mut h = Harness::new(EventSource::Vanilla);
        h.set(ORIGIN, h.id("minecraft:stone"));
        block_event(&mut h, PistonAction::Pushing, Direction::Up);
        assert!(h.session.pistons.is_empty());
        assert_eq!(h.drain(), 0);
    }

    #[test]
    fn plugin_source_skips_pushes_from_block_events() {
        let mut h = Harness::new(EventSource::Plugin);
        h.set(ORIGIN, h.piston(Direction::Up, true, false));
        block_event(&mut h, PistonAction::Pushing, Direction::Up);
        assert!(h.session.pistons.is_empty());
    }

    #[test]
    fn plugin_source_takes_empty_sticky_retraction() {
        let mut h = Harness::new(EventSource::Plugin);
        h.set(ORIGIN, h.piston(Direction::Up, true, true));

        block_event(&mut h, PistonAction::Pulling, Direction::Up);
        let piston = h.session.pistons.piston(ORIGIN).unwrap();
        assert_eq!(piston.action(), PistonAction::Pulling);
        assert!(piston.attached_blocks().is_empty());

        h.session.tick().unwrap();
        // A repeat is not a new move.
        block_event(&mut h, PistonAction::Pulling, Direction::Up);
        assert_eq!(h.session.pistons.piston(ORIGIN).unwrap().progress(), 0.5);
    }

    #[test]
    fn plugin_source_ignores_retraction_with_block_in_front() {
        let mut h = Harness::new(EventSource::Plugin);
        h.set(ORIGIN, h.piston(Direction::Up, true, true));
        h.set(ORIGIN + IVec3::Y, h.id("minecraft:stone"));
        block_event(&mut h, PistonAction::Pulling, Direction::Up);
        assert!(h.session.pistons.is_empty());
    }

    #[test]
    fn plugin_event_ignores_repeated_positions() {
        let mut h = Harness::new(EventSource::Plugin);
        let stone = h.id("minecraft:stone");
        h.set(ORIGIN, h.piston(Direction::Up, false, false));
        // Twelve distinct blocks listed twice each stay under the push limit.
        let mut blocks = Vec::new();
        for y in 1..=12 {
            h.set(ORIGIN + IVec3::Y * y, stone);
            blocks.push(ORIGIN + IVec3::Y * y);
            blocks.push(ORIGIN + IVec3::Y * y);
        }

        h.session
            .handle(SessionEvent::PluginPistonEvent {
                position: ORIGIN,
                extending: true,
                sticky: false,
                blocks,
            })
            .unwrap();

        let piston = h.session.pistons.piston(ORIGIN).unwrap();
        assert_eq!(piston.attached_blocks().len(), 12);
        assert_eq!(piston.attached_blocks()[0], (ORIGIN + IVec3::Y, stone));
        assert_eq!(h.session.pistons.moving_block_count(), 13);
    }

    #[test]
    fn plugin_event_filters_unmovable_blocks() {
        let mut h = Harness::new(EventSource::Plugin);
        let stone = h.id("minecraft:stone");
        let obsidian = h.id("minecraft:obsidian");
        h.set(ORIGIN, h.piston(Direction::South, false, false));
        h.set(ORIGIN + IVec3::Z, stone);
        h.set(ORIGIN + IVec3::new(5, 0, 0), obsidian);

        h.session
            .handle(SessionEvent::PluginPistonEvent {
                position: ORIGIN,
                extending: true,
                sticky: false,
                blocks: vec![ORIGIN + IVec3::Z, ORIGIN + IVec3::new(5, 0, 0)],
            })
            .unwrap();

        let piston = h.session.pistons.piston(ORIGIN).unwrap();
        assert_eq!(piston.orientation(), Direction::South);
        assert_eq!(piston.action(), PistonAction::Pushing);
        assert_eq!(piston.attached_blocks(), &[(ORIGIN + IVec3::Z, stone)]);
        assert_eq!(h.session.world.block_at(ORIGIN + IVec3::Z), AIR);
    }
}
