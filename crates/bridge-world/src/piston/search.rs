use std::collections::{HashSet, VecDeque};

use glam::IVec3;
use thiserror::Error;

use super::{PistonAction, PUSH_LIMIT};
use crate::block_registry::{BlockId, PistonClassifier, AIR};
use crate::chunk::BlockView;
use crate::geometry::Direction;

/// Why a piston moves nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Immovable {
    #[error("immovable block {block} at {at}")]
    Obstructed { at: IVec3, block: BlockId },
    #[error("more than {} blocks attached", PUSH_LIMIT)]
    PushLimit,
}

/// Collect the blocks a piston at `position` moves when starting `action`,
/// in discovery order.
///
/// Walks the line in front of the piston (two blocks out when pulling, past
/// the head) and fans out sideways from slime and honey. Air is skipped and
/// blocks pistons destroy end nothing. Any other unmovable block, or more
/// than [`PUSH_LIMIT`] blocks, fails the move.
pub fn find_affected_blocks(
    position: IVec3,
    orientation: Direction,
    action: PistonAction,
    world: &dyn BlockView,
    blocks: &dyn PistonClassifier,
) -> Result<Vec<(IVec3, BlockId)>, Immovable> {
    let direction = orientation.unit_vector();
    let movement = action.movement(orientation);
    let head = position + direction;
    let pushing = action == PistonAction::Pushing;

    let mut checked = HashSet::from([position]);
    let mut queue = VecDeque::new();
    match action {
        PistonAction::Pushing => queue.push_back(head),
        PistonAction::Pulling => {
            checked.insert(head);
            queue.push_back(head + direction);
        }
        PistonAction::CancelledMidPush => return Ok(Vec::new()),
    }

    let mut attached = Vec::new();
    while attached.len() <= PUSH_LIMIT {
        let Some(pos) = queue.pop_front() else {
            break;
        };
        if !checked.insert(pos) {
            continue;
        }
        let block = world.block_at(pos);
        if block == AIR {
            continue;
        }
        if !blocks.can_move(block, pushing) {
            if blocks.can_destroy(block) {
                continue;
            }
            return Err(Immovable::Obstructed { at: pos, block });
        }

        attached.push((pos, block));
        if blocks.is_sticky(block) {
            for side in Direction::ALL {
                let offset = side.unit_vector();
                if offset == movement {
                    continue;
                }
                let adjacent = pos + offset;
                if adjacent == position || (!pushing && adjacent == head) {
                    continue;
                }
                let adjacent_block = world.block_at(adjacent);
                if adjacent_block == AIR
                    || !blocks.is_attachable(block, adjacent_block)
                    || !blocks.can_move(adjacent_block, false)
                {
                    continue;
                }
                if blocks.is_sticky(adjacent_block) {
                    queue.push_back(adjacent);
                } else if checked.insert(adjacent) {
                    attached.push((adjacent, adjacent_block));
                    queue.push_back(adjacent + movement);
                }
            }
        }
        queue.push_back(pos + movement);
    }

    if attached.len() > PUSH_LIMIT {
        return Err(Immovable::PushLimit);
    }
    Ok(attached)
}
