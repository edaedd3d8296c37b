//! Client movement against blocks in flight.

use bridge_world::physics::{PlayerPhysics, INCORRECT_MOVEMENT_THRESHOLD};
use bridge_world::piston::BlockData;
use glam::{DVec3, Vec3};
use tracing::trace;

use super::Session;
use crate::emit::SessionError;

impl Session {
    /// Track the client's own move. The adjusted position is what would be
    /// reported upstream; with no upstream link it only updates the player.
    pub(super) fn on_client_move(
        &mut self,
        eye: DVec3,
        on_ground: bool,
    ) -> Result<(), SessionError> {
        match self.adjust_client_position(eye, on_ground)? {
            Some(feet) => {
                self.player.on_ground = on_ground;
                trace!(?feet, on_ground, "client move accepted");
            }
            None => trace!("client move held back"),
        }
        Ok(())
    }

    /// Apply a client move to the tracked player, stopping it at blocks in
    /// flight. Returns the feet position to report upstream, or `None` when
    /// the move must not be forwarded.
    pub(super) fn adjust_client_position(
        &mut self,
        eye: DVec3,
        on_ground: bool,
    ) -> Result<Option<DVec3>, SessionError> {
        // The client slides off honey on its own; the tick moves the player.
        if self.pistons.player_push().attached_to_honey {
            return Ok(None);
        }

        let movement = PlayerPhysics::feet_from_eye(eye) - self.player.feet();
        let data = BlockData::from_registry(&self.registry);
        let adjusted = self
            .pistons
            .correct_player_movement(movement, &self.world, data, &self.player);
        let push = self.pistons.player_push();
        self.player
            .bounding_box
            .translate(adjusted + push.motion.as_dvec3());
        if push.collided {
            return Ok(None);
        }

        let feet = self.player.feet();
        let new_on_ground = (adjusted.y != movement.y && movement.y < 0.0) || on_ground;
        let desynced = on_ground != new_on_ground
            || movement.distance_squared(adjusted) > INCORRECT_MOVEMENT_THRESHOLD;
        if desynced && push.motion == Vec3::ZERO && !push.slime_collision {
            self.emitter.correct_position(&self.player, feet, on_ground)?;
        }

        if new_on_ground {
            Ok(Some(feet))
        } else {
            Ok(Some(DVec3::new(feet.x, round_to_4(feet.y), feet.z)))
        }
    }
}

fn round_to_4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
