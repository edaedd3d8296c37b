//! Player physics constants and the session's view of the player hitbox.

use glam::DVec3;

use crate::geometry::BoundingBox;

/// Player hitbox width (0.6 blocks on both editions).
pub const PLAYER_WIDTH: f64 = 0.6;

/// Player hitbox height when standing (1.8 blocks).
pub const PLAYER_HEIGHT: f64 = 1.8;

/// Eye offset above feet. Bedrock positions are eye positions.
pub const PLAYER_EYE_HEIGHT: f64 = 1.62;

/// Maximum height the player climbs without jumping.
pub const PLAYER_STEP_UP: f64 = 0.6;

/// Squared distance between requested and corrected movement above which
/// the client is sent the corrected position.
pub const INCORRECT_MOVEMENT_THRESHOLD: f64 = 0.08;

/// The local player as tracked by the session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerPhysics {
    pub runtime_id: u64,
    pub bounding_box: BoundingBox,
    pub on_ground: bool,
    pub pitch: f32,
    pub yaw: f32,
    pub head_yaw: f32,
}

impl PlayerPhysics {
    /// Player standing with feet at `feet`.
    pub fn at_feet(runtime_id: u64, feet: DVec3) -> Self {
        let mut player = Self {
            runtime_id,
            bounding_box: BoundingBox::new(
                DVec3::ZERO,
                DVec3::new(PLAYER_WIDTH, PLAYER_HEIGHT, PLAYER_WIDTH),
            ),
            on_ground: true,
            pitch: 0.0,
            yaw: 0.0,
            head_yaw: 0.0,
        };
        player.set_feet(feet);
        player
    }

    pub fn feet(&self) -> DVec3 {
        self.bounding_box.bottom_center()
    }

    pub fn set_feet(&mut self, feet: DVec3) {
        self.bounding_box.middle = feet + DVec3::new(0.0, self.bounding_box.size.y / 2.0, 0.0);
    }

    /// Bedrock clients send and expect eye positions.
    pub fn eye_position(&self) -> DVec3 {
        Self::eye_from_feet(self.feet())
    }

    pub fn feet_from_eye(eye: DVec3) -> DVec3 {
        eye - DVec3::new(0.0, PLAYER_EYE_HEIGHT, 0.0)
    }

    pub fn eye_from_feet(feet: DVec3) -> DVec3 {
        feet + DVec3::new(0.0, PLAYER_EYE_HEIGHT, 0.0)
    }
}
