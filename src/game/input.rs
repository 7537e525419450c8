use serde::{Deserialize, Serialize};

use crate::util::vec2::Vec2;

/// Control state for one tick
///
/// Movement flags are level-triggered (held keys). `interact` and `melee`
/// are edge triggers: the host sets them only on the tick the key went down.
/// `melee` carries the swing direction in radians (atan2 convention).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub handbrake: bool,
    pub interact: bool,
    pub melee: Option<f32>,
}

impl ControlInput {
    /// Throttle: +1 forward, -1 back (back wins when both are held)
    pub fn throttle(&self) -> f32 {
        if self.back {
            -1.0
        } else if self.forward {
            1.0
        } else {
            0.0
        }
    }

    /// Steering target in {-1, 0, 1}; right is positive
    pub fn steer_target(&self) -> f32 {
        let mut target = 0.0;
        if self.left {
            target -= 1.0;
        }
        if self.right {
            target += 1.0;
        }
        target
    }

    /// Unit on-foot movement direction (zero when idle)
    pub fn walk_direction(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.forward {
            dir.y -= 1.0;
        }
        if self.back {
            dir.y += 1.0;
        }
        if self.left {
            dir.x -= 1.0;
        }
        if self.right {
            dir.x += 1.0;
        }
        dir.normalize_or_zero()
    }
}
