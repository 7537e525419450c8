//! Effect and lifecycle triggers returned from each step
//!
//! Events carry only what a renderer needs to draw the effect; the
//! simulation never draws anything itself.

use serde::{Deserialize, Serialize};

use crate::game::state::{AgentId, EntityId, RunPhase, VehicleIndex};
use crate::game::world::ObstacleId;
use crate::util::vec2::Vec2;

/// Events produced by one simulation step, in the order they happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Vehicle scraped a wall hard enough to take damage
    Sparks {
        /// Contact point on the obstacle
        position: Vec2,
        /// Outward impact normal angle (atan2)
        angle: f32,
    },
    /// Tyre smoke at a rear wheel while drifting
    Smoke { position: Vec2 },
    /// Vehicle destroyed
    Explosion {
        position: Vec2,
        /// Rough blast size (the vehicle's longer side)
        extent: f32,
    },
    /// Agent removed from the simulation
    AgentKilled {
        agent_id: AgentId,
        position: Vec2,
        radius: f32,
        by_vehicle: bool,
    },
    /// Body parts thrown from a vehicle kill
    Gibs { position: Vec2, radius: f32 },
    /// Melee swing connected
    MeleeHit { agent_id: AgentId, position: Vec2 },
    /// Breakable decoration destroyed and replaced by transient debris
    DecorationBroken {
        obstacle_id: ObstacleId,
        debris_id: EntityId,
        position: Vec2,
    },
    /// Loose decoration knocked out of the static index
    DecorationDislodged {
        obstacle_id: ObstacleId,
        debris_id: EntityId,
        position: Vec2,
    },
    EnteredVehicle { vehicle: VehicleIndex },
    ExitedVehicle {
        vehicle: VehicleIndex,
        position: Vec2,
    },
    /// Vehicle health reached zero
    VehicleWrecked {
        vehicle: VehicleIndex,
        position: Vec2,
        /// Vehicle that became active in its place, if any
        replacement: Option<VehicleIndex>,
    },
    /// Run reached a terminal state
    PhaseChanged { phase: RunPhase },
}

impl SimEvent {
    /// Effects with no gameplay consequence (sparks, smoke)
    pub fn is_cosmetic(&self) -> bool {
        matches!(self, SimEvent::Sparks { .. } | SimEvent::Smoke { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosmetic_classification() {
        let smoke = SimEvent::Smoke {
            position: Vec2::ZERO,
        };
        let sparks = SimEvent::Sparks {
            position: Vec2::ZERO,
            angle: 0.0,
        };
        let victory = SimEvent::PhaseChanged {
            phase: RunPhase::Victory,
        };
        assert!(smoke.is_cosmetic());
        assert!(sparks.is_cosmetic());
        assert!(!victory.is_cosmetic());
    }

    #[test]
    fn test_event_serializes_with_variant_name() {
        let json = serde_json::to_string(&SimEvent::Gibs {
            position: Vec2::new(1.0, 2.0),
            radius: 10.0,
        })
        .unwrap();
        assert!(json.contains("Gibs"));
    }
}
