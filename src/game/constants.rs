use std::f32::consts::PI;

/// Simulation cadence - one step per host frame, no delta-time scaling
pub mod timing {
    /// Nominal host frame rate the tunables below were authored against
    pub const TICK_RATE: u32 = 60;
    /// Milliseconds per nominal tick
    pub const TICK_MS: f32 = 1000.0 / TICK_RATE as f32;
}

/// Vehicle dynamics tunables (per tick, world units)
pub mod vehicle {
    use super::PI;

    /// Lateral size (across the axle)
    pub const WIDTH: f32 = 40.0;
    /// Longitudinal size (nose to tail)
    pub const HEIGHT: f32 = 70.0;
    pub const MAX_SPEED: f32 = 5.0;
    pub const ACCELERATION: f32 = 0.2;
    /// Base rolling friction when not on a terrain zone
    pub const FRICTION: f32 = 0.02;
    /// Lateral grip when not on a terrain zone
    pub const BASE_GRIP: f32 = 0.18;
    /// Heading change per tick at full steer and full speed (3 degrees)
    pub const TURN_SPEED: f32 = 3.0 * PI / 180.0;
    /// Handbrake turn rate (6 degrees)
    pub const DRIFT_TURN_SPEED: f32 = 6.0 * PI / 180.0;
    /// Exponential smoothing rate of actual steer toward target
    pub const STEER_SMOOTHING: f32 = 0.12;
    pub const MAX_STEER: f32 = 0.5;
    /// Below this speed steering input is ignored
    pub const MIN_STEER_SPEED: f32 = 0.5;
    /// Reverse speed cap as a fraction of max speed
    pub const REVERSE_SPEED_RATIO: f32 = 0.4;
    /// Handbrake caps grip at this value
    pub const HANDBRAKE_GRIP_CAP: f32 = 0.07;
    /// Handbrake adds this much forward friction
    pub const HANDBRAKE_FRICTION_BONUS: f32 = 0.03;
    pub const MAX_HEALTH: f32 = 100.0;

    /// Coefficient of restitution for wall impacts (0 = dead stop, 1 = perfect bounce)
    pub const RESTITUTION: f32 = 0.5;
    /// Velocity damping applied on every wall impact
    pub const WALL_FRICTION: f32 = 0.85;
    /// Distance pushed along the separation normal after rollback
    pub const COLLISION_NUDGE: f32 = 2.0;
    /// Health lost per unit of impact speed along the normal
    pub const IMPACT_DAMAGE_SCALE: f32 = 8.0;
    pub const MAX_IMPACT_DAMAGE: f32 = 20.0;
    /// Minimum wall-clock gap between two impact damage events
    pub const DAMAGE_COOLDOWN_MS: f32 = 300.0;

    /// Velocity/heading divergence (radians) that counts as sliding
    pub const DRIFT_ANGLE_THRESHOLD: f32 = 0.2;
    pub const DRIFT_MIN_SPEED: f32 = 1.0;
    /// Rear axle distance behind the centre
    pub const REAR_WHEEL_OFFSET: f32 = 20.0;
    /// Wheel inset from the side of the body
    pub const WHEEL_INSET: f32 = 8.0;

    /// Maximum distance from which an on-foot player can get in
    pub const ENTER_RADIUS: f32 = 80.0;
    /// Exit slots sit this many (half-extent + player radius) lengths from the centre
    pub const EXIT_DISTANCE_FACTOR: f32 = 2.0;
}

/// Terrain zone surface coefficients
pub mod terrain {
    pub const GRASS_FRICTION: f32 = 0.04;
    pub const GRASS_GRIP: f32 = 0.12;
    pub const SAND_FRICTION: f32 = 0.08;
    pub const SAND_GRIP: f32 = 0.08;
}

/// On-foot avatar
pub mod player {
    pub const RADIUS: f32 = 10.0;
    pub const SPEED: f32 = 2.0;
    pub const MAX_HEALTH: f32 = 100.0;
}

/// Agent (zombie) behaviour
pub mod agent {
    /// Maximum distance at which a target can be acquired
    pub const DETECTION_RANGE: f32 = 500.0;
    /// Ticks an agent keeps chasing after losing sight (3 seconds)
    pub const CHASE_GRACE_TICKS: u32 = 180;
    /// Agents closer than this to the target stop stepping toward it
    pub const MIN_CHASE_DISTANCE: f32 = 1.0;
    /// Wander speed as a fraction of the agent's chase speed
    pub const WANDER_SPEED_FACTOR: f32 = 0.4;
    /// Wander heading is held for MIN..MIN+SPREAD ticks
    pub const WANDER_MIN_TICKS: u32 = 60;
    pub const WANDER_SPREAD_TICKS: u32 = 120;
    /// Per-agent cooldown between contact hits
    pub const CONTACT_COOLDOWN_TICKS: u32 = 40;
    pub const PLAYER_CONTACT_DAMAGE: f32 = 10.0;
    pub const VEHICLE_CONTACT_DAMAGE: f32 = 10.0;
    /// Ragdoll velocity and spin decay per tick
    pub const RAGDOLL_DAMPING: f32 = 0.92;
    /// Velocity kept (and reversed) when a ragdoll bounces off geometry
    pub const RAGDOLL_BOUNCE: f32 = 0.5;
    /// Populations at or above this run perception on the rayon pool
    pub const PARALLEL_THRESHOLD: usize = 64;
}

/// Vehicle striking an agent
pub mod impact {
    /// Vehicle speed needed to hurt an agent
    pub const SPEED_THRESHOLD: f32 = 2.0;
    /// Damage is floor(speed * DAMAGE_PER_SPEED)
    pub const DAMAGE_PER_SPEED: f32 = 2.0;
    /// Ragdoll launch speed per unit of vehicle speed
    pub const KNOCKBACK_PER_SPEED: f32 = 2.5;
    /// Random spin in [-SPIN_RANGE/2, SPIN_RANGE/2)
    pub const SPIN_RANGE: f32 = 0.4;
    pub const RAGDOLL_MIN_TICKS: u32 = 40;
    pub const RAGDOLL_SPREAD_TICKS: u32 = 20;
}

/// On-foot melee swing
pub mod melee {
    use super::PI;

    /// Full width of the swing arc (150 degrees)
    pub const ARC: f32 = 150.0 * PI / 180.0;
    /// Reach from the player's centre to the agent's edge
    pub const RANGE: f32 = 40.0;
    pub const DAMAGE: f32 = 15.0;
    /// Ticks the swing stays live
    pub const SWING_TICKS: u32 = 12;
    /// Ticks after a swing ends before another can start
    pub const COOLDOWN_TICKS: u32 = 24;
    pub const KNOCKBACK: f32 = 6.0;
    pub const RAGDOLL_MIN_TICKS: u32 = 20;
    pub const RAGDOLL_SPREAD_TICKS: u32 = 10;
}

/// Agent population spawning
pub mod spawn {
    /// Default population for the built-in city
    pub const DEFAULT_AGENT_COUNT: usize = 100;
    /// Agents spawn in a ring RING_INNER..RING_INNER+RING_WIDTH around the origin
    pub const RING_INNER: f32 = 800.0;
    pub const RING_WIDTH: f32 = 1200.0;
    /// Placement budget per requested agent before giving up
    pub const ATTEMPTS_PER_AGENT: u32 = 10;

    /// Cumulative type thresholds for a uniform roll in [0, 1)
    /// normal 93%, fast 5%, tank 1.5%, boss 0.5%
    pub const NORMAL_CUTOFF: f32 = 0.93;
    pub const FAST_CUTOFF: f32 = 0.98;
    pub const TANK_CUTOFF: f32 = 0.995;
}

/// Loose decoration props
pub mod debris {
    /// Lifetime of debris from a broken decoration
    pub const TRANSIENT_LIFETIME_TICKS: u32 = 90;
    /// Velocity and spin decay per tick
    pub const DAMPING: f32 = 0.9;
    /// Debris launch speed relative to the vehicle that hit it
    pub const KICK_FACTOR: f32 = 1.2;
    /// Random spin in [-SPIN_RANGE/2, SPIN_RANGE/2)
    pub const SPIN_RANGE: f32 = 0.3;
    /// Vehicle velocity kept after hitting an intact breakable
    pub const ABSORB_FACTOR: f32 = 0.6;
    /// Vehicle velocity kept after shoving loose debris
    pub const SHOVE_FACTOR: f32 = 0.95;
    /// Ticks between two counted hits on the same breakable
    pub const HIT_COOLDOWN_TICKS: u64 = 18;
    /// Below this speed a body comes to rest; a vehicle slower than this does not kick
    pub const REST_SPEED: f32 = 0.05;
    /// Velocity kept (reversed) on the blocked axis after hitting an obstacle
    pub const BOUNCE: f32 = 0.5;
    /// Clearance left when a new body is pushed out of a wall
    pub const EJECT_MARGIN: f32 = 0.5;
}

/// Post-movement crowd resolution
pub mod crowd {
    /// Overlapping centres closer than this are left alone (no stable normal)
    pub const MIN_SEPARATION_DISTANCE: f32 = 0.01;
    /// Extra clearance when ejecting an agent out of an obstacle
    pub const UNSTICK_MARGIN: f32 = 0.5;
    /// Spatial grid cell size; must be >= the largest agent diameter
    pub const GRID_CELL_SIZE: f32 = 64.0;
}

/// Convert a wall-clock duration to whole ticks at the given rate (at least one)
#[inline]
pub fn ms_to_ticks(ms: f32, tick_rate: u32) -> u64 {
    ((ms * tick_rate as f32 / 1000.0).ceil() as u64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_cooldown_is_eighteen_ticks_at_sixty_hz() {
        assert_eq!(ms_to_ticks(vehicle::DAMAGE_COOLDOWN_MS, timing::TICK_RATE), 18);
    }

    #[test]
    fn test_ms_to_ticks_never_zero() {
        assert_eq!(ms_to_ticks(0.0, 60), 1);
        assert_eq!(ms_to_ticks(1.0, 30), 1);
    }

    #[test]
    fn test_spawn_cutoffs_are_ordered() {
        assert!(spawn::NORMAL_CUTOFF < spawn::FAST_CUTOFF);
        assert!(spawn::FAST_CUTOFF < spawn::TANK_CUTOFF);
        assert!(spawn::TANK_CUTOFF < 1.0);
    }

    #[test]
    fn test_grid_cell_covers_largest_agent_pair() {
        // Boss radius is 24; two bosses touch at 48
        assert!(crowd::GRID_CELL_SIZE >= 48.0);
    }
}
