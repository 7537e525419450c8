//! Simulation state definitions
//!
//! Contains every entity (vehicles, agents, the player, loose debris) plus
//! the static world, bundled into one explicit [`Simulation`] context that
//! each system borrows mutably for its slice of the step.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, SimConfig};
use crate::game::collision::{Aabb, OrientedRect, Shape};
use crate::game::constants::{self, agent, player, vehicle};
use crate::game::outcome::RunStats;
use crate::game::spatial::AgentGrid;
use crate::game::systems::spawn::{self, SpawnReport};
use crate::game::world::{ObstacleId, World, WorldData, WorldError};
use crate::util::vec2::Vec2;

/// Identifier for agents and debris bodies
pub type EntityId = u64;

pub type AgentId = EntityId;

/// Index into [`Simulation::vehicles`]; vehicles are never removed
pub type VehicleIndex = usize;

/// Errors building or resetting a simulation
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

// ============================================================================
// Agents
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Normal,
    Fast,
    Tank,
    Boss,
}

/// Fixed per-kind stats
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentStats {
    pub radius: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub health: f32,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Normal,
        AgentKind::Fast,
        AgentKind::Tank,
        AgentKind::Boss,
    ];

    pub fn stats(&self) -> AgentStats {
        match self {
            AgentKind::Normal => AgentStats {
                radius: 10.0,
                speed_min: 0.7,
                speed_max: 1.0,
                health: 30.0,
            },
            AgentKind::Fast => AgentStats {
                radius: 8.0,
                speed_min: 1.5,
                speed_max: 2.0,
                health: 18.0,
            },
            AgentKind::Tank => AgentStats {
                radius: 16.0,
                speed_min: 0.4,
                speed_max: 0.6,
                health: 80.0,
            },
            AgentKind::Boss => AgentStats {
                radius: 24.0,
                speed_min: 0.3,
                speed_max: 0.4,
                health: 300.0,
            },
        }
    }

    /// Map a uniform roll in [0, 1) onto the spawn mix
    pub fn from_roll(roll: f32) -> Self {
        use crate::game::constants::spawn::{FAST_CUTOFF, NORMAL_CUTOFF, TANK_CUTOFF};
        if roll < NORMAL_CUTOFF {
            AgentKind::Normal
        } else if roll < FAST_CUTOFF {
            AgentKind::Fast
        } else if roll < TANK_CUTOFF {
            AgentKind::Tank
        } else {
            AgentKind::Boss
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    Wander,
    Chase,
    Ragdoll,
}

/// What dealt the last blow to an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageSource {
    Vehicle,
    Melee,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub position: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub health: f32,
    pub max_health: f32,
    pub kind: AgentKind,
    pub state: AgentState,
    /// Ballistic velocity while ragdolling
    pub velocity: Vec2,
    /// Body rotation (radians), only changes while ragdolling
    pub angle: f32,
    pub spin: f32,
    pub ragdoll_timer: u32,
    pub chase_timer: u32,
    pub wander_angle: f32,
    pub wander_timer: u32,
    pub damage_cooldown: u32,
    pub last_hit: Option<DamageSource>,
}

impl Agent {
    pub fn new(
        id: AgentId,
        kind: AgentKind,
        position: Vec2,
        speed: f32,
        wander_angle: f32,
        wander_timer: u32,
    ) -> Self {
        let stats = kind.stats();
        Self {
            id,
            position,
            radius: stats.radius,
            speed,
            health: stats.health,
            max_health: stats.health,
            kind,
            state: AgentState::Wander,
            velocity: Vec2::ZERO,
            angle: 0.0,
            spin: 0.0,
            ragdoll_timer: 0,
            chase_timer: 0,
            wander_angle,
            wander_timer,
            damage_cooldown: 0,
            last_hit: None,
        }
    }

    #[inline]
    pub fn collider(&self) -> Shape {
        Shape::circle(self.position, self.radius)
    }

    #[inline]
    pub fn is_ragdoll(&self) -> bool {
        self.state == AgentState::Ragdoll
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// Throw the agent into ragdoll unless it is already flying
    pub fn knock(&mut self, velocity: Vec2, spin: f32, ticks: u32) -> bool {
        if self.is_ragdoll() {
            return false;
        }
        self.state = AgentState::Ragdoll;
        self.velocity = velocity;
        self.spin = spin;
        self.ragdoll_timer = ticks;
        true
    }
}

// ============================================================================
// Vehicles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleCondition {
    Intact,
    Wrecked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub position: Vec2,
    /// Heading in radians; 0 faces -y
    pub angle: f32,
    pub velocity: Vec2,
    /// Smoothed steering in [-MAX_STEER, MAX_STEER]
    pub steer: f32,
    pub width: f32,
    pub height: f32,
    pub max_speed: f32,
    pub acceleration: f32,
    pub friction: f32,
    pub turn_speed: f32,
    pub drift_turn_speed: f32,
    pub health: f32,
    pub condition: VehicleCondition,
    /// Tick of the last wall-impact damage
    pub last_damage_tick: Option<u64>,
    /// Sliding with the handbrake held on the last tick
    pub drifting: bool,
}

impl Vehicle {
    pub fn new(position: Vec2, angle: f32) -> Self {
        Self {
            position,
            angle,
            velocity: Vec2::ZERO,
            steer: 0.0,
            width: vehicle::WIDTH,
            height: vehicle::HEIGHT,
            max_speed: vehicle::MAX_SPEED,
            acceleration: vehicle::ACCELERATION,
            friction: vehicle::FRICTION,
            turn_speed: vehicle::TURN_SPEED,
            drift_turn_speed: vehicle::DRIFT_TURN_SPEED,
            health: vehicle::MAX_HEALTH,
            condition: VehicleCondition::Intact,
            last_damage_tick: None,
            drifting: false,
        }
    }

    #[inline]
    pub fn forward(&self) -> Vec2 {
        Vec2::heading(self.angle)
    }

    /// Lateral axis, 90 degrees clockwise of forward
    #[inline]
    pub fn right(&self) -> Vec2 {
        Vec2::from_angle(self.angle)
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Collision body at the current pose
    pub fn body(&self) -> OrientedRect {
        self.body_at(self.position)
    }

    pub fn body_at(&self, position: Vec2) -> OrientedRect {
        OrientedRect::new(position, self.width, self.height, self.angle)
    }

    pub fn collider(&self) -> Shape {
        Shape::Oriented(self.body())
    }

    #[inline]
    pub fn is_intact(&self) -> bool {
        self.condition == VehicleCondition::Intact
    }
}

// ============================================================================
// Player
// ============================================================================

/// Who is controlling what
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupancy {
    Driving { vehicle: VehicleIndex },
    OnFoot,
}

/// A live melee swing
#[derive(Debug, Clone, PartialEq)]
pub struct MeleeSwing {
    /// Swing direction (atan2 convention)
    pub direction: f32,
    pub ticks_left: u32,
    /// Agents already struck by this swing
    pub hit: SmallVec<[AgentId; 8]>,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub position: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub health: f32,
    pub melee: Option<MeleeSwing>,
    /// Ticks before another swing may start
    pub melee_cooldown: u32,
}

impl Player {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            radius: player::RADIUS,
            speed: player::SPEED,
            health: player::MAX_HEALTH,
            melee: None,
            melee_cooldown: 0,
        }
    }

    pub fn is_swinging(&self) -> bool {
        self.melee.is_some()
    }

    #[inline]
    pub fn collider(&self) -> Shape {
        Shape::circle(self.position, self.radius)
    }
}

// ============================================================================
// Debris
// ============================================================================

/// Decoration knocked out of the static index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebrisBody {
    pub id: EntityId,
    /// Obstacle this body came from
    pub source: ObstacleId,
    pub half_extents: Vec2,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub spin: f32,
    /// Persistent bodies never expire
    pub persistent: bool,
    /// Remaining ticks for transient bodies
    pub lifetime: u32,
}

impl DebrisBody {
    /// Axis-aligned footprint used against static geometry
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_extents)
    }

    pub fn body(&self) -> OrientedRect {
        OrientedRect {
            center: self.position,
            half_extents: self.half_extents,
            angle: self.angle,
        }
    }

    pub fn collider(&self) -> Shape {
        Shape::Oriented(self.body())
    }

    pub fn is_expired(&self) -> bool {
        !self.persistent && self.lifetime == 0
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// Run phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunPhase {
    /// Simulation advancing
    #[default]
    Running,
    /// Every agent is dead
    Victory,
    /// Player health reached zero
    Defeat,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunPhase::Running)
    }
}

/// What agents are currently hunting
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Player { position: Vec2 },
    Vehicle { index: VehicleIndex, position: Vec2 },
}

impl Target {
    pub fn position(&self) -> Vec2 {
        match self {
            Target::Player { position } | Target::Vehicle { position, .. } => *position,
        }
    }
}

/// Complete simulation context
pub struct Simulation {
    pub tick: u64,
    pub phase: RunPhase,
    pub world: World,
    pub vehicles: Vec<Vehicle>,
    /// Vehicle the player drives or last drove; `None` once every car is wrecked
    pub active_vehicle: Option<VehicleIndex>,
    pub occupancy: Occupancy,
    pub player: Player,
    pub agents: Vec<Agent>,
    pub debris: Vec<DebrisBody>,
    pub stats: RunStats,
    pub spawn_report: SpawnReport,
    pub rng: StdRng,
    pub config: SimConfig,
    /// Wall-impact cooldown converted to ticks at the configured rate
    pub damage_cooldown_ticks: u64,
    /// Broadphase grid reused across ticks
    pub(crate) agent_grid: AgentGrid,
    pub(crate) pair_scratch: Vec<(usize, usize)>,
    data: WorldData,
    next_entity_id: EntityId,
}

impl Simulation {
    /// Build a fresh run: load the world, park the vehicles, seat the
    /// player in the first one and spawn the agent population
    pub fn new(data: WorldData, config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let world = World::from_data(&data)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let vehicles: Vec<Vehicle> = data
            .vehicles
            .iter()
            .map(|v| Vehicle::new(Vec2::new(v.x, v.y), v.angle))
            .collect();
        let start = vehicles[0].position;

        let mut sim = Self {
            tick: 0,
            phase: RunPhase::Running,
            world,
            vehicles,
            active_vehicle: Some(0),
            occupancy: Occupancy::Driving { vehicle: 0 },
            player: Player::new(start),
            agents: Vec::with_capacity(config.agent_count),
            debris: Vec::new(),
            stats: RunStats::default(),
            spawn_report: SpawnReport::default(),
            rng,
            damage_cooldown_ticks: constants::ms_to_ticks(
                vehicle::DAMAGE_COOLDOWN_MS,
                config.tick_rate,
            ),
            config,
            agent_grid: AgentGrid::default(),
            pair_scratch: Vec::new(),
            data,
            next_entity_id: 1,
        };

        sim.spawn_report = spawn::populate(&mut sim);
        info!(
            agents = sim.agents.len(),
            vehicles = sim.vehicles.len(),
            obstacles = sim.world.obstacles().len(),
            "Simulation ready"
        );
        Ok(sim)
    }

    /// Start over from the initial world data and configuration
    pub fn reset(&mut self) -> Result<(), SimError> {
        *self = Self::new(self.data.clone(), self.config.clone())?;
        Ok(())
    }

    /// Generate a new unique entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Vehicle currently being driven
    pub fn driven_vehicle(&self) -> Option<VehicleIndex> {
        match self.occupancy {
            Occupancy::Driving { vehicle } => Some(vehicle),
            Occupancy::OnFoot => None,
        }
    }

    pub fn is_driving(&self) -> bool {
        self.driven_vehicle().is_some()
    }

    /// On-foot player, or the occupied vehicle
    pub fn target(&self) -> Target {
        match self.occupancy {
            Occupancy::Driving { vehicle } => Target::Vehicle {
                index: vehicle,
                position: self.vehicles[vehicle].position,
            },
            Occupancy::OnFoot => Target::Player {
                position: self.player.position,
            },
        }
    }

    /// Add an agent of the given kind, rolling its speed and wander state
    pub fn spawn_agent(&mut self, kind: AgentKind, position: Vec2) -> AgentId {
        let stats = kind.stats();
        let speed = if stats.speed_max > stats.speed_min {
            self.rng.gen_range(stats.speed_min..stats.speed_max)
        } else {
            stats.speed_min
        };
        let wander_angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let wander_timer = self.rng.gen_range(0..agent::WANDER_SPREAD_TICKS);
        let id = self.next_entity_id();
        self.agents
            .push(Agent::new(id, kind, position, speed, wander_angle, wander_timer));
        id
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}
