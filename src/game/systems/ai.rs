//! Agent AI controller
//!
//! Two passes per tick:
//! 1. Perception: distance and line of sight to the current target. Read-only
//!    and independent per agent, so large populations fan out over rayon.
//! 2. Act: vehicle impacts, ragdoll flight, chase/wander steering and contact
//!    damage, applied sequentially in agent order.

use rand::Rng;
use rayon::prelude::*;

use crate::game::collision::{self, Shape};
use crate::game::constants::{agent as tuning, impact};
use crate::game::state::{Agent, AgentState, DamageSource, Simulation, Target};
use crate::game::systems::lifecycle;
use crate::game::world::World;
use crate::util::vec2::Vec2;

/// What one agent knows about the target this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perception {
    /// Vector from the agent to the target
    pub offset: Vec2,
    pub distance: f32,
    /// In detection range with an unobstructed sight line
    pub sees_target: bool,
}

/// Distance and visibility of `target` from `agent`
pub fn perceive(world: &World, agent: &Agent, target: Vec2) -> Perception {
    let offset = target - agent.position;
    let distance = offset.length();
    let sees_target =
        distance < tuning::DETECTION_RANGE && world.line_of_sight(agent.position, target);
    Perception {
        offset,
        distance,
        sees_target,
    }
}

/// Perception for every agent; `None` for agents already ragdolling
fn perceive_all(sim: &Simulation, target: Vec2) -> Vec<Option<Perception>> {
    let world = &sim.world;
    let sense = |agent: &Agent| (!agent.is_ragdoll()).then(|| perceive(world, agent, target));

    if sim.config.parallel_perception && sim.agents.len() >= tuning::PARALLEL_THRESHOLD {
        sim.agents.par_iter().map(sense).collect()
    } else {
        sim.agents.iter().map(sense).collect()
    }
}

/// Advance every agent one tick
pub fn update(sim: &mut Simulation) {
    if sim.agents.is_empty() {
        return;
    }

    let target = sim.target();
    let perceptions = perceive_all(sim, target.position());
    let driven = sim.driven_vehicle();

    for (agent, perception) in sim.agents.iter_mut().zip(perceptions) {
        // Vehicle strikes land even on ragdolling agents
        if let Some(index) = driven {
            let vehicle = &sim.vehicles[index];
            let speed = vehicle.speed();
            if speed > impact::SPEED_THRESHOLD
                && collision::overlaps(&agent.collider(), &vehicle.collider())
            {
                let damage = (speed * impact::DAMAGE_PER_SPEED).floor();
                lifecycle::damage_agent(agent, damage, DamageSource::Vehicle);
                let launch = vehicle.velocity * impact::KNOCKBACK_PER_SPEED;
                let spin = (sim.rng.gen::<f32>() - 0.5) * impact::SPIN_RANGE;
                let ticks =
                    impact::RAGDOLL_MIN_TICKS + sim.rng.gen_range(0..impact::RAGDOLL_SPREAD_TICKS);
                if agent.knock(launch, spin, ticks) {
                    sim.stats.vehicle_impacts += 1;
                }
            }
        }

        if agent.is_ragdoll() {
            integrate_ragdoll(&sim.world, agent);
            continue;
        }

        let perception = perception.unwrap_or(Perception {
            offset: Vec2::ZERO,
            distance: 0.0,
            sees_target: false,
        });
        steer(&sim.world, agent, &perception, &mut sim.rng);

        agent.damage_cooldown = agent.damage_cooldown.saturating_sub(1);
        if agent.damage_cooldown > 0 {
            continue;
        }
        match target {
            Target::Player { position } => {
                let player = Shape::circle(position, sim.player.radius);
                if collision::overlaps(&agent.collider(), &player) {
                    sim.stats.player_damage_taken +=
                        lifecycle::damage_player(&mut sim.player, tuning::PLAYER_CONTACT_DAMAGE);
                    agent.damage_cooldown = tuning::CONTACT_COOLDOWN_TICKS;
                }
            }
            Target::Vehicle { index, .. } => {
                let vehicle = &mut sim.vehicles[index];
                if collision::overlaps(&agent.collider(), &vehicle.collider()) {
                    sim.stats.vehicle_damage_taken +=
                        lifecycle::damage_vehicle(vehicle, tuning::VEHICLE_CONTACT_DAMAGE);
                    agent.damage_cooldown = tuning::CONTACT_COOLDOWN_TICKS;
                }
            }
        }
    }
}

/// Ballistic flight with per-axis bounce, then damping and countdown
fn integrate_ragdoll(world: &World, agent: &mut Agent) {
    let try_x = Vec2::new(agent.position.x + agent.velocity.x, agent.position.y);
    if world.circle_blocked(try_x, agent.radius) {
        agent.velocity.x *= -tuning::RAGDOLL_BOUNCE;
    } else {
        agent.position = try_x;
    }
    let try_y = Vec2::new(agent.position.x, agent.position.y + agent.velocity.y);
    if world.circle_blocked(try_y, agent.radius) {
        agent.velocity.y *= -tuning::RAGDOLL_BOUNCE;
    } else {
        agent.position = try_y;
    }

    agent.angle += agent.spin;
    agent.velocity *= tuning::RAGDOLL_DAMPING;
    agent.spin *= tuning::RAGDOLL_DAMPING;

    agent.ragdoll_timer = agent.ragdoll_timer.saturating_sub(1);
    if agent.ragdoll_timer == 0 {
        agent.state = AgentState::Wander;
        agent.velocity = Vec2::ZERO;
        agent.spin = 0.0;
    }
}

/// Chase while the target is visible or within the grace window, else wander
fn steer<R: Rng>(world: &World, agent: &mut Agent, perception: &Perception, rng: &mut R) {
    if perception.sees_target {
        agent.chase_timer = tuning::CHASE_GRACE_TICKS;
    } else {
        agent.chase_timer = agent.chase_timer.saturating_sub(1);
    }

    let chasing = perception.sees_target || agent.chase_timer > 0;
    if chasing && perception.distance > tuning::MIN_CHASE_DISTANCE {
        agent.state = AgentState::Chase;
        let step = perception.offset * (agent.speed / perception.distance);
        slide(world, agent, step);
        return;
    }

    agent.state = AgentState::Wander;
    agent.wander_timer = agent.wander_timer.saturating_sub(1);
    if agent.wander_timer == 0 {
        agent.wander_angle = rng.gen_range(0.0..std::f32::consts::TAU);
        agent.wander_timer =
            tuning::WANDER_MIN_TICKS + rng.gen_range(0..tuning::WANDER_SPREAD_TICKS);
    }
    let step =
        Vec2::from_angle(agent.wander_angle) * (agent.speed * tuning::WANDER_SPEED_FACTOR);
    slide(world, agent, step);
}

/// Full step, else X only, else Y only
fn slide(world: &World, agent: &mut Agent, step: Vec2) {
    let candidates = [
        agent.position + step,
        Vec2::new(agent.position.x + step.x, agent.position.y),
        Vec2::new(agent.position.x, agent.position.y + step.y),
    ];
    if let Some(next) = candidates
        .into_iter()
        .find(|&p| !world.circle_blocked(p, agent.radius))
    {
        agent.position = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::test_support::*;
    use crate::game::state::AgentKind;
    use crate::game::world::WorldData;

    fn lone_agent(sim: &mut Simulation, position: Vec2) -> u64 {
        sim.spawn_agent(AgentKind::Normal, position)
    }

    #[test]
    fn test_vehicle_strike_damages_and_ragdolls() {
        let mut sim = create_test_sim(vec![], vec![]);
        sim.vehicles[0].velocity = Vec2::new(0.0, -10.0);
        let id = lone_agent(&mut sim, Vec2::new(0.0, -40.0));

        update(&mut sim);
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.health, 10.0);
        assert_eq!(agent.state, AgentState::Ragdoll);
        assert_eq!(agent.last_hit, Some(DamageSource::Vehicle));
        // One tick of flight already elapsed
        assert!((39..59).contains(&agent.ragdoll_timer));
        assert!(agent.position.y < -40.0);
        assert_eq!(sim.stats.vehicle_impacts, 1);
    }

    #[test]
    fn test_ragdoll_timer_range() {
        for seed in 0..20 {
            let mut sim = create_test_sim(vec![], vec![]);
            sim.rng = rand::SeedableRng::seed_from_u64(seed);
            sim.vehicles[0].velocity = Vec2::new(0.0, -10.0);
            let id = lone_agent(&mut sim, Vec2::new(0.0, -40.0));

            update(&mut sim);
            // One tick of flight has already been counted down
            let timer = sim.agent(id).unwrap().ragdoll_timer + 1;
            assert!((40..60).contains(&timer), "timer {}", timer);
        }
    }

    #[test]
    fn test_slow_vehicle_does_not_strike() {
        let mut sim = create_test_sim(vec![], vec![]);
        sim.vehicles[0].velocity = Vec2::new(0.0, -1.5);
        let id = lone_agent(&mut sim, Vec2::new(0.0, -40.0));
        update(&mut sim);
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.health, 30.0);
        assert_ne!(agent.state, AgentState::Ragdoll);
    }

    #[test]
    fn test_target_out_of_range_stays_wander() {
        let mut sim = create_on_foot_sim(Vec2::ZERO);
        let id = lone_agent(&mut sim, Vec2::new(600.0, 0.0));
        for _ in 0..5 {
            update(&mut sim);
        }
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.state, AgentState::Wander);
        assert_eq!(agent.chase_timer, 0);
    }

    #[test]
    fn test_visible_target_is_chased() {
        let mut sim = create_on_foot_sim(Vec2::ZERO);
        let id = lone_agent(&mut sim, Vec2::new(300.0, 0.0));
        let speed = sim.agent(id).unwrap().speed;

        update(&mut sim);
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.state, AgentState::Chase);
        assert_eq!(agent.chase_timer, tuning::CHASE_GRACE_TICKS);
        assert!((agent.position.x - (300.0 - speed)).abs() < 1e-4);
    }

    #[test]
    fn test_building_blocks_sight_but_grace_keeps_chasing() {
        let data = WorldData {
            buildings: vec![building(100.0, -50.0, 50.0, 100.0)],
            decorations: vec![],
            zones: vec![],
            vehicles: vec![vehicle_spawn(5000.0, 5000.0)],
        };
        let mut sim = Simulation::new(data, empty_config()).unwrap();
        sim.occupancy = crate::game::state::Occupancy::OnFoot;
        sim.player.position = Vec2::ZERO;
        let id = lone_agent(&mut sim, Vec2::new(300.0, 0.0));

        update(&mut sim);
        assert_eq!(sim.agent(id).unwrap().state, AgentState::Wander);

        sim.agent_mut(id).unwrap().chase_timer = 10;
        update(&mut sim);
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.state, AgentState::Chase);
        assert_eq!(agent.chase_timer, 9);
    }

    #[test]
    fn test_chase_slides_along_wall() {
        // Wall between agent and target; only the Y component is free
        let data = WorldData {
            buildings: vec![building(200.0, -100.0, 20.0, 300.0)],
            decorations: vec![],
            zones: vec![],
            vehicles: vec![vehicle_spawn(5000.0, 5000.0)],
        };
        let mut sim = Simulation::new(data, empty_config()).unwrap();
        sim.occupancy = crate::game::state::Occupancy::OnFoot;
        sim.player.position = Vec2::new(0.0, 150.0);
        let id = lone_agent(&mut sim, Vec2::new(230.5, 0.0));
        sim.agent_mut(id).unwrap().chase_timer = 5;

        update(&mut sim);
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.state, AgentState::Chase);
        assert_eq!(agent.position.x, 230.5);
        assert!(agent.position.y > 0.0);
        assert!(!sim.world.circle_blocked(agent.position, agent.radius));
    }

    #[test]
    fn test_wander_rerolls_heading_when_timer_expires() {
        let mut sim = create_on_foot_sim(Vec2::ZERO);
        let id = lone_agent(&mut sim, Vec2::new(1500.0, 0.0));
        sim.agent_mut(id).unwrap().wander_timer = 1;

        update(&mut sim);
        let agent = sim.agent(id).unwrap();
        assert!(agent.wander_timer >= tuning::WANDER_MIN_TICKS);
        assert!(agent.wander_timer < tuning::WANDER_MIN_TICKS + tuning::WANDER_SPREAD_TICKS);
        let moved = agent.position.distance_to(Vec2::new(1500.0, 0.0));
        assert!((moved - agent.speed * tuning::WANDER_SPEED_FACTOR).abs() < 1e-4);
    }

    #[test]
    fn test_contact_damage_respects_cooldown() {
        let mut sim = create_on_foot_sim(Vec2::ZERO);
        lone_agent(&mut sim, Vec2::new(15.0, 0.0));

        update(&mut sim);
        assert_eq!(sim.player.health, 90.0);
        for _ in 0..tuning::CONTACT_COOLDOWN_TICKS - 1 {
            sim.agents[0].position = Vec2::new(15.0, 0.0);
            update(&mut sim);
        }
        assert_eq!(sim.player.health, 90.0);
        sim.agents[0].position = Vec2::new(15.0, 0.0);
        update(&mut sim);
        assert_eq!(sim.player.health, 80.0);
        assert_eq!(sim.stats.player_damage_taken, 20.0);
    }

    #[test]
    fn test_contact_damages_occupied_vehicle() {
        let mut sim = create_test_sim(vec![], vec![]);
        lone_agent(&mut sim, Vec2::new(25.0, 0.0));
        update(&mut sim);
        assert_eq!(sim.vehicles[0].health, 90.0);
    }

    #[test]
    fn test_ragdoll_bounces_off_building() {
        let data = WorldData {
            buildings: vec![building(20.0, -100.0, 50.0, 200.0)],
            decorations: vec![],
            zones: vec![],
            vehicles: vec![vehicle_spawn(5000.0, 5000.0)],
        };
        let sim = Simulation::new(data, empty_config()).unwrap();
        let mut agent = Agent::new(1, AgentKind::Normal, Vec2::new(0.0, 0.0), 1.0, 0.0, 60);
        agent.knock(Vec2::new(15.0, 0.0), 0.0, 30);

        integrate_ragdoll(&sim.world, &mut agent);
        assert_eq!(agent.position.x, 0.0);
        assert!(agent.velocity.x < 0.0);
        assert!(!sim.world.circle_blocked(agent.position, agent.radius));
    }

    #[test]
    fn test_ragdoll_recovers_into_wander() {
        let sim = create_on_foot_sim(Vec2::ZERO);
        let mut agent = Agent::new(1, AgentKind::Normal, Vec2::new(800.0, 0.0), 1.0, 0.0, 60);
        agent.knock(Vec2::new(4.0, 0.0), 0.2, 2);

        integrate_ragdoll(&sim.world, &mut agent);
        assert!(agent.is_ragdoll());
        integrate_ragdoll(&sim.world, &mut agent);
        assert_eq!(agent.state, AgentState::Wander);
        assert_eq!(agent.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_parallel_and_sequential_perception_agree() {
        let mut config = empty_config();
        config.agent_count = 150;
        let mut parallel = Simulation::new(WorldData::city(), config.clone()).unwrap();
        config.parallel_perception = false;
        let mut sequential = Simulation::new(WorldData::city(), config).unwrap();

        for _ in 0..10 {
            update(&mut parallel);
            update(&mut sequential);
        }
        let a: Vec<_> = parallel.agents.iter().map(|a| (a.position, a.state)).collect();
        let b: Vec<_> = sequential.agents.iter().map(|a| (a.position, a.state)).collect();
        assert_eq!(a, b);
    }
}
