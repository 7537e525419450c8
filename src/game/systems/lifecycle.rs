//! Health, destruction and run-state transitions
//!
//! Every health write in the simulation goes through the `damage_*`
//! functions here, which clamp at zero. `update` runs last in the step: it
//! resolves the melee swing, sweeps dead agents, turns zero-health vehicles
//! into wrecks and decides whether the run has ended.

use rand::Rng;
use tracing::{debug, info};

use crate::game::constants::{impact, melee, vehicle as vehicle_consts};
use crate::game::events::SimEvent;
use crate::game::input::ControlInput;
use crate::game::state::{
    Agent, DamageSource, MeleeSwing, Occupancy, Player, RunPhase, Simulation, Vehicle,
    VehicleCondition, VehicleIndex,
};
use crate::game::systems::player;
use crate::game::systems::vehicle::WallImpact;
use crate::util::vec2::{wrap_angle, Vec2};

// ============================================================================
// Damage
// ============================================================================

/// Subtract health, clamped at zero. Returns the damage actually applied.
#[inline]
fn apply_damage(health: &mut f32, amount: f32) -> f32 {
    let before = *health;
    *health = (*health - amount.max(0.0)).max(0.0);
    before - *health
}

pub fn damage_vehicle(vehicle: &mut Vehicle, amount: f32) -> f32 {
    apply_damage(&mut vehicle.health, amount)
}

pub fn damage_player(player: &mut Player, amount: f32) -> f32 {
    apply_damage(&mut player.health, amount)
}

/// Damage an agent and remember what hit it
pub fn damage_agent(agent: &mut Agent, amount: f32, source: DamageSource) -> f32 {
    agent.last_hit = Some(source);
    apply_damage(&mut agent.health, amount)
}

/// Wall damage for a resolved vehicle collision, rate-limited by `cooldown_ticks`
///
/// Emits a spark event at the contact when damage is taken. Returns the
/// damage applied.
pub fn apply_wall_impact(
    vehicle: &mut Vehicle,
    impact: &WallImpact,
    tick: u64,
    cooldown_ticks: u64,
    events: &mut Vec<SimEvent>,
) -> f32 {
    let ready = vehicle
        .last_damage_tick
        .map_or(true, |last| tick.saturating_sub(last) >= cooldown_ticks);
    if !ready {
        return 0.0;
    }

    let amount = (impact.impact_speed * vehicle_consts::IMPACT_DAMAGE_SCALE)
        .min(vehicle_consts::MAX_IMPACT_DAMAGE);
    let applied = damage_vehicle(vehicle, amount);
    vehicle.last_damage_tick = Some(tick);
    events.push(SimEvent::Sparks {
        position: impact.contact,
        angle: impact.normal.angle(),
    });
    applied
}

// ============================================================================
// Per-tick lifecycle pass
// ============================================================================

pub fn update(sim: &mut Simulation, input: &ControlInput) -> Vec<SimEvent> {
    let mut events = Vec::new();

    update_melee(sim, input, &mut events);
    sweep_dead_agents(sim, &mut events);
    wreck_vehicles(sim, &mut events);
    check_terminal(sim, &mut events);

    events
}

/// Start a swing on the input edge, then land it on every agent in the arc
/// that it has not struck yet
fn update_melee(sim: &mut Simulation, input: &ControlInput, events: &mut Vec<SimEvent>) {
    if sim.is_driving() {
        sim.player.melee = None;
        return;
    }

    if let Some(direction) = input.melee {
        if !sim.player.is_swinging() && sim.player.melee_cooldown == 0 {
            sim.player.melee = Some(MeleeSwing {
                direction,
                ticks_left: melee::SWING_TICKS,
                hit: Default::default(),
            });
        }
    }

    if sim.player.melee.is_none() {
        sim.player.melee_cooldown = sim.player.melee_cooldown.saturating_sub(1);
        return;
    }
    let origin = sim.player.position;
    let Some(swing) = sim.player.melee.as_mut() else {
        return;
    };

    let half_arc = melee::ARC * 0.5;
    for agent in sim.agents.iter_mut() {
        if agent.is_dead() || swing.hit.contains(&agent.id) {
            continue;
        }
        let offset = agent.position - origin;
        if offset.length() - agent.radius > melee::RANGE {
            continue;
        }
        if wrap_angle(offset.angle() - swing.direction).abs() > half_arc {
            continue;
        }

        damage_agent(agent, melee::DAMAGE, DamageSource::Melee);
        let push = offset.normalize_or(Vec2::from_angle(swing.direction)) * melee::KNOCKBACK;
        let spin = (sim.rng.gen::<f32>() - 0.5) * impact::SPIN_RANGE;
        let ticks = melee::RAGDOLL_MIN_TICKS + sim.rng.gen_range(0..melee::RAGDOLL_SPREAD_TICKS);
        agent.knock(push, spin, ticks);

        swing.hit.push(agent.id);
        sim.stats.melee_hits += 1;
        events.push(SimEvent::MeleeHit {
            agent_id: agent.id,
            position: agent.position,
        });
    }

    swing.ticks_left = swing.ticks_left.saturating_sub(1);
    if swing.ticks_left == 0 {
        sim.player.melee = None;
        sim.player.melee_cooldown = melee::COOLDOWN_TICKS;
    }
}

fn sweep_dead_agents(sim: &mut Simulation, events: &mut Vec<SimEvent>) {
    if !sim.agents.iter().any(|a| a.is_dead()) {
        return;
    }

    for agent in sim.agents.iter().filter(|a| a.is_dead()) {
        let by_vehicle = agent.last_hit == Some(DamageSource::Vehicle);
        if by_vehicle {
            sim.stats.kills_by_vehicle += 1;
        } else {
            sim.stats.kills_by_melee += 1;
        }
        events.push(SimEvent::AgentKilled {
            agent_id: agent.id,
            position: agent.position,
            radius: agent.radius,
            by_vehicle,
        });
        if by_vehicle {
            events.push(SimEvent::Gibs {
                position: agent.position,
                radius: agent.radius,
            });
        }
    }

    sim.agents.retain(|a| !a.is_dead());
}

fn wreck_vehicles(sim: &mut Simulation, events: &mut Vec<SimEvent>) {
    for index in 0..sim.vehicles.len() {
        let v = &mut sim.vehicles[index];
        if !v.is_intact() || v.health > 0.0 {
            continue;
        }
        v.condition = VehicleCondition::Wrecked;
        v.velocity = Vec2::ZERO;
        v.steer = 0.0;
        v.drifting = false;
        let position = v.position;
        events.push(SimEvent::Explosion {
            position,
            extent: v.width.max(v.height),
        });
        sim.stats.vehicles_wrecked += 1;

        if sim.driven_vehicle() == Some(index) {
            let exit = player::exit_position(sim, index);
            sim.player.position = exit;
            sim.occupancy = Occupancy::OnFoot;
        }

        let replacement = nearest_intact_vehicle(sim, position);
        if sim.active_vehicle == Some(index) {
            sim.active_vehicle = replacement;
        }

        debug!(vehicle = index, ?replacement, "Vehicle wrecked");
        events.push(SimEvent::VehicleWrecked {
            vehicle: index,
            position,
            replacement,
        });
    }
}

/// Closest intact vehicle to `position`, lowest index on ties
pub fn nearest_intact_vehicle(sim: &Simulation, position: Vec2) -> Option<VehicleIndex> {
    sim.vehicles
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_intact())
        .map(|(i, v)| (i, v.position.distance_sq_to(position)))
        .fold(None, |best: Option<(VehicleIndex, f32)>, (i, d)| match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((i, d)),
        })
        .map(|(i, _)| i)
}

fn check_terminal(sim: &mut Simulation, events: &mut Vec<SimEvent>) {
    let phase = if sim.player.health <= 0.0 {
        RunPhase::Defeat
    } else if sim.agents.is_empty() {
        RunPhase::Victory
    } else {
        return;
    };

    sim.phase = phase;
    sim.player.melee = None;
    info!(
        ?phase,
        tick = sim.tick,
        kills = sim.stats.total_kills(),
        "Run ended"
    );
    events.push(SimEvent::PhaseChanged { phase });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::test_support::*;
    use crate::game::state::{AgentKind, AgentState};
    use crate::game::world::WorldData;

    fn swing_at(direction: f32) -> ControlInput {
        ControlInput {
            melee: Some(direction),
            ..Default::default()
        }
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut v = Vehicle::new(Vec2::ZERO, 0.0);
        assert_eq!(damage_vehicle(&mut v, 30.0), 30.0);
        assert_eq!(damage_vehicle(&mut v, 500.0), 70.0);
        assert_eq!(v.health, 0.0);
        assert_eq!(damage_vehicle(&mut v, 5.0), 0.0);

        let mut p = Player::new(Vec2::ZERO);
        damage_player(&mut p, -10.0);
        assert_eq!(p.health, 100.0);
    }

    #[test]
    fn test_damage_agent_records_source() {
        let mut agent = Agent::new(1, AgentKind::Normal, Vec2::ZERO, 1.0, 0.0, 0);
        damage_agent(&mut agent, 12.0, DamageSource::Melee);
        assert_eq!(agent.health, 18.0);
        assert_eq!(agent.last_hit, Some(DamageSource::Melee));
        damage_agent(&mut agent, 100.0, DamageSource::Vehicle);
        assert_eq!(agent.health, 0.0);
        assert_eq!(agent.last_hit, Some(DamageSource::Vehicle));
    }

    #[test]
    fn test_wall_impact_damage_is_capped() {
        let mut v = Vehicle::new(Vec2::ZERO, 0.0);
        let impact = WallImpact {
            normal: Vec2::new(0.0, 1.0),
            contact: Vec2::new(0.0, -35.0),
            impact_speed: 12.0,
        };
        let mut events = Vec::new();
        let applied = apply_wall_impact(&mut v, &impact, 0, 18, &mut events);
        assert_eq!(applied, vehicle_consts::MAX_IMPACT_DAMAGE);
        match events[0] {
            SimEvent::Sparks { position, angle } => {
                assert_eq!(position, impact.contact);
                assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
            }
            ref other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_melee_hits_each_agent_once_per_swing() {
        let mut sim = create_on_foot_sim(Vec2::ZERO);
        let front = sim.spawn_agent(AgentKind::Tank, Vec2::new(30.0, 0.0));
        let behind = sim.spawn_agent(AgentKind::Tank, Vec2::new(-30.0, 0.0));
        let far = sim.spawn_agent(AgentKind::Tank, Vec2::new(200.0, 0.0));

        let events = update(&mut sim, &swing_at(0.0));
        assert_eq!(events.len(), 1);
        assert_eq!(sim.agent(front).unwrap().health, 80.0 - melee::DAMAGE);
        assert_eq!(sim.agent(front).unwrap().state, AgentState::Ragdoll);
        assert_eq!(sim.agent(behind).unwrap().health, 80.0);
        assert_eq!(sim.agent(far).unwrap().health, 80.0);

        // The swing is still live but the same agent is not struck again
        sim.agent_mut(front).unwrap().position = Vec2::new(30.0, 0.0);
        update(&mut sim, &ControlInput::default());
        assert_eq!(sim.agent(front).unwrap().health, 80.0 - melee::DAMAGE);
        assert_eq!(sim.stats.melee_hits, 1);
    }

    #[test]
    fn test_melee_arc_edges() {
        let mut sim = create_on_foot_sim(Vec2::ZERO);
        let at = |degrees: f32| Vec2::from_angle(degrees.to_radians()) * 30.0;
        let inside = sim.spawn_agent(AgentKind::Tank, at(70.0));
        let inside_low = sim.spawn_agent(AgentKind::Tank, at(-70.0));
        let outside = sim.spawn_agent(AgentKind::Tank, at(80.0));
        let outside_low = sim.spawn_agent(AgentKind::Tank, at(-80.0));

        update(&mut sim, &swing_at(0.0));
        assert_eq!(sim.agent(inside).unwrap().health, 80.0 - melee::DAMAGE);
        assert_eq!(sim.agent(inside_low).unwrap().health, 80.0 - melee::DAMAGE);
        assert_eq!(sim.agent(outside).unwrap().health, 80.0);
        assert_eq!(sim.agent(outside_low).unwrap().health, 80.0);
        assert_eq!(sim.stats.melee_hits, 2);
    }

    #[test]
    fn test_melee_cooldown_after_swing() {
        let mut sim = create_on_foot_sim(Vec2::ZERO);
        sim.spawn_agent(AgentKind::Boss, Vec2::new(500.0, 0.0));

        update(&mut sim, &swing_at(0.0));
        for _ in 1..melee::SWING_TICKS {
            assert!(sim.player.is_swinging());
            update(&mut sim, &ControlInput::default());
        }
        assert!(!sim.player.is_swinging());
        assert_eq!(sim.player.melee_cooldown, melee::COOLDOWN_TICKS);

        update(&mut sim, &swing_at(0.0));
        assert!(!sim.player.is_swinging());
    }

    #[test]
    fn test_no_melee_while_driving() {
        let mut sim = create_test_sim(vec![], vec![]);
        sim.spawn_agent(AgentKind::Normal, Vec2::new(20.0, 0.0));
        update(&mut sim, &swing_at(0.0));
        assert!(!sim.player.is_swinging());
    }

    #[test]
    fn test_dead_agents_are_swept_with_events() {
        let mut sim = create_on_foot_sim(Vec2::ZERO);
        let crushed = sim.spawn_agent(AgentKind::Normal, Vec2::new(300.0, 0.0));
        let slashed = sim.spawn_agent(AgentKind::Normal, Vec2::new(-300.0, 0.0));
        sim.spawn_agent(AgentKind::Normal, Vec2::new(0.0, 300.0));

        damage_agent(sim.agent_mut(crushed).unwrap(), 100.0, DamageSource::Vehicle);
        damage_agent(sim.agent_mut(slashed).unwrap(), 100.0, DamageSource::Melee);

        let events = update(&mut sim, &ControlInput::default());
        assert_eq!(sim.agents.len(), 1);
        assert_eq!(sim.stats.kills_by_vehicle, 1);
        assert_eq!(sim.stats.kills_by_melee, 1);
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::AgentKilled { by_vehicle: true, agent_id, .. } if *agent_id == crushed
        )));
        assert_eq!(
            events.iter().filter(|e| matches!(e, SimEvent::Gibs { .. })).count(),
            1
        );
    }

    #[test]
    fn test_victory_when_population_cleared() {
        let mut sim = create_on_foot_sim(Vec2::ZERO);
        let id = sim.spawn_agent(AgentKind::Normal, Vec2::new(300.0, 0.0));
        damage_agent(sim.agent_mut(id).unwrap(), 100.0, DamageSource::Melee);

        let events = update(&mut sim, &ControlInput::default());
        assert_eq!(sim.phase, RunPhase::Victory);
        assert!(matches!(events.last(), Some(SimEvent::PhaseChanged { phase: RunPhase::Victory })));
    }

    #[test]
    fn test_defeat_takes_priority() {
        let mut sim = create_on_foot_sim(Vec2::ZERO);
        damage_player(&mut sim.player, 1000.0);
        update(&mut sim, &ControlInput::default());
        assert_eq!(sim.phase, RunPhase::Defeat);
    }

    #[test]
    fn test_wreck_evicts_driver_and_picks_nearest_replacement() {
        let data = WorldData {
            buildings: vec![],
            decorations: vec![],
            zones: vec![],
            vehicles: vec![
                vehicle_spawn(0.0, 0.0),
                vehicle_spawn(900.0, 0.0),
                vehicle_spawn(300.0, 0.0),
            ],
        };
        let mut sim = crate::game::state::Simulation::new(data, empty_config()).unwrap();
        sim.spawn_agent(AgentKind::Normal, Vec2::new(0.0, 1500.0));
        damage_vehicle(&mut sim.vehicles[0], 100.0);

        let events = update(&mut sim, &ControlInput::default());
        assert_eq!(sim.vehicles[0].condition, VehicleCondition::Wrecked);
        assert_eq!(sim.occupancy, Occupancy::OnFoot);
        assert_eq!(sim.active_vehicle, Some(2));
        assert_eq!(sim.stats.vehicles_wrecked, 1);
        assert!(sim.player.position.distance_to(Vec2::ZERO) > 20.0);
        assert!(events.iter().any(|e| matches!(e, SimEvent::Explosion { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::VehicleWrecked { vehicle: 0, replacement: Some(2), .. }
        )));

        // A wreck is only reported once
        let events = update(&mut sim, &ControlInput::default());
        assert!(events.is_empty());
    }

    #[test]
    fn test_last_vehicle_wreck_leaves_no_active_vehicle() {
        let mut sim = create_test_sim(vec![], vec![]);
        sim.spawn_agent(AgentKind::Normal, Vec2::new(0.0, 1500.0));
        damage_vehicle(&mut sim.vehicles[0], 100.0);
        update(&mut sim, &ControlInput::default());
        assert_eq!(sim.active_vehicle, None);
        assert!(!sim.is_driving());
    }
}
