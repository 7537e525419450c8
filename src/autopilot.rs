//! Scripted input for the headless runner
//!
//! Drives toward the nearest agent, pulling the handbrake on sharp turns.
//! On foot it swings at anything in reach and walks back to the nearest
//! intact vehicle.

use zombie_drift_sim::game::constants::{melee, vehicle};
use zombie_drift_sim::game::state::Simulation;
use zombie_drift_sim::game::systems::lifecycle;
use zombie_drift_sim::util::vec2::Vec2;
use zombie_drift_sim::ControlInput;

/// Steering dead zone, as the sine of the heading error
const STEER_DEAD_ZONE: f32 = 0.1;
/// Heading error (cosine) below which the handbrake is pulled
const DRIFT_THRESHOLD: f32 = 0.3;
/// Ticks between repeated edge presses
const PRESS_INTERVAL: u64 = 15;

pub fn next_input(sim: &Simulation) -> ControlInput {
    match sim.driven_vehicle() {
        Some(index) => drive(sim, index),
        None => walk(sim),
    }
}

fn nearest_agent(sim: &Simulation, from: Vec2) -> Option<Vec2> {
    sim.agents
        .iter()
        .map(|a| a.position)
        .min_by(|a, b| a.distance_sq_to(from).total_cmp(&b.distance_sq_to(from)))
}

fn drive(sim: &Simulation, index: usize) -> ControlInput {
    let car = &sim.vehicles[index];
    let Some(target) = nearest_agent(sim, car.position) else {
        return ControlInput::default();
    };
    let to_target = (target - car.position).normalize_or_zero();
    let across = to_target.dot(car.right());
    let along = to_target.dot(car.forward());

    ControlInput {
        forward: true,
        left: across < -STEER_DEAD_ZONE,
        right: across > STEER_DEAD_ZONE,
        handbrake: along < DRIFT_THRESHOLD && car.speed() > car.max_speed * 0.5,
        ..Default::default()
    }
}

fn walk(sim: &Simulation) -> ControlInput {
    let position = sim.player.position;
    let press = sim.tick % PRESS_INTERVAL == 0;

    let mut input = ControlInput::default();
    if let Some(target) = nearest_agent(sim, position) {
        let offset = target - position;
        if offset.length() < melee::RANGE + sim.player.radius && press {
            input.melee = Some(offset.angle());
        }
    }

    let Some(index) = lifecycle::nearest_intact_vehicle(sim, position) else {
        return input;
    };
    let offset = sim.vehicles[index].position - position;
    if offset.length() < vehicle::ENTER_RADIUS {
        input.interact = press;
        return input;
    }
    input.left = offset.x < -1.0;
    input.right = offset.x > 1.0;
    input.forward = offset.y < -1.0;
    input.back = offset.y > 1.0;
    input
}
