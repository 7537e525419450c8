//! Post-movement crowd resolution
//!
//! Separates overlapping agents from each other, from the on-foot player
//! and from the occupied vehicle. A push that would shove an agent into
//! static geometry is dropped, and the on-foot player is also kept out of
//! vehicle bodies. A final pass ejects anything still stuck through its
//! nearest edge.

use crate::game::collision::{self, Separation, Shape};
use crate::game::constants::crowd::{MIN_SEPARATION_DISTANCE, UNSTICK_MARGIN};
use crate::game::spatial::GridAgent;
use crate::game::state::{Occupancy, Simulation, Vehicle};
use crate::game::systems::player;
use crate::game::world::World;
use crate::util::vec2::Vec2;

/// Ejection attempts per circle in the unstick pass
const UNSTICK_ITERATIONS: usize = 4;

pub fn resolve(sim: &mut Simulation) {
    separate_agents(sim);

    match sim.occupancy {
        Occupancy::OnFoot => separate_from_player(sim),
        Occupancy::Driving { vehicle } => separate_from_vehicle(sim, vehicle),
    }

    for agent in sim.agents.iter_mut() {
        agent.position = unstick(&sim.world, agent.position, agent.radius);
    }
    if !sim.is_driving() {
        sim.player.position = unstick_on_foot(
            &sim.world,
            &sim.vehicles,
            sim.player.position,
            sim.player.radius,
        );
    }
}

/// Move `position` by `delta` unless that lands in static geometry
#[inline]
fn push(world: &World, position: &mut Vec2, radius: f32, delta: Vec2) {
    let next = *position + delta;
    if !world.circle_blocked(next, radius) {
        *position = next;
    }
}

/// Agent-agent separation over grid candidate pairs, ragdolls excluded
fn separate_agents(sim: &mut Simulation) {
    sim.agent_grid.clear();
    for (index, agent) in sim.agents.iter().enumerate() {
        if agent.is_ragdoll() {
            continue;
        }
        sim.agent_grid.insert(GridAgent {
            index,
            position: agent.position,
        });
    }
    sim.agent_grid.sorted_pairs(&mut sim.pair_scratch);

    for &(i, j) in &sim.pair_scratch {
        let (a, b) = (&sim.agents[i], &sim.agents[j]);
        if a.position.distance_to(b.position) <= MIN_SEPARATION_DISTANCE {
            continue;
        }
        let Some(sep) = collision::separation(&a.collider(), &b.collider()) else {
            continue;
        };
        let shift = sep.normal * (sep.depth * 0.5);

        let (ra, rb) = (a.radius, b.radius);
        push(&sim.world, &mut sim.agents[i].position, ra, shift);
        push(&sim.world, &mut sim.agents[j].position, rb, -shift);
    }
}

/// Player and agent each take half the overlap
fn separate_from_player(sim: &mut Simulation) {
    let radius = sim.player.radius;
    for agent in sim.agents.iter_mut() {
        if sim.player.position.distance_to(agent.position) <= MIN_SEPARATION_DISTANCE {
            continue;
        }
        let Some(sep) = collision::separation(&sim.player.collider(), &agent.collider()) else {
            continue;
        };
        let shift = sep.normal * (sep.depth * 0.5);

        let next = Shape::circle(sim.player.position + shift, radius);
        if !player::walk_blocked(&sim.world, &sim.vehicles, &next) {
            sim.player.position += shift;
        }
        push(&sim.world, &mut agent.position, agent.radius, -shift);
    }
}

/// Agents are pushed clear of the occupied vehicle; the vehicle does not move
fn separate_from_vehicle(sim: &mut Simulation, vehicle: usize) {
    let body = sim.vehicles[vehicle].collider();
    for agent in sim.agents.iter_mut() {
        if agent.is_ragdoll() {
            continue;
        }
        if let Some(sep) = collision::separation(&agent.collider(), &body) {
            let delta = sep.normal * sep.depth;
            push(&sim.world, &mut agent.position, agent.radius, delta);
        }
    }
}

/// Eject a circle from any blocking obstacle it still overlaps
pub fn unstick(world: &World, position: Vec2, radius: f32) -> Vec2 {
    eject(position, radius, |body| world.deepest_contact(body).map(|(_, sep)| sep))
}

/// Like [`unstick`], but vehicle bodies (wrecks included) count as blockers
pub fn unstick_on_foot(world: &World, vehicles: &[Vehicle], position: Vec2, radius: f32) -> Vec2 {
    eject(position, radius, |body| {
        let mut deepest = world.deepest_contact(body).map(|(_, sep)| sep);
        for v in vehicles {
            if let Some(sep) = collision::separation(body, &v.collider()) {
                if deepest.as_ref().map_or(true, |d| sep.depth > d.depth) {
                    deepest = Some(sep);
                }
            }
        }
        deepest
    })
}

fn eject<F>(mut position: Vec2, radius: f32, deepest: F) -> Vec2
where
    F: Fn(&Shape) -> Option<Separation>,
{
    for _ in 0..UNSTICK_ITERATIONS {
        match deepest(&Shape::circle(position, radius)) {
            Some(sep) => position += sep.normal * (sep.depth + UNSTICK_MARGIN),
            None => break,
        }
    }
    position
}
