//! On-foot avatar and vehicle occupancy

use tracing::debug;

use crate::game::collision::{self, Shape};
use crate::game::constants::vehicle::{ENTER_RADIUS, EXIT_DISTANCE_FACTOR};
use crate::game::events::SimEvent;
use crate::game::input::ControlInput;
use crate::game::state::{Occupancy, Simulation, Vehicle, VehicleIndex};
use crate::game::systems::crowd;
use crate::game::world::World;
use crate::util::vec2::Vec2;

/// Walk the on-foot player, one axis at a time so walls can be slid along
pub fn update(sim: &mut Simulation, input: &ControlInput) {
    let dir = input.walk_direction();
    if dir == Vec2::ZERO {
        return;
    }
    let step = dir * sim.player.speed;
    let radius = sim.player.radius;

    let try_x = Vec2::new(sim.player.position.x + step.x, sim.player.position.y);
    if !position_blocked(sim, try_x, radius) {
        sim.player.position = try_x;
    }
    let try_y = Vec2::new(sim.player.position.x, sim.player.position.y + step.y);
    if !position_blocked(sim, try_y, radius) {
        sim.player.position = try_y;
    }
}

/// Circle overlaps static geometry or any vehicle body (wrecks included)
pub fn position_blocked(sim: &Simulation, center: Vec2, radius: f32) -> bool {
    walk_blocked(&sim.world, &sim.vehicles, &Shape::circle(center, radius))
}

pub fn walk_blocked(world: &World, vehicles: &[Vehicle], body: &Shape) -> bool {
    world.blocked(body) || vehicles.iter().any(|v| collision::overlaps(body, &v.collider()))
}

/// Toggle occupancy on the interact edge
pub fn interact(sim: &mut Simulation) -> Vec<SimEvent> {
    match sim.occupancy {
        Occupancy::Driving { vehicle } => exit_vehicle(sim, vehicle).into_iter().collect(),
        Occupancy::OnFoot => enter_nearest(sim).into_iter().collect(),
    }
}

fn exit_vehicle(sim: &mut Simulation, index: VehicleIndex) -> Option<SimEvent> {
    let Some(position) = free_exit_slot(sim, index) else {
        debug!(vehicle = index, "No free exit slot");
        return None;
    };

    let v = &mut sim.vehicles[index];
    v.velocity = Vec2::ZERO;
    v.steer = 0.0;
    v.drifting = false;
    sim.player.position = position;
    sim.occupancy = Occupancy::OnFoot;

    Some(SimEvent::ExitedVehicle {
        vehicle: index,
        position,
    })
}

fn enter_nearest(sim: &mut Simulation) -> Option<SimEvent> {
    let player = sim.player.position;
    let (index, _) = sim
        .vehicles
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_intact())
        .map(|(i, v)| (i, v.position.distance_to(player)))
        .filter(|&(_, d)| d < ENTER_RADIUS)
        .fold(None, |best: Option<(VehicleIndex, f32)>, (i, d)| match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((i, d)),
        })?;

    sim.occupancy = Occupancy::Driving { vehicle: index };
    sim.active_vehicle = Some(index);
    sim.player.melee = None;
    sim.player.position = sim.vehicles[index].position;

    Some(SimEvent::EnteredVehicle { vehicle: index })
}

/// Candidate exit points: left, right, rear, front
fn exit_slots(v: &Vehicle, radius: f32) -> [Vec2; 4] {
    let side = (v.width * 0.5 + radius) * EXIT_DISTANCE_FACTOR;
    let end = (v.height * 0.5 + radius) * EXIT_DISTANCE_FACTOR;
    let right = v.right();
    let forward = v.forward();
    [
        v.position - right * side,
        v.position + right * side,
        v.position - forward * end,
        v.position + forward * end,
    ]
}

fn free_exit_slot(sim: &Simulation, index: VehicleIndex) -> Option<Vec2> {
    let radius = sim.player.radius;
    exit_slots(&sim.vehicles[index], radius)
        .into_iter()
        .find(|&slot| !position_blocked(sim, slot, radius))
}

/// Where a driver lands when forced out; the left slot, ejected from any
/// wall or car it overlaps, if every slot is blocked
pub fn exit_position(sim: &Simulation, index: VehicleIndex) -> Vec2 {
    free_exit_slot(sim, index).unwrap_or_else(|| {
        let radius = sim.player.radius;
        let slot = exit_slots(&sim.vehicles[index], radius)[0];
        crowd::unstick_on_foot(&sim.world, &sim.vehicles, slot, radius)
    })
}
