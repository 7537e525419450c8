//! Driven-vehicle dynamics
//!
//! One integration step per tick for the occupied vehicle: terrain lookup,
//! throttle, smoothed steering, grip/friction decomposition, speed caps,
//! integration and static collision. Parked and wrecked vehicles never move.

use crate::game::collision::{self, Aabb, Shape};
use crate::game::constants::vehicle::*;
use crate::game::events::SimEvent;
use crate::game::input::ControlInput;
use crate::game::state::{Simulation, Vehicle, VehicleIndex};
use crate::game::systems::{debris, lifecycle};
use crate::game::world::ContactKind;
use crate::util::vec2::Vec2;

/// Result of bouncing a vehicle off a solid obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallImpact {
    /// Outward normal of the obstacle at the contact
    pub normal: Vec2,
    /// Closest point on the obstacle to the vehicle centre
    pub contact: Vec2,
    /// Speed along the normal before the bounce
    pub impact_speed: f32,
}

/// Advance the driven vehicle one tick
pub fn update(sim: &mut Simulation, index: VehicleIndex, input: &ControlInput) -> Vec<SimEvent> {
    let mut events = Vec::new();

    let base_friction = sim.vehicles[index].friction;
    let surface = sim.world.surface_at(sim.vehicles[index].position, base_friction);

    let prev_position = {
        let v = &mut sim.vehicles[index];
        apply_controls(v, input, surface.friction, surface.grip);
        let prev = v.position;
        v.position += v.velocity;
        prev
    };

    // Only the first overlapping obstacle is handled each tick
    let contact = sim
        .world
        .first_oriented_contact(&sim.vehicles[index].body())
        .map(|o| (o.id, o.rect, o.contact_kind()));

    if let Some((obstacle_id, rect, kind)) = contact {
        match kind {
            ContactKind::Solid => {
                let tick = sim.tick;
                let cooldown = sim.damage_cooldown_ticks;
                let v = &mut sim.vehicles[index];
                v.position = prev_position;

                let wall = Shape::Aabb(rect);
                let impact = resolve_wall_contact(v, &rect);
                let mut damage =
                    lifecycle::apply_wall_impact(v, &impact, tick, cooldown, &mut events);

                if collision::overlaps(&v.collider(), &wall) {
                    let impact = resolve_wall_contact(v, &rect);
                    damage +=
                        lifecycle::apply_wall_impact(v, &impact, tick, cooldown, &mut events);
                }
                // Still wedged after two bounces: push straight out
                if let Some(sep) = collision::separation(&v.collider(), &wall) {
                    v.position += sep.normal * (sep.depth + COLLISION_NUDGE);
                }

                sim.stats.wall_impacts += 1;
                sim.stats.vehicle_damage_taken += damage;
            }
            ContactKind::Breakable | ContactKind::Loose => {
                events.extend(debris::strike_decoration(sim, index, obstacle_id, prev_position));
            }
            ContactKind::Passable => {}
        }
    }

    let v = &mut sim.vehicles[index];
    v.drifting = input.handbrake && is_sliding(v);
    if v.drifting {
        let [left, right] = rear_wheels(v);
        events.push(SimEvent::Smoke { position: left });
        events.push(SimEvent::Smoke { position: right });
    }

    events
}

/// Throttle, steering, grip and the speed caps. Does not move the vehicle.
pub fn apply_controls(v: &mut Vehicle, input: &ControlInput, friction: f32, grip: f32) {
    // Axes are taken before this tick's heading change
    let forward = v.forward();
    let right = v.right();

    v.velocity += forward * (input.throttle() * v.acceleration);

    let speed = v.speed();
    let turn_rate = if input.handbrake {
        v.drift_turn_speed
    } else {
        v.turn_speed
    };
    let moving_forward = v.velocity.dot(forward) >= 0.0;
    let target = if speed > MIN_STEER_SPEED {
        input.steer_target()
    } else {
        0.0
    };
    v.steer += (target - v.steer) * STEER_SMOOTHING;
    v.steer = v.steer.clamp(-MAX_STEER, MAX_STEER);
    let direction = if moving_forward { 1.0 } else { -1.0 };
    v.angle += v.steer * turn_rate * (speed / v.max_speed) * direction;

    let (grip, friction) = if input.handbrake {
        (grip.min(HANDBRAKE_GRIP_CAP), friction + HANDBRAKE_FRICTION_BONUS)
    } else {
        (grip, friction)
    };

    let v_forward = v.velocity.dot(forward) * (1.0 - friction);
    let v_side = v.velocity.dot(right) * (1.0 - grip);
    v.velocity = forward * v_forward + right * v_side;

    let new_speed = v.speed();
    let cap = if v.velocity.dot(forward) >= 0.0 {
        v.max_speed
    } else {
        v.max_speed * REVERSE_SPEED_RATIO
    };
    if new_speed > cap {
        v.velocity *= cap / new_speed;
    }
}

/// Bounce off a solid box: nudge out along the normal, reflect the inbound
/// component with restitution, then damp for wall friction.
pub fn resolve_wall_contact(v: &mut Vehicle, rect: &Aabb) -> WallImpact {
    let (normal, contact, _) = collision::aabb_exit_direction(v.position, rect);

    v.position += normal * COLLISION_NUDGE;

    let dot = v.velocity.dot(normal);
    if dot < 0.0 {
        v.velocity -= normal * ((1.0 + RESTITUTION) * dot);
    }
    v.velocity *= WALL_FRICTION;

    WallImpact {
        normal,
        contact,
        impact_speed: dot.abs(),
    }
}

/// Velocity pointing more than the drift threshold away from the body axis
pub fn is_sliding(v: &Vehicle) -> bool {
    let speed = v.speed();
    if speed <= DRIFT_MIN_SPEED {
        return false;
    }
    let forward = v.forward();
    let axis = if v.velocity.dot(forward) >= 0.0 {
        forward
    } else {
        -forward
    };
    let cos = (v.velocity.dot(axis) / speed).clamp(-1.0, 1.0);
    cos.acos() > DRIFT_ANGLE_THRESHOLD
}

/// Rear wheel contact points (left, right)
pub fn rear_wheels(v: &Vehicle) -> [Vec2; 2] {
    let rear = v.position - v.forward() * REAR_WHEEL_OFFSET;
    let lateral = v.right() * (v.width * 0.5 - WHEEL_INSET);
    [rear - lateral, rear + lateral]
}
