//! Loose decoration debris
//!
//! Decorations the vehicle knocks out of the static index become free
//! bodies: breakables shatter into transient debris once their hit counter
//! runs out, ragdoll props turn into persistent debris on first contact.
//! Bodies never come to rest inside static geometry.

use rand::Rng;

use crate::game::collision::{self, Aabb, Shape};
use crate::game::constants::debris::*;
use crate::game::events::SimEvent;
use crate::game::state::{DebrisBody, EntityId, Simulation, VehicleIndex};
use crate::game::world::{ContactKind, Obstacle, ObstacleId, World};
use crate::util::vec2::Vec2;

/// Attempts to push a freshly spawned body out of walls
const EJECT_ITERATIONS: usize = 4;

/// Vehicle ran into a breakable or loose decoration
///
/// `prev_position` is where the vehicle stood before this tick's move; a
/// breakable that survives the hit pushes the vehicle back there.
pub fn strike_decoration(
    sim: &mut Simulation,
    vehicle: VehicleIndex,
    obstacle_id: ObstacleId,
    prev_position: Vec2,
) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let tick = sim.tick;
    let Some(kind) = sim.world.obstacle(obstacle_id).map(|o| o.contact_kind()) else {
        return events;
    };
    let incoming = sim.vehicles[vehicle].velocity;

    match kind {
        ContactKind::Breakable => {
            {
                let v = &mut sim.vehicles[vehicle];
                v.position = prev_position;
                v.velocity *= ABSORB_FACTOR;
            }

            let Some(obstacle) = sim.world.obstacle_mut(obstacle_id) else {
                return events;
            };
            let ready = obstacle
                .last_hit_tick
                .map_or(true, |last| tick.saturating_sub(last) >= HIT_COOLDOWN_TICKS);
            if !ready {
                return events;
            }
            obstacle.hits_to_break = obstacle.hits_to_break.saturating_sub(1);
            obstacle.last_hit_tick = Some(tick);

            if obstacle.hits_to_break == 0 {
                if let Some(removed) = sim.world.remove_obstacle(obstacle_id) {
                    let position = removed.rect.center();
                    let debris_id = spawn_body(sim, &removed, incoming * KICK_FACTOR, false);
                    sim.stats.decorations_broken += 1;
                    events.push(SimEvent::DecorationBroken {
                        obstacle_id,
                        debris_id,
                        position,
                    });
                }
            }
        }
        ContactKind::Loose => {
            if let Some(removed) = sim.world.remove_obstacle(obstacle_id) {
                let position = removed.rect.center();
                let debris_id = spawn_body(sim, &removed, incoming * KICK_FACTOR, true);
                sim.vehicles[vehicle].velocity *= SHOVE_FACTOR;
                events.push(SimEvent::DecorationDislodged {
                    obstacle_id,
                    debris_id,
                    position,
                });
            }
        }
        ContactKind::Solid | ContactKind::Passable => {}
    }

    events
}

fn spawn_body(
    sim: &mut Simulation,
    source: &Obstacle,
    velocity: Vec2,
    persistent: bool,
) -> EntityId {
    let id = sim.next_entity_id();
    let spin = (sim.rng.gen::<f32>() - 0.5) * SPIN_RANGE;
    let half_extents = source.rect.half_extents();
    sim.debris.push(DebrisBody {
        id,
        source: source.id,
        half_extents,
        position: clear_of_walls(&sim.world, source.rect.center(), half_extents),
        velocity,
        angle: 0.0,
        spin,
        persistent,
        lifetime: if persistent { 0 } else { TRANSIENT_LIFETIME_TICKS },
    });
    id
}

/// Kick, integrate and expire debris bodies
pub fn update(sim: &mut Simulation) {
    if sim.debris.is_empty() {
        return;
    }

    if let Some(index) = sim.driven_vehicle() {
        let vehicle = &mut sim.vehicles[index];
        let body = vehicle.collider();
        for debris in sim.debris.iter_mut() {
            if vehicle.speed() <= REST_SPEED {
                break;
            }
            let Some(sep) = collision::separation(&debris.collider(), &body) else {
                continue;
            };
            // Shoved out of the car unless a wall is in the way
            let cleared = debris.position + sep.normal * sep.depth;
            if !sim.world.blocked(&Shape::Aabb(Aabb::from_center(cleared, debris.half_extents))) {
                debris.position = cleared;
            }
            debris.velocity = vehicle.velocity * KICK_FACTOR;
            debris.spin += (sim.rng.gen::<f32>() - 0.5) * SPIN_RANGE;
            vehicle.velocity *= SHOVE_FACTOR;
        }
    }

    for debris in sim.debris.iter_mut() {
        integrate(&sim.world, debris);
    }

    sim.debris.retain(|d| !d.is_expired());
}

fn integrate(world: &World, debris: &mut DebrisBody) {
    let step_x = Vec2::new(debris.position.x + debris.velocity.x, debris.position.y);
    if blocked(world, Aabb::from_center(step_x, debris.half_extents)) {
        debris.velocity.x *= -BOUNCE;
    } else {
        debris.position = step_x;
    }

    let step_y = Vec2::new(debris.position.x, debris.position.y + debris.velocity.y);
    if blocked(world, Aabb::from_center(step_y, debris.half_extents)) {
        debris.velocity.y *= -BOUNCE;
    } else {
        debris.position = step_y;
    }

    debris.angle += debris.spin;
    debris.velocity *= DAMPING;
    debris.spin *= DAMPING;
    if debris.velocity.length() < REST_SPEED {
        debris.velocity = Vec2::ZERO;
    }

    if !debris.persistent {
        debris.lifetime = debris.lifetime.saturating_sub(1);
    }
}

fn blocked(world: &World, bounds: Aabb) -> bool {
    world.blocked(&Shape::Aabb(bounds))
}

/// Nudge a box centred at `position` out of any wall it overlaps
fn clear_of_walls(world: &World, mut position: Vec2, half_extents: Vec2) -> Vec2 {
    for _ in 0..EJECT_ITERATIONS {
        let bounds = Shape::Aabb(Aabb::from_center(position, half_extents));
        match world.deepest_contact(&bounds) {
            Some((_, sep)) => position += sep.normal * (sep.depth + EJECT_MARGIN),
            None => break,
        }
    }
    position
}
