//! One simulation step
//!
//! Fixed system order per tick:
//! occupancy toggle -> vehicle or on-foot movement -> debris -> agent AI ->
//! crowd resolution -> lifecycle. Once the run is over every call is a no-op.

use crate::game::events::SimEvent;
use crate::game::input::ControlInput;
use crate::game::state::Simulation;
use crate::game::systems::{ai, crowd, debris, lifecycle, player, vehicle};

/// Advance the simulation by one host frame
pub fn step(sim: &mut Simulation, input: &ControlInput) -> Vec<SimEvent> {
    if sim.is_terminal() {
        return Vec::new();
    }
    sim.tick += 1;

    let mut events = Vec::new();

    if input.interact {
        events.extend(player::interact(sim));
    }

    match sim.driven_vehicle() {
        Some(index) => events.extend(vehicle::update(sim, index, input)),
        None => player::update(sim, input),
    }

    debris::update(sim);
    ai::update(sim);
    crowd::resolve(sim);

    events.extend(lifecycle::update(sim, input));
    events
}
