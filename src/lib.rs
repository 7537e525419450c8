//! Zombie Drift Simulation Library
//!
//! Deterministic, frame-coupled core of a top-down zombie survival game:
//! a drivable car with drift physics, an on-foot avatar, a seeded horde of
//! agents, destructible decorations and a run that ends in victory or defeat.
//!
//! The host owns the loop. Build a [`Simulation`] from [`WorldData`] and a
//! [`SimConfig`], then call [`step`] once per frame with the current
//! [`ControlInput`]; each call returns the [`SimEvent`]s it produced.

pub mod config;
pub mod game;
pub mod util;

pub use config::SimConfig;
pub use game::events::SimEvent;
pub use game::input::ControlInput;
pub use game::outcome::{summarize, RunSummary};
pub use game::state::Simulation;
pub use game::step::step;
pub use game::world::WorldData;
