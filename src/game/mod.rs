pub mod collision;
pub mod constants;
pub mod events;
pub mod input;
pub mod outcome;
pub mod performance;
pub mod spatial;
pub mod state;
pub mod step;
pub mod systems;
pub mod world;
