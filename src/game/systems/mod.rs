pub mod ai;
pub mod crowd;
pub mod debris;
pub mod lifecycle;
pub mod player;
pub mod spawn;
pub mod vehicle;
