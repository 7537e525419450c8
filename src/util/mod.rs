pub mod vec2;

pub use vec2::{wrap_angle, Vec2};
