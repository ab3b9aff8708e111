// Per-tick simulation systems, run in this order: physics, then collision.

pub mod collision;
pub mod physics;

pub use collision::{DestroyCause, Destruction};
