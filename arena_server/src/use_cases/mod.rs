// Use cases layer: application workflows for the game server.

pub mod game;
pub mod input;
pub mod types;

pub use game::{Simulation, world_task};
pub use input::InputChannel;
pub use types::{GameEvent, TickReport, WorldUpdate};
