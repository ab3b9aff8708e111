// Domain layer: core simulation types and rules.

pub mod geometry;
pub mod state;
pub mod store;
pub mod systems;
pub mod tuning;

pub use state::{
    Arena, Craft, CraftId, CraftSnapshot, Intent, Projectile, ProjectileId, ProjectileSnapshot,
    ProjectileSpawn,
};
pub use store::EntityStore;
pub use tuning::SimTuning;
