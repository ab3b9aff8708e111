// Gameplay constants grouped per entity kind.

pub mod craft;
pub mod projectile;

pub use craft::CraftTuning;
pub use projectile::ProjectileTuning;

#[derive(Debug, Clone, Copy, Default)]
pub struct SimTuning {
    pub craft: CraftTuning,
    pub projectile: ProjectileTuning,
}
