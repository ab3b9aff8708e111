/// Gameplay tuning for projectiles.
///
/// A shot leaves the craft at `vel * speed_factor + speed_bonus`, spawned
/// `vel + spawn_offset` units ahead of the craft along its heading.
#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    /// Multiplier applied to the firing craft's velocity.
    pub speed_factor: f64,

    /// Flat speed added on top of the scaled craft velocity.
    pub speed_bonus: f64,

    /// Added to the craft velocity to get the spawn distance (negative spawns behind).
    pub spawn_offset: f64,

    /// Distance from the origin craft a projectile must exceed before it can hit anything.
    pub activation_distance: f64,

    /// Skip the firing craft during hit checks.
    pub exempt_shooter: bool,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed_factor: 1.1,
            speed_bonus: 10.0,
            spawn_offset: -10.0,
            activation_distance: 50.0,
            exempt_shooter: false,
        }
    }
}
