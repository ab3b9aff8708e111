/// Gameplay tuning for player-controlled craft.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct CraftTuning {
    /// Heading change in degrees per tick while a turn flag is held.
    pub turn_step_deg: f64,

    /// Velocity change in units per tick while accelerate/decelerate is held.
    pub speed_step: f64,

    /// Heading assigned to newly spawned craft, in degrees.
    pub initial_heading_deg: f64,

    /// A projectile closer than this to a craft destroys it.
    pub hit_radius: f64,
}

impl Default for CraftTuning {
    fn default() -> Self {
        Self {
            turn_step_deg: 5.0,
            speed_step: 1.0,
            initial_heading_deg: -90.0,
            hit_radius: 20.0,
        }
    }
}
