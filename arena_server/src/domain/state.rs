// Domain-level simulation entities and snapshot types.

use crate::domain::geometry::distance;

pub type CraftId = u64;
pub type ProjectileId = u64;

/// Circular playable region. Fixed for the lifetime of the server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
}

impl Arena {
    pub fn new(center_x: f64, center_y: f64, radius: f64) -> Self {
        Self {
            center_x,
            center_y,
            radius,
        }
    }

    /// True when the point lies inside the boundary (the rim itself counts as inside).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        distance(x, y, self.center_x, self.center_y) <= self.radius
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(500.0, 500.0, 3000.0)
    }
}

/// Latest control flags received for a craft. Replaced wholesale on every input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intent {
    pub turn_left: bool,
    pub turn_right: bool,
    pub accelerate: bool,
    pub decelerate: bool,
    pub shoot: bool,
}

#[derive(Debug, Clone)]
pub struct Craft {
    pub id: CraftId,
    pub x: f64,
    pub y: f64,
    // Signed, unbounded; units per tick.
    pub vel: f64,
    // Degrees, left unwrapped.
    pub rot: f64,
    pub alive: bool,
    pub intent: Intent,
}

impl Craft {
    /// A fresh craft parked at the arena center.
    pub fn spawn(id: CraftId, arena: &Arena, heading_deg: f64) -> Self {
        Self {
            id,
            x: arena.center_x,
            y: arena.center_y,
            vel: 0.0,
            rot: heading_deg,
            alive: true,
            intent: Intent::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: ProjectileId,
    pub origin_id: CraftId,
    pub x: f64,
    pub y: f64,
    pub vel: f64,
    pub rot: f64,
    // Only active projectiles can hit craft.
    pub active: bool,
}

/// Projectile fields computed at fire time, before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSpawn {
    pub origin_id: CraftId,
    pub x: f64,
    pub y: f64,
    pub vel: f64,
    pub rot: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CraftSnapshot {
    pub id: CraftId,
    pub x: f64,
    pub y: f64,
    pub vel: f64,
    pub rot: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSnapshot {
    pub id: ProjectileId,
    pub x: f64,
    pub y: f64,
    pub vel: f64,
    pub rot: f64,
}

impl From<&Craft> for CraftSnapshot {
    fn from(c: &Craft) -> Self {
        Self {
            id: c.id,
            x: c.x,
            y: c.y,
            vel: c.vel,
            rot: c.rot,
        }
    }
}

impl From<&Projectile> for ProjectileSnapshot {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
            vel: p.vel,
            rot: p.rot,
        }
    }
}
