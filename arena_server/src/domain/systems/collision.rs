use crate::domain::geometry::distance;
use crate::domain::state::{Arena, CraftId, ProjectileId};
use crate::domain::store::EntityStore;
use crate::domain::tuning::SimTuning;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyCause {
    Projectile {
        projectile_id: ProjectileId,
        shooter_id: CraftId,
    },
    Boundary,
}

/// One craft destruction, reported exactly once in the tick it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destruction {
    pub craft_id: CraftId,
    pub cause: DestroyCause,
}

/// Resolves projectile and boundary interactions for one tick.
///
/// Projectiles outside the arena are removed whether armed or not. An armed
/// projectile destroys at most one craft per tick (the first alive craft in
/// id order inside the hit radius) and keeps flying afterwards. Craft that
/// left the arena are destroyed last. Destroyed craft are only flagged here;
/// the caller prunes them.
pub fn resolve(store: &mut EntityStore, arena: &Arena, cfg: &SimTuning) -> Vec<Destruction> {
    let hit_radius = cfg.craft.hit_radius;
    let exempt_shooter = cfg.projectile.exempt_shooter;
    let mut destroyed: Vec<Destruction> = Vec::new();

    let (crafts, projectiles) = store.split_mut();

    // Projectile pass; `retain` visits each projectile once before compacting.
    projectiles.retain(|p| {
        if !arena.contains(p.x, p.y) {
            return false;
        }
        if !p.active {
            return true;
        }

        for c in crafts.values_mut() {
            if !c.alive {
                continue;
            }
            if exempt_shooter && c.id == p.origin_id {
                continue;
            }
            if distance(c.x, c.y, p.x, p.y) < hit_radius {
                c.alive = false;
                info!(
                    victim_id = c.id,
                    shooter_id = p.origin_id,
                    projectile_id = p.id,
                    "craft hit"
                );
                destroyed.push(Destruction {
                    craft_id: c.id,
                    cause: DestroyCause::Projectile {
                        projectile_id: p.id,
                        shooter_id: p.origin_id,
                    },
                });
                break;
            }
        }
        true
    });

    // Craft boundary pass.
    for c in crafts.values_mut() {
        if c.alive && !arena.contains(c.x, c.y) {
            c.alive = false;
            info!(craft_id = c.id, x = c.x, y = c.y, "craft left the arena");
            destroyed.push(Destruction {
                craft_id: c.id,
                cause: DestroyCause::Boundary,
            });
        }
    }

    destroyed
}
