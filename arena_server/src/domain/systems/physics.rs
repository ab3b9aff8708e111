use crate::domain::geometry::{advance, distance};
use crate::domain::state::{Craft, ProjectileSpawn};
use crate::domain::store::EntityStore;
use crate::domain::tuning::{CraftTuning, ProjectileTuning, SimTuning};
use tracing::{debug, trace};

/// Applies the craft's current intent and moves it one tick.
///
/// Order is fixed: turn, then speed, then fire, then move. The shot is taken
/// from the pre-move position so it inherits the freshly updated heading and
/// velocity. Returns the projectile to spawn when the shoot flag is held.
pub fn tick_craft(
    c: &mut Craft,
    craft_cfg: &CraftTuning,
    projectile_cfg: &ProjectileTuning,
) -> Option<ProjectileSpawn> {
    let intent = c.intent;

    // Both turn flags may be held at once; they cancel out.
    if intent.turn_left {
        c.rot -= craft_cfg.turn_step_deg;
    }
    if intent.turn_right {
        c.rot += craft_cfg.turn_step_deg;
    }

    // No clamping in either direction.
    if intent.accelerate {
        c.vel += craft_cfg.speed_step;
    }
    if intent.decelerate {
        c.vel -= craft_cfg.speed_step;
    }

    let shot = intent.shoot.then(|| fire(c, projectile_cfg));

    (c.x, c.y) = advance(c.x, c.y, c.rot, c.vel);

    shot
}

/// Projectile parameters for a shot fired by `c` in its current state.
pub fn fire(c: &Craft, cfg: &ProjectileTuning) -> ProjectileSpawn {
    let (x, y) = advance(c.x, c.y, c.rot, c.vel + cfg.spawn_offset);
    ProjectileSpawn {
        origin_id: c.id,
        x,
        y,
        vel: c.vel * cfg.speed_factor + cfg.speed_bonus,
        rot: c.rot,
    }
}

/// Advances every alive craft, spawns requested shots, then moves all
/// projectiles (including the ones spawned this tick) and arms those that
/// cleared their origin craft. Returns the number of shots fired.
pub fn integrate(store: &mut EntityStore, cfg: &SimTuning) -> usize {
    let mut shots: Vec<ProjectileSpawn> = Vec::new();
    for c in store.crafts_mut() {
        if !c.alive {
            continue;
        }
        if let Some(shot) = tick_craft(c, &cfg.craft, &cfg.projectile) {
            shots.push(shot);
        }
    }

    let fired = shots.len();
    for shot in shots {
        let origin_id = shot.origin_id;
        let projectile_id = store.spawn_projectile(shot);
        debug!(projectile_id, origin_id, "projectile fired");
    }

    let (crafts, projectiles) = store.split_mut();
    for p in projectiles.iter_mut() {
        (p.x, p.y) = advance(p.x, p.y, p.rot, p.vel);

        if p.active {
            continue;
        }
        // A projectile whose origin is gone has nothing to measure against and stays inert.
        let Some(origin) = crafts.get(&p.origin_id) else {
            continue;
        };
        if distance(origin.x, origin.y, p.x, p.y) > cfg.projectile.activation_distance {
            p.active = true;
            trace!(projectile_id = p.id, origin_id = p.origin_id, "projectile armed");
        }
    }

    fired
}
