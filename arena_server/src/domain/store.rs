// Authoritative ownership of every craft and projectile in the arena.

use crate::domain::state::{Craft, CraftId, Projectile, ProjectileId, ProjectileSpawn};
use std::collections::BTreeMap;

/// Craft are keyed by id and iterate in ascending id order, so hit resolution
/// sees the same order every tick. Projectiles keep insertion order.
#[derive(Debug)]
pub struct EntityStore {
    crafts: BTreeMap<CraftId, Craft>,
    projectiles: Vec<Projectile>,
    next_projectile_id: ProjectileId,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            crafts: BTreeMap::new(),
            projectiles: Vec::new(),
            next_projectile_id: 1,
        }
    }

    /// Inserts a craft, returning any craft previously stored under the same id.
    pub fn insert_craft(&mut self, craft: Craft) -> Option<Craft> {
        self.crafts.insert(craft.id, craft)
    }

    pub fn craft(&self, id: CraftId) -> Option<&Craft> {
        self.crafts.get(&id)
    }

    pub fn craft_mut(&mut self, id: CraftId) -> Option<&mut Craft> {
        self.crafts.get_mut(&id)
    }

    /// Removes a craft. Absent ids are a no-op and return `None`.
    pub fn remove_craft(&mut self, id: CraftId) -> Option<Craft> {
        self.crafts.remove(&id)
    }

    pub fn crafts(&self) -> impl Iterator<Item = &Craft> {
        self.crafts.values()
    }

    pub fn crafts_mut(&mut self) -> impl Iterator<Item = &mut Craft> {
        self.crafts.values_mut()
    }

    pub fn craft_count(&self) -> usize {
        self.crafts.len()
    }

    /// Stores a new inactive projectile and returns its id.
    pub fn spawn_projectile(&mut self, spawn: ProjectileSpawn) -> ProjectileId {
        let id = self.next_projectile_id;
        self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
        self.projectiles.push(Projectile {
            id,
            origin_id: spawn.origin_id,
            x: spawn.x,
            y: spawn.y,
            vel: spawn.vel,
            rot: spawn.rot,
            active: false,
        });
        id
    }

    #[cfg(test)]
    pub(crate) fn insert_projectile(&mut self, projectile: Projectile) {
        self.next_projectile_id = self.next_projectile_id.max(projectile.id.wrapping_add(1));
        self.projectiles.push(projectile);
    }

    pub fn projectile(&self, id: ProjectileId) -> Option<&Projectile> {
        self.projectiles.iter().find(|p| p.id == id)
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn projectiles_mut(&mut self) -> &mut [Projectile] {
        &mut self.projectiles
    }

    /// Removes a projectile by id. Absent ids are a no-op and return `None`.
    pub fn remove_projectile(&mut self, id: ProjectileId) -> Option<Projectile> {
        let idx = self.projectiles.iter().position(|p| p.id == id)?;
        Some(self.projectiles.remove(idx))
    }

    /// Drops every craft whose alive flag is cleared and returns their ids.
    pub fn prune_dead_crafts(&mut self) -> Vec<CraftId> {
        // Mark first, then compact, so no iterator is live while removing.
        let dead: Vec<CraftId> = self
            .crafts
            .values()
            .filter(|c| !c.alive)
            .map(|c| c.id)
            .collect();
        for id in &dead {
            self.crafts.remove(id);
        }
        dead
    }

    /// Disjoint mutable access for systems that touch both collections in one pass.
    pub(crate) fn split_mut(&mut self) -> (&mut BTreeMap<CraftId, Craft>, &mut Vec<Projectile>) {
        (&mut self.crafts, &mut self.projectiles)
    }
}
