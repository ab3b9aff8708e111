// Use-case level inputs/outputs for the game loop.

use crate::domain::systems::Destruction;
use crate::domain::{CraftId, CraftSnapshot, ProjectileSnapshot};
use tokio::sync::oneshot;

/// Connection lifecycle requests, applied by the world task between ticks.
#[derive(Debug)]
pub enum GameEvent {
    Join {
        craft_id: CraftId,
        // Fired once if the craft is destroyed; dropped silently on leave.
        destroyed_tx: oneshot::Sender<()>,
    },
    Leave {
        craft_id: CraftId,
    },
}

/// Full world state after a tick. Every client receives every entity.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldUpdate {
    pub tick: u64,
    pub crafts: Vec<CraftSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
}

/// Everything a single simulation step produced.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub shots_fired: usize,
    pub destroyed: Vec<Destruction>,
    pub update: WorldUpdate,
}
