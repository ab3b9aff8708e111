use crate::domain::Arena;
use crate::use_cases::{GameEvent, InputChannel, WorldUpdate};
use axum::extract::ws::Utf8Bytes;
use tokio::sync::{broadcast, mpsc, watch};

#[derive(Clone)]
pub struct AppState {
    // Join/leave requests flowing from connections into the world task.
    pub events_tx: mpsc::Sender<GameEvent>,
    // Latest control intent per craft, read by the world task each tick.
    pub input: InputChannel,
    // Arena geometry, announced to every client on connect.
    pub arena: Arena,
    // World updates produced by the game loop (domain structs).
    pub world_tx: broadcast::Sender<WorldUpdate>,
    // Serialized world updates, shared across all connections.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    // Latest serialized world update for lag recovery.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
}
