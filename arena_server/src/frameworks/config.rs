use crate::domain::Arena;
use std::{env, time::Duration};
use tracing::warn;

// Runtime/server constants (not gameplay tuning).

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;

pub const TICK_RATE_HZ: u64 = 30;
pub const TICK_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / TICK_RATE_HZ);

pub fn http_port() -> u16 {
    env::var("ARENA_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

fn env_f64(key: &str) -> Option<f64> {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Arena geometry from `ARENA_CENTER_X`, `ARENA_CENTER_Y` and `ARENA_RADIUS`.
/// Missing or unparsable values keep the defaults; a non-positive radius is rejected.
pub fn arena() -> Arena {
    let defaults = Arena::default();
    let radius = match env_f64("ARENA_RADIUS") {
        Some(radius) if radius > 0.0 => radius,
        Some(radius) => {
            warn!(
                radius,
                default = defaults.radius,
                "ARENA_RADIUS must be positive; using default"
            );
            defaults.radius
        }
        None => defaults.radius,
    };

    Arena::new(
        env_f64("ARENA_CENTER_X").unwrap_or(defaults.center_x),
        env_f64("ARENA_CENTER_Y").unwrap_or(defaults.center_y),
        radius,
    )
}
