// Framework bootstrap for the arena server runtime.

use crate::domain::SimTuning;
use crate::frameworks::config;
use crate::interface_adapters::net::{spawn_world_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{GameEvent, InputChannel, Simulation, WorldUpdate, world_task};

use axum::{Router, extract::ws::Utf8Bytes, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();
    let app = app(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([0, 0, 0, 0], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    let arena = config::arena();
    tracing::debug!(
        center_x = arena.center_x,
        center_y = arena.center_y,
        radius = arena.radius,
        "arena configured"
    );

    // events_tx/rx: join/leave requests from every connection go to the single world task.
    let (events_tx, events_rx) = mpsc::channel::<GameEvent>(config::EVENT_CHANNEL_CAPACITY);
    let input = InputChannel::new();

    // world_tx/rx: world updates are broadcast to all clients.
    let (world_tx, _world_rx) = broadcast::channel::<WorldUpdate>(config::WORLD_BROADCAST_CAPACITY);
    let (world_bytes_tx, _world_bytes_rx) =
        broadcast::channel::<Utf8Bytes>(config::WORLD_BROADCAST_CAPACITY);
    let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));

    let state = Arc::new(AppState {
        events_tx,
        input: input.clone(),
        arena,
        world_tx: world_tx.clone(),
        world_bytes_tx,
        world_latest_tx,
    });

    // Spawn the Game Loop (World Task)
    // It owns the simulation; everything else talks to it through channels.
    let sim = Simulation::new(arena, SimTuning::default());
    tokio::spawn(world_task(
        events_rx,
        input,
        world_tx,
        sim,
        config::TICK_INTERVAL,
    ));
    spawn_world_serializer(&state);

    state
}
