use crate::domain::CraftId;
use crate::interface_adapters::protocol::{ArenaDto, ServerMessage, WorldUpdateDto, parse_intent};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::next_craft_id;
use crate::use_cases::{GameEvent, InputChannel, WorldUpdate};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    WorldUpdatesClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each world update once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::WorldUpdate(WorldUpdateDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize world update");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                // Broadcast first, then publish as latest; lag recovery relies on this order.
                let _ = world_bytes_tx.send(bytes.clone());
                let _ = world_latest_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    missed = n,
                    "world serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_world_serializer(state: &AppState) {
    tokio::spawn(world_update_serializer(
        state.world_tx.subscribe(),
        state.world_bytes_tx.clone(),
        state.world_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    // The craft id doubles as the connection id in logs.
    let craft_id = next_craft_id();
    let span = info_span!("conn", craft_id);

    async move {
        let mut ctx = match bootstrap_connection(&mut socket, &state, craft_id).await {
            Ok(ctx) => ctx,
            Err(e) => {
                error!(error = ?e, "failed to bootstrap connection");
                let _ = send_close_with_reason(&mut socket, close_code::ERROR, "bootstrap failed")
                    .await;
                return;
            }
        };

        info!("client connected");

        if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
            warn!(error = ?e, "client loop exited with error");
        }
    }
    .instrument(span)
    .await
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket.send(Message::Text(txt.into())).await?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await?;
    socket.close().await.map_err(NetError::Ws)
}

#[derive(Debug, Default)]
struct ConnStats {
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
    lag_recovery_count: u64,
}

struct ConnCtx {
    craft_id: CraftId,
    events_tx: mpsc::Sender<GameEvent>,
    input: InputChannel,
    world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    world_latest_rx: watch::Receiver<Utf8Bytes>,
    destroyed_rx: oneshot::Receiver<()>,
    // Cleared once the destruction notice resolved; the receiver must not be polled again.
    craft_alive: bool,
    stats: ConnStats,
    last_world_lag_log: Instant,
    last_invalid_input_log: Instant,
    close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
    craft_id: CraftId,
) -> Result<ConnCtx, NetError> {
    // Subscribe to updates *before* doing anything else (awaits) to not miss packets.
    let world_bytes_rx = state.world_bytes_tx.subscribe();
    let world_latest_rx = state.world_latest_tx.subscribe();

    // Tell the game loop to spawn a craft for this connection.
    let (destroyed_tx, destroyed_rx) = oneshot::channel();
    state
        .events_tx
        .send(GameEvent::Join {
            craft_id,
            destroyed_tx,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    // Identity first, then arena geometry. If either send fails, compensate
    // with Leave so the craft does not outlive its connection.
    let mut stats = ConnStats::default();
    let greeting = [
        ServerMessage::identity(craft_id),
        ServerMessage::ArenaInfo(ArenaDto::from(&state.arena)),
    ];
    for msg in &greeting {
        match send_message(socket, msg).await {
            Ok(bytes) => {
                stats.msgs_out += 1;
                stats.bytes_out += bytes as u64;
            }
            Err(e) => {
                state
                    .events_tx
                    .send(GameEvent::Leave { craft_id })
                    .await
                    .map_err(|_| NetError::InputClosed)?; // InputClosed takes precedence
                return Err(e);
            }
        }
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        craft_id,
        events_tx: state.events_tx.clone(),
        input: state.input.clone(),
        world_bytes_rx,
        world_latest_rx,
        destroyed_rx,
        craft_alive: true,
        stats,
        last_world_lag_log: now,
        last_invalid_input_log: now,
        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, ctx) {
                    LoopControl::Continue => false,
                    LoopControl::Disconnect => true,
                }
            }

            // Outgoing World Update
            world_msg = ctx.world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => match forward_world_bytes(bytes, socket, &mut ctx.stats).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_world_lag_log) {
                            warn!(missed = n, "world updates lagged; sending snapshot");
                        }
                        recover_from_lag(socket, ctx).await
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }

            // One-time destruction notice for this connection's craft.
            destroyed = &mut ctx.destroyed_rx, if ctx.craft_alive => {
                ctx.craft_alive = false;
                match destroyed {
                    Ok(()) => {
                        info!("craft destroyed; notifying owner");
                        let msg = ServerMessage::destroyed(ctx.craft_id);
                        match send_message(socket, &msg).await {
                            Ok(bytes) => {
                                ctx.stats.msgs_out += 1;
                                ctx.stats.bytes_out += bytes as u64;
                                false
                            }
                            Err(err) => {
                                warn!(error = ?err, "failed to send destruction notice");
                                true
                            }
                        }
                    }
                    // The world dropped the notifier without firing (shutting down).
                    Err(_) => false,
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

fn handle_incoming_ws(incoming: Option<Result<Message, Error>>, ctx: &mut ConnCtx) -> LoopControl {
    let craft_id = ctx.craft_id;
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.stats.msgs_in += 1;
                ctx.stats.bytes_in += text.len() as u64;

                match parse_intent(&text) {
                    Ok(intent) => {
                        // Input after destruction would only be dropped by the world.
                        if ctx.craft_alive {
                            ctx.input.submit(craft_id, intent);
                        }
                        LoopControl::Continue
                    }
                    Err(parse_err) => {
                        ctx.stats.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                craft_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if ctx.stats.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return LoopControl::Disconnect;
                        }

                        LoopControl::Continue
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                LoopControl::Disconnect
            }
            Message::Ping(_) | Message::Pong(_) => LoopControl::Continue,
            Message::Close(_) => LoopControl::Disconnect,
        },
        Some(Err(e)) => {
            warn!(craft_id, error = %e, "websocket recv error");
            LoopControl::Disconnect
        }
        None => {
            info!(craft_id, "websocket closed");
            LoopControl::Disconnect
        }
    }
}

// Takes the newest snapshot, then drops the buffered backlog so the next
// `recv` only yields updates published after it.
fn skip_to_latest(
    world_bytes_rx: &mut broadcast::Receiver<Utf8Bytes>,
    world_latest_rx: &watch::Receiver<Utf8Bytes>,
) -> Utf8Bytes {
    let latest = world_latest_rx.borrow().clone();
    *world_bytes_rx = world_bytes_rx.resubscribe();
    latest
}

// Resync strategy: skip the missed backlog and send the newest snapshot.
async fn recover_from_lag(socket: &mut WebSocket, ctx: &mut ConnCtx) -> bool {
    let latest = skip_to_latest(&mut ctx.world_bytes_rx, &ctx.world_latest_rx);
    if latest.is_empty() {
        if should_log(&mut ctx.last_world_lag_log) {
            warn!("world snapshot unavailable during lag recovery");
        }
        return false;
    }

    let bytes_len = latest.len();
    ctx.stats.lag_recovery_count += 1;
    let outcome = forward_world_bytes(latest, socket, &mut ctx.stats).await;
    debug!(
        bytes = bytes_len,
        count = ctx.stats.lag_recovery_count,
        "sent lag recovery snapshot"
    );

    matches!(outcome, LoopControl::Disconnect)
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    stats: &mut ConnStats,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket.send(Message::Text(world_msg)).await {
        Ok(()) => {
            stats.msgs_out += 1;
            stats.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send world update");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &mut ConnCtx) -> Result<(), NetError> {
    let craft_id = ctx.craft_id;
    // Leave is idempotent on the world side, so a craft that was already
    // destroyed and pruned is fine here.
    ctx.events_tx
        .send(GameEvent::Leave { craft_id })
        .await
        .map_err(|_| NetError::InputClosed)?;
    ctx.input.forget(craft_id);

    let stats = &ctx.stats;
    debug!(
        craft_id,
        msgs_in = stats.msgs_in,
        msgs_out = stats.msgs_out,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        invalid_json = stats.invalid_json,
        lag_recovery_count = stats.lag_recovery_count,
        "connection stats"
    );
    info!(craft_id, "client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish(
        bytes_tx: &broadcast::Sender<Utf8Bytes>,
        latest_tx: &watch::Sender<Utf8Bytes>,
        tick: u64,
    ) {
        let bytes = Utf8Bytes::from(tick.to_string());
        let _ = bytes_tx.send(bytes.clone());
        let _ = latest_tx.send(bytes);
    }

    fn tick_of(bytes: &Utf8Bytes) -> u64 {
        bytes.as_str().parse().expect("tick payload")
    }

    #[test]
    fn when_receiver_lags_then_delivered_ticks_never_go_backwards() {
        let (bytes_tx, mut bytes_rx) = broadcast::channel::<Utf8Bytes>(4);
        let (latest_tx, latest_rx) = watch::channel(Utf8Bytes::from(""));

        for tick in 1..=10 {
            publish(&bytes_tx, &latest_tx, tick);
        }

        let mut delivered = Vec::new();
        match bytes_rx.try_recv() {
            Err(broadcast::error::TryRecvError::Lagged(_)) => {
                delivered.push(tick_of(&skip_to_latest(&mut bytes_rx, &latest_rx)));
            }
            other => panic!("expected lag, got {other:?}"),
        }

        // Backlog is gone; only fresh updates follow.
        assert!(matches!(
            bytes_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        for tick in 11..=12 {
            publish(&bytes_tx, &latest_tx, tick);
        }
        while let Ok(bytes) = bytes_rx.try_recv() {
            delivered.push(tick_of(&bytes));
        }

        assert_eq!(delivered, vec![10, 11, 12]);
        assert!(delivered.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn when_serializer_publishes_then_latest_matches_last_broadcast() {
        let (world_tx, world_rx) = broadcast::channel::<WorldUpdate>(8);
        let (bytes_tx, mut bytes_rx) = broadcast::channel::<Utf8Bytes>(8);
        let (latest_tx, mut latest_rx) = watch::channel(Utf8Bytes::from(""));
        let handle = tokio::spawn(world_update_serializer(world_rx, bytes_tx, latest_tx));

        let _ = world_tx.send(WorldUpdate {
            tick: 3,
            crafts: Vec::new(),
            projectiles: Vec::new(),
        });

        let sent = bytes_rx.recv().await.expect("serialized update");
        latest_rx.changed().await.expect("latest published");
        assert_eq!(sent.as_str(), latest_rx.borrow().as_str());
        assert!(sent.as_str().contains("\"tick\":3"));

        drop(world_tx);
        handle.await.expect("serializer should exit when updates close");
    }
}
