/**
 * WebSocket Endpoint and Connection Task
 *
 * `GET /ws` authenticates through the `SessionUser` extractor before the
 * upgrade, so an unauthenticated client gets a 401 and never a socket.
 *
 * # Connection Lifecycle
 *
 * 1. Split the socket; spawn the writer task that owns the sink
 * 2. Replay undelivered direct messages onto the new connection
 * 3. Register it, closing any connection it supersedes
 * 4. Replay messages stored between step 2 and registration; each is
 *    claimed first so a concurrent live delivery cannot send it twice
 * 5. Read loop: dispatch text frames in order until the peer closes, a read
 *    fails, the writer stops, or the server asks the connection to close
 * 6. Evict from the registry (guaranteed by `EvictOnDrop`) and announce the
 *    new user list
 *
 * The writer is the only task writing to the socket. It sends queued
 * frames and periodic pings, each bounded by the write timeout.
 */
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::connection::Connection;
use super::dispatcher::Dispatcher;
use super::registry::ConnectionRegistry;
use crate::backend::chat;
use crate::backend::middleware::auth::SessionUser;
use crate::backend::server::state::AppState;
use crate::shared::ServerFrame;

/// Upgrade handler for `GET /ws`
pub async fn ws_upgrade(
    State(state): State<AppState>,
    user: SessionUser,
    ws: WebSocketUpgrade,
) -> Response {
    tracing::info!("[Realtime] Upgrading connection for {}", user.nickname);
    ws.on_upgrade(move |socket| run_connection(socket, state, user))
}

/// Why the read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// Peer sent a close frame or the stream ended
    PeerClosed,
    ReadError,
    /// Superseded or evicted by the delivery engine
    ServerClosed,
    WriterStopped,
}

/// Removes the connection from the registry however the task ends
struct EvictOnDrop {
    registry: ConnectionRegistry,
    connection: Arc<Connection>,
}

impl Drop for EvictOnDrop {
    fn drop(&mut self) {
        if self.registry.evict(&self.connection) {
            tracing::debug!(
                "[Realtime] Evicted connection {} ({})",
                self.connection.id(),
                self.connection.nickname()
            );
        }
    }
}

/// Drive one authenticated socket to completion
pub async fn run_connection(socket: WebSocket, state: AppState, user: SessionUser) {
    let (sink, mut stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(state.config.outbound_buffer);
    let connection = Connection::new(user.user_id, user.nickname, outbound_tx);
    let write_timeout = state.config.write_timeout();
    let mut writer = tokio::spawn(write_loop(
        sink,
        outbound_rx,
        write_timeout,
        state.config.ping_interval(),
    ));

    let guard = EvictOnDrop {
        registry: state.registry.clone(),
        connection: connection.clone(),
    };

    let replayed = replay_backlog(&state, &connection).await;

    if let Some(previous) = state.registry.register(connection.clone()) {
        tracing::info!(
            "[Realtime] {} reconnected; closing superseded connection {}",
            connection.nickname(),
            previous.id()
        );
        previous.close();
    }
    tracing::info!(
        "[Realtime] {} connected (connection {}, {} online)",
        connection.nickname(),
        connection.id(),
        state.registry.connection_count()
    );
    replay_late_backlog(&state, &connection, &replayed).await;
    state.notifier.broadcast_user_list_update().await;

    let exit = read_loop(&mut stream, &connection, &state, &mut writer).await;
    tracing::info!(
        "[Realtime] {} disconnected ({:?}, connection {})",
        connection.nickname(),
        exit,
        connection.id()
    );

    drop(guard);
    if exit == Exit::ServerClosed {
        let _ = connection.try_send(Message::Close(Some(CloseFrame {
            code: close_code::AWAY,
            reason: "connection closed by server".into(),
        })));
        if tokio::time::timeout(write_timeout, &mut writer).await.is_err() {
            writer.abort();
        }
    } else {
        writer.abort();
    }

    state.notifier.broadcast_user_list_update().await;
}

async fn read_loop(
    stream: &mut SplitStream<WebSocket>,
    connection: &Arc<Connection>,
    state: &AppState,
    writer: &mut JoinHandle<()>,
) -> Exit {
    let dispatcher = Dispatcher::new(state.clone(), connection.clone());
    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    dispatcher.handle_text(text.as_str()).await;
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::debug!(
                        "[Realtime] Ignoring {} byte binary frame from {}",
                        data.len(),
                        connection.nickname()
                    );
                }
                Some(Ok(Message::Close(frame))) => {
                    match frame {
                        Some(frame) if frame.code != close_code::NORMAL => tracing::info!(
                            "[Realtime] {} closed with code {}: {}",
                            connection.nickname(),
                            frame.code,
                            frame.reason.as_str()
                        ),
                        _ => {}
                    }
                    return Exit::PeerClosed;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::warn!("[Realtime] Read error from {}: {}", connection.nickname(), err);
                    return Exit::ReadError;
                }
                None => return Exit::PeerClosed,
            },
            _ = connection.closed() => return Exit::ServerClosed,
            _ = &mut *writer => return Exit::WriterStopped,
        }
    }
}

/// Send queued frames and pings until the queue closes or a write fails
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Message>,
    write_timeout: Duration,
    ping_interval: Option<Duration>,
) {
    let mut ping = tokio::time::interval(ping_interval.unwrap_or(Duration::from_secs(3600)));
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ping.tick().await;

    loop {
        let message = tokio::select! {
            next = outbound.recv() => match next {
                Some(message) => message,
                None => break,
            },
            _ = ping.tick(), if ping_interval.is_some() => Message::Ping(Vec::new().into()),
        };

        let closing = matches!(message, Message::Close(_));
        match tokio::time::timeout(write_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::debug!("[Realtime] Socket write failed: {}", err);
                break;
            }
            Err(_) => {
                tracing::warn!("[Realtime] Socket write timed out after {:?}", write_timeout);
                break;
            }
        }
        if closing {
            break;
        }
    }
}

/// Push undelivered direct messages before the connection goes live
///
/// # Returns
/// Ids of every backlog message read, queued or not
async fn replay_backlog(state: &AppState, connection: &Arc<Connection>) -> HashSet<i64> {
    let backlog = match chat::db::undelivered_for(&state.db, connection.nickname()).await {
        Ok(backlog) => backlog,
        Err(err) => {
            tracing::error!(
                "[Realtime] Failed to load backlog for {}: {}",
                connection.nickname(),
                err
            );
            return HashSet::new();
        }
    };
    let seen: HashSet<i64> = backlog.iter().map(|message| message.id).collect();
    if backlog.is_empty() {
        return seen;
    }

    let mut delivered = Vec::with_capacity(backlog.len());
    for message in &backlog {
        let frame = ServerFrame::Chat(message.to_chat_message());
        if !state.delivery.deliver_to_connection(connection, &frame).await {
            break;
        }
        delivered.push(message.id);
    }

    match chat::db::mark_delivered(&state.db, &delivered).await {
        Ok(count) => tracing::info!(
            "[Realtime] Replayed {} of {} backlog messages to {}",
            count,
            backlog.len(),
            connection.nickname()
        ),
        Err(err) => tracing::warn!(
            "[Realtime] Failed to mark backlog delivered for {}: {}",
            connection.nickname(),
            err
        ),
    }
    seen
}

/// Push messages stored after `replay_backlog` read the backlog
///
/// Once registered, the connection also receives live chats, so every
/// message is claimed before it is queued. Ids in `skip` were already
/// handled by the first pass.
///
/// # Returns
/// Number of messages queued
async fn replay_late_backlog(state: &AppState, connection: &Arc<Connection>, skip: &HashSet<i64>) -> usize {
    let backlog = match chat::db::undelivered_for(&state.db, connection.nickname()).await {
        Ok(backlog) => backlog,
        Err(err) => {
            tracing::error!(
                "[Realtime] Failed to reload backlog for {}: {}",
                connection.nickname(),
                err
            );
            return 0;
        }
    };

    let mut queued = 0;
    for message in backlog.iter().filter(|message| !skip.contains(&message.id)) {
        match chat::db::claim_undelivered(&state.db, message.id).await {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => {
                tracing::warn!("[Realtime] Failed to claim message {}: {}", message.id, err);
                break;
            }
        }
        let frame = ServerFrame::Chat(message.to_chat_message());
        if !state.delivery.deliver_to_connection(connection, &frame).await {
            if let Err(err) = chat::db::release_claim(&state.db, message.id).await {
                tracing::warn!("[Realtime] Failed to release message {}: {}", message.id, err);
            }
            break;
        }
        queued += 1;
    }

    if queued > 0 {
        tracing::info!(
            "[Realtime] Replayed {} late backlog messages to {}",
            queued,
            connection.nickname()
        );
    }
    queued
}
