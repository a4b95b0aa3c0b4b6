/**
 * Live Connection Handle
 *
 * A `Connection` is the server's handle on one authenticated WebSocket. It
 * never touches the socket directly: frames are pushed into a bounded queue
 * that the connection's writer task drains. Holding an `Arc<Connection>` is
 * enough to deliver to it or to ask its socket task to shut down.
 *
 * Each connection gets a process-unique `ConnectionId`, so a superseded
 * connection can be told apart from its replacement even though both carry
 * the same user id and nickname.
 */
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};

use crate::shared::UserId;

/// Process-unique connection id
pub type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Why a frame could not be handed to a connection
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The writer task is gone
    #[error("connection closed")]
    Closed,
    /// The outbound queue stayed full for the whole write timeout
    #[error("outbound queue full past write timeout")]
    TimedOut,
}

/// Handle on a single authenticated WebSocket
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    nickname: String,
    outbound: mpsc::Sender<Message>,
    shutdown: Notify,
}

impl Connection {
    /// Create a handle feeding `outbound`
    ///
    /// # Arguments
    /// * `user_id` - Authenticated user
    /// * `nickname` - The user's nickname, resolved at upgrade time
    /// * `outbound` - Sender half of the queue drained by the writer task
    pub fn new(user_id: UserId, nickname: impl Into<String>, outbound: mpsc::Sender<Message>) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            user_id,
            nickname: nickname.into(),
            outbound,
            shutdown: Notify::new(),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Queue a frame for the writer task
    ///
    /// Waits at most `timeout` for room in the queue.
    pub async fn send(&self, message: Message, timeout: Duration) -> Result<(), SendError> {
        self.outbound
            .send_timeout(message, timeout)
            .await
            .map_err(|err| match err {
                mpsc::error::SendTimeoutError::Timeout(_) => SendError::TimedOut,
                mpsc::error::SendTimeoutError::Closed(_) => SendError::Closed,
            })
    }

    /// Queue a frame without waiting; fails if the queue is full
    pub fn try_send(&self, message: Message) -> Result<(), SendError> {
        self.outbound.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SendError::TimedOut,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Ask the socket task to shut down
    ///
    /// The request is remembered if the task is not currently waiting.
    pub fn close(&self) {
        self.shutdown.notify_one();
    }

    /// Resolves once `close` has been called
    pub async fn closed(&self) {
        self.shutdown.notified().await;
    }

    /// Whether the writer task has dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}
