//! Streaming connection state shared by a session's broadcast loop,
//! keepalive monitor, and inbound reader.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::SinkExt;
use futures::stream::SplitSink;
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::errors::SendError;

/// Write half of a streaming connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), SendError>;
    /// Send a liveness probe.
    async fn send_ping(&mut self) -> Result<(), SendError>;
    /// Close the write half. Errors are ignored.
    async fn close(&mut self);
}

#[async_trait]
impl FrameSink for SplitSink<WebSocket, Message> {
    async fn send_text(&mut self, text: String) -> Result<(), SendError> {
        self.send(Message::Text(text.into()))
            .await
            .map_err(SendError::from_ws)
    }

    async fn send_ping(&mut self) -> Result<(), SendError> {
        self.send(Message::Ping(Vec::new().into()))
            .await
            .map_err(SendError::from_ws)
    }

    async fn close(&mut self) {
        let _ = SinkExt::close(self).await;
    }
}

/// Why a session ended. The first reason recorded wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The hello frame could not be delivered.
    HandshakeFailed(SendError),
    /// A position frame could not be delivered.
    SendFailed(SendError),
    /// A keepalive probe could not be delivered.
    ProbeFailed(SendError),
    /// The peer stopped answering probes.
    KeepaliveTimeout,
    /// The peer sent a close frame or its stream ended.
    PeerClosed,
    /// Reading from the peer failed.
    ReadError(String),
    /// The server is shutting down.
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HandshakeFailed(e) => write!(f, "handshake failed: {e}"),
            Self::SendFailed(e) => write!(f, "send failed: {e}"),
            Self::ProbeFailed(e) => write!(f, "keepalive probe failed: {e}"),
            Self::KeepaliveTimeout => f.write_str("keepalive timeout"),
            Self::PeerClosed => f.write_str("peer closed"),
            Self::ReadError(e) => write!(f, "read error: {e}"),
            Self::Shutdown => f.write_str("server shutdown"),
        }
    }
}

/// A connected streaming client.
///
/// Sends from the broadcast loop and the keepalive monitor go through one
/// async mutex, so frames never interleave on the wire.
pub struct StreamConnection {
    /// Unique session ID.
    pub id: String,
    /// Peer address, when known.
    pub remote: Option<SocketAddr>,
    sink: tokio::sync::Mutex<Box<dyn FrameSink>>,
    /// Set by inbound activity, cleared by each keepalive check.
    is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    frames_sent: AtomicU64,
    probes_sent: AtomicU64,
    cancel: CancellationToken,
    close_reason: Mutex<Option<CloseReason>>,
    sink_closed: AtomicBool,
}

impl StreamConnection {
    /// Wrap a sink. Cancelling `cancel` (or any parent of it) ends the session.
    pub fn new(
        id: String,
        remote: Option<SocketAddr>,
        sink: Box<dyn FrameSink>,
        cancel: CancellationToken,
    ) -> Self {
        let now = Instant::now();
        Self {
            id,
            remote,
            sink: tokio::sync::Mutex::new(sink),
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            frames_sent: AtomicU64::new(0),
            probes_sent: AtomicU64::new(0),
            cancel,
            close_reason: Mutex::new(None),
            sink_closed: AtomicBool::new(false),
        }
    }

    /// Serialize `value` as JSON and send it as one text frame.
    pub async fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), SendError> {
        let json = serde_json::to_string(value).map_err(|e| SendError::Transport(e.to_string()))?;
        self.send_text(json).await
    }

    /// Send a raw text frame.
    pub async fn send_text(&self, text: String) -> Result<(), SendError> {
        if self.is_terminated() {
            return Err(SendError::Closed);
        }
        self.sink.lock().await.send_text(text).await?;
        let _ = self.frames_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Send a keepalive probe.
    pub async fn ping(&self) -> Result<(), SendError> {
        if self.is_terminated() {
            return Err(SendError::Closed);
        }
        self.sink.lock().await.send_ping().await?;
        let _ = self.probes_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Record the reason and cancel the session.
    ///
    /// Returns `true` for the call that actually terminated the session;
    /// later calls keep the first reason and return `false`.
    pub fn terminate(&self, reason: CloseReason) -> bool {
        let first = {
            let mut slot = self.close_reason.lock();
            if slot.is_some() {
                false
            } else {
                *slot = Some(reason);
                true
            }
        };
        self.cancel.cancel();
        first
    }

    /// Whether the session has been cancelled, by [`terminate`](Self::terminate) or a parent token.
    pub fn is_terminated(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The recorded close reason. A cancelled token without a recorded
    /// reason means the server is shutting down.
    pub fn close_reason(&self) -> Option<CloseReason> {
        let recorded = self.close_reason.lock().clone();
        recorded.or_else(|| self.is_terminated().then_some(CloseReason::Shutdown))
    }

    /// Clone of the session's cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Close the write half. Only the first call touches the sink.
    pub async fn close_sink(&self) {
        if self.sink_closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.sink.lock().await.close().await;
    }

    /// Mark the connection as alive (pong or other inbound activity).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Check and reset the alive flag.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Text frames delivered so far, hello included.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Probes delivered so far.
    pub fn probes_sent(&self) -> u64 {
        self.probes_sent.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for StreamConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConnection")
            .field("id", &self.id)
            .field("remote", &self.remote)
            .field("terminated", &self.is_terminated())
            .finish_non_exhaustive()
    }
}
