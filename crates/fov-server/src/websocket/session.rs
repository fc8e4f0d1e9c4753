//! Streaming session lifecycle: one connected client from upgrade through
//! disconnect.

use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chrono::{DateTime, Utc};
use fov_core::{HelloMessage, PositionMessage, Trajectory};
use futures::{Stream, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, info, instrument, trace, warn};

use super::connection::{CloseReason, StreamConnection};
use super::keepalive::{KeepaliveOutcome, run_keepalive};
use super::registry::SessionRegistry;
use crate::config::SessionTiming;
use crate::metrics::{
    STREAM_FRAMES_SENT_TOTAL, STREAM_SESSION_DURATION_SECONDS, STREAM_SESSIONS_ACTIVE,
    STREAM_SESSIONS_TOTAL,
};

/// Upper bound on flushing a close frame to a stalled peer.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle stage of a [`Session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, nothing sent yet.
    Connecting,
    /// Sending the hello frame.
    Greeting,
    /// Broadcast loop and keepalive running.
    Streaming,
    /// Keepalive stopped, connection being closed.
    Closing,
    /// Connection released.
    Terminated,
}

/// What a finished session did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    /// Text frames delivered, hello included.
    pub frames_sent: u64,
    /// Trajectory cursor when the session ended; equals the number of
    /// position frames delivered.
    pub cursor: u64,
    /// Why the session ended.
    pub reason: CloseReason,
    /// Time from start of [`Session::run`] to teardown.
    pub duration: Duration,
}

/// Per-connection streaming state.
pub struct Session {
    connection: Arc<StreamConnection>,
    trajectory: Arc<Trajectory>,
    hello: HelloMessage,
    timing: SessionTiming,
    cursor: u64,
    state: SessionState,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session over an accepted connection.
    pub fn new(
        connection: Arc<StreamConnection>,
        trajectory: Arc<Trajectory>,
        hello: HelloMessage,
        timing: SessionTiming,
    ) -> Self {
        Self {
            connection,
            trajectory,
            hello,
            timing,
            cursor: 0,
            state: SessionState::Connecting,
            created_at: Utc::now(),
        }
    }

    /// Current lifecycle stage.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// When the session was accepted.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Drive the session to completion.
    ///
    /// `inbound` is the read half of the connection. It is drained on a
    /// separate task: any frame counts as liveness, and a close frame, read
    /// error or end of stream ends the session.
    pub async fn run<S, E>(mut self, inbound: S) -> SessionSummary
    where
        S: Stream<Item = Result<Message, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
    {
        let started = Instant::now();
        let reader = tokio::spawn(drain_inbound(Arc::clone(&self.connection), inbound));

        self.transition(SessionState::Greeting);
        match self.connection.send_json(&self.hello).await {
            Ok(()) => {
                self.transition(SessionState::Streaming);
                let keepalive = self.spawn_keepalive();
                self.stream_positions().await;
                self.transition(SessionState::Closing);
                if keepalive.await.is_err() {
                    warn!("keepalive task panicked");
                }
            }
            Err(e) => {
                debug!(error = %e, "hello send failed");
                self.fail(CloseReason::HandshakeFailed(e));
                self.transition(SessionState::Closing);
            }
        }

        // Wakes the reader when the session ended without a recorded reason.
        self.connection.token().cancel();
        if time::timeout(CLOSE_TIMEOUT, self.connection.close_sink())
            .await
            .is_err()
        {
            debug!("close frame not flushed before timeout");
        }
        if reader.await.is_err() {
            warn!("inbound reader panicked");
        }
        self.transition(SessionState::Terminated);

        SessionSummary {
            frames_sent: self.connection.frames_sent(),
            cursor: self.cursor,
            reason: self
                .connection
                .close_reason()
                .unwrap_or(CloseReason::Shutdown),
            duration: started.elapsed(),
        }
    }

    async fn stream_positions(&mut self) {
        let cancel = self.connection.token();
        loop {
            let point = self.trajectory.point_at(self.cursor);
            let frame = PositionMessage::now(point);
            let sent = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                sent = self.connection.send_json(&frame) => sent,
            };
            if let Err(e) = sent {
                self.fail(CloseReason::SendFailed(e));
                return;
            }
            trace!(cursor = self.cursor, x = point.x, y = point.y, "position sent");
            counter!(STREAM_FRAMES_SENT_TOTAL).increment(1);
            self.cursor += 1;

            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = time::sleep(self.timing.send_interval) => {}
            }
        }
    }

    fn spawn_keepalive(&self) -> JoinHandle<()> {
        let connection = Arc::clone(&self.connection);
        let cancel = connection.token().child_token();
        let SessionTiming {
            keepalive_interval,
            keepalive_timeout,
            ..
        } = self.timing;
        tokio::spawn(async move {
            let outcome = run_keepalive(
                Arc::clone(&connection),
                keepalive_interval,
                keepalive_timeout,
                cancel,
            )
            .await;
            let reason = match outcome {
                KeepaliveOutcome::Cancelled => return,
                KeepaliveOutcome::ProbeFailed(e) => CloseReason::ProbeFailed(e),
                KeepaliveOutcome::TimedOut => CloseReason::KeepaliveTimeout,
            };
            if connection.terminate(reason.clone()) {
                info!(%reason, last_pong_secs = connection.last_pong_elapsed().as_secs(), "keepalive ended session");
            }
        })
    }

    /// Record a failure unless the session is already ending.
    fn fail(&self, reason: CloseReason) {
        if self.connection.is_terminated() {
            return;
        }
        debug!(%reason, cursor = self.cursor, "session failed");
        let _ = self.connection.terminate(reason);
    }

    fn transition(&mut self, next: SessionState) {
        trace!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}

async fn drain_inbound<S, E>(connection: Arc<StreamConnection>, mut inbound: S)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let cancel = connection.token();
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            next = inbound.next() => next,
        };
        match next {
            Some(Ok(Message::Close(frame))) => {
                debug!(?frame, "peer sent close");
                let _ = connection.terminate(CloseReason::PeerClosed);
                return;
            }
            None => {
                let _ = connection.terminate(CloseReason::PeerClosed);
                return;
            }
            Some(Ok(message)) => {
                connection.mark_alive();
                match message {
                    Message::Pong(_) => trace!("pong"),
                    Message::Text(_) | Message::Binary(_) => debug!("ignoring inbound data frame"),
                    Message::Ping(_) | Message::Close(_) => {}
                }
            }
            Some(Err(e)) => {
                let _ = connection.terminate(CloseReason::ReadError(e.to_string()));
                return;
            }
        }
    }
}

/// Shared state handed to every streaming session.
pub struct SessionContext {
    /// The path every session replays.
    pub trajectory: Arc<Trajectory>,
    /// Hello frame sent on connect.
    pub hello: HelloMessage,
    /// Cadence of position frames and probes.
    pub timing: SessionTiming,
    /// Live session tracking.
    pub registry: Arc<SessionRegistry>,
    /// Server-wide shutdown token; each session runs on a child of it.
    pub shutdown: CancellationToken,
}

/// Generate a new session ID.
pub fn new_session_id() -> String {
    format!("sess_{}", uuid::Uuid::now_v7())
}

/// Run a streaming session over an upgraded axum `WebSocket`.
#[instrument(skip_all, fields(session_id = tracing::field::Empty, remote = ?remote))]
pub async fn run_ws_session(
    socket: WebSocket,
    remote: Option<SocketAddr>,
    ctx: Arc<SessionContext>,
) -> SessionSummary {
    let session_id = new_session_id();
    let _ = Span::current().record("session_id", session_id.as_str());

    let (sink, stream) = socket.split();
    let connection = Arc::new(StreamConnection::new(
        session_id.clone(),
        remote,
        Box::new(sink),
        ctx.shutdown.child_token(),
    ));
    ctx.registry.add(Arc::clone(&connection)).await;

    info!("client connected");
    counter!(STREAM_SESSIONS_TOTAL).increment(1);
    gauge!(STREAM_SESSIONS_ACTIVE).increment(1.0);

    let session = Session::new(
        Arc::clone(&connection),
        Arc::clone(&ctx.trajectory),
        ctx.hello.clone(),
        ctx.timing,
    );
    let summary = session.run(stream).await;

    let _ = ctx.registry.remove(&session_id).await;
    gauge!(STREAM_SESSIONS_ACTIVE).decrement(1.0);
    histogram!(STREAM_SESSION_DURATION_SECONDS).record(summary.duration.as_secs_f64());
    info!(
        reason = %summary.reason,
        frames_sent = summary.frames_sent,
        cursor = summary.cursor,
        duration_ms = summary.duration.as_millis() as u64,
        "client disconnected"
    );
    summary
}
