//! Graceful shutdown coordination via `CancellationToken`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long the WebSocket and HTTP listeners get to wind down.
pub const LISTENER_GRACE: Duration = Duration::from_secs(10);

/// Coordinates shutdown of both listeners and every streaming session.
///
/// Sessions run on child tokens, so one cancellation reaches all of them.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Get a clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel every session and both listeners, then give the listener
    /// tasks `grace` to return.
    ///
    /// Returns `false` when a listener was still running at the deadline.
    pub async fn stop_listeners(&self, listeners: Vec<JoinHandle<()>>, grace: Duration) -> bool {
        self.shutdown();
        debug!(listeners = listeners.len(), grace_ms = grace.as_millis() as u64, "stopping listeners");

        match tokio::time::timeout(grace, futures::future::join_all(listeners)).await {
            Ok(results) => {
                for err in results.into_iter().filter_map(Result::err) {
                    warn!(error = %err, "listener task failed");
                }
                true
            }
            Err(_) => {
                warn!(?grace, "listeners still running at deadline");
                false
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                let _ = sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c"),
        () = terminate => info!("received SIGTERM"),
    }
}
