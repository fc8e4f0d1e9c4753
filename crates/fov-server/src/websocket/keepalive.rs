//! Keepalive probing for streaming sessions.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::connection::StreamConnection;
use crate::errors::SendError;
use crate::metrics::STREAM_KEEPALIVE_PROBES_TOTAL;

/// Outcome of the keepalive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeepaliveOutcome {
    /// The session ended for another reason.
    Cancelled,
    /// A probe could not be delivered.
    ProbeFailed(SendError),
    /// The client stopped answering probes.
    TimedOut,
}

/// Probe `connection` every `interval` until cancelled or the client is dead.
///
/// No probe is sent at time zero. At each tick the alive flag is checked and
/// reset; `timeout / interval` consecutive silent ticks (at least one) end the
/// loop with [`KeepaliveOutcome::TimedOut`]. A probe that cannot be sent ends
/// it with [`KeepaliveOutcome::ProbeFailed`].
pub async fn run_keepalive(
    connection: Arc<StreamConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> KeepaliveOutcome {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let interval_ms = interval.as_millis().max(1);
    let max_missed = (timeout.as_millis() / interval_ms).max(1);
    let mut missed: u128 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return KeepaliveOutcome::Cancelled,
            _ = ticker.tick() => {}
        }

        if connection.check_alive() {
            missed = 0;
        } else {
            missed += 1;
            debug!(missed, max_missed, "keepalive probe unanswered");
            if missed >= max_missed {
                return KeepaliveOutcome::TimedOut;
            }
        }

        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => return KeepaliveOutcome::Cancelled,
            sent = connection.ping() => sent,
        };
        if let Err(e) = sent {
            if cancel.is_cancelled() {
                return KeepaliveOutcome::Cancelled;
            }
            return KeepaliveOutcome::ProbeFailed(e);
        }
        counter!(STREAM_KEEPALIVE_PROBES_TOTAL).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::super::connection::test_support::{Frame, RecordingSink, connection};
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(20);
    const TIMEOUT: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_first_probe() {
        let (sink, mut rx) = RecordingSink::new();
        let conn = connection(sink);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = run_keepalive(conn.clone(), INTERVAL, TIMEOUT, cancel).await;
        assert_eq!(outcome, KeepaliveOutcome::Cancelled);
        assert_eq!(conn.probes_sent(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_client_times_out_after_three_probes() {
        let (sink, _rx) = RecordingSink::new();
        let conn = connection(sink);
        let start = Instant::now();

        let outcome = run_keepalive(conn.clone(), INTERVAL, TIMEOUT, CancellationToken::new()).await;
        assert_eq!(outcome, KeepaliveOutcome::TimedOut);
        // Probes at 20s, 40s, 60s; the fourth tick finds three misses.
        assert_eq!(conn.probes_sent(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(80));
    }

    #[tokio::test(start_paused = true)]
    async fn answering_client_stays_alive() {
        let (sink, mut rx) = RecordingSink::new();
        let conn = connection(sink);
        let cancel = CancellationToken::new();

        let weak = Arc::downgrade(&conn);
        let responder = tokio::spawn(async move {
            let mut probes = 0;
            while let Some(frame) = rx.recv().await {
                if frame == Frame::Ping {
                    probes += 1;
                    if let Some(conn) = weak.upgrade() {
                        conn.mark_alive();
                    }
                }
            }
            probes
        });

        let task = tokio::spawn(run_keepalive(conn.clone(), INTERVAL, TIMEOUT, cancel.clone()));
        time::sleep(Duration::from_secs(310)).await;
        assert!(!task.is_finished());

        cancel.cancel();
        assert_eq!(task.await.unwrap(), KeepaliveOutcome::Cancelled);
        assert_eq!(conn.probes_sent(), 15);

        drop(conn);
        assert_eq!(responder.await.unwrap(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_ends_loop() {
        let (sink, _rx) = RecordingSink::new();
        let conn = connection(sink.fail_pings());

        let outcome = run_keepalive(conn, INTERVAL, TIMEOUT, CancellationToken::new()).await;
        assert_eq!(outcome, KeepaliveOutcome::ProbeFailed(SendError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_shorter_than_interval_allows_one_miss() {
        let (sink, _rx) = RecordingSink::new();
        let conn = connection(sink);
        let start = Instant::now();

        let outcome = run_keepalive(
            conn,
            Duration::from_secs(10),
            Duration::from_secs(5),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(outcome, KeepaliveOutcome::TimedOut);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }
}
