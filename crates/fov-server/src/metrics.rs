//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Fails if a global recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// Streaming sessions opened total (counter).
pub const STREAM_SESSIONS_TOTAL: &str = "stream_sessions_total";
/// Active streaming sessions (gauge).
pub const STREAM_SESSIONS_ACTIVE: &str = "stream_sessions_active";
/// Position frames delivered total (counter).
pub const STREAM_FRAMES_SENT_TOTAL: &str = "stream_frames_sent_total";
/// Keepalive probes delivered total (counter).
pub const STREAM_KEEPALIVE_PROBES_TOTAL: &str = "stream_keepalive_probes_total";
/// Streaming session duration seconds (histogram).
pub const STREAM_SESSION_DURATION_SECONDS: &str = "stream_session_duration_seconds";
/// Directory document requests total (counter).
pub const DIRECTORY_REQUESTS_TOTAL: &str = "directory_requests_total";
