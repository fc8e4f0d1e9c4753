//! Why a settings file or value was rejected.

use std::path::PathBuf;

use fov_core::MAX_GRID_AXIS;
use thiserror::Error;

use crate::types::MAX_FPS;

/// Settings loading and validation failures. All of them stop startup.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid JSON or does not match the schema.
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Frame rate outside `1..=MAX_FPS`.
    #[error("stream.fps must be between 1 and {MAX_FPS}, got {0}")]
    Fps(u32),
    /// Grid axis of zero or larger than [`MAX_GRID_AXIS`].
    #[error("stream.grid must be between 1x1 and {MAX_GRID_AXIS}x{MAX_GRID_AXIS}, got {max_x}x{max_y}")]
    Grid {
        /// Configured horizontal bound.
        max_x: u32,
        /// Configured vertical bound.
        max_y: u32,
    },
    /// Zero probe interval, or a timeout shorter than one interval.
    #[error(
        "keepalive needs intervalSecs >= 1 and timeoutSecs >= intervalSecs, got {interval_secs}s / {timeout_secs}s"
    )]
    Keepalive {
        /// Configured probe interval.
        interval_secs: u64,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// The advertised host is empty, so no stream URL can be built.
    #[error("server.publicHost must not be blank")]
    BlankPublicHost,
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
