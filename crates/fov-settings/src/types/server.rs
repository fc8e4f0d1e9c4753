//! Listener, keepalive, and logging settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Network settings for both listeners.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address shared by both listeners.
    pub host: String,
    /// Port of the streaming (WebSocket) listener.
    pub stream_port: u16,
    /// Port of the HTTP listener (status page + directory).
    pub http_port: u16,
    /// Hostname advertised in stream URLs.
    pub public_host: String,
    /// URL scheme advertised in stream URLs.
    pub public_scheme: String,
}

impl ServerSettings {
    /// The connection URL advertised to clients.
    pub fn public_stream_url(&self) -> String {
        format!("{}://{}/", self.public_scheme, self.public_host)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            stream_port: 8765,
            http_port: 8080,
            public_host: "stream.fov.ie".to_string(),
            public_scheme: "wss".to_string(),
        }
    }
}

/// Liveness probe settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeepaliveSettings {
    /// Seconds between probes.
    pub interval_secs: u64,
    /// Seconds without any pong before a connection is declared dead.
    pub timeout_secs: u64,
}

impl KeepaliveSettings {
    /// Probe period.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Unanswered-probe deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for KeepaliveSettings {
    fn default() -> Self {
        Self {
            interval_secs: 20,
            timeout_secs: 60,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
