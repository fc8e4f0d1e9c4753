//! Server configuration.

use std::time::Duration;

use fov_settings::FovSettings;

/// Listener configuration for the two servers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Streaming listener port (`0` to auto-assign).
    pub stream_port: u16,
    /// HTTP listener port (`0` to auto-assign).
    pub http_port: u16,
    /// Per-session cadence.
    pub timing: SessionTiming,
}

impl ServerConfig {
    /// Derive listener configuration from resolved settings.
    pub fn from_settings(settings: &FovSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            stream_port: settings.server.stream_port,
            http_port: settings.server.http_port,
            timing: SessionTiming {
                send_interval: settings.stream.send_interval(),
                keepalive_interval: settings.keepalive.interval(),
                keepalive_timeout: settings.keepalive.timeout(),
            },
        }
    }

    /// Bind address of the streaming listener.
    pub fn stream_addr(&self) -> String {
        format!("{}:{}", self.host, self.stream_port)
    }

    /// Bind address of the HTTP listener.
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_settings(&FovSettings::default())
    }
}

/// Timers driving a single streaming session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionTiming {
    /// Delay between position frames.
    pub send_interval: Duration,
    /// Delay between keepalive probes.
    pub keepalive_interval: Duration,
    /// How long a connection may go without answering probes.
    pub keepalive_timeout: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            send_interval: Duration::from_millis(200),
            keepalive_interval: Duration::from_secs(20),
            keepalive_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.stream_port, 8765);
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.host, "0.0.0.0");
    }

    #[test]
    fn default_timing_matches_settings() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.timing, SessionTiming::default());
    }

    #[test]
    fn addresses() {
        let cfg = ServerConfig {
            host: "127.0.0.1".into(),
            stream_port: 1,
            http_port: 2,
            timing: SessionTiming::default(),
        };
        assert_eq!(cfg.stream_addr(), "127.0.0.1:1");
        assert_eq!(cfg.http_addr(), "127.0.0.1:2");
    }

    #[test]
    fn timing_follows_settings() {
        let mut settings = FovSettings::default();
        settings.stream.fps = 10;
        settings.keepalive.interval_secs = 5;
        settings.keepalive.timeout_secs = 15;
        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.timing.send_interval, Duration::from_millis(100));
        assert_eq!(cfg.timing.keepalive_interval, Duration::from_secs(5));
        assert_eq!(cfg.timing.keepalive_timeout, Duration::from_secs(15));
    }
}
