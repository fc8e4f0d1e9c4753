//! # fov-server
//!
//! Axum HTTP + `WebSocket` server for the figure-8 position stream.
//!
//! - Streaming listener: one [`websocket::session::Session`] per connection,
//!   a `hello` frame then `pos` frames at a fixed cadence
//! - Keepalive: per-session Ping probes, cancelled with the session
//! - HTTP listener: status page, `/api/streams.json` directory, health, metrics
//! - Shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod directory;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod status;
pub mod websocket;

pub use config::{ServerConfig, SessionTiming};
pub use errors::{SendError, ServerError};
pub use server::{FovServer, ListenHandle};
