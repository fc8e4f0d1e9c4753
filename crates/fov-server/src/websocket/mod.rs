//! WebSocket connection handle, session lifecycle, keepalive, and session tracking.

pub mod connection;
pub mod keepalive;
pub mod registry;
pub mod session;
