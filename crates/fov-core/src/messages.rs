//! Frames sent over the streaming socket.
//!
//! A session sends exactly one [`HelloMessage`] and then an unbounded run of
//! [`PositionMessage`]s. Both serialize to flat JSON objects tagged by `type`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::grid::{GridBounds, Point};

/// Version of the hello/pos frame protocol.
pub const PROTOCOL_VERSION: u32 = 1;

/// First frame on every session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "hello")]
pub struct HelloMessage {
    /// Protocol version, always [`PROTOCOL_VERSION`] when produced here.
    pub version: u32,
    /// Stream name.
    pub name: String,
    /// Sport being tracked.
    pub sport: String,
    /// Coordinate space of subsequent `pos` frames.
    pub grid: GridBounds,
    /// Target frames per second.
    pub fps: u32,
}

impl HelloMessage {
    /// Build a hello frame for the current protocol version.
    pub fn new(name: impl Into<String>, sport: impl Into<String>, grid: GridBounds, fps: u32) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            name: name.into(),
            sport: sport.into(),
            grid,
            fps,
        }
    }
}

/// One position sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "pos")]
pub struct PositionMessage {
    /// Horizontal coordinate.
    pub x: u32,
    /// Vertical coordinate.
    pub y: u32,
    /// Send time in seconds since the Unix epoch.
    pub t: f64,
}

impl PositionMessage {
    /// A frame for `point` stamped with an explicit time.
    pub fn at(point: Point, t: f64) -> Self {
        Self {
            x: point.x,
            y: point.y,
            t,
        }
    }

    /// A frame for `point` stamped with the current wall-clock time.
    pub fn now(point: Point) -> Self {
        Self::at(point, epoch_seconds(SystemTime::now()))
    }

    /// The sampled point.
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Seconds since the Unix epoch with microsecond resolution.
///
/// Times before the epoch map to `0.0`.
pub fn epoch_seconds(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as f64 / 1_000_000.0)
        .unwrap_or_default()
}
