//! Stream metadata and cadence.

use std::time::Duration;

use fov_core::GridBounds;
use serde::{Deserialize, Serialize};

/// Highest accepted frame rate.
pub const MAX_FPS: u32 = 60;

/// The single advertised stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamSettings {
    /// Directory identifier.
    pub id: String,
    /// Name sent in the hello frame.
    pub name: String,
    /// Human-readable title for the directory.
    pub title: String,
    /// Sport being tracked.
    pub sport: String,
    /// Venue shown in the directory.
    pub venue: String,
    /// Directory status string.
    pub status: String,
    /// Position frames per second.
    pub fps: u32,
    /// Coordinate grid.
    pub grid: GridBounds,
}

impl StreamSettings {
    /// Delay between two position frames.
    pub fn send_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            id: "fig8-demo".to_string(),
            name: "fig8-demo".to_string(),
            title: "Figure-8 Demo".to_string(),
            sport: "football".to_string(),
            venue: "Demo Pitch".to_string(),
            status: "live".to_string(),
            fps: 5,
            grid: GridBounds::default(),
        }
    }
}
