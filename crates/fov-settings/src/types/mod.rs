//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a settings
//! file may be partial. Missing fields keep their compiled default.

mod server;
mod stream;

pub use server::*;
pub use stream::*;

use fov_core::{GridBounds, MAX_GRID_AXIS};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// Example settings file:
///
/// ```json
/// {
///   "server": { "publicHost": "stream.example.com" },
///   "stream": { "venue": "Croke Park" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FovSettings {
    /// Listener and public address settings.
    pub server: ServerSettings,
    /// The advertised stream and its cadence.
    pub stream: StreamSettings,
    /// Liveness probing.
    pub keepalive: KeepaliveSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl FovSettings {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        let fps = self.stream.fps;
        if !(1..=MAX_FPS).contains(&fps) {
            return Err(SettingsError::Fps(fps));
        }
        let GridBounds { max_x, max_y } = self.stream.grid;
        let axis = 1..=MAX_GRID_AXIS;
        if !axis.contains(&max_x) || !axis.contains(&max_y) {
            return Err(SettingsError::Grid { max_x, max_y });
        }
        let KeepaliveSettings {
            interval_secs,
            timeout_secs,
        } = self.keepalive;
        if interval_secs == 0 || timeout_secs < interval_secs {
            return Err(SettingsError::Keepalive {
                interval_secs,
                timeout_secs,
            });
        }
        if self.server.public_host.trim().is_empty() {
            return Err(SettingsError::BlankPublicHost);
        }
        Ok(())
    }
}
