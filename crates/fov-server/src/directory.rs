//! `/api/streams.json` stream directory.

use axum::Json;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use fov_core::GridBounds;
use fov_settings::FovSettings;
use serde::{Deserialize, Serialize};

/// Path the directory is served on.
pub const DIRECTORY_PATH: &str = "/api/streams.json";

/// Cache policy for directory responses.
pub const CACHE_CONTROL_VALUE: &str = "public, max-age=5, stale-while-revalidate=30";

/// One advertised stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDirectoryEntry {
    /// Stable stream identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Connection URL.
    pub url: String,
    /// Status string, e.g. `"live"`.
    pub status: String,
    /// Sport being tracked.
    pub sport: String,
    /// Venue name.
    pub venue: String,
    /// Position frames per second.
    pub fps: u32,
    /// Coordinate grid of the stream.
    pub grid: GridBounds,
}

/// Body of a directory response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryDocument {
    /// Generation time, UTC, second precision.
    pub updated_at: String,
    /// Advertised streams. Never empty.
    pub streams: Vec<StreamDirectoryEntry>,
}

/// Static directory built from settings at startup.
#[derive(Clone, Debug)]
pub struct StreamDirectory {
    stream_url: String,
    entries: Vec<StreamDirectoryEntry>,
}

impl StreamDirectory {
    /// Build the single-entry directory from resolved settings.
    pub fn from_settings(settings: &FovSettings) -> Self {
        let stream_url = settings.server.public_stream_url();
        let stream = &settings.stream;
        let entry = StreamDirectoryEntry {
            id: stream.id.clone(),
            title: stream.title.clone(),
            url: stream_url.clone(),
            status: stream.status.clone(),
            sport: stream.sport.clone(),
            venue: stream.venue.clone(),
            fps: stream.fps,
            grid: stream.grid,
        };
        Self {
            stream_url,
            entries: vec![entry],
        }
    }

    /// Public connection URL of the stream.
    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    /// Advertised entries.
    pub fn entries(&self) -> &[StreamDirectoryEntry] {
        &self.entries
    }

    /// Directory document stamped with `now`.
    pub fn snapshot(&self, now: DateTime<Utc>) -> DirectoryDocument {
        DirectoryDocument {
            updated_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            streams: self.entries.clone(),
        }
    }

    /// HTTP response for the current time, with cache and CORS headers.
    pub fn response(&self, now: DateTime<Utc>) -> Response {
        (
            [
                (header::CACHE_CONTROL, CACHE_CONTROL_VALUE),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            ],
            Json(self.snapshot(now)),
        )
            .into_response()
    }
}
