//! Server error types.

use std::io;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Outcome of a failed frame or probe send.
///
/// Both variants end the session; they differ only in how they are logged.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The peer is gone or the connection was already shut.
    #[error("connection closed")]
    Closed,
    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl SendError {
    /// Classify an error returned by an axum `WebSocket` sink.
    pub fn from_ws(err: axum::Error) -> Self {
        let inner = err.into_inner();
        match inner.downcast_ref::<tungstenite::Error>() {
            Some(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Self::Closed
            }
            Some(tungstenite::Error::Io(io_err)) if is_disconnect(io_err.kind()) => Self::Closed,
            Some(other) => Self::Transport(other.to_string()),
            None => Self::Transport(inner.to_string()),
        }
    }
}

fn is_disconnect(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected
    )
}

/// Fatal server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A listener could not be bound. There is no partial-service mode.
    #[error("failed to bind {listener} listener on {addr}: {source}")]
    Bind {
        /// Which listener (`"stream"` or `"http"`).
        listener: &'static str,
        /// Requested address.
        addr: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Any other I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}
