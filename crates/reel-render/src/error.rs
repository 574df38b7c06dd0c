//! Render pipeline error types.

use thiserror::Error;

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that abort a render job.
///
/// Degraded conditions (overlay download or blend failure) never appear
/// here; they are handled at the chunk boundary and logged.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid request: {0}")]
    Request(#[from] reel_models::render::RequestError),

    #[error("{0}")]
    Media(#[from] reel_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] reel_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Message forwarded to the caller's `error` event.
    ///
    /// FFmpeg's own stderr tail is appended when available; the error event
    /// carries the underlying tool's text largely verbatim.
    pub fn caller_message(&self) -> String {
        match self {
            RenderError::Media(e) => match e.stderr() {
                Some(stderr) => format!("{}: {}", e, stderr),
                None => e.to_string(),
            },
            other => other.to_string(),
        }
    }
}
