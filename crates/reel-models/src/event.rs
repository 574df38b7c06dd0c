//! Caller-facing progress event protocol.
//!
//! Every render job produces a stream of these events, terminated by exactly
//! one `complete` or one `error`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Event envelope streamed to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderEvent {
    /// Advisory progress update (0-100, monotonically non-decreasing)
    Progress {
        stage: String,
        percent: u8,
        message: String,
    },

    /// The job finished and the artifact is publicly reachable
    Complete {
        #[serde(rename = "videoUrl")]
        video_url: String,
        /// Final artifact size in bytes
        size: u64,
        message: String,
    },

    /// The job failed; no artifact was produced
    Error { error: String },
}

impl RenderEvent {
    /// Create a progress event.
    pub fn progress(stage: Stage, percent: u8, message: impl Into<String>) -> Self {
        RenderEvent::Progress {
            stage: stage.as_str().to_string(),
            percent: percent.min(100),
            message: message.into(),
        }
    }

    /// Create a completion event.
    pub fn complete(video_url: impl Into<String>, size: u64) -> Self {
        RenderEvent::Complete {
            video_url: video_url.into(),
            size,
            message: "Render complete".to_string(),
        }
    }

    /// Create an error event.
    pub fn error(message: impl Into<String>) -> Self {
        RenderEvent::Error {
            error: message.into(),
        }
    }

    /// Whether this event terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderEvent::Complete { .. } | RenderEvent::Error { .. })
    }

    /// The percentage carried by this event, if any.
    pub fn percent(&self) -> Option<u8> {
        match self {
            RenderEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_serialization() {
        let ev = RenderEvent::progress(Stage::Rendering, 45, "chunk 3/8");
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"progress\""));
        assert!(json.contains("\"stage\":\"rendering\""));
        assert!(json.contains("\"percent\":45"));
    }

    #[test]
    fn test_complete_serialization_uses_camel_case_url() {
        let ev = RenderEvent::complete("https://cdn.example.com/final.mp4", 1024);
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"complete\""));
        assert!(json.contains("\"videoUrl\":\"https://cdn.example.com/final.mp4\""));
        assert!(json.contains("\"size\":1024"));
    }

    #[test]
    fn test_error_is_terminal() {
        assert!(RenderEvent::error("boom").is_terminal());
        assert!(RenderEvent::complete("u", 0).is_terminal());
        assert!(!RenderEvent::progress(Stage::Muxing, 77, "").is_terminal());
    }

    #[test]
    fn test_progress_clamps_percent() {
        let ev = RenderEvent::progress(Stage::Uploading, 150, "");
        assert_eq!(ev.percent(), Some(100));
    }
}
