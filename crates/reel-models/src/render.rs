//! Render job request and assembled timeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures for an inbound render request.
///
/// These are client errors: they are never retried and are reported to the
/// caller as a terminal error event before any scratch space is allocated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("projectId must not be empty")]
    EmptyProjectId,

    #[error("imageUrls must not be empty")]
    NoImages,

    #[error("imageTimings length ({timings}) does not match imageUrls length ({urls})")]
    TimingMismatch { urls: usize, timings: usize },

    #[error("audioUrl must not be empty")]
    EmptyAudioUrl,
}

/// Per-image display window, in seconds from the start of the video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageTiming {
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// Inbound render job request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    /// Project identifier; also keys the published artifact
    pub project_id: String,

    /// Voice-over audio asset
    pub audio_url: String,

    /// Ordered still-image assets
    pub image_urls: Vec<String>,

    /// Display window per image; must be the same length as `image_urls`
    pub image_timings: Vec<ImageTiming>,

    /// Subtitles in SRT form, carried through and optionally burned in
    #[serde(default)]
    pub srt_content: Option<String>,

    /// Human-readable title, used for logging only
    #[serde(default)]
    pub project_title: Option<String>,
}

impl RenderRequest {
    /// Validate the request shape.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.project_id.trim().is_empty() {
            return Err(RequestError::EmptyProjectId);
        }
        if self.audio_url.trim().is_empty() {
            return Err(RequestError::EmptyAudioUrl);
        }
        if self.image_urls.is_empty() {
            return Err(RequestError::NoImages);
        }
        if self.image_timings.len() != self.image_urls.len() {
            return Err(RequestError::TimingMismatch {
                urls: self.image_urls.len(),
                timings: self.image_timings.len(),
            });
        }
        Ok(())
    }

    /// Build the ordered timeline from a validated request.
    pub fn timeline(&self) -> Timeline {
        let images = self
            .image_urls
            .iter()
            .zip(self.image_timings.iter())
            .map(|(url, t)| ImageSegment {
                url: url.clone(),
                start_seconds: t.start_seconds,
                end_seconds: t.end_seconds,
            })
            .collect();

        Timeline {
            images,
            audio_url: self.audio_url.clone(),
            srt_content: self.srt_content.clone(),
        }
    }
}

/// One still image held on screen for a window of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageSegment {
    pub url: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl ImageSegment {
    /// Nominal display duration. May be zero or negative for degenerate
    /// timings; the partitioner floors it before it reaches an encoder.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// The ordered plan for the final video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Timeline {
    /// Non-empty, ordered by start time
    pub images: Vec<ImageSegment>,
    /// The audio track's duration is authoritative for the final length
    pub audio_url: String,
    /// Subtitles, if any
    pub srt_content: Option<String>,
}

impl Timeline {
    /// Nominal total duration: the last image's end time.
    ///
    /// Used for progress math only; the muxer's shortest-stream policy
    /// decides the real output duration.
    pub fn total_duration(&self) -> f64 {
        self.images.last().map(|s| s.end_seconds).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(urls: usize, timings: usize) -> RenderRequest {
        RenderRequest {
            project_id: "proj-1".to_string(),
            audio_url: "https://assets.example.com/voice.mp3".to_string(),
            image_urls: (0..urls).map(|i| format!("https://img/{i}.png")).collect(),
            image_timings: (0..timings)
                .map(|i| ImageTiming {
                    start_seconds: i as f64 * 2.0,
                    end_seconds: (i + 1) as f64 * 2.0,
                })
                .collect(),
            srt_content: None,
            project_title: None,
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request(3, 3).validate().is_ok());
    }

    #[test]
    fn test_timing_mismatch_rejected() {
        assert_eq!(
            request(3, 2).validate(),
            Err(RequestError::TimingMismatch { urls: 3, timings: 2 })
        );
    }

    #[test]
    fn test_empty_images_rejected() {
        assert_eq!(request(0, 0).validate(), Err(RequestError::NoImages));
    }

    #[test]
    fn test_empty_project_id_rejected() {
        let mut req = request(1, 1);
        req.project_id = "  ".to_string();
        assert_eq!(req.validate(), Err(RequestError::EmptyProjectId));
    }

    #[test]
    fn test_timeline_total_duration() {
        let tl = request(3, 3).timeline();
        assert_eq!(tl.images.len(), 3);
        assert!((tl.total_duration() - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{
            "projectId": "p",
            "audioUrl": "https://a/voice.mp3",
            "imageUrls": ["https://a/1.png"],
            "imageTimings": [{"startSeconds": 0.0, "endSeconds": 2.0}],
            "srtContent": "1\n00:00:00,000 --> 00:00:02,000\nhi\n"
        }"#;
        let req: RenderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.project_id, "p");
        assert_eq!(req.image_timings[0].end_seconds, 2.0);
        assert!(req.srt_content.is_some());
    }
}
