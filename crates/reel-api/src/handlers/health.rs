//! Health check handler.

use axum::Json;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ffmpeg: bool,
    pub ffprobe: bool,
}

/// GET /healthz
///
/// Liveness plus a check that the media tools this service shells out to
/// are actually present.
pub async fn health() -> ApiResult<Json<HealthResponse>> {
    let ffmpeg = reel_media::check_ffmpeg().is_ok();
    let ffprobe = reel_media::check_ffprobe().is_ok();

    if !ffmpeg || !ffprobe {
        return Err(ApiError::unavailable("ffmpeg/ffprobe not found in PATH"));
    }

    Ok(Json(HealthResponse {
        status: "ok",
        ffmpeg,
        ffprobe,
    }))
}
