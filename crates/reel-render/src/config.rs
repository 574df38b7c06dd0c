//! Render pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use reel_media::DEFAULT_IMAGES_PER_CHUNK;

/// Render pipeline configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Maximum images per chunk
    pub images_per_chunk: usize,
    /// Chunks rendered concurrently within a job. Kept below the chunk size:
    /// the overlay pass decodes two streams at once and is the memory
    /// ceiling of the whole pipeline.
    pub parallel_chunk_renders: usize,
    /// Maximum concurrent asset downloads per job
    pub download_parallel: usize,
    /// Whether the overlay blend pass is enabled at all
    pub overlay_enabled: bool,
    /// Looping overlay asset to screen-blend onto every chunk
    pub overlay_url: Option<String>,
    /// Per-chunk overlay blend timeout
    pub overlay_timeout: Duration,
    /// Burn SRT captions into the video stream before muxing
    pub burn_subtitles: bool,
    /// Interval between synthetic progress events while uploading
    pub upload_heartbeat: Duration,
    /// Root directory for per-job scratch space
    pub work_root: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            images_per_chunk: DEFAULT_IMAGES_PER_CHUNK,
            parallel_chunk_renders: 2,
            download_parallel: 4,
            overlay_enabled: true,
            overlay_url: None,
            overlay_timeout: Duration::from_secs(120),
            burn_subtitles: false,
            upload_heartbeat: Duration::from_secs(3),
            work_root: PathBuf::from("/tmp/reelforge"),
        }
    }
}

impl RenderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            images_per_chunk: env_parse("REEL_IMAGES_PER_CHUNK", defaults.images_per_chunk),
            parallel_chunk_renders: env_parse(
                "REEL_PARALLEL_CHUNK_RENDERS",
                defaults.parallel_chunk_renders,
            ),
            download_parallel: env_parse("REEL_DOWNLOAD_PARALLEL", defaults.download_parallel),
            overlay_enabled: env_parse("REEL_OVERLAY_ENABLED", defaults.overlay_enabled),
            overlay_url: std::env::var("REEL_OVERLAY_URL").ok().filter(|s| !s.is_empty()),
            overlay_timeout: Duration::from_secs(env_parse(
                "REEL_OVERLAY_TIMEOUT_SECS",
                defaults.overlay_timeout.as_secs(),
            )),
            burn_subtitles: env_parse("REEL_BURN_SUBTITLES", defaults.burn_subtitles),
            upload_heartbeat: Duration::from_secs(env_parse(
                "REEL_UPLOAD_HEARTBEAT_SECS",
                defaults.upload_heartbeat.as_secs(),
            )),
            work_root: std::env::var("REEL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_root),
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.images_per_chunk, 25);
        assert_eq!(config.parallel_chunk_renders, 2);
        assert_eq!(config.overlay_timeout, Duration::from_secs(120));
        assert!(config.parallel_chunk_renders < config.images_per_chunk);
    }
}
