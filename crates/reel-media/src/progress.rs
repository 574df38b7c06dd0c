//! FFmpeg progress reporting.

/// Progress state parsed from FFmpeg's `-progress pipe:2` output.
#[derive(Debug, Clone, Default)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Encoding speed in frames per second
    pub fps: f64,
    /// Output timestamp in milliseconds
    pub out_time_ms: i64,
    /// Output timestamp as HH:MM:SS.micros
    pub out_time: String,
    /// Encoding speed relative to realtime (e.g. 2.5 = 2.5x)
    pub speed: f64,
    /// Whether encoding has finished
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Output position in seconds.
    pub fn out_time_secs(&self) -> f64 {
        self.out_time_ms as f64 / 1000.0
    }
}
