//! Pipeline stages and progress bands.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A non-terminal stage of the render pipeline.
///
/// Stages run strictly in declaration order. Each stage owns a band of the
/// overall 0-100 progress range; percentages emitted within a stage are
/// interpolated inside its band so the caller sees one monotonic series
/// across the whole job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Fetching remote audio/image/overlay assets into scratch storage
    Downloading,
    /// Partitioning the timeline and writing concat manifests
    Preparing,
    /// Rendering chunks (image composition + optional overlay blend)
    Rendering,
    /// Stream-concatenating rendered chunks
    Concatenating,
    /// Muxing the voice-over track into the concatenated video
    Muxing,
    /// Uploading the final artifact to the content store
    Uploading,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Downloading => "downloading",
            Stage::Preparing => "preparing",
            Stage::Rendering => "rendering",
            Stage::Concatenating => "concatenating",
            Stage::Muxing => "muxing",
            Stage::Uploading => "uploading",
        }
    }

    /// Inclusive (start, end) percentage band for this stage.
    pub fn band(&self) -> (u8, u8) {
        match self {
            Stage::Downloading => (5, 25),
            Stage::Preparing => (25, 30),
            Stage::Rendering => (30, 72),
            Stage::Concatenating => (72, 76),
            Stage::Muxing => (76, 80),
            Stage::Uploading => (80, 100),
        }
    }

    /// Map a completion fraction within this stage to an overall percentage.
    ///
    /// The fraction is clamped to [0, 1] so callers can pass raw
    /// `done / total` ratios without worrying about rounding overshoot.
    pub fn percent_at(&self, fraction: f64) -> u8 {
        let (lo, hi) = self.band();
        let f = fraction.clamp(0.0, 1.0);
        (lo as f64 + f * (hi - lo) as f64).round() as u8
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_are_contiguous_and_increasing() {
        let stages = [
            Stage::Downloading,
            Stage::Preparing,
            Stage::Rendering,
            Stage::Concatenating,
            Stage::Muxing,
            Stage::Uploading,
        ];
        for pair in stages.windows(2) {
            assert_eq!(pair[0].band().1, pair[1].band().0);
        }
        assert_eq!(Stage::Uploading.band().1, 100);
    }

    #[test]
    fn test_percent_at_clamps_fraction() {
        assert_eq!(Stage::Rendering.percent_at(-0.5), 30);
        assert_eq!(Stage::Rendering.percent_at(0.0), 30);
        assert_eq!(Stage::Rendering.percent_at(1.0), 72);
        assert_eq!(Stage::Rendering.percent_at(2.0), 72);
    }

    #[test]
    fn test_percent_at_interpolates() {
        assert_eq!(Stage::Rendering.percent_at(0.5), 51);
        assert_eq!(Stage::Uploading.percent_at(0.25), 85);
    }
}
