//! FFmpeg filter definitions for the assembly pipeline.

use std::path::Path;

/// Canonical output frame width.
pub const FRAME_WIDTH: u32 = 1920;

/// Canonical output frame height.
pub const FRAME_HEIGHT: u32 = 1080;

/// Constant output frame rate.
pub const FRAME_RATE: u32 = 30;

/// Scale-to-fit with centered black padding, square pixels, constant frame
/// rate. Every chunk runs through this, which is what makes the later
/// copy-concatenation valid: all segments share identical stream parameters.
pub const FILTER_SCALE_PAD: &str = concat!(
    "scale=1920:1080:force_original_aspect_ratio=decrease,",
    "pad=1920:1080:(ow-iw)/2:(oh-ih)/2:color=black,",
    "setsar=1,fps=30,format=yuv420p"
);

/// Screen-blend a looped overlay (input 1) onto the base segment (input 0).
///
/// The overlay is scaled to the canonical frame and expanded from limited to
/// full range first; without the range expansion its nominally-black pixels
/// sit at luma 16 and wash the base with gray instead of staying invisible.
/// `shortest=1` ends the blend when the base segment ends, since the overlay
/// input loops forever.
pub const FILTER_SCREEN_BLEND: &str = concat!(
    "[1:v]scale=1920:1080:in_range=limited:out_range=full,setsar=1,format=yuv420p[ovl];",
    "[0:v][ovl]blend=all_mode=screen:shortest=1,format=yuv420p"
);

/// Build a subtitle-burn filter for an SRT file.
pub fn filter_subtitles(srt_path: &Path) -> String {
    format!("subtitles='{}'", escape_filter_path(srt_path))
}

/// Quote a path for use inside a filter argument.
///
/// Single-quoted filter strings treat only `'` specially; an embedded quote
/// closes the string, emits an escaped quote, and reopens it.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_scale_pad_filter_shape() {
        assert!(FILTER_SCALE_PAD.contains("force_original_aspect_ratio=decrease"));
        assert!(FILTER_SCALE_PAD.contains("pad=1920:1080"));
        assert!(FILTER_SCALE_PAD.contains("fps=30"));
    }

    #[test]
    fn test_screen_blend_filter_shape() {
        assert!(FILTER_SCREEN_BLEND.contains("blend=all_mode=screen"));
        assert!(FILTER_SCREEN_BLEND.contains("in_range=limited:out_range=full"));
        assert!(FILTER_SCREEN_BLEND.contains("shortest=1"));
    }

    #[test]
    fn test_filter_subtitles_escaping() {
        let filter = filter_subtitles(&PathBuf::from("/tmp/it's.srt"));
        assert_eq!(filter, r"subtitles='/tmp/it'\''s.srt'");
    }
}
