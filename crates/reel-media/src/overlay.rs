//! Pass 2: screen-blend a looping overlay onto a composed segment.
//!
//! The overlay is cosmetic. Callers own the degrade-not-fail policy: any
//! error or timeout from this pass falls back to the unblended segment.

use std::path::Path;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegInput, FfmpegRunner};
use crate::error::MediaResult;
use crate::filters::FILTER_SCREEN_BLEND;
use crate::verify::ensure_non_empty;

/// Build the overlay-blend command.
pub fn blend_command(base: &Path, overlay: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input(FfmpegInput::new(base))
        .input(FfmpegInput::new(overlay).loop_forever())
        .filter_complex(FILTER_SCREEN_BLEND)
        .video_codec("libx264")
        .preset("veryfast")
        .crf(23)
        .no_audio()
}

/// Blend the looping overlay onto `base`, bounded by `timeout_secs`.
///
/// The two-stream decode makes this the most memory-hungry operation in the
/// pipeline, which is why chunk parallelism is capped below the partition
/// size.
pub async fn blend_overlay(
    base: &Path,
    overlay: &Path,
    output: &Path,
    timeout_secs: u64,
) -> MediaResult<()> {
    debug!(
        base = %base.display(),
        overlay = %overlay.display(),
        timeout_secs,
        "Blending overlay"
    );

    let cmd = blend_command(base, overlay, output);
    FfmpegRunner::new()
        .with_timeout(timeout_secs)
        .run(&cmd)
        .await?;
    ensure_non_empty(output).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_blend_command_args() {
        let cmd = blend_command(
            &PathBuf::from("raw.mp4"),
            &PathBuf::from("embers.mp4"),
            &PathBuf::from("final.mp4"),
        );
        let args = cmd.build_args();

        // Overlay input loops and comes second
        let loop_pos = args.iter().position(|a| a == "-stream_loop").unwrap();
        let first_i = args.iter().position(|a| a == "-i").unwrap();
        assert!(first_i < loop_pos);

        assert!(args.contains(&"-filter_complex".to_string()));
        assert!(args.iter().any(|a| a.contains("blend=all_mode=screen")));
        assert_eq!(args.last().unwrap(), "final.mp4");
    }
}
