//! Optional subtitle-burn pass.
//!
//! Runs over the concatenated (still silent) stream before muxing, as an
//! independent pass rather than a separate pipeline, so it composes freely
//! with the overlay blend.

use std::path::Path;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegInput, FfmpegRunner};
use crate::error::MediaResult;
use crate::filters::filter_subtitles;
use crate::verify::ensure_non_empty;

/// Build the subtitle-burn command.
pub fn burn_command(video: &Path, srt: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input(FfmpegInput::new(video))
        .video_filter(filter_subtitles(srt))
        .video_codec("libx264")
        .preset("veryfast")
        .crf(23)
        .no_audio()
}

/// Burn SRT subtitles into the video stream.
pub async fn burn_subtitles(video: &Path, srt: &Path, output: &Path) -> MediaResult<()> {
    debug!(
        video = %video.display(),
        srt = %srt.display(),
        "Burning subtitles"
    );

    let cmd = burn_command(video, srt, output);
    FfmpegRunner::new().run(&cmd).await?;
    ensure_non_empty(output).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_burn_command_args() {
        let cmd = burn_command(
            &PathBuf::from("video.mp4"),
            &PathBuf::from("/job/captions.srt"),
            &PathBuf::from("subbed.mp4"),
        );
        let args = cmd.build_args();
        assert!(args.iter().any(|a| a.contains("subtitles=")));
        assert!(args.contains(&"libx264".to_string()));
    }
}
