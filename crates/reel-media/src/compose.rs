//! Pass 1: compose a silent video segment from a chunk's still images.

use std::path::Path;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegInput, FfmpegRunner};
use crate::error::MediaResult;
use crate::filters::FILTER_SCALE_PAD;
use crate::verify::ensure_non_empty;

/// Build the image-composition command for a chunk manifest.
///
/// The encode is speed-biased (`veryfast`): chunks are intermediate bulk
/// artifacts, re-read once by the concatenator, not delivery files.
pub fn compose_command(manifest: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input(FfmpegInput::new(manifest).concat_demuxer())
        .video_filter(FILTER_SCALE_PAD)
        .video_codec("libx264")
        .preset("veryfast")
        .crf(23)
        .no_audio()
}

/// Render a chunk manifest into a silent video segment.
///
/// Failure here is fatal to the whole job: a manifest that cannot be
/// composed means the timeline itself is broken.
pub async fn compose_chunk(manifest: &Path, output: &Path) -> MediaResult<()> {
    debug!(
        manifest = %manifest.display(),
        output = %output.display(),
        "Composing chunk"
    );

    let cmd = compose_command(manifest, output);
    FfmpegRunner::new().run(&cmd).await?;
    ensure_non_empty(output).await?;
    Ok(())
}
