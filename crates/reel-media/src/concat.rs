//! Stream concatenation and audio muxing.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegInput, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::timeline::escape_concat_path;
use crate::verify::ensure_non_empty;

/// Generate the concat list for fully-rendered segments (no durations; each
/// segment carries its own).
pub fn concat_list(segments: &[PathBuf]) -> String {
    let mut out = String::from("ffconcat version 1.0\n");
    for segment in segments {
        out.push_str(&format!("file '{}'\n", escape_concat_path(segment)));
    }
    out
}

/// Build the copy-concatenation command.
pub fn concat_command(list: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input(FfmpegInput::new(list).concat_demuxer())
        .video_codec("copy")
}

/// Concatenate rendered segments, in the given order, without re-encoding.
///
/// Valid only because every segment came out of the same pass-1 settings
/// (codec, resolution, frame rate, pixel format).
pub async fn concat_segments(
    segments: &[PathBuf],
    list_path: &Path,
    output: &Path,
) -> MediaResult<()> {
    if segments.is_empty() {
        return Err(MediaError::EmptyChunk);
    }

    debug!(count = segments.len(), output = %output.display(), "Concatenating segments");

    tokio::fs::write(list_path, concat_list(segments)).await?;

    let cmd = concat_command(list_path, output);
    FfmpegRunner::new().run(&cmd).await?;
    ensure_non_empty(output).await?;
    Ok(())
}

/// Build the audio-mux command: video copied verbatim, audio re-encoded to
/// AAC 192k / 44.1 kHz, output clipped to the shorter stream.
pub fn mux_command(video: &Path, audio: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input(FfmpegInput::new(video))
        .input(FfmpegInput::new(audio))
        .map("0:v:0")
        .map("1:a:0")
        .video_codec("copy")
        .audio_codec("aac")
        .audio_bitrate("192k")
        .sample_rate(44_100)
        .shortest()
}

/// Mux the voice-over track into the concatenated video.
///
/// `-shortest` makes the audio duration authoritative when the image
/// timeline runs long, and protects against a silent tail when it runs
/// short.
pub async fn mux_audio(video: &Path, audio: &Path, output: &Path) -> MediaResult<()> {
    debug!(
        video = %video.display(),
        audio = %audio.display(),
        "Muxing audio track"
    );

    let cmd = mux_command(video, audio, output);
    FfmpegRunner::new().run(&cmd).await?;
    ensure_non_empty(output).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_order() {
        let segments = vec![
            PathBuf::from("/job/chunk_000.mp4"),
            PathBuf::from("/job/chunk_001.mp4"),
            PathBuf::from("/job/chunk_002.mp4"),
        ];
        let list = concat_list(&segments);
        let lines: Vec<&str> = list.lines().collect();
        assert_eq!(lines[0], "ffconcat version 1.0");
        assert_eq!(lines[1], "file '/job/chunk_000.mp4'");
        assert_eq!(lines[2], "file '/job/chunk_001.mp4'");
        assert_eq!(lines[3], "file '/job/chunk_002.mp4'");
    }

    #[test]
    fn test_concat_command_copies_streams() {
        let cmd = concat_command(&PathBuf::from("list.txt"), &PathBuf::from("video.mp4"));
        let args = cmd.build_args();
        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"copy".to_string()));
        assert!(args.contains(&"concat".to_string()));
    }

    #[test]
    fn test_mux_command_shortest_stream_policy() {
        let cmd = mux_command(
            &PathBuf::from("video.mp4"),
            &PathBuf::from("voice.mp3"),
            &PathBuf::from("final.mp4"),
        );
        let args = cmd.build_args();

        assert!(args.contains(&"-shortest".to_string()));
        assert!(args.contains(&"0:v:0".to_string()));
        assert!(args.contains(&"1:a:0".to_string()));
        assert!(args.contains(&"aac".to_string()));
        assert!(args.contains(&"192k".to_string()));
        assert!(args.contains(&"44100".to_string()));

        // Video stream is copied, not re-encoded
        let cv = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[cv + 1], "copy");
    }

    #[tokio::test]
    async fn test_concat_empty_list_rejected() {
        let err = concat_segments(
            &[],
            &PathBuf::from("/tmp/list.txt"),
            &PathBuf::from("/tmp/out.mp4"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::EmptyChunk));
    }
}
