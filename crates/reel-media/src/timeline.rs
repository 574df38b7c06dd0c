//! Timeline partitioning and concat-manifest generation.
//!
//! The image timeline is split into fixed-size chunks so each FFmpeg
//! invocation touches a bounded number of stills, and each chunk carries a
//! concat-demuxer manifest describing its images and display durations.

use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// Minimum display duration per image. Zero or negative durations make the
/// concat demuxer drop frames or fail outright.
pub const MIN_SEGMENT_SECS: f64 = 0.1;

/// Default number of images per chunk.
pub const DEFAULT_IMAGES_PER_CHUNK: usize = 25;

/// A local still image with its floored display duration.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedImage {
    pub path: PathBuf,
    pub duration: f64,
}

impl TimedImage {
    /// Create from a timing window, flooring the duration at
    /// [`MIN_SEGMENT_SECS`].
    pub fn new(path: impl Into<PathBuf>, start_seconds: f64, end_seconds: f64) -> Self {
        Self {
            path: path.into(),
            duration: (end_seconds - start_seconds).max(MIN_SEGMENT_SECS),
        }
    }
}

/// A contiguous slice of the image timeline, rendered as one unit.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 0-based, contiguous across the job
    pub index: usize,
    pub images: Vec<TimedImage>,
}

impl Chunk {
    /// Generate the concat-demuxer manifest for this chunk.
    ///
    /// The final image is listed twice: the demuxer treats the last `file`
    /// entry as having undefined duration, so without the duplicate the
    /// closing frame is dropped or mistimed.
    pub fn manifest(&self) -> MediaResult<String> {
        let last = self.images.last().ok_or(MediaError::EmptyChunk)?;

        let mut out = String::from("ffconcat version 1.0\n");
        for image in &self.images {
            out.push_str(&format!(
                "file '{}'\nduration {:.3}\n",
                escape_concat_path(&image.path),
                image.duration
            ));
        }
        out.push_str(&format!("file '{}'\n", escape_concat_path(&last.path)));
        Ok(out)
    }

    /// Write the manifest into `dir`, returning its path.
    pub async fn write_manifest(&self, dir: &Path) -> MediaResult<PathBuf> {
        let path = dir.join(format!("chunk_{:03}.txt", self.index));
        tokio::fs::write(&path, self.manifest()?).await?;
        Ok(path)
    }

    /// Sum of display durations in this chunk.
    pub fn duration(&self) -> f64 {
        self.images.iter().map(|i| i.duration).sum()
    }
}

/// Split the timeline into contiguous chunks of at most `chunk_size` images.
pub fn partition(images: Vec<TimedImage>, chunk_size: usize) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(images.len().div_ceil(chunk_size));
    let mut iter = images.into_iter().peekable();
    let mut index = 0;

    while iter.peek().is_some() {
        let images: Vec<TimedImage> = iter.by_ref().take(chunk_size).collect();
        chunks.push(Chunk { index, images });
        index += 1;
    }

    chunks
}

/// Quote a path for a concat-demuxer `file` directive.
///
/// Inside single quotes the demuxer honors no escapes, so an embedded quote
/// closes the string, emits an escaped quote, and reopens it.
pub(crate) fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images(n: usize) -> Vec<TimedImage> {
        (0..n)
            .map(|i| TimedImage::new(format!("/tmp/img_{i}.png"), i as f64, i as f64 + 1.5))
            .collect()
    }

    #[test]
    fn test_duration_floor() {
        let img = TimedImage::new("/tmp/a.png", 5.0, 5.0);
        assert_eq!(img.duration, MIN_SEGMENT_SECS);

        let img = TimedImage::new("/tmp/a.png", 5.0, 4.0);
        assert_eq!(img.duration, MIN_SEGMENT_SECS);

        let img = TimedImage::new("/tmp/a.png", 0.0, 2.0);
        assert_eq!(img.duration, 2.0);
    }

    #[test]
    fn test_manifest_has_doubled_final_entry() {
        let chunk = Chunk {
            index: 0,
            images: images(3),
        };
        let manifest = chunk.manifest().unwrap();
        let file_lines = manifest.lines().filter(|l| l.starts_with("file ")).count();
        let duration_lines = manifest
            .lines()
            .filter(|l| l.starts_with("duration "))
            .count();
        assert_eq!(file_lines, 4);
        assert_eq!(duration_lines, 3);
        assert!(manifest.trim_end().ends_with("file '/tmp/img_2.png'"));
    }

    #[test]
    fn test_manifest_single_image_chunk() {
        let chunk = Chunk {
            index: 0,
            images: images(1),
        };
        let manifest = chunk.manifest().unwrap();
        let file_lines = manifest.lines().filter(|l| l.starts_with("file ")).count();
        assert_eq!(file_lines, 2);
    }

    #[test]
    fn test_manifest_empty_chunk_fails() {
        let chunk = Chunk {
            index: 0,
            images: vec![],
        };
        assert!(matches!(chunk.manifest(), Err(MediaError::EmptyChunk)));
    }

    #[test]
    fn test_manifest_preserves_order() {
        let chunk = Chunk {
            index: 0,
            images: images(5),
        };
        let manifest = chunk.manifest().unwrap();
        let positions: Vec<usize> = (0..5)
            .map(|i| manifest.find(&format!("img_{i}.png")).unwrap())
            .collect();
        for pair in positions.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_partition_completeness() {
        for (n, chunk_size) in [(1, 25), (25, 25), (26, 25), (60, 25), (7, 3)] {
            let chunks = partition(images(n), chunk_size);
            assert_eq!(chunks.len(), n.div_ceil(chunk_size));
            assert_eq!(chunks.iter().map(|c| c.images.len()).sum::<usize>(), n);
            for (i, chunk) in chunks.iter().enumerate() {
                assert_eq!(chunk.index, i);
                assert!(!chunk.images.is_empty());
                assert!(chunk.images.len() <= chunk_size);
            }
        }
    }

    #[test]
    fn test_partition_preserves_order_across_chunks() {
        let chunks = partition(images(10), 4);
        let flattened: Vec<_> = chunks
            .iter()
            .flat_map(|c| c.images.iter().map(|i| i.path.clone()))
            .collect();
        let expected: Vec<_> = images(10).into_iter().map(|i| i.path).collect();
        assert_eq!(flattened, expected);
    }

    #[test]
    fn test_escape_concat_path() {
        let path = PathBuf::from("/tmp/it's here.png");
        assert_eq!(escape_concat_path(&path), r"/tmp/it'\''s here.png");
    }
}
