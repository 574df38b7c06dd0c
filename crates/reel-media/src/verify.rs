//! Output verification.

use std::path::Path;

use crate::error::{MediaError, MediaResult};

/// Check that `path` exists and is non-empty, returning its size.
///
/// FFmpeg occasionally exits zero after writing nothing (e.g. a concat list
/// whose entries all failed to open with `-v error`), so every operation
/// verifies its output before handing it downstream.
pub async fn ensure_non_empty(path: &Path) -> MediaResult<u64> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|_| MediaError::FileNotFound(path.to_path_buf()))?;

    if meta.len() == 0 {
        return Err(MediaError::EmptyOutput(path.to_path_buf()));
    }

    Ok(meta.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file() {
        let err = ensure_non_empty(Path::new("/nonexistent/out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mp4");
        tokio::fs::write(&path, b"").await.unwrap();
        let err = ensure_non_empty(&path).await.unwrap_err();
        assert!(matches!(err, MediaError::EmptyOutput(_)));
    }

    #[tokio::test]
    async fn test_non_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mp4");
        tokio::fs::write(&path, b"data").await.unwrap();
        assert_eq!(ensure_non_empty(&path).await.unwrap(), 4);
    }
}
