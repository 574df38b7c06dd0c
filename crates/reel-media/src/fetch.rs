//! HTTP asset fetching into scratch storage.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Download one asset to `dest`, streaming the body to disk.
///
/// Any non-success status fails the download; retry policy, if any, belongs
/// to whoever produced the URL.
pub async fn fetch_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> MediaResult<u64> {
    debug!(url, dest = %dest.display(), "Fetching asset");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(url, e.to_string()))?;

    if !response.status().is_success() {
        return Err(MediaError::download_failed(
            url,
            format!("HTTP status {}", response.status()),
        ));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(part) = stream.next().await {
        let bytes = part.map_err(|e| MediaError::download_failed(url, e.to_string()))?;
        file.write_all(&bytes).await?;
        written += bytes.len() as u64;
    }

    file.flush().await?;

    if written == 0 {
        return Err(MediaError::download_failed(url, "empty response body"));
    }

    Ok(written)
}

/// Download a batch of assets with bounded concurrency, invoking `on_done`
/// with the running completion count as each finishes.
///
/// Fails fast: the first error aborts the remaining downloads.
pub async fn fetch_all<F>(
    client: &reqwest::Client,
    downloads: Vec<(String, PathBuf)>,
    max_parallel: usize,
    mut on_done: F,
) -> MediaResult<()>
where
    F: FnMut(usize),
{
    let mut stream = futures_util::stream::iter(downloads.into_iter().map(|(url, dest)| {
        let client = client.clone();
        async move { fetch_to_file(&client, &url, &dest).await }
    }))
    .buffer_unordered(max_parallel.max(1));

    let mut done = 0usize;
    while let Some(result) = stream.next().await {
        result?;
        done += 1;
        on_done(done);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_writes_body_to_disk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pngdata".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("img.png");
        let client = reqwest::Client::new();

        let size = fetch_to_file(&client, &format!("{}/img.png", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(size, 7);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"pngdata");
    }

    #[tokio::test]
    async fn test_fetch_fails_on_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("missing.png");
        let client = reqwest::Client::new();

        let err = fetch_to_file(&client, &format!("{}/missing.png", server.uri()), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::DownloadFailed { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_all_reports_completions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let downloads: Vec<(String, PathBuf)> = (0..5)
            .map(|i| {
                (
                    format!("{}/asset/{i}", server.uri()),
                    dir.path().join(format!("asset_{i}")),
                )
            })
            .collect();

        let client = reqwest::Client::new();
        let mut seen = Vec::new();
        fetch_all(&client, downloads, 2, |done| seen.push(done))
            .await
            .unwrap();

        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }
}
