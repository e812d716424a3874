//! Image downloading functionality
//!
//! This module provides the metadata probe (HEAD) and the streamed body fetch
//! (GET) used by the mirror engine. Both go through one `reqwest` client so
//! they share the same bounded timeout; neither is retried.

use crate::error::{MirrorError, Result};
use crate::types::RemoteImageInfo;
use async_trait::async_trait;
use futures_util::stream::TryStreamExt;
#[cfg(feature = "cli")]
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::debug;

/// Fetches image metadata and bodies
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Metadata-only request returning content type and length
    ///
    /// # Errors
    /// - Transport failure or non-success status
    /// - Missing or malformed `Content-Type` / `Content-Length`
    async fn probe(&self, url: &str) -> Result<RemoteImageInfo>;

    /// Fetch the body of `url` into `destination`, returning bytes written
    ///
    /// The destination is only created (and truncated) once the server has
    /// answered 200.
    ///
    /// # Errors
    /// - Transport failure or non-200 status
    /// - File could not be created or written
    async fn fetch_to(&self, url: &str, destination: &Path) -> Result<u64>;
}

/// Progress bar abstraction that works with and without CLI features
#[derive(Debug)]
pub enum ProgressIndicator {
    #[cfg(feature = "cli")]
    Indicatif(ProgressBar),
    NoOp,
}

impl ProgressIndicator {
    /// Set message for progress indicator
    pub fn set_message(&self, msg: String) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_message(msg),
            Self::NoOp => drop(msg),
        }
    }

    /// Set length for progress indicator
    pub fn set_length(&self, len: u64) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_length(len),
            Self::NoOp => {},
        }
    }

    /// Set position for progress indicator
    pub fn set_position(&self, pos: u64) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.set_position(pos),
            Self::NoOp => {},
        }
    }

    /// Remove the indicator from the terminal
    pub fn finish_and_clear(&self) {
        match self {
            #[cfg(feature = "cli")]
            Self::Indicatif(pb) => pb.finish_and_clear(),
            Self::NoOp => {},
        }
    }
}

/// `reqwest`-backed [`ImageFetcher`]
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
    show_progress: bool,
}

impl HttpImageFetcher {
    /// Create a new fetcher
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(timeout: Duration, show_progress: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MirrorError::network_error("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            show_progress,
        })
    }

    /// Create a progress indicator for download reporting
    fn create_progress_indicator(&self) -> ProgressIndicator {
        if !self.show_progress {
            return ProgressIndicator::NoOp;
        }

        #[cfg(feature = "cli")]
        {
            let pb = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            ProgressIndicator::Indicatif(pb)
        }
        #[cfg(not(feature = "cli"))]
        {
            ProgressIndicator::NoOp
        }
    }
}

/// Read `Content-Type` and `Content-Length` from a probe response
///
/// # Errors
/// - `MissingHeader` when either header is absent or unparseable
pub fn remote_info_from_headers(
    headers: &reqwest::header::HeaderMap,
    url: &str,
) -> Result<RemoteImageInfo> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| MirrorError::missing_header("content-type", url))?
        .to_string();

    // Read the header directly: HEAD responses carry no body to size-hint from
    let content_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| MirrorError::missing_header("content-length", url))?;

    Ok(RemoteImageInfo {
        content_type,
        content_length,
    })
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn probe(&self, url: &str) -> Result<RemoteImageInfo> {
        debug!("Probing: {}", url);

        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| MirrorError::network_error(format!("Failed to probe {}", url), e))?;

        if !response.status().is_success() {
            return Err(MirrorError::http_status(response.status().as_u16(), url));
        }

        let info = remote_info_from_headers(response.headers(), url)?;
        debug!(
            url = %url,
            content_type = %info.content_type,
            content_length = info.content_length,
            "Probe complete"
        );
        Ok(info)
    }

    async fn fetch_to(&self, url: &str, destination: &Path) -> Result<u64> {
        debug!("Downloading: {} -> {}", url, destination.display());

        let response =
            self.client.get(url).send().await.map_err(|e| {
                MirrorError::network_error(format!("Failed to download {}", url), e)
            })?;

        if response.status() != StatusCode::OK {
            return Err(MirrorError::http_status(response.status().as_u16(), url));
        }

        let total_size = response.content_length();
        let progress = self.create_progress_indicator();
        if let Some(total) = total_size {
            progress.set_length(total);
        }
        if let Some(name) = destination.file_name() {
            progress.set_message(name.to_string_lossy().into_owned());
        }

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| MirrorError::file_io_error("create file", destination, &e))?;

        let mut stream = StreamReader::new(
            response
                .bytes_stream()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
        );

        let mut downloaded = 0u64;
        let mut buffer = vec![0; 8192];

        let copied: Result<()> = async {
            loop {
                let bytes_read = tokio::io::AsyncReadExt::read(&mut stream, &mut buffer)
                    .await
                    .map_err(|e| MirrorError::network_error("Failed to read download stream", e))?;

                if bytes_read == 0 {
                    break;
                }

                file.write_all(buffer.get(..bytes_read).unwrap_or(&[]))
                    .await
                    .map_err(|e| MirrorError::file_io_error("write to file", destination, &e))?;

                downloaded += bytes_read as u64;
                progress.set_position(downloaded);
            }

            file.flush()
                .await
                .map_err(|e| MirrorError::file_io_error("flush file", destination, &e))
        }
        .await;

        progress.finish_and_clear();
        copied?;

        debug!(
            "Downloaded {} bytes to {}",
            downloaded,
            destination.display()
        );
        Ok(downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{http_head_response, http_response, request_parts, LocalHttpServer};
    use reqwest::header::{HeaderMap, HeaderValue};
    use tempfile::TempDir;

    #[test]
    fn test_remote_info_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("123456"));

        let info = remote_info_from_headers(&headers, "https://img/1=s3840").unwrap();
        assert_eq!(info.content_type, "image/jpeg");
        assert_eq!(info.content_length, 123_456);
    }

    #[test]
    fn test_missing_headers_are_errors() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("10"));
        let err = remote_info_from_headers(&headers, "u").unwrap_err();
        assert!(err.to_string().contains("content-type"));

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        let err = remote_info_from_headers(&headers, "u").unwrap_err();
        assert!(err.to_string().contains("content-length"));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("not-a-number"));
        assert!(remote_info_from_headers(&headers, "u").is_err());
    }

    #[test]
    fn test_progress_indicator_no_op() {
        let progress = ProgressIndicator::NoOp;

        progress.set_message("test message".to_string());
        progress.set_length(100);
        progress.set_position(50);
        progress.finish_and_clear();
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_progress_indicator_with_indicatif() {
        let progress = ProgressIndicator::Indicatif(ProgressBar::hidden());

        progress.set_message("test message".to_string());
        progress.set_length(100);
        progress.set_position(50);
        progress.finish_and_clear();
    }

    #[test]
    fn test_fetcher_creation() {
        let fetcher = HttpImageFetcher::new(Duration::from_secs(5), false).unwrap();
        assert!(matches!(
            fetcher.create_progress_indicator(),
            ProgressIndicator::NoOp
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_leaves_destination_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("1.jpg");
        std::fs::write(&destination, b"stale").unwrap();

        let fetcher = HttpImageFetcher::new(Duration::from_secs(2), false).unwrap();
        let result = fetcher
            .fetch_to("http://127.0.0.1:9/image=s3840", &destination)
            .await;

        assert!(matches!(result, Err(MirrorError::Network(_))));
        assert_eq!(std::fs::read(&destination).unwrap(), b"stale");

        let probe = fetcher.probe("http://127.0.0.1:9/image=s3840").await;
        assert!(matches!(probe, Err(MirrorError::Network(_))));
    }

    #[tokio::test]
    async fn test_head_request_reads_headers() {
        let server = LocalHttpServer::start(vec![http_head_response(
            "200 OK",
            &[("Content-Type", "image/jpeg")],
            1234,
        )])
        .await
        .unwrap();
        let url = format!("{}/image=s3840", server.url());

        let fetcher = HttpImageFetcher::new(Duration::from_secs(5), false).unwrap();
        let info = fetcher.probe(&url).await.unwrap();

        assert_eq!(
            info,
            RemoteImageInfo {
                content_type: "image/jpeg".to_string(),
                content_length: 1234,
            }
        );
        let requests = server.requests().await.unwrap();
        let (head, _) = request_parts(&requests[0]);
        assert!(head.starts_with("head /image=s3840 "));
    }

    #[tokio::test]
    async fn test_head_request_rejects_error_status() {
        let server = LocalHttpServer::start(vec![http_response("404 Not Found", &[], b"")])
            .await
            .unwrap();
        let fetcher = HttpImageFetcher::new(Duration::from_secs(5), false).unwrap();

        let result = fetcher.probe(&format!("{}/gone", server.url())).await;
        assert!(matches!(
            result,
            Err(MirrorError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_truncates_longer_stale_file() {
        let body: Vec<u8> = (0..1234u32).map(|i| (i % 251) as u8).collect();
        let server = LocalHttpServer::start(vec![http_response(
            "200 OK",
            &[("Content-Type", "image/jpeg")],
            &body,
        )])
        .await
        .unwrap();

        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("1.jpg");
        std::fs::write(&destination, vec![0xAA; 5000]).unwrap();

        let fetcher = HttpImageFetcher::new(Duration::from_secs(5), false).unwrap();
        let written = fetcher
            .fetch_to(&format!("{}/1=s3840", server.url()), &destination)
            .await
            .unwrap();

        assert_eq!(written, 1234);
        assert_eq!(std::fs::read(&destination).unwrap(), body);

        let requests = server.requests().await.unwrap();
        let (head, _) = request_parts(&requests[0]);
        assert!(head.starts_with("get /1=s3840 "));
    }

    #[tokio::test]
    async fn test_fetch_404_leaves_stale_bytes() {
        let server = LocalHttpServer::start(vec![http_response(
            "404 Not Found",
            &[("Content-Type", "text/html")],
            b"<h1>missing</h1>",
        )])
        .await
        .unwrap();

        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("1.jpg");
        std::fs::write(&destination, b"stale").unwrap();

        let fetcher = HttpImageFetcher::new(Duration::from_secs(5), false).unwrap();
        let result = fetcher
            .fetch_to(&format!("{}/1=s3840", server.url()), &destination)
            .await;

        assert!(matches!(
            result,
            Err(MirrorError::HttpStatus { status: 404, .. })
        ));
        assert_eq!(std::fs::read(&destination).unwrap(), b"stale");
    }

    #[tokio::test]
    async fn test_fetch_error_does_not_create_file() {
        let server =
            LocalHttpServer::start(vec![http_response("500 Internal Server Error", &[], b"")])
                .await
                .unwrap();

        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("new.png");

        let fetcher = HttpImageFetcher::new(Duration::from_secs(5), false).unwrap();
        let result = fetcher
            .fetch_to(&format!("{}/new=s3840", server.url()), &destination)
            .await;

        assert!(result.is_err());
        assert!(!destination.exists());
    }
}
