//! In-memory catalog, fetcher and reporter for testing
//!
//! These stand in for the HTTP implementations so the mirror engine can be
//! exercised without network access. [`LocalHttpServer`] goes the other way:
//! it lets the real HTTP clients talk to a loopback socket.
//!
//! Only compiled for unit tests or with the `test-utils` feature.

use crate::catalog::CatalogSource;
use crate::download::ImageFetcher;
use crate::error::{MirrorError, Result};
use crate::services::StatusReporter;
use crate::types::{Collection, ImageDescriptor, ImageOutcome, MirrorStats, RemoteImageInfo};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Catalog serving fixed collections and image lists
#[derive(Debug, Default)]
pub struct MockCatalog {
    collections: Vec<Collection>,
    images: HashMap<String, Vec<ImageDescriptor>>,
    failing_collections: HashSet<String>,
    unavailable: bool,
    collection_requests: Mutex<Vec<(String, Vec<String>)>>,
    image_requests: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection with its images
    #[must_use]
    pub fn with_collection(mut self, collection: Collection, images: Vec<ImageDescriptor>) -> Self {
        self.images.insert(collection.id.clone(), images);
        self.collections.push(collection);
        self
    }

    /// Make the image listing of `collection_id` fail
    #[must_use]
    pub fn with_failing_collection<S: Into<String>>(mut self, collection_id: S) -> Self {
        self.failing_collections.insert(collection_id.into());
        self
    }

    /// Make the collection listing itself fail
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// `(region, filters)` of every collection listing request
    #[must_use]
    pub fn collection_requests(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.collection_requests).clone()
    }

    /// `(collection_id, filters)` of every image listing request
    #[must_use]
    pub fn image_requests(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.image_requests).clone()
    }
}

#[async_trait]
impl CatalogSource for MockCatalog {
    async fn list_collections(
        &self,
        region: &str,
        filters: &[String],
    ) -> Result<Vec<Collection>> {
        lock(&self.collection_requests).push((region.to_string(), filters.to_vec()));

        if self.unavailable {
            return Err(MirrorError::catalog_unavailable("mock catalog offline"));
        }
        Ok(self.collections.clone())
    }

    async fn list_images(
        &self,
        collection_id: &str,
        _region: &str,
        filters: &[String],
    ) -> Result<Vec<ImageDescriptor>> {
        lock(&self.image_requests).push((collection_id.to_string(), filters.to_vec()));

        if self.failing_collections.contains(collection_id) {
            return Err(MirrorError::catalog_unavailable(format!(
                "mock listing failure for {}",
                collection_id
            )));
        }
        Ok(self.images.get(collection_id).cloned().unwrap_or_default())
    }
}

/// One remote image served by [`MockImageFetcher`]
#[derive(Debug, Clone)]
pub struct MockImage {
    pub content_type: String,
    pub body: Vec<u8>,
    pub probe_fails: bool,
    pub fetch_status: u16,
}

/// Fetcher serving bodies from memory and counting requests
#[derive(Debug, Default)]
pub struct MockImageFetcher {
    images: Mutex<HashMap<String, MockImage>>,
    probes: Mutex<Vec<String>>,
    fetches: Mutex<Vec<String>>,
}

impl MockImageFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with `content_type` at `url`, replacing any previous image
    pub fn insert<U: Into<String>, C: Into<String>>(&self, url: U, content_type: C, body: Vec<u8>) {
        lock(&self.images).insert(
            url.into(),
            MockImage {
                content_type: content_type.into(),
                body,
                probe_fails: false,
                fetch_status: 200,
            },
        );
    }

    /// Builder form of [`MockImageFetcher::insert`]
    #[must_use]
    pub fn with_image<U: Into<String>, C: Into<String>>(
        self,
        url: U,
        content_type: C,
        body: Vec<u8>,
    ) -> Self {
        self.insert(url, content_type, body);
        self
    }

    /// Make the probe of `url` fail
    pub fn fail_probe(&self, url: &str) {
        if let Some(image) = lock(&self.images).get_mut(url) {
            image.probe_fails = true;
        }
    }

    /// Make the body fetch of `url` answer with `status`
    pub fn fail_fetch(&self, url: &str, status: u16) {
        if let Some(image) = lock(&self.images).get_mut(url) {
            image.fetch_status = status;
        }
    }

    /// URLs whose body was requested, in order
    #[must_use]
    pub fn fetched_urls(&self) -> Vec<String> {
        lock(&self.fetches).clone()
    }

    #[must_use]
    pub fn fetch_count(&self) -> usize {
        lock(&self.fetches).len()
    }

    #[must_use]
    pub fn probe_count(&self) -> usize {
        lock(&self.probes).len()
    }

    /// Forget recorded requests, keeping the served images
    pub fn reset_counters(&self) {
        lock(&self.probes).clear();
        lock(&self.fetches).clear();
    }
}

#[async_trait]
impl ImageFetcher for MockImageFetcher {
    async fn probe(&self, url: &str) -> Result<RemoteImageInfo> {
        lock(&self.probes).push(url.to_string());

        let image = lock(&self.images).get(url).cloned();
        match image {
            Some(image) if !image.probe_fails => Ok(RemoteImageInfo {
                content_type: image.content_type,
                content_length: image.body.len() as u64,
            }),
            Some(_) => Err(MirrorError::network_error(
                format!("Failed to probe {}", url),
                "mock probe failure",
            )),
            None => Err(MirrorError::http_status(404, url)),
        }
    }

    async fn fetch_to(&self, url: &str, destination: &Path) -> Result<u64> {
        lock(&self.fetches).push(url.to_string());

        let image = lock(&self.images)
            .get(url)
            .cloned()
            .ok_or_else(|| MirrorError::http_status(404, url))?;

        if image.fetch_status != 200 {
            return Err(MirrorError::http_status(image.fetch_status, url));
        }

        tokio::fs::write(destination, &image.body)
            .await
            .map_err(|e| MirrorError::file_io_error("write to file", destination, &e))?;
        Ok(image.body.len() as u64)
    }
}

/// One event captured by [`RecordingReporter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedEvent {
    CollectionStarted(String),
    ImageStarted(String),
    CollectionFailed { collection: String, error: String },
    Image { asset_id: String, outcome: ImageOutcome },
    Completed(MirrorStats),
}

/// Reporter keeping every event for later inspection
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportedEvent>>,
}

impl RecordingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<ReportedEvent> {
        lock(&self.events).clone()
    }

    /// Names of collections reported as failed
    #[must_use]
    pub fn failed_collections(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ReportedEvent::CollectionFailed { collection, .. } => Some(collection.clone()),
                _ => None,
            })
            .collect()
    }

    /// Outcomes of all reported images, in order
    #[must_use]
    pub fn image_outcomes(&self) -> Vec<(String, ImageOutcome)> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ReportedEvent::Image { asset_id, outcome } => {
                    Some((asset_id.clone(), outcome.clone()))
                },
                _ => None,
            })
            .collect()
    }
}

impl StatusReporter for RecordingReporter {
    fn collection_started(&self, collection: &Collection) {
        lock(&self.events).push(ReportedEvent::CollectionStarted(collection.name.clone()));
    }

    fn collection_failed(&self, collection: &Collection, error: &str) {
        lock(&self.events).push(ReportedEvent::CollectionFailed {
            collection: collection.name.clone(),
            error: error.to_string(),
        });
    }

    fn image_started(&self, _collection: &Collection, image: &ImageDescriptor) {
        lock(&self.events).push(ReportedEvent::ImageStarted(image.asset_id.clone()));
    }

    fn image_finished(
        &self,
        _collection: &Collection,
        image: &ImageDescriptor,
        outcome: &ImageOutcome,
    ) {
        lock(&self.events).push(ReportedEvent::Image {
            asset_id: image.asset_id.clone(),
            outcome: outcome.clone(),
        });
    }

    fn run_completed(&self, stats: &MirrorStats) {
        lock(&self.events).push(ReportedEvent::Completed(stats.clone()));
    }
}

/// Loopback HTTP/1.1 server answering each connection with the next canned response
///
/// Requests are captured whole (head and body) so tests can check what the
/// real clients put on the wire.
#[derive(Debug)]
pub struct LocalHttpServer {
    url: String,
    handle: JoinHandle<io::Result<Vec<Vec<u8>>>>,
}

impl LocalHttpServer {
    /// Bind `127.0.0.1:0` and serve `responses` in order, one per connection
    ///
    /// # Errors
    /// - Socket could not be bound
    pub async fn start(responses: Vec<Vec<u8>>) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);

        let handle = tokio::spawn(async move {
            let mut requests = Vec::with_capacity(responses.len());
            for response in responses {
                let (mut socket, _) = listener.accept().await?;
                requests.push(read_request(&mut socket).await?);
                socket.write_all(&response).await?;
                socket.shutdown().await?;
            }
            Ok(requests)
        });

        Ok(Self { url, handle })
    }

    /// Base URL, e.g. `http://127.0.0.1:40123`
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait until every response was served and return the raw requests
    ///
    /// # Errors
    /// - Accept, read or write failed, or the server task panicked
    pub async fn requests(self) -> io::Result<Vec<Vec<u8>>> {
        self.handle
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }
}

/// Raw response carrying `body`, with `Content-Length` and `Connection: close`
#[must_use]
pub fn http_response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut response = response_head(status, headers, body.len() as u64).into_bytes();
    response.extend_from_slice(body);
    response
}

/// Raw response to a HEAD request announcing `content_length` without a body
#[must_use]
pub fn http_head_response(
    status: &str,
    headers: &[(&str, &str)],
    content_length: u64,
) -> Vec<u8> {
    response_head(status, headers, content_length).into_bytes()
}

fn response_head(status: &str, headers: &[(&str, &str)], content_length: u64) -> String {
    let mut head = format!("HTTP/1.1 {}\r\n", status);
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        content_length
    ));
    head
}

/// Split a captured request into its head (lowercased) and body
#[must_use]
pub fn request_parts(raw: &[u8]) -> (String, Vec<u8>) {
    match head_end(raw) {
        Some(end) => {
            let (head, body) = raw.split_at(end);
            (String::from_utf8_lossy(head).to_ascii_lowercase(), body.to_vec())
        },
        None => (String::from_utf8_lossy(raw).to_ascii_lowercase(), Vec::new()),
    }
}

fn head_end(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| p + 4)
}

fn declared_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}

async fn read_request(socket: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        if let Some(end) = head_end(&request) {
            let body_len = declared_length(request.get(..end).unwrap_or_default());
            if request.len() >= end + body_len {
                return Ok(request);
            }
        }

        let read = socket.read(&mut chunk).await?;
        if read == 0 {
            return Ok(request);
        }
        request.extend_from_slice(chunk.get(..read).unwrap_or_default());
    }
}
