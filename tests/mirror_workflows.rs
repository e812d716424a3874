//! End-to-end mirror runs against in-memory catalog and image host
//!
//! These drive `MirrorEngine::run` the way the binary does and check the
//! resulting directory tree, counters and status events.

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use wallpaper_mirror::{
    mock::{MockCatalog, MockImageFetcher, RecordingReporter, ReportedEvent},
    Collection, ImageDescriptor, ImageOutcome, MirrorConfig, MirrorEngine,
};

fn image(id: &str) -> ImageDescriptor {
    ImageDescriptor::new(id, format!("https://img.test/{id}"), format!("Photo by {id}"))
}

fn url(id: &str) -> String {
    format!("https://img.test/{id}=s3840")
}

fn config(root: &TempDir) -> MirrorConfig {
    MirrorConfig::builder()
        .output_root(root.path())
        .build()
        .unwrap()
}

/// One collection "Landscapes" holding three JPEGs of 100, 200 and 300 bytes
fn landscapes() -> (MockCatalog, Arc<MockImageFetcher>) {
    let catalog = MockCatalog::new().with_collection(
        Collection::new("54", "Landscapes"),
        vec![image("1"), image("2"), image("3")],
    );
    let fetcher = Arc::new(
        MockImageFetcher::new()
            .with_image(url("1"), "image/jpeg", vec![1; 100])
            .with_image(url("2"), "image/jpeg", vec![2; 200])
            .with_image(url("3"), "image/jpeg", vec![3; 300]),
    );
    (catalog, fetcher)
}

#[tokio::test]
async fn test_fresh_run_counts_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, fetcher) = landscapes();
    let engine = MirrorEngine::new(config(&temp_dir), Arc::new(catalog), fetcher);

    let stats = engine.run().await.unwrap();

    assert_eq!(stats.collections_seen, 1);
    assert_eq!(stats.images_downloaded, 3);
    assert_eq!(stats.bytes_downloaded, 600);
    assert_eq!(stats.images_failed, 0);

    let dir = temp_dir.path().join("Landscapes");
    for (id, size) in [("1", 100), ("2", 200), ("3", 300)] {
        let path = dir.join(format!("{id}.jpg"));
        assert_eq!(fs::metadata(&path).unwrap().len(), size);
    }
}

#[tokio::test]
async fn test_second_run_fetches_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, fetcher) = landscapes();
    let reporter = Arc::new(RecordingReporter::new());
    let engine = MirrorEngine::new(config(&temp_dir), Arc::new(catalog), fetcher.clone())
        .with_reporter(reporter.clone());

    engine.run().await.unwrap();
    fetcher.reset_counters();

    let stats = engine.run().await.unwrap();
    assert_eq!(fetcher.fetch_count(), 0);
    assert_eq!(stats.images_current, 3);
    assert_eq!(stats.images_downloaded, 0);
    assert_eq!(stats.bytes_downloaded, 0);

    let second_run: Vec<_> = reporter.image_outcomes().into_iter().skip(3).collect();
    assert!(second_run.iter().all(|(_, o)| *o == ImageOutcome::Current));
}

#[tokio::test]
async fn test_truncated_file_is_redownloaded() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, fetcher) = landscapes();
    let engine = MirrorEngine::new(config(&temp_dir), Arc::new(catalog), fetcher.clone());
    engine.run().await.unwrap();

    let path = temp_dir.path().join("Landscapes").join("2.jpg");
    fs::write(&path, vec![2; 50]).unwrap();
    fetcher.reset_counters();

    let stats = engine.run().await.unwrap();
    assert_eq!(fetcher.fetched_urls(), vec![url("2")]);
    assert_eq!(stats.images_downloaded, 1);
    assert_eq!(stats.bytes_downloaded, 200);
    assert_eq!(fs::metadata(&path).unwrap().len(), 200);
}

#[tokio::test]
async fn test_failing_image_list_isolated_to_collection() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = MockCatalog::new()
        .with_collection(Collection::new("a", "Broken"), vec![image("1")])
        .with_collection(Collection::new("b", "Fine"), vec![image("2")])
        .with_failing_collection("a");
    let fetcher = Arc::new(
        MockImageFetcher::new()
            .with_image(url("1"), "image/png", vec![0; 10])
            .with_image(url("2"), "image/png", vec![0; 20]),
    );
    let reporter = Arc::new(RecordingReporter::new());
    let engine = MirrorEngine::new(config(&temp_dir), Arc::new(catalog), fetcher)
        .with_reporter(reporter.clone());

    let stats = engine.run().await.unwrap();

    assert_eq!(stats.collections_seen, 2);
    assert_eq!(stats.collections_failed, 1);
    assert_eq!(stats.images_downloaded, 1);
    assert_eq!(reporter.failed_collections(), vec!["Broken".to_string()]);
    assert!(temp_dir.path().join("Fine").join("2.png").exists());
    assert!(!temp_dir.path().join("Broken").exists());
}

#[tokio::test]
async fn test_failed_image_does_not_stop_collection() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, fetcher) = landscapes();
    fetcher.fail_probe(&url("1"));
    fetcher.fail_fetch(&url("2"), 500);
    let engine = MirrorEngine::new(config(&temp_dir), Arc::new(catalog), fetcher);

    let stats = engine.run().await.unwrap();
    assert_eq!(stats.images_seen, 3);
    assert_eq!(stats.images_failed, 2);
    assert_eq!(stats.images_downloaded, 1);
    assert_eq!(stats.bytes_downloaded, 300);
    assert_eq!(stats.collections_failed, 0);
}

#[tokio::test]
async fn test_content_types_map_to_extensions() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = MockCatalog::new().with_collection(
        Collection::new("m", "Mixed"),
        vec![image("j"), image("p"), image("w")],
    );
    let fetcher = Arc::new(
        MockImageFetcher::new()
            .with_image(url("j"), "image/jpeg", vec![0; 4])
            .with_image(url("p"), "image/png; charset=binary", vec![0; 4])
            .with_image(url("w"), "IMAGE/WEBP", vec![0; 4]),
    );
    let engine = MirrorEngine::new(config(&temp_dir), Arc::new(catalog), fetcher);

    engine.run().await.unwrap();

    let dir = temp_dir.path().join("Mixed");
    assert!(dir.join("j.jpg").exists());
    assert!(dir.join("p.png").exists());
    assert!(dir.join("w.webp").exists());
}

#[tokio::test]
async fn test_filters_sent_with_every_request() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, fetcher) = landscapes();
    let catalog = Arc::new(catalog);
    let engine = MirrorEngine::new(config(&temp_dir), catalog.clone(), fetcher);

    engine.run().await.unwrap();

    let expected = vec![
        "chromebook".to_string(),
        "google_branded_chromebook".to_string(),
    ];
    assert_eq!(
        catalog.collection_requests(),
        vec![("en-US".to_string(), expected.clone())]
    );
    assert_eq!(catalog.image_requests(), vec![("54".to_string(), expected)]);
}

#[tokio::test]
async fn test_unfiltered_run_omits_default_labels() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, fetcher) = landscapes();
    let catalog = Arc::new(catalog);
    let config = MirrorConfig::builder()
        .output_root(temp_dir.path())
        .region("ja-JP")
        .unfiltered(true)
        .build()
        .unwrap();
    let engine = MirrorEngine::new(config, catalog.clone(), fetcher);

    engine.run().await.unwrap();

    assert_eq!(
        catalog.collection_requests(),
        vec![("ja-JP".to_string(), Vec::<String>::new())]
    );
    assert!(catalog.image_requests().iter().all(|(_, f)| f.is_empty()));
}

#[tokio::test]
async fn test_list_only_reports_every_image() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, fetcher) = landscapes();
    let reporter = Arc::new(RecordingReporter::new());
    let config = MirrorConfig::builder()
        .output_root(temp_dir.path().join("never"))
        .list_only(true)
        .build()
        .unwrap();
    let engine = MirrorEngine::new(config, Arc::new(catalog), fetcher.clone())
        .with_reporter(reporter.clone());

    let stats = engine.run().await.unwrap();

    assert_eq!(stats.images_listed, 3);
    assert_eq!(fetcher.probe_count(), 0);
    assert_eq!(fetcher.fetch_count(), 0);
    assert!(!temp_dir.path().join("never").exists());

    let events = reporter.events();
    assert_eq!(
        events.first(),
        Some(&ReportedEvent::CollectionStarted("Landscapes".to_string()))
    );
    assert!(matches!(events.last(), Some(ReportedEvent::Completed(_))));
}

#[tokio::test]
async fn test_empty_catalog_completes() {
    let temp_dir = TempDir::new().unwrap();
    let engine = MirrorEngine::new(
        config(&temp_dir),
        Arc::new(MockCatalog::new()),
        Arc::new(MockImageFetcher::new()),
    );

    let stats = engine.run().await.unwrap();
    assert_eq!(stats.collections_seen, 0);
    assert_eq!(stats.images_seen, 0);
}
