//! Mirror engine
//!
//! Reconciles the remote catalog against the local mirror, one collection and
//! one image at a time. Failures are isolated by scope: an image failure
//! skips that image, a collection failure skips that collection, and only a
//! failed collection listing aborts the run.

use crate::catalog::{CatalogClient, CatalogSource};
use crate::config::{FreshnessPolicy, MirrorConfig};
use crate::download::{HttpImageFetcher, ImageFetcher};
use crate::error::{MirrorError, Result};
use crate::services::{ContentTypeHandler, MirrorStore, NoOpStatusReporter, StatusReporter};
use crate::types::{Collection, ImageDescriptor, ImageOutcome, MirrorStats};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Drives a mirror run over a catalog source and an image fetcher
pub struct MirrorEngine {
    config: MirrorConfig,
    catalog: Arc<dyn CatalogSource>,
    fetcher: Arc<dyn ImageFetcher>,
    reporter: Arc<dyn StatusReporter>,
    store: MirrorStore,
}

impl MirrorEngine {
    /// Create an engine from explicit collaborators
    #[must_use]
    pub fn new(
        config: MirrorConfig,
        catalog: Arc<dyn CatalogSource>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        let store = MirrorStore::new(config.output_root.clone(), config.freshness);
        Self {
            config,
            catalog,
            fetcher,
            reporter: Arc::new(NoOpStatusReporter),
            store,
        }
    }

    /// Create an engine talking HTTP to the configured server
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Failed to create HTTP clients
    pub fn from_config(config: MirrorConfig) -> Result<Self> {
        config.validate()?;
        let catalog = CatalogClient::from_config(&config)?;
        let fetcher = HttpImageFetcher::new(config.timeout(), config.show_progress)?;
        Ok(Self::new(config, Arc::new(catalog), Arc::new(fetcher)))
    }

    /// Attach a status reporter
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &MirrorStore {
        &self.store
    }

    /// Mirror every collection of the catalog
    ///
    /// # Errors
    /// - `CatalogUnavailable` when the collection list cannot be fetched;
    ///   every later failure is reported and counted instead
    pub async fn run(&self) -> Result<MirrorStats> {
        let start_time = Instant::now();
        let filters = self.config.filter_labels();
        info!(
            server = %self.config.server,
            region = %self.config.region,
            filters = ?filters,
            "Fetching collection list"
        );

        let collections = self
            .catalog
            .list_collections(&self.config.region, &filters)
            .await?;
        info!("Found {} collection(s)", collections.len());

        let mut stats = MirrorStats::default();
        for collection in &collections {
            stats.collections_seen += 1;
            self.reporter.collection_started(collection);

            if let Err(e) = self.mirror_collection(collection, &filters, &mut stats).await {
                warn!(collection = %collection.name, error = %e, "Skipping collection");
                stats.collections_failed += 1;
                self.reporter.collection_failed(collection, &e.to_string());
            }
        }

        info!(
            downloaded = stats.images_downloaded,
            bytes = stats.bytes_downloaded,
            current = stats.images_current,
            failed = stats.images_failed,
            "Mirror run finished in {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
        self.reporter.run_completed(&stats);
        Ok(stats)
    }

    /// Mirror one collection, folding image outcomes into `stats`
    ///
    /// # Errors
    /// - The image list could not be fetched
    /// - The collection name is unusable or its directory cannot be created
    #[instrument(skip(self, filters, stats), fields(collection = %collection.name))]
    pub async fn mirror_collection(
        &self,
        collection: &Collection,
        filters: &[String],
        stats: &mut MirrorStats,
    ) -> Result<()> {
        let images = self
            .catalog
            .list_images(&collection.id, &self.config.region, filters)
            .await?;
        debug!("{} image(s) listed", images.len());

        if !self.config.list_only {
            self.store.collection_dir(collection)?;
        }

        for image in &images {
            if !self.config.list_only {
                self.reporter.image_started(collection, image);
            }

            let outcome = match self.mirror_image(collection, image).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Close the started line before the collection is abandoned
                    let reason = e.to_string();
                    self.reporter
                        .image_finished(collection, image, &ImageOutcome::Failed { reason });
                    return Err(e);
                },
            };
            stats.record(&outcome);
            self.reporter.image_finished(collection, image, &outcome);
        }

        Ok(())
    }

    /// Bring the local copy of one image up to date
    ///
    /// Image-level failures come back as [`ImageOutcome::Failed`]; only a
    /// collection-level failure (directory creation) is an `Err`.
    ///
    /// # Errors
    /// - The collection directory cannot be created
    pub async fn mirror_image(
        &self,
        collection: &Collection,
        image: &ImageDescriptor,
    ) -> Result<ImageOutcome> {
        if self.config.list_only {
            return Ok(ImageOutcome::Listed);
        }

        let url = image.full_resolution_url();

        let info = match self.fetcher.probe(&url).await {
            Ok(info) => info,
            Err(e) => return Ok(Self::skipped(image, "probe failed", &e)),
        };

        let extension = match ContentTypeHandler::extension_for(&info.content_type) {
            Ok(ext) => ext,
            Err(e) => return Ok(Self::skipped(image, "unusable content type", &e)),
        };

        let destination = match self.store.image_path(collection, &image.asset_id, extension) {
            Ok(path) => path,
            Err(e) => return Ok(Self::skipped(image, "unusable asset id", &e)),
        };

        if self.store.is_current(&destination, info.content_length) {
            debug!(asset_id = %image.asset_id, "Already mirrored");
            return Ok(ImageOutcome::Current);
        }

        let dir = self.store.collection_dir(collection)?;
        MirrorStore::ensure_dir(&dir)?;

        let bytes = match self.fetcher.fetch_to(&url, &destination).await {
            Ok(bytes) => bytes,
            Err(e) => return Ok(Self::skipped(image, "download failed", &e)),
        };

        if bytes != info.content_length {
            warn!(
                asset_id = %image.asset_id,
                expected = info.content_length,
                received = bytes,
                "Downloaded size differs from probed size"
            );
        }

        if self.store.policy() == FreshnessPolicy::SizeAndChecksum {
            if let Err(e) = MirrorStore::write_checksum(&destination) {
                warn!(asset_id = %image.asset_id, error = %e, "Could not record checksum");
            }
        }

        debug!(
            asset_id = %image.asset_id,
            bytes,
            path = %destination.display(),
            "Image mirrored"
        );
        Ok(ImageOutcome::Downloaded { bytes })
    }

    fn skipped(image: &ImageDescriptor, stage: &str, error: &MirrorError) -> ImageOutcome {
        warn!(asset_id = %image.asset_id, error = %error, "Skipping image: {}", stage);
        ImageOutcome::Failed {
            reason: error.to_string(),
        }
    }
}
