//! Status reporting service
//!
//! This module separates operator-facing status lines from the mirror logic,
//! allowing different frontends to implement their own reporting.

use crate::services::format::format_size;
use crate::types::{Collection, ImageDescriptor, ImageOutcome, MirrorStats};
use std::io::Write;

/// Column at which the image status word starts
const STATUS_COLUMN: usize = 80;

/// Trait for reporting per-collection and per-image status during a run
pub trait StatusReporter: Send + Sync {
    /// A collection was returned by the catalog and is about to be processed
    fn collection_started(&self, collection: &Collection);

    /// A collection was skipped after a collection-fatal failure
    fn collection_failed(&self, collection: &Collection, error: &str);

    /// An image is about to be probed and possibly downloaded
    ///
    /// Not called in list-only mode.
    fn image_started(&self, collection: &Collection, image: &ImageDescriptor);

    /// One image reached its final outcome
    fn image_finished(
        &self,
        collection: &Collection,
        image: &ImageDescriptor,
        outcome: &ImageOutcome,
    );

    /// The run finished; `stats` holds the totals
    fn run_completed(&self, stats: &MirrorStats);
}

/// No-op reporter that discards all status updates
pub struct NoOpStatusReporter;

impl StatusReporter for NoOpStatusReporter {
    fn collection_started(&self, _collection: &Collection) {}

    fn collection_failed(&self, _collection: &Collection, _error: &str) {}

    fn image_started(&self, _collection: &Collection, _image: &ImageDescriptor) {}

    fn image_finished(
        &self,
        _collection: &Collection,
        _image: &ImageDescriptor,
        _outcome: &ImageOutcome,
    ) {
    }

    fn run_completed(&self, _stats: &MirrorStats) {}
}

/// Console reporter printing one status line per event to stdout
pub struct ConsoleStatusReporter {
    quiet_summary: bool,
}

impl ConsoleStatusReporter {
    /// Create a new console reporter
    ///
    /// # Arguments
    /// * `quiet_summary` - Suppress the human-readable summary (e.g. when JSON is
    ///   printed instead)
    #[must_use]
    pub fn new(quiet_summary: bool) -> Self {
        Self { quiet_summary }
    }

    fn image_label(image: &ImageDescriptor) -> String {
        if image.attribution_text.is_empty() {
            format!("    {}", image.asset_id)
        } else {
            format!("    {} ({})", image.asset_id, image.attribution_text)
        }
    }

    /// Text printed before an image is probed, status column included
    #[must_use]
    pub fn image_prefix(image: &ImageDescriptor) -> String {
        format!(
            "{:<width$} ... ",
            Self::image_label(image),
            width = STATUS_COLUMN
        )
    }

    /// Text completing the line once the image is done
    #[must_use]
    pub fn status_text(outcome: &ImageOutcome) -> String {
        match outcome {
            ImageOutcome::Downloaded { bytes } => {
                format!("downloading ... done ({})", format_size(*bytes))
            },
            other => other.status_label(),
        }
    }

    /// Format the end-of-run summary lines
    #[must_use]
    pub fn summary_lines(stats: &MirrorStats) -> Vec<String> {
        let mut lines = vec![format!(
            "downloaded {} image(s) with a total size of {}",
            stats.images_downloaded,
            format_size(stats.bytes_downloaded)
        )];

        if stats.images_current > 0 {
            lines.push(format!("{} image(s) already present", stats.images_current));
        }
        if stats.images_failed > 0 || stats.collections_failed > 0 {
            lines.push(format!(
                "{} image(s) and {} collection(s) failed",
                stats.images_failed, stats.collections_failed
            ));
        }

        lines
    }
}

impl Default for ConsoleStatusReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl StatusReporter for ConsoleStatusReporter {
    fn collection_started(&self, collection: &Collection) {
        println!("found collection: {}", collection.name);
    }

    fn collection_failed(&self, collection: &Collection, error: &str) {
        println!("failed to process collection [{}]: {}", collection.name, error);
    }

    fn image_started(&self, _collection: &Collection, image: &ImageDescriptor) {
        let mut stdout = std::io::stdout().lock();
        // Best effort: a closed stdout must not fail the run
        let _ = write!(stdout, "{}", Self::image_prefix(image));
        let _ = stdout.flush();
    }

    fn image_finished(
        &self,
        _collection: &Collection,
        image: &ImageDescriptor,
        outcome: &ImageOutcome,
    ) {
        match outcome {
            ImageOutcome::Listed => println!("{}", Self::image_label(image)),
            other => println!("{}", Self::status_text(other)),
        }
    }

    fn run_completed(&self, stats: &MirrorStats) {
        if self.quiet_summary {
            return;
        }
        for line in Self::summary_lines(stats) {
            println!("{}", line);
        }
    }
}
