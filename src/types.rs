//! Core data types for catalog listings and mirror results

use crate::config::FULL_RESOLUTION_SUFFIX;
use serde::{Deserialize, Serialize};

/// A named, server-defined group of images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Server-side identifier
    pub id: String,
    /// Display name, also used as the local directory name
    pub name: String,
}

impl Collection {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Catalog metadata for one remote image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// Identifier unique within its collection; basis of the local filename
    pub asset_id: String,
    /// Base image URL without a resolution suffix
    pub source_url: String,
    /// Photographer/owner credit, empty when the service sends none
    pub attribution_text: String,
}

impl ImageDescriptor {
    pub fn new<A, U, T>(asset_id: A, source_url: U, attribution_text: T) -> Self
    where
        A: Into<String>,
        U: Into<String>,
        T: Into<String>,
    {
        Self {
            asset_id: asset_id.into(),
            source_url: source_url.into(),
            attribution_text: attribution_text.into(),
        }
    }

    /// URL of the largest rendition the image host serves
    #[must_use]
    pub fn full_resolution_url(&self) -> String {
        format!("{}{}", self.source_url, FULL_RESOLUTION_SUFFIX)
    }
}

/// Result of a metadata-only probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImageInfo {
    /// Value of the `Content-Type` header
    pub content_type: String,
    /// Value of the `Content-Length` header
    pub content_length: u64,
}

/// What happened to a single image during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Local copy already matches the remote image
    Current,
    /// Body fetched and written
    Downloaded { bytes: u64 },
    /// Reported only (list-only mode)
    Listed,
    /// Skipped after an isolated failure
    Failed { reason: String },
}

impl ImageOutcome {
    /// Short status word shown after the image line
    #[must_use]
    pub fn status_label(&self) -> String {
        match self {
            Self::Current => "have".to_string(),
            Self::Downloaded { .. } => "downloaded".to_string(),
            Self::Listed => "listed".to_string(),
            Self::Failed { reason } => format!("failed: {}", reason),
        }
    }
}

/// Run totals, accumulated by the mirror engine and returned at the end
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorStats {
    pub collections_seen: usize,
    pub collections_failed: usize,
    pub images_seen: usize,
    pub images_current: usize,
    pub images_downloaded: usize,
    pub images_failed: usize,
    pub images_listed: usize,
    pub bytes_downloaded: u64,
}

impl MirrorStats {
    /// Fold one image outcome into the totals
    pub fn record(&mut self, outcome: &ImageOutcome) {
        self.images_seen += 1;
        match outcome {
            ImageOutcome::Current => self.images_current += 1,
            ImageOutcome::Downloaded { bytes } => {
                self.images_downloaded += 1;
                self.bytes_downloaded += bytes;
            },
            ImageOutcome::Listed => self.images_listed += 1,
            ImageOutcome::Failed { .. } => self.images_failed += 1,
        }
    }
}
