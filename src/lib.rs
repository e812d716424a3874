#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Wallpaper Mirror
//!
//! Mirrors the wallpaper catalog of the Chromecast/Chromebook backdrop
//! service into a local directory tree, one directory per collection and one
//! file per image.
//!
//! A run lists the collections, lists the images of each collection, probes
//! each image for its content type and size, and downloads only the images
//! whose local copy is missing or has a different size. Runs are idempotent:
//! a second run against an unchanged catalog fetches no bodies.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wallpaper_mirror::{MirrorConfig, MirrorEngine, Server};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = MirrorConfig::builder()
//!     .server(Server::Production)
//!     .region("en-US")
//!     .output_root("wallpapers")
//!     .build()?;
//!
//! let stats = MirrorEngine::from_config(config)?.run().await?;
//! println!("{} new image(s), {} bytes", stats.images_downloaded, stats.bytes_downloaded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure scopes
//!
//! Only a failed collection listing aborts a run. A collection whose image
//! list cannot be fetched, or whose directory cannot be created, is reported
//! and skipped. A failed probe or download skips just that image.
//!
//! ## Feature Flags
//!
//! - `cli` (default): command-line interface, progress bars and tracing setup
//! - `tracing-json`: JSON log output for the command-line interface
//! - `test-utils`: the `mock` module, needed by the integration tests
//!   (`cargo test --features test-utils`)

pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod mirror;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

// Public API exports
pub use catalog::{CatalogClient, CatalogSource};
pub use config::{FreshnessPolicy, MirrorConfig, MirrorConfigBuilder, Server};
pub use download::{HttpImageFetcher, ImageFetcher, ProgressIndicator};
pub use error::{MirrorError, Result};
pub use mirror::MirrorEngine;
pub use services::{
    format_size, ConsoleStatusReporter, ContentTypeHandler, MirrorStore, NoOpStatusReporter,
    StatusReporter,
};
pub use types::{Collection, ImageDescriptor, ImageOutcome, MirrorStats, RemoteImageInfo};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, spans, TracingConfig, TracingFormat};
