//! Configuration types for catalog and mirror operations

use crate::error::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Filter labels sent with every catalog request unless disabled
pub const DEFAULT_FILTER_LABELS: &[&str] = &["chromebook", "google_branded_chromebook"];

/// Language/region code used when none is given
pub const DEFAULT_REGION: &str = "en-US";

/// Resolution suffix appended to image URLs; the image host caps at 4K
pub const FULL_RESOLUTION_SUFFIX: &str = "=s3840";

/// Default timeout applied to every HTTP request, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default output directory, relative to the working directory
pub const DEFAULT_OUTPUT_ROOT: &str = "output";

const COLLECTIONS_PATH: &str = "/cast/chromecast/home/wallpaper/collections?rt=b";
const IMAGES_PATH: &str = "/cast/chromecast/home/wallpaper/collection-images?rt=b";

/// Catalog backend to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Server {
    /// Production service
    Production,
    /// Staging (alpha) sandbox
    Staging,
    /// Development sandbox
    Test,
}

impl Default for Server {
    fn default() -> Self {
        Self::Production
    }
}

impl Server {
    /// Host name serving the catalog for this server
    #[must_use]
    pub fn host(self) -> &'static str {
        match self {
            Self::Production => "clients3.google.com",
            Self::Staging => "chromecast-staging.sandbox.google.com",
            Self::Test => "chromecast-dev.sandbox.google.com",
        }
    }

    /// Endpoint returning the list of collections
    #[must_use]
    pub fn collections_url(self) -> String {
        format!("https://{}{}", self.host(), COLLECTIONS_PATH)
    }

    /// Endpoint returning the images of one collection
    #[must_use]
    pub fn images_url(self) -> String {
        format!("https://{}{}", self.host(), IMAGES_PATH)
    }
}

impl std::fmt::Display for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "prod"),
            Self::Staging => write!(f, "staging"),
            Self::Test => write!(f, "test"),
        }
    }
}

impl FromStr for Server {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "prod" | "production" => Ok(Self::Production),
            "staging" | "alpha" => Ok(Self::Staging),
            "test" | "dev" => Ok(Self::Test),
            other => Err(MirrorError::invalid_config(format!(
                "Unknown server '{}'. Expected one of: prod, staging, test",
                other
            ))),
        }
    }
}

/// How a local file is judged to be current
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreshnessPolicy {
    /// File size equals the remote `Content-Length`
    SizeOnly,
    /// Size matches and the `.sha256` sidecar matches the file contents
    SizeAndChecksum,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::SizeOnly
    }
}

/// Configuration for a mirror run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Catalog backend
    pub server: Server,

    /// Language/region code sent with catalog requests
    pub region: String,

    /// Send the default filter labels
    pub use_default_filters: bool,

    /// Additional filter labels
    pub extra_filters: Vec<String>,

    /// Root directory receiving one subdirectory per collection
    pub output_root: PathBuf,

    /// Timeout for catalog requests, probes and body fetches (seconds)
    pub timeout_secs: u64,

    /// Only list collections and images, never download
    pub list_only: bool,

    /// Freshness criterion for local files
    pub freshness: FreshnessPolicy,

    /// Show byte progress while a body downloads
    pub show_progress: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            server: Server::default(),
            region: DEFAULT_REGION.to_string(),
            use_default_filters: true,
            extra_filters: Vec::new(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            list_only: false,
            freshness: FreshnessPolicy::default(),
            show_progress: false,
        }
    }
}

impl MirrorConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use wallpaper_mirror::{MirrorConfig, Server};
    ///
    /// let config = MirrorConfig::builder()
    ///     .server(Server::Staging)
    ///     .region("de-DE")
    ///     .unfiltered(true)
    ///     .build()
    ///     .unwrap();
    /// assert!(config.filter_labels().is_empty());
    /// ```
    #[must_use]
    pub fn builder() -> MirrorConfigBuilder {
        MirrorConfigBuilder::default()
    }

    /// Filter labels to send with catalog requests
    #[must_use]
    pub fn filter_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = if self.use_default_filters {
            DEFAULT_FILTER_LABELS.iter().map(|s| (*s).to_string()).collect()
        } else {
            Vec::new()
        };

        for label in &self.extra_filters {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }

        labels
    }

    /// Request timeout as a `Duration`
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Empty region code
    /// - Zero timeout
    /// - Empty output root
    /// - Empty filter label
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(MirrorError::invalid_config("Region code cannot be empty"));
        }

        if self.timeout_secs == 0 {
            return Err(MirrorError::invalid_config(
                "Timeout must be at least 1 second",
            ));
        }

        if self.output_root.as_os_str().is_empty() {
            return Err(MirrorError::invalid_config("Output directory cannot be empty"));
        }

        if self.extra_filters.iter().any(|f| f.trim().is_empty()) {
            return Err(MirrorError::invalid_config("Filter labels cannot be empty"));
        }

        Ok(())
    }
}

/// Builder for `MirrorConfig`
#[derive(Debug, Default)]
pub struct MirrorConfigBuilder {
    config: MirrorConfig,
}

impl MirrorConfigBuilder {
    /// Set catalog backend
    #[must_use]
    pub fn server(mut self, server: Server) -> Self {
        self.config.server = server;
        self
    }

    /// Set region code
    #[must_use]
    pub fn region<S: Into<String>>(mut self, region: S) -> Self {
        self.config.region = region.into();
        self
    }

    /// Drop the default filter labels
    #[must_use]
    pub fn unfiltered(mut self, unfiltered: bool) -> Self {
        self.config.use_default_filters = !unfiltered;
        self
    }

    /// Add an extra filter label
    #[must_use]
    pub fn filter<S: Into<String>>(mut self, label: S) -> Self {
        self.config.extra_filters.push(label.into());
        self
    }

    /// Set output root directory
    #[must_use]
    pub fn output_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.config.output_root = root.into();
        self
    }

    /// Set request timeout in seconds
    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Enable list-only mode
    #[must_use]
    pub fn list_only(mut self, list_only: bool) -> Self {
        self.config.list_only = list_only;
        self
    }

    /// Set freshness policy
    #[must_use]
    pub fn freshness(mut self, policy: FreshnessPolicy) -> Self {
        self.config.freshness = policy;
        self
    }

    /// Enable download progress bars
    #[must_use]
    pub fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Validation failure, see [`MirrorConfig::validate`]
    pub fn build(self) -> Result<MirrorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MirrorConfig::default();
        assert_eq!(config.server, Server::Production);
        assert_eq!(config.region, "en-US");
        assert_eq!(config.output_root, PathBuf::from("output"));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.freshness, FreshnessPolicy::SizeOnly);
        assert!(!config.list_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_filter_labels_present() {
        let config = MirrorConfig::default();
        assert_eq!(
            config.filter_labels(),
            vec!["chromebook".to_string(), "google_branded_chromebook".to_string()]
        );
    }

    #[test]
    fn test_unfiltered_omits_default_labels() {
        let config = MirrorConfig::builder().unfiltered(true).build().unwrap();
        assert!(config.filter_labels().is_empty());

        let config = MirrorConfig::builder()
            .unfiltered(true)
            .filter("custom")
            .build()
            .unwrap();
        assert_eq!(config.filter_labels(), vec!["custom".to_string()]);
    }

    #[test]
    fn test_extra_filters_are_deduplicated() {
        let config = MirrorConfig::builder()
            .filter("chromebook")
            .filter("extra")
            .build()
            .unwrap();
        assert_eq!(
            config.filter_labels(),
            vec![
                "chromebook".to_string(),
                "google_branded_chromebook".to_string(),
                "extra".to_string()
            ]
        );
    }

    #[test]
    fn test_validation_failures() {
        assert!(MirrorConfig::builder().region("  ").build().is_err());
        assert!(MirrorConfig::builder().timeout_secs(0).build().is_err());
        assert!(MirrorConfig::builder().output_root("").build().is_err());
        assert!(MirrorConfig::builder().filter("").build().is_err());

        let err = MirrorConfig::builder().timeout_secs(0).build().unwrap_err();
        assert!(err.to_string().contains("Timeout"));
    }

    #[test]
    fn test_server_parsing_and_display() {
        assert_eq!("prod".parse::<Server>().unwrap(), Server::Production);
        assert_eq!("STAGING".parse::<Server>().unwrap(), Server::Staging);
        assert_eq!("dev".parse::<Server>().unwrap(), Server::Test);
        assert!("qa".parse::<Server>().is_err());

        for server in [Server::Production, Server::Staging, Server::Test] {
            assert_eq!(server.to_string().parse::<Server>().unwrap(), server);
        }
    }

    #[test]
    fn test_server_endpoints() {
        assert_eq!(
            Server::Production.collections_url(),
            "https://clients3.google.com/cast/chromecast/home/wallpaper/collections?rt=b"
        );
        assert_eq!(
            Server::Staging.images_url(),
            concat!(
                "https://chromecast-staging.sandbox.google.com",
                "/cast/chromecast/home/wallpaper/collection-images?rt=b"
            )
        );
        assert!(Server::Test.collections_url().contains("chromecast-dev.sandbox"));
    }

    #[test]
    fn test_config_serialization() {
        let config = MirrorConfig::builder()
            .server(Server::Test)
            .freshness(FreshnessPolicy::SizeAndChecksum)
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: MirrorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
