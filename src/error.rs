//! Error types for catalog and mirror operations

use thiserror::Error;

/// Result type alias for mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Error types for catalog fetches and image mirroring
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Input/output errors (permission denied, disk full, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failures
    #[error("Network error: {0}")]
    Network(String),

    /// The catalog service could not be reached or answered with garbage
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No file extension is known for the probed content type
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// A required response header was absent or malformed
    #[error("Missing or invalid header '{header}' for {url}")]
    MissingHeader { header: String, url: String },

    /// The server answered with a non-success status
    #[error("HTTP error {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// A collection name that cannot be used as a directory
    #[error("Invalid collection '{0}'")]
    InvalidCollection(String),
}

impl MirrorError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new catalog unavailable error
    pub fn catalog_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::CatalogUnavailable(msg.into())
    }

    /// Create a new unsupported content type error
    pub fn unsupported_content_type<S: Into<String>>(content_type: S) -> Self {
        Self::UnsupportedContentType(content_type.into())
    }

    /// Create a missing header error
    pub fn missing_header<H: Into<String>, U: Into<String>>(header: H, url: U) -> Self {
        Self::MissingHeader {
            header: header.into(),
            url: url.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status<U: Into<String>>(status: u16, url: U) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Create an invalid collection error
    pub fn invalid_collection<S: Into<String>>(name: S) -> Self {
        Self::InvalidCollection(name.into())
    }

    /// Create network error with operation context
    pub fn network_error<S: Into<String>, E: std::fmt::Display>(context: S, error: E) -> Self {
        Self::Network(format!("{}: {}", context.into(), error))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }
}
