//! Content type and size formatting service
//!
//! The extension table is owned here rather than delegated to a platform
//! MIME guesser, so `image/jpeg` always lands on disk as `.jpg`.

use crate::error::{MirrorError, Result};

/// Content type → file extension, without the dot
const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/pjpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("image/bmp", "bmp"),
    ("image/tiff", "tiff"),
    ("image/avif", "avif"),
    ("image/heic", "heic"),
    ("image/svg+xml", "svg"),
];

/// Service mapping probed content types to local file extensions
pub struct ContentTypeHandler;

impl ContentTypeHandler {
    /// Strip parameters and normalize case (`"Image/JPEG; q=1"` → `"image/jpeg"`)
    #[must_use]
    pub fn essence(content_type: &str) -> String {
        content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    /// Get the file extension for a content type
    ///
    /// # Errors
    /// - `UnsupportedContentType` when the type is not in the table
    ///
    /// # Examples
    /// ```rust
    /// use wallpaper_mirror::services::ContentTypeHandler;
    ///
    /// assert_eq!(ContentTypeHandler::extension_for("image/jpeg").unwrap(), "jpg");
    /// assert_eq!(ContentTypeHandler::extension_for("image/png").unwrap(), "png");
    /// assert!(ContentTypeHandler::extension_for("text/html").is_err());
    /// ```
    pub fn extension_for(content_type: &str) -> Result<&'static str> {
        let essence = Self::essence(content_type);
        EXTENSION_TABLE
            .iter()
            .find(|(mime, _)| *mime == essence)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| MirrorError::unsupported_content_type(content_type.trim()))
    }

    /// Check if a content type is known
    #[must_use]
    pub fn is_supported(content_type: &str) -> bool {
        Self::extension_for(content_type).is_ok()
    }
}

/// Format a byte count for display (`1536` → `"1.5 KB"`)
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS.get(unit_index).unwrap_or(&"B"))
    } else {
        format!("{:.1} {}", size, UNITS.get(unit_index).unwrap_or(&"B"))
    }
}
