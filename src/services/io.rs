//! Local mirror store
//!
//! Owns the on-disk layout `<root>/<collection>/<asset_id>.<ext>` and the
//! freshness check that decides whether a remote image needs fetching.

use crate::config::FreshnessPolicy;
use crate::error::{MirrorError, Result};
use crate::types::Collection;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CHECKSUM_EXTENSION: &str = "sha256";

/// Local directory tree mirroring the remote catalog
#[derive(Debug, Clone)]
pub struct MirrorStore {
    root: PathBuf,
    policy: FreshnessPolicy,
}

impl MirrorStore {
    pub fn new<P: Into<PathBuf>>(root: P, policy: FreshnessPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// Turn a remote name into a single path component
    ///
    /// Separators become `_`; names that would escape or alias the parent
    /// directory are rejected.
    ///
    /// # Errors
    /// - `InvalidCollection` for empty, `.` or `..` names
    pub fn path_component(name: &str) -> Result<String> {
        let cleaned: String = name
            .chars()
            .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
            .collect();

        match cleaned.trim() {
            "" | "." | ".." => Err(MirrorError::invalid_collection(name)),
            _ => Ok(cleaned),
        }
    }

    /// Directory receiving the images of `collection`
    ///
    /// # Errors
    /// - `InvalidCollection` when the name is not usable as a directory
    pub fn collection_dir(&self, collection: &Collection) -> Result<PathBuf> {
        Ok(self.root.join(Self::path_component(&collection.name)?))
    }

    /// Candidate path for one image
    ///
    /// # Errors
    /// - `InvalidCollection` when the collection name or asset id is unusable
    pub fn image_path(
        &self,
        collection: &Collection,
        asset_id: &str,
        extension: &str,
    ) -> Result<PathBuf> {
        let file_name = format!("{}.{}", Self::path_component(asset_id)?, extension);
        Ok(self.collection_dir(collection)?.join(file_name))
    }

    /// Size of a local file, `None` when it does not exist or is not a file
    #[must_use]
    pub fn local_size(path: &Path) -> Option<u64> {
        fs::metadata(path)
            .ok()
            .filter(fs::Metadata::is_file)
            .map(|m| m.len())
    }

    /// Whether the local copy at `path` satisfies a remote image of `remote_size` bytes
    #[must_use]
    pub fn is_current(&self, path: &Path, remote_size: u64) -> bool {
        match Self::local_size(path) {
            Some(local_size) if local_size == remote_size => {},
            Some(local_size) => {
                debug!(
                    path = %path.display(),
                    local_size,
                    remote_size,
                    "Local copy is stale"
                );
                return false;
            },
            None => return false,
        }

        match self.policy {
            FreshnessPolicy::SizeOnly => true,
            FreshnessPolicy::SizeAndChecksum => match Self::verify_checksum(path) {
                Ok(matches) => matches,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Checksum sidecar unusable");
                    false
                },
            },
        }
    }

    /// Create a directory (and parents) if missing
    ///
    /// # Errors
    /// - Directory could not be created
    pub fn ensure_dir(dir: &Path) -> Result<()> {
        if dir.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(dir)
            .map_err(|e| MirrorError::file_io_error("create directory", dir, &e))
    }

    /// Path of the checksum sidecar for an image file
    #[must_use]
    pub fn checksum_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(CHECKSUM_EXTENSION);
        path.with_file_name(name)
    }

    /// SHA-256 of a file's contents, lowercase hex
    ///
    /// # Errors
    /// - File could not be read
    pub fn sha256_file(path: &Path) -> Result<String> {
        let contents = fs::read(path)
            .map_err(|e| MirrorError::file_io_error("read file for checksum", path, &e))?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Record the checksum of `path` in its sidecar
    ///
    /// # Errors
    /// - File could not be read or sidecar could not be written
    pub fn write_checksum(path: &Path) -> Result<String> {
        let digest = Self::sha256_file(path)?;
        let sidecar = Self::checksum_path(path);
        fs::write(&sidecar, format!("{}\n", digest))
            .map_err(|e| MirrorError::file_io_error("write checksum", &sidecar, &e))?;
        Ok(digest)
    }

    /// Compare a file with its recorded checksum
    ///
    /// # Errors
    /// - File or sidecar could not be read
    pub fn verify_checksum(path: &Path) -> Result<bool> {
        let sidecar = Self::checksum_path(path);
        let recorded = fs::read_to_string(&sidecar)
            .map_err(|e| MirrorError::file_io_error("read checksum", &sidecar, &e))?;
        let actual = Self::sha256_file(path)?;

        if recorded.trim() == actual {
            Ok(true)
        } else {
            warn!(
                "Checksum mismatch for {}: recorded {}, actual {}",
                path.display(),
                recorded.trim(),
                actual
            );
            Ok(false)
        }
    }
}
