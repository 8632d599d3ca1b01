// src/error.rs

//! Error types for packaging runs
//!
//! Every failure a caller can observe maps onto one of four categories
//! (see [`ErrorKind`]). Missing input files are deliberately absent: they
//! are excluded from the archive and logged, never reported as errors.

use crate::archive::ArchiveError;
use crate::config::ConfigError;
use crate::inventory::InventoryError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Coarse failure category of a packaging run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid option, rejected before any run begins
    Configuration,
    /// The manifest generator failed; nothing was written
    Manifest,
    /// The archive could not be written; no inventory was touched
    ArchiveWrite,
    /// The archive was written but an inventory update failed
    InventoryWrite,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Manifest generation failed: {0}")]
    Manifest(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Failed to write archive {path:?}: {source}")]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    #[error("Archive {archive:?} was written but inventory {inventory:?} could not be updated: {source}")]
    InventoryWrite {
        archive: PathBuf,
        inventory: PathBuf,
        #[source]
        source: InventoryError,
    },
}

impl Error {
    /// The failure category, for callers that branch on it
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Manifest(_) => ErrorKind::Manifest,
            Self::ArchiveWrite { .. } => ErrorKind::ArchiveWrite,
            Self::InventoryWrite { .. } => ErrorKind::InventoryWrite,
        }
    }

    /// Path of an archive left on disk by a partially successful run
    ///
    /// Only inventory failures happen after the archive is durably written,
    /// so this is `Some` for [`ErrorKind::InventoryWrite`] alone.
    pub fn archive_path(&self) -> Option<&Path> {
        match self {
            Self::InventoryWrite { archive, .. } => Some(archive),
            _ => None,
        }
    }
}

/// Result type for packaging operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = Error::Config(ConfigError::CompressionLevel(12));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.archive_path().is_none());

        let err = Error::Manifest(anyhow::anyhow!("generator exploded").into());
        assert_eq!(err.kind(), ErrorKind::Manifest);
        assert!(err.to_string().contains("generator exploded"));
    }

    #[test]
    fn test_inventory_failure_exposes_archive() {
        let err = Error::InventoryWrite {
            archive: PathBuf::from("/out/build-3.zip"),
            inventory: PathBuf::from("/out/proj-packages.xml"),
            source: InventoryError::Corrupt {
                path: PathBuf::from("/out/proj-packages.xml"),
                reason: "root element is <html>".to_string(),
            },
        };
        assert_eq!(err.kind(), ErrorKind::InventoryWrite);
        assert_eq!(err.archive_path(), Some(Path::new("/out/build-3.zip")));
    }
}
