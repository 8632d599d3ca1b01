// src/archive.rs
//! Zip archive builder
//!
//! Writes the resolved files, plus an optional manifest, into a single zip
//! archive. The archive is assembled in a staging file next to its final
//! location and renamed into place once complete, so readers never observe
//! a half-written package and a failed run never truncates a previous one.

use crate::config::CompressionLevel;
use crate::lock::LockError;
use crate::manifest::{MANIFEST_ENTRY_NAME, ManifestDocument};
use crate::xml::XmlError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to serialize manifest: {0}")]
    Manifest(#[from] XmlError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

/// One written package, as recorded in the inventories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    /// Archive file name (no directory)
    pub name: String,
    pub created: DateTime<Utc>,
    /// Archive size in bytes
    pub size: u64,
    /// Number of data files packaged (the manifest is not counted)
    pub files: usize,
    /// Build label that produced the archive
    pub label: Option<String>,
}

impl ArchiveRecord {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Builds zip packages
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    compression_level: CompressionLevel,
    flatten: bool,
    base_directory: Option<PathBuf>,
}

impl ArchiveBuilder {
    pub fn new(compression_level: CompressionLevel) -> Self {
        Self {
            compression_level,
            flatten: false,
            base_directory: None,
        }
    }

    /// Store every file under its base name only
    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    /// Directory that entry names are made relative to
    pub fn with_base_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_directory = Some(dir.into());
        self
    }

    /// Archive entry name for a packaged file
    ///
    /// Flattened runs use the base name. Otherwise the path relative to the
    /// base directory is used; files outside it keep their own directory
    /// structure with the root stripped.
    pub fn entry_name(&self, path: &Path) -> String {
        if self.flatten {
            if let Some(name) = path.file_name() {
                return name.to_string_lossy().into_owned();
            }
        }

        let relative = self
            .base_directory
            .as_deref()
            .and_then(|base| path.strip_prefix(base).ok())
            .unwrap_or(path);

        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    fn options_for(&self, size: u64) -> SimpleFileOptions {
        let options = SimpleFileOptions::default()
            .unix_permissions(0o644)
            .large_file(size >= u64::from(u32::MAX));
        if self.compression_level.is_store() {
            options.compression_method(CompressionMethod::Stored)
        } else {
            options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(self.compression_level.get())))
        }
    }

    /// Write `files` (and `manifest`, if any) to `output_path`
    ///
    /// Any existing file at `output_path` is replaced. Files that vanished
    /// since resolution are skipped.
    pub fn build(
        &self,
        files: &[PathBuf],
        manifest: Option<&ManifestDocument>,
        output_path: &Path,
    ) -> Result<ArchiveRecord, ArchiveError> {
        let directory = match output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&directory)?;

        // Serialize first so a bad manifest never leaves a staging file behind
        let manifest_bytes = manifest.map(|m| m.to_bytes()).transpose()?;

        let staging = tempfile::Builder::new()
            .prefix(".artipack-")
            .suffix(".zip.tmp")
            .tempfile_in(&directory)?;
        let mut zip = ZipWriter::new(staging);

        let mut names: HashSet<String> = HashSet::new();
        if manifest_bytes.is_some() {
            names.insert(MANIFEST_ENTRY_NAME.to_string());
        }

        let mut written = 0usize;
        for path in files {
            let name = self.entry_name(path);
            if name.is_empty() || names.contains(&name) {
                warn!("Skipping {:?}: archive entry '{}' already taken", path, name);
                continue;
            }

            let mut source = match File::open(path) {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!("Skipping {:?}: file disappeared before packaging", path);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let size = source.metadata()?.len();

            zip.start_file(name.as_str(), self.options_for(size))?;
            io::copy(&mut source, &mut zip)?;
            debug!("Added {:?} as '{}'", path, name);
            names.insert(name);
            written += 1;
        }

        if let Some(bytes) = &manifest_bytes {
            zip.start_file(MANIFEST_ENTRY_NAME, self.options_for(bytes.len() as u64))?;
            io::Write::write_all(&mut zip, bytes)?;
            debug!("Added manifest ({} bytes)", bytes.len());
        }

        let staging = zip.finish()?;
        staging.as_file().sync_all()?;
        staging
            .persist(output_path)
            .map_err(|e| ArchiveError::Io(e.error))?;

        let size = fs::metadata(output_path)?.len();
        let name = output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!(
            "Wrote {:?} ({} file(s), {} bytes, compression {})",
            output_path, written, size, self.compression_level
        );

        Ok(ArchiveRecord {
            name,
            created: Utc::now(),
            size,
            files: written,
            label: None,
        })
    }
}
