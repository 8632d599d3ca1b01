// src/version/mod.rs

//! Archive name allocation
//!
//! Packages are written as `<base>-<sequence>.zip`, where the sequence is
//! one more than the highest sequence already present in the destination
//! directory. In single-instance mode the name is always `<base>.zip` and
//! each run overwrites the previous archive.
//!
//! The directory scan is not atomic on its own. Callers that may race with
//! another packaging run hold the allocation lock (see [`crate::lock`]) from
//! the scan until the archive has been written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension of generated archives
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Destination directory and base name of a package
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageName {
    pub directory: PathBuf,
    pub base: String,
}

impl PackageName {
    /// Split a configured name into directory and base name
    ///
    /// The name may carry a directory prefix. A relative name is placed
    /// under `artifact_directory`.
    ///
    /// Examples (artifact directory `/artifacts`):
    /// - "nightly" → `/artifacts`, "nightly"
    /// - "dist/app" → `/artifacts/dist`, "app"
    /// - "/srv/drop/app" → `/srv/drop`, "app"
    pub fn from_config(name: &str, artifact_directory: &Path) -> Self {
        let name = name.trim().replace('\\', "/");
        let path = Path::new(&name);
        let full = if path.is_absolute() {
            path.to_path_buf()
        } else {
            artifact_directory.join(path)
        };

        let base = full
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = full
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| artifact_directory.to_path_buf());

        Self { directory, base }
    }

    /// Archive path for a sequence number, or the fixed single-instance path
    pub fn archive_path(&self, sequence: Option<u64>) -> PathBuf {
        let file_name = match sequence {
            Some(seq) => format!("{}-{}.{}", self.base, seq, ARCHIVE_EXTENSION),
            None => format!("{}.{}", self.base, ARCHIVE_EXTENSION),
        };
        self.directory.join(file_name)
    }

    /// Sequence number of `file_name` if it is a versioned archive of this base
    ///
    /// Only exact `<base>-<digits>.zip` names count; anything else is ignored.
    /// A sequence too large for `u64` reads as `u64::MAX`, which leaves no
    /// room for a next sequence.
    pub fn sequence_of(&self, file_name: &str) -> Option<u64> {
        let digits = file_name
            .strip_prefix(self.base.as_str())?
            .strip_prefix('-')?
            .strip_suffix(ARCHIVE_EXTENSION)?
            .strip_suffix('.')?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(digits.parse::<u64>().unwrap_or(u64::MAX))
    }

    /// Highest sequence number present in the destination directory
    ///
    /// A destination that does not exist yet holds no archives.
    pub fn latest_sequence(&self) -> io::Result<Option<u64>> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut latest = None;
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(seq) = file_name.to_str().and_then(|n| self.sequence_of(n)) else {
                continue;
            };
            latest = latest.max(Some(seq));
        }
        Ok(latest)
    }
}

/// Choose the output archive path
pub fn allocate_name(
    destination_directory: &Path,
    base_name: &str,
    single_instance: bool,
) -> io::Result<PathBuf> {
    let name = PackageName {
        directory: destination_directory.to_path_buf(),
        base: base_name.to_string(),
    };

    if single_instance {
        return Ok(name.archive_path(None));
    }

    let latest = name.latest_sequence()?;
    let next = match latest {
        Some(seq) => seq.checked_add(1).ok_or_else(|| {
            io::Error::other(format!(
                "Sequence numbers for '{}' are exhausted in {:?}",
                base_name, destination_directory
            ))
        })?,
        None => 1,
    };
    debug!(
        "Allocated sequence {} for '{}' (previous: {:?})",
        next, base_name, latest
    );
    Ok(name.archive_path(Some(next)))
}
