// src/lock.rs

//! Named resource locks for concurrent packaging runs
//!
//! Two packaging runs that share a destination directory and base name, or
//! share an inventory file, must not interleave. Each shared resource gets a
//! lock file next to it, held with `flock(LOCK_EX)` for the critical
//! section:
//!
//! - **Allocation lock**: `<destination>/.<base>.lock`, held from the
//!   sequence-number scan until the archive is persisted
//! - **Inventory lock**: `<inventory>.lock`, held for read + append + write
//!
//! Advisory locks also exclude other handles opened by the same process, so
//! the same lock serializes threads and processes alike. The lock is released
//! when the guard is dropped, on success and failure paths alike.
//!
//! # Example
//!
//! ```ignore
//! use artipack::lock::ResourceLock;
//!
//! let _guard = ResourceLock::for_allocation(&dest_dir, "nightly")?;
//! // ... scan, allocate, write ...
//! // lock released on drop
//! ```

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LockError {
    #[error("Failed to create lock file {path:?}: {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("Failed to acquire lock {path:?}: {source}")]
    Acquire { path: PathBuf, source: io::Error },
}

/// Exclusive lock on a named resource
pub struct ResourceLock {
    /// Kept open to maintain the lock
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl ResourceLock {
    /// Acquire an exclusive lock, blocking until available
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self, LockError> {
        let path = path.as_ref().to_path_buf();
        let file = open_lock_file(&path)?;

        file.lock_exclusive().map_err(|source| LockError::Acquire {
            path: path.clone(),
            source,
        })?;

        debug!("Acquired lock {:?}", path);
        Ok(Self { file, path })
    }

    /// Try to acquire an exclusive lock without blocking
    ///
    /// Returns `Ok(None)` if another holder has the lock.
    pub fn try_acquire<P: AsRef<Path>>(path: P) -> Result<Option<Self>, LockError> {
        let path = path.as_ref().to_path_buf();
        let file = open_lock_file(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("Acquired lock {:?}", path);
                Ok(Some(Self { file, path }))
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                debug!("Lock {:?} already held", path);
                Ok(None)
            }
            Err(source) => Err(LockError::Acquire { path, source }),
        }
    }

    /// Lock guarding sequence allocation for `base_name` in `directory`
    pub fn for_allocation(directory: &Path, base_name: &str) -> Result<Self, LockError> {
        Self::acquire(allocation_lock_path(directory, base_name))
    }

    /// Lock guarding read-modify-write of the inventory at `inventory`
    pub fn for_inventory(inventory: &Path) -> Result<Self, LockError> {
        Self::acquire(inventory_lock_path(inventory))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ResourceLock {
    fn drop(&mut self) {
        // Closing the handle releases the lock
        debug!("Released lock {:?}", self.path);
    }
}

/// Lock file path for allocations of `base_name` in `directory`
pub fn allocation_lock_path(directory: &Path, base_name: &str) -> PathBuf {
    directory.join(format!(".{}.lock", base_name))
}

/// Lock file path for an inventory file
pub fn inventory_lock_path(inventory: &Path) -> PathBuf {
    let mut name = inventory
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    inventory.with_file_name(name)
}

fn open_lock_file(path: &Path) -> Result<File, LockError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| LockError::Create {
            path: path.to_path_buf(),
            source,
        })?;
    }

    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|source| LockError::Create {
            path: path.to_path_buf(),
            source,
        })
}
