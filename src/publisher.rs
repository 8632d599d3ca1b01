// src/publisher.rs
//! Packaging runs
//!
//! [`PackagePublisher`] drives one packaging run through its states:
//!
//! ```text
//! Idle → PatternsResolved → [ManifestGenerated] → NameAllocated
//!      → ArchiveWritten → InventoriesUpdated → Done
//! ```
//!
//! Any failure moves the run to `Failed` and is returned to the caller.
//! The manifest is generated before a name is allocated, so a failing
//! generator leaves the destination untouched, including any archive a
//! previous run left at the same path.

use crate::archive::{ArchiveBuilder, ArchiveError, ArchiveRecord};
use crate::config::PackageSpecification;
use crate::error::{Error, Result};
use crate::integration::BuildResult;
use crate::inventory::{self, InventoryRecorder};
use crate::lock::ResourceLock;
use crate::pattern;
use crate::version::{PackageName, allocate_name};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Progress of a packaging run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    PatternsResolved,
    ManifestGenerated,
    NameAllocated,
    ArchiveWritten,
    InventoriesUpdated,
    Done,
    Failed,
}

/// Result of a successful packaging run
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    pub archive_path: PathBuf,
    pub record: ArchiveRecord,
    /// Files that were resolved for packaging
    pub files: Vec<PathBuf>,
    pub project_inventory: PathBuf,
    pub build_inventory: PathBuf,
}

/// Packages build artifacts according to a [`PackageSpecification`]
pub struct PackagePublisher {
    spec: PackageSpecification,
    recorder: InventoryRecorder,
}

impl PackagePublisher {
    pub fn new(spec: PackageSpecification) -> Self {
        Self {
            spec,
            recorder: InventoryRecorder::new(),
        }
    }

    pub fn specification(&self) -> &PackageSpecification {
        &self.spec
    }

    /// Whether a caller should package this build
    ///
    /// True when `always_package` is set or the build has modifications.
    /// [`run`](Self::run) never consults this; deciding when to package is
    /// up to the caller.
    pub fn should_package(&self, build: &dyn BuildResult) -> bool {
        self.spec.always_package() || !build.modifications().is_empty()
    }

    /// Root directory for relative file patterns of this build
    pub fn base_directory(&self, build: &dyn BuildResult) -> PathBuf {
        let working = build.working_directory();
        let base = match self.spec.base_directory() {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => working.join(dir),
            None => working.to_path_buf(),
        };
        std::path::absolute(&base)
            .map(|p| pattern::normalize(&p))
            .unwrap_or(base)
    }

    /// Run one packaging operation for `build`
    pub fn run(&self, build: &dyn BuildResult) -> Result<PackageOutcome> {
        info!(
            "Packaging '{}' for project '{}' build '{}'",
            self.spec.name(),
            build.project_name(),
            build.label()
        );

        let mut state = RunState::Idle;
        let result = self.execute(build, &mut state);
        match &result {
            Ok(outcome) => {
                advance(&mut state, RunState::Done);
                info!("Package written to {:?}", outcome.archive_path);
            }
            Err(e) => {
                let failed_in = state;
                advance(&mut state, RunState::Failed);
                error!("Packaging failed after {:?}: {}", failed_in, e);
            }
        }
        result
    }

    fn execute(&self, build: &dyn BuildResult, state: &mut RunState) -> Result<PackageOutcome> {
        let base_directory = self.base_directory(build);
        let files = pattern::resolve(self.spec.files(), &base_directory);
        debug!(
            "Resolved {} file(s) from {} pattern(s) under {:?}",
            files.len(),
            self.spec.files().len(),
            base_directory
        );
        advance(state, RunState::PatternsResolved);

        let manifest = match self.spec.manifest_generator() {
            Some(generator) => {
                let manifest = generator
                    .generate(build, &files)
                    .map_err(|e| Error::Manifest(e.into()))?;
                advance(state, RunState::ManifestGenerated);
                manifest
            }
            None => None,
        };

        let name = PackageName::from_config(self.spec.name(), build.artifact_directory());
        let archive_failure = |path: &Path, source: ArchiveError| Error::ArchiveWrite {
            path: path.to_path_buf(),
            source,
        };

        // Held until the archive is persisted so no other run can claim the name
        let allocation_guard = ResourceLock::for_allocation(&name.directory, &name.base)
            .map_err(|e| archive_failure(&name.archive_path(None), e.into()))?;

        let archive_path = allocate_name(&name.directory, &name.base, self.spec.single_instance())
            .map_err(|e| archive_failure(&name.archive_path(None), e.into()))?;
        advance(state, RunState::NameAllocated);

        let mut builder = ArchiveBuilder::new(self.spec.compression_level())
            .with_flatten(self.spec.flatten());
        if self.spec.base_directory().is_some() {
            builder = builder.with_base_directory(&base_directory);
        }

        let record = builder
            .build(&files, manifest.as_ref(), &archive_path)
            .map_err(|e| archive_failure(&archive_path, e))?
            .with_label(build.label());
        drop(allocation_guard);
        advance(state, RunState::ArchiveWritten);

        let project_inventory =
            inventory::project_inventory_path(build.artifact_directory(), build.project_name());
        let build_inventory = inventory::build_inventory_path(
            build.artifact_directory(),
            build.label(),
            build.project_name(),
        );
        self.recorder
            .record(&project_inventory, &build_inventory, &record)
            .map_err(|source| Error::InventoryWrite {
                archive: archive_path.clone(),
                inventory: source.path().to_path_buf(),
                source,
            })?;
        advance(state, RunState::InventoriesUpdated);

        Ok(PackageOutcome {
            archive_path,
            record,
            files,
            project_inventory,
            build_inventory,
        })
    }
}

fn advance(state: &mut RunState, next: RunState) {
    debug!("Packaging run {:?} -> {:?}", state, next);
    *state = next;
}
