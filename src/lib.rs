// src/lib.rs

//! Artipack build-artifact packager
//!
//! Packages the outputs of a CI build into versioned zip archives and keeps
//! a running inventory of every package produced.
//!
//! # Architecture
//!
//! - Pattern resolution: literal, wildcard and recursive `**` file patterns
//! - Versioned names: `<name>-<n>.zip`, or one overwritten `<name>.zip`
//! - Manifests: pluggable generators, embedded as `manifest.xml`
//! - Inventories: per-project and per-build XML logs that only grow
//! - Locking: runs sharing a destination or inventory are serialized

pub mod archive;
pub mod config;
mod error;
pub mod integration;
pub mod inventory;
pub mod lock;
pub mod manifest;
pub mod pattern;
pub mod publisher;
pub mod version;
pub mod xml;

pub use archive::{ArchiveBuilder, ArchiveError, ArchiveRecord};
pub use config::{CompressionLevel, ConfigError, PackageConfig, PackageSpecification};
pub use error::{Error, ErrorKind, Result};
pub use integration::{BuildResult, BuildStatus, IntegrationResult, Modification};
pub use inventory::{InventoryError, InventoryRecorder};
pub use manifest::{BuildManifestGenerator, ManifestDocument, ManifestGenerator};
pub use publisher::{PackageOutcome, PackagePublisher, RunState};
pub use version::{PackageName, allocate_name};
