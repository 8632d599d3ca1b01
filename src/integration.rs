// src/integration.rs
//! Build results handed to the packager
//!
//! The CI server owns the real build model. Packaging only needs a handful
//! of identifying values from it, captured by the [`BuildResult`] trait.
//! [`IntegrationResult`] is a plain implementation used by the command line
//! tool and by tests.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome of the build that produced the artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildStatus {
    #[default]
    Unknown,
    Success,
    Failure,
    Exception,
    Cancelled,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::Exception => "Exception",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A source-control change that went into a build
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Modification {
    pub file_name: String,
    pub folder_name: Option<String>,
    /// Change kind as reported by source control ("Add", "Modify", ...)
    pub change_type: String,
    pub user_name: Option<String>,
    pub email_address: Option<String>,
    pub change_number: Option<String>,
    pub version: Option<String>,
    pub comment: Option<String>,
    pub modified_time: Option<DateTime<Utc>>,
}

impl Modification {
    pub fn new(file_name: impl Into<String>, change_type: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            change_type: change_type.into(),
            ..Default::default()
        }
    }
}

/// The build a packaging run belongs to
pub trait BuildResult {
    fn project_name(&self) -> &str;

    /// Build label, used as the per-build artifact folder name
    fn label(&self) -> &str;

    /// Root of the project's published artifacts
    fn artifact_directory(&self) -> &Path;

    /// Directory the build ran in; default root for relative file patterns
    fn working_directory(&self) -> &Path;

    fn modifications(&self) -> &[Modification] {
        &[]
    }

    fn status(&self) -> BuildStatus {
        BuildStatus::Unknown
    }

    fn start_time(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Concrete build result
#[derive(Debug, Clone)]
pub struct IntegrationResult {
    pub project_name: String,
    pub label: String,
    pub artifact_directory: PathBuf,
    pub working_directory: PathBuf,
    pub modifications: Vec<Modification>,
    pub status: BuildStatus,
    pub start_time: Option<DateTime<Utc>>,
}

impl IntegrationResult {
    pub fn new(
        project_name: impl Into<String>,
        label: impl Into<String>,
        artifact_directory: impl Into<PathBuf>,
        working_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            label: label.into(),
            artifact_directory: artifact_directory.into(),
            working_directory: working_directory.into(),
            modifications: Vec::new(),
            status: BuildStatus::Unknown,
            start_time: None,
        }
    }

    pub fn with_status(mut self, status: BuildStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_modifications(mut self, modifications: Vec<Modification>) -> Self {
        self.modifications = modifications;
        self
    }

    pub fn with_start_time(mut self, time: DateTime<Utc>) -> Self {
        self.start_time = Some(time);
        self
    }
}

impl BuildResult for IntegrationResult {
    fn project_name(&self) -> &str {
        &self.project_name
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn artifact_directory(&self) -> &Path {
        &self.artifact_directory
    }

    fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    fn modifications(&self) -> &[Modification] {
        &self.modifications
    }

    fn status(&self) -> BuildStatus {
        self.status
    }

    fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }
}
