// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use artipack::xml::Element;
use artipack::{
    BuildResult, BuildStatus, IntegrationResult, ManifestDocument, ManifestGenerator, Modification,
};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

pub const PROJECT: &str = "Test project";
pub const LABEL: &str = "A Label";

/// A build sandbox: `work/` holds build outputs, `artifacts/` receives packages.
///
/// Keep the TempDir alive for the duration of the test.
pub struct Sandbox {
    pub temp: TempDir,
    pub work: PathBuf,
    pub artifacts: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let work = temp.path().join("work");
        let artifacts = temp.path().join("artifacts");
        fs::create_dir_all(&work).unwrap();
        fs::create_dir_all(&artifacts).unwrap();
        Self {
            temp,
            work,
            artifacts,
        }
    }

    /// Write a file under `work/` and return its path
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.work.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn build(&self) -> IntegrationResult {
        let mut first = Modification::new("first file", "Add");
        first.user_name = Some("johnDoe".to_string());
        first.comment = Some("A comment".to_string());
        IntegrationResult::new(PROJECT, LABEL, &self.artifacts, &self.work)
            .with_status(BuildStatus::Success)
            .with_modifications(vec![first, Modification::new("second file", "Modify")])
    }

    pub fn project_inventory(&self) -> PathBuf {
        self.artifacts.join(format!("{}-packages.xml", PROJECT))
    }

    pub fn build_inventory(&self) -> PathBuf {
        self.artifacts
            .join(LABEL)
            .join(format!("{}-packages.xml", PROJECT))
    }
}

/// Entry names of a zip archive, in archive order
pub fn zip_entries(path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Manifest generator double that remembers what it was called with
pub struct RecordingGenerator {
    pub calls: Mutex<Vec<(String, Vec<PathBuf>)>>,
}

impl RecordingGenerator {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ManifestGenerator for RecordingGenerator {
    fn generate(
        &self,
        build: &dyn BuildResult,
        files: &[PathBuf],
    ) -> anyhow::Result<Option<ManifestDocument>> {
        self.calls
            .lock()
            .unwrap()
            .push((build.project_name().to_string(), files.to_vec()));
        Ok(Some(ManifestDocument::new(Element::new("manifest"))))
    }
}

/// Manifest generator double that always fails
pub struct FailingGenerator;

impl ManifestGenerator for FailingGenerator {
    fn generate(
        &self,
        _build: &dyn BuildResult,
        _files: &[PathBuf],
    ) -> anyhow::Result<Option<ManifestDocument>> {
        anyhow::bail!("manifest template missing")
    }
}
