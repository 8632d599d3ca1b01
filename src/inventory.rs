// src/inventory.rs
//! Package inventories
//!
//! Every written archive is recorded twice: once in the project inventory,
//! which accumulates across all builds, and once in the inventory of the
//! build label that produced it. Both are XML files that only ever grow:
//!
//! ```xml
//! <packages>
//!   <package name="nightly-3.zip" time="2026-10-19T08:12:44+00:00" size="48213" files="12" label="1.4.0.231"/>
//! </packages>
//! ```
//!
//! Existing content (including elements this crate does not know about) is
//! preserved; a file that cannot be parsed is reported, never replaced.

use crate::archive::ArchiveRecord;
use crate::lock::{LockError, ResourceLock};
use crate::xml::{Element, XmlError};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// File extension of inventory files
pub const INVENTORY_EXTENSION: &str = "xml";

const ROOT_ELEMENT: &str = "packages";
const RECORD_ELEMENT: &str = "package";

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("I/O error on inventory {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Inventory {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to serialize inventory {path:?}: {source}")]
    Xml { path: PathBuf, source: XmlError },

    #[error("Failed to lock inventory {path:?}: {source}")]
    Lock { path: PathBuf, source: LockError },
}

impl InventoryError {
    /// Inventory file the error refers to
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::Corrupt { path, .. }
            | Self::Xml { path, .. }
            | Self::Lock { path, .. } => path,
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// `<project>-packages.xml`
pub fn inventory_file_name(project_name: &str) -> String {
    format!("{}-packages.{}", project_name, INVENTORY_EXTENSION)
}

/// Inventory accumulating every package of a project
pub fn project_inventory_path(artifact_directory: &Path, project_name: &str) -> PathBuf {
    artifact_directory.join(inventory_file_name(project_name))
}

/// Inventory accumulating the packages of one build label
pub fn build_inventory_path(artifact_directory: &Path, label: &str, project_name: &str) -> PathBuf {
    artifact_directory
        .join(label)
        .join(inventory_file_name(project_name))
}

/// Appends archive records to inventories
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryRecorder;

impl InventoryRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Record `entry` in both the project and the build inventory
    ///
    /// Both inventories are attempted even if the first fails; the first
    /// failure is returned. When both paths name the same file (an empty
    /// build label) the record is appended once.
    pub fn record(
        &self,
        project_inventory: &Path,
        build_inventory: &Path,
        entry: &ArchiveRecord,
    ) -> Result<(), InventoryError> {
        if project_inventory == build_inventory {
            debug!("Build inventory is the project inventory {:?}", project_inventory);
            return append_record(project_inventory, entry);
        }
        let project = append_record(project_inventory, entry);
        let build = append_record(build_inventory, entry);
        project.and(build)
    }
}

/// Append one record to the inventory at `path`, creating it if needed
pub fn append_record(path: &Path, entry: &ArchiveRecord) -> Result<(), InventoryError> {
    let _guard = ResourceLock::for_inventory(path).map_err(|source| InventoryError::Lock {
        path: path.to_path_buf(),
        source,
    })?;

    let mut document = load_document(path)?;
    document.push(record_element(entry));
    write_document(path, &document)?;

    info!("Recorded {} in {:?}", entry.name, path);
    Ok(())
}

/// Read all records from an inventory; a missing file has none
pub fn load(path: &Path) -> Result<Vec<ArchiveRecord>, InventoryError> {
    let document = load_document(path)?;
    document
        .children_named(RECORD_ELEMENT)
        .map(|element| parse_record(path, element))
        .collect()
}

fn load_document(path: &Path) -> Result<Element, InventoryError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Inventory {:?} does not exist yet", path);
            return Ok(Element::new(ROOT_ELEMENT));
        }
        Err(e) => return Err(InventoryError::io(path, e)),
    };

    let document = Element::parse(&bytes).map_err(|e| InventoryError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if document.name != ROOT_ELEMENT {
        return Err(InventoryError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("root element is <{}>, expected <{}>", document.name, ROOT_ELEMENT),
        });
    }
    Ok(document)
}

fn write_document(path: &Path, document: &Element) -> Result<(), InventoryError> {
    let bytes = document.to_bytes().map_err(|source| InventoryError::Xml {
        path: path.to_path_buf(),
        source,
    })?;

    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&directory).map_err(|e| InventoryError::io(path, e))?;

    let mut staging = tempfile::Builder::new()
        .prefix(".artipack-")
        .suffix(".xml.tmp")
        .tempfile_in(&directory)
        .map_err(|e| InventoryError::io(path, e))?;
    io::Write::write_all(&mut staging, &bytes).map_err(|e| InventoryError::io(path, e))?;
    staging
        .as_file()
        .sync_all()
        .map_err(|e| InventoryError::io(path, e))?;
    staging
        .persist(path)
        .map_err(|e| InventoryError::io(path, e.error))?;
    Ok(())
}

fn record_element(entry: &ArchiveRecord) -> Element {
    let mut element = Element::new(RECORD_ELEMENT)
        .with_attr("name", &entry.name)
        .with_attr("time", entry.created.to_rfc3339())
        .with_attr("size", entry.size.to_string())
        .with_attr("files", entry.files.to_string());
    if let Some(label) = &entry.label {
        element.set_attr("label", label);
    }
    element
}

fn parse_record(path: &Path, element: &Element) -> Result<ArchiveRecord, InventoryError> {
    let corrupt = |reason: String| InventoryError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let name = element
        .attr("name")
        .ok_or_else(|| corrupt("package record without a name".to_string()))?;
    let time = element
        .attr("time")
        .ok_or_else(|| corrupt(format!("package '{}' has no time", name)))?;
    let created = DateTime::parse_from_rfc3339(time)
        .map_err(|e| corrupt(format!("package '{}' has invalid time '{}': {}", name, time, e)))?
        .with_timezone(&Utc);
    let size = element
        .attr("size")
        .unwrap_or("0")
        .parse::<u64>()
        .map_err(|e| corrupt(format!("package '{}' has invalid size: {}", name, e)))?;
    let files = element
        .attr("files")
        .unwrap_or("0")
        .parse::<usize>()
        .map_err(|e| corrupt(format!("package '{}' has invalid file count: {}", name, e)))?;

    Ok(ArchiveRecord {
        name: name.to_string(),
        created,
        size,
        files,
        label: element.attr("label").map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(name: &str, seconds: u32) -> ArchiveRecord {
        ArchiveRecord {
            name: name.to_string(),
            created: Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, seconds).unwrap(),
            size: 1024,
            files: 3,
            label: Some("A Label".to_string()),
        }
    }

    #[test]
    fn test_paths() {
        let artifacts = Path::new("/artifacts");
        assert_eq!(
            project_inventory_path(artifacts, "Test project"),
            PathBuf::from("/artifacts/Test project-packages.xml")
        );
        assert_eq!(
            build_inventory_path(artifacts, "A Label", "Test project"),
            PathBuf::from("/artifacts/A Label/Test project-packages.xml")
        );
    }

    #[test]
    fn test_append_creates_inventory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("label/proj-packages.xml");

        append_record(&path, &record("build-1.zip", 0)).unwrap();

        let records = load(&path).unwrap();
        assert_eq!(records, vec![record("build-1.zip", 0)]);
    }

    #[test]
    fn test_append_merges_in_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("proj-packages.xml");

        append_record(&path, &record("build-1.zip", 0)).unwrap();
        append_record(&path, &record("build-2.zip", 1)).unwrap();
        append_record(&path, &record("build-3.zip", 2)).unwrap();

        let names: Vec<_> = load(&path).unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["build-1.zip", "build-2.zip", "build-3.zip"]);
    }

    #[test]
    fn test_preserves_unknown_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("proj-packages.xml");
        fs::write(
            &path,
            "<packages owner=\"ci\">\n  <note>migrated</note>\n  <package name=\"old.zip\" time=\"2009-01-01T00:00:00+00:00\" size=\"7\" extra=\"yes\"/>\n</packages>\n",
        )
        .unwrap();

        append_record(&path, &record("build-1.zip", 0)).unwrap();

        let document = Element::parse(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(document.attr("owner"), Some("ci"));
        assert_eq!(document.children_named("note").count(), 1);
        let packages: Vec<_> = document.children_named("package").collect();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].attr("extra"), Some("yes"));

        let records = load(&path).unwrap();
        assert_eq!(records[0].name, "old.zip");
        assert_eq!(records[0].files, 0);
        assert_eq!(records[0].label, None);
        assert_eq!(records[1].name, "build-1.zip");
    }

    #[test]
    fn test_corrupt_inventory_not_replaced() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("proj-packages.xml");
        fs::write(&path, "<html><body>oops</body></html>").unwrap();

        let err = append_record(&path, &record("build-1.zip", 0)).unwrap_err();
        assert!(matches!(err, InventoryError::Corrupt { .. }));
        assert_eq!(err.path(), path);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "<html><body>oops</body></html>"
        );

        fs::write(&path, "<packages><package").unwrap();
        assert!(matches!(
            append_record(&path, &record("build-1.zip", 0)),
            Err(InventoryError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_load_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(load(&temp.path().join("none.xml")).unwrap().is_empty());
    }

    #[test]
    fn test_load_rejects_bad_record() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("proj-packages.xml");
        fs::write(&path, "<packages><package name=\"a.zip\" time=\"yesterday\"/></packages>").unwrap();
        assert!(matches!(load(&path), Err(InventoryError::Corrupt { .. })));
    }

    #[test]
    fn test_recorder_updates_both() {
        let temp = TempDir::new().unwrap();
        let project = project_inventory_path(temp.path(), "proj");
        let build = build_inventory_path(temp.path(), "42", "proj");

        let recorder = InventoryRecorder::new();
        recorder.record(&project, &build, &record("a-1.zip", 0)).unwrap();
        recorder.record(&project, &build, &record("a-2.zip", 1)).unwrap();

        assert_eq!(load(&project).unwrap().len(), 2);
        assert_eq!(load(&build).unwrap().len(), 2);
    }

    #[test]
    fn test_recorder_empty_label_records_once() {
        let temp = TempDir::new().unwrap();
        let project = project_inventory_path(temp.path(), "proj");
        let build = build_inventory_path(temp.path(), "", "proj");
        assert_eq!(project, build);

        InventoryRecorder::new()
            .record(&project, &build, &record("a-1.zip", 0))
            .unwrap();
        assert_eq!(load(&project).unwrap().len(), 1);
    }

    #[test]
    fn test_recorder_attempts_build_after_project_failure() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("proj-packages.xml");
        fs::write(&project, "garbage").unwrap();
        let build = build_inventory_path(temp.path(), "42", "proj");

        let err = InventoryRecorder::new()
            .record(&project, &build, &record("a-1.zip", 0))
            .unwrap_err();
        assert_eq!(err.path(), project);
        assert_eq!(load(&build).unwrap().len(), 1);
    }
}
