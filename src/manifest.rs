// src/manifest.rs
//! Package manifests
//!
//! A manifest generator is an opaque capability: it receives the build and
//! the resolved file list and may return a document, which the archive
//! builder embeds as [`MANIFEST_ENTRY_NAME`]. The packager never inspects
//! the document beyond serializing it.

use crate::integration::BuildResult;
use crate::xml::{Element, XmlError};
use std::path::{Path, PathBuf};

/// Archive entry name used for the embedded manifest
pub const MANIFEST_ENTRY_NAME: &str = "manifest.xml";

/// A generated manifest document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    root: Element,
}

impl ManifestDocument {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Serialized form written into the archive
    pub fn to_bytes(&self) -> Result<Vec<u8>, XmlError> {
        self.root.to_bytes()
    }
}

/// Produces the manifest embedded in a package
pub trait ManifestGenerator: Send + Sync {
    /// Generate a manifest for `files`, or `None` to package without one
    fn generate(
        &self,
        build: &dyn BuildResult,
        files: &[PathBuf],
    ) -> anyhow::Result<Option<ManifestDocument>>;
}

/// Default generator describing the build, its modifications and the
/// packaged files
#[derive(Debug, Clone, Default)]
pub struct BuildManifestGenerator;

impl BuildManifestGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ManifestGenerator for BuildManifestGenerator {
    fn generate(
        &self,
        build: &dyn BuildResult,
        files: &[PathBuf],
    ) -> anyhow::Result<Option<ManifestDocument>> {
        let mut header = Element::new("header")
            .with_attr("project", build.project_name())
            .with_attr("label", build.label())
            .with_attr("status", build.status().as_str());
        if let Some(start) = build.start_time() {
            header.set_attr("build", start.to_rfc3339());
        }

        let mut root = Element::new("manifest").with_child(header);

        for modification in build.modifications() {
            let mut element = Element::new("modification");
            if let Some(user) = &modification.user_name {
                element.set_attr("user", user);
            }
            if let Some(change) = &modification.change_number {
                element.set_attr("changeNumber", change);
            }
            if let Some(time) = modification.modified_time {
                element.set_attr("time", time.to_rfc3339());
            }
            if let Some(comment) = &modification.comment {
                element.push(Element::new("comment").with_text(comment));
            }

            let mut file = Element::new("file")
                .with_attr("name", &modification.file_name)
                .with_attr("type", &modification.change_type);
            if let Some(folder) = &modification.folder_name {
                file.set_attr("folder", folder);
            }
            if let Some(version) = &modification.version {
                file.set_attr("version", version);
            }
            element.push(file);
            root.push(element);
        }

        let working = build.working_directory();
        for path in files {
            root.push(Element::new("file").with_attr("name", manifest_file_name(path, working)));
        }

        Ok(Some(ManifestDocument::new(root)))
    }
}

/// Packaged file as listed in the manifest: relative to the working
/// directory when inside it, otherwise the full path
fn manifest_file_name(path: &Path, working_directory: &Path) -> String {
    let relative = path.strip_prefix(working_directory).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}
