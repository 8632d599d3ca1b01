// src/config.rs
//! Package specification and its TOML configuration file
//!
//! A [`PackageSpecification`] is built once and never changes afterwards.
//! Invalid values are rejected by the builder setters themselves, so a
//! specification that exists is always usable for a packaging run.

use crate::manifest::{BuildManifestGenerator, ManifestGenerator};
use serde::Deserialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Compression level {0} is out of range (expected 0 to 9)")]
    CompressionLevel(i64),

    #[error("Package name must not be empty")]
    EmptyName,

    #[error("Package name '{0}' does not end in a file name")]
    InvalidName(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Zip compression effort, 0 (store) through 9 (maximum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "i64")]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    pub const STORE: Self = Self(0);
    pub const DEFAULT: Self = Self(5);
    pub const MAX: Self = Self(9);

    pub fn new(level: i64) -> Result<Self, ConfigError> {
        match u8::try_from(level) {
            Ok(l) if l <= 9 => Ok(Self(l)),
            _ => Err(ConfigError::CompressionLevel(level)),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Whether entries are stored without compression
    pub fn is_store(self) -> bool {
        self.0 == 0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for CompressionLevel {
    type Error = ConfigError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable packaging options
#[derive(Clone)]
pub struct PackageSpecification {
    always_package: bool,
    base_directory: Option<PathBuf>,
    compression_level: CompressionLevel,
    flatten: bool,
    name: String,
    single_instance: bool,
    manifest_generator: Option<Arc<dyn ManifestGenerator>>,
    files: Vec<String>,
}

impl PackageSpecification {
    /// Start a specification for an archive with the given base name
    pub fn builder(name: impl Into<String>) -> PackageSpecBuilder {
        PackageSpecBuilder {
            spec: PackageSpecification {
                always_package: false,
                base_directory: None,
                compression_level: CompressionLevel::default(),
                flatten: false,
                name: name.into(),
                single_instance: false,
                manifest_generator: None,
                files: Vec::new(),
            },
        }
    }

    pub fn always_package(&self) -> bool {
        self.always_package
    }

    pub fn base_directory(&self) -> Option<&Path> {
        self.base_directory.as_deref()
    }

    pub fn compression_level(&self) -> CompressionLevel {
        self.compression_level
    }

    pub fn flatten(&self) -> bool {
        self.flatten
    }

    /// Archive base name; may carry a directory prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn single_instance(&self) -> bool {
        self.single_instance
    }

    pub fn manifest_generator(&self) -> Option<&Arc<dyn ManifestGenerator>> {
        self.manifest_generator.as_ref()
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }
}

impl fmt::Debug for PackageSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageSpecification")
            .field("always_package", &self.always_package)
            .field("base_directory", &self.base_directory)
            .field("compression_level", &self.compression_level)
            .field("flatten", &self.flatten)
            .field("name", &self.name)
            .field("single_instance", &self.single_instance)
            .field("manifest_generator", &self.manifest_generator.is_some())
            .field("files", &self.files)
            .finish()
    }
}

/// Builder for [`PackageSpecification`]
pub struct PackageSpecBuilder {
    spec: PackageSpecification,
}

impl PackageSpecBuilder {
    pub fn always_package(mut self, always: bool) -> Self {
        self.spec.always_package = always;
        self
    }

    pub fn base_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spec.base_directory = Some(dir.into());
        self
    }

    /// Set the compression level
    ///
    /// Fails immediately for values outside 0..=9; the value is never clamped.
    pub fn compression_level(mut self, level: i64) -> Result<Self, ConfigError> {
        self.spec.compression_level = CompressionLevel::new(level)?;
        Ok(self)
    }

    pub fn flatten(mut self, flatten: bool) -> Self {
        self.spec.flatten = flatten;
        self
    }

    pub fn single_instance(mut self, single: bool) -> Self {
        self.spec.single_instance = single;
        self
    }

    pub fn manifest_generator(mut self, generator: Arc<dyn ManifestGenerator>) -> Self {
        self.spec.manifest_generator = Some(generator);
        self
    }

    pub fn file(mut self, pattern: impl Into<String>) -> Self {
        self.spec.files.push(pattern.into());
        self
    }

    pub fn files<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.files.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<PackageSpecification, ConfigError> {
        validate_name(&self.spec.name)?;
        Ok(self.spec)
    }
}

/// A package name must end in a plain file name component
fn validate_name(name: &str) -> Result<(), ConfigError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyName);
    }
    let normalized = trimmed.replace('\\', "/");
    match Path::new(&normalized).components().next_back() {
        Some(Component::Normal(_)) => Ok(()),
        _ => Err(ConfigError::InvalidName(name.to_string())),
    }
}

/// Manifest generators selectable from a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    /// [`BuildManifestGenerator`]
    Build,
}

/// On-disk form of a package specification (`artipack.toml`)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    pub name: String,

    #[serde(default)]
    pub files: Vec<String>,

    #[serde(default)]
    pub base_directory: Option<PathBuf>,

    #[serde(default)]
    pub compression_level: CompressionLevel,

    #[serde(default)]
    pub flatten: bool,

    #[serde(default)]
    pub single_instance: bool,

    #[serde(default)]
    pub always_package: bool,

    #[serde(default)]
    pub manifest: Option<ManifestKind>,
}

impl PackageConfig {
    /// Load configuration from a file path
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: PackageConfig = toml::from_str(content)?;
        validate_name(&config.name)?;
        Ok(config)
    }

    /// Convert into an immutable specification
    pub fn into_specification(self) -> Result<PackageSpecification, ConfigError> {
        let mut builder = PackageSpecification::builder(self.name)
            .files(self.files)
            .flatten(self.flatten)
            .single_instance(self.single_instance)
            .always_package(self.always_package)
            .compression_level(i64::from(self.compression_level.get()))?;

        if let Some(dir) = self.base_directory {
            builder = builder.base_directory(dir);
        }

        if let Some(ManifestKind::Build) = self.manifest {
            builder = builder.manifest_generator(Arc::new(BuildManifestGenerator::new()));
        }

        builder.build()
    }
}
