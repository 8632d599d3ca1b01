// src/pattern.rs
//! File pattern resolution
//!
//! Expands the configured file patterns into the concrete list of files to
//! package. Three pattern shapes are understood:
//!
//! - literal paths (`bin/app.dll`), kept only when the file exists
//! - single-level wildcards (`bin/*.dll`), matched within one directory
//! - recursive patterns (`docs/**/*.md`), matched at any depth below the
//!   directory preceding the `**` segment
//!
//! Relative patterns are anchored at the base directory. Backslashes are
//! treated as path separators so Windows-style patterns keep working.
//! Nothing here is fatal: missing files and unreadable directories are
//! logged and skipped.

use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Segment marking a recursive directory match
pub const RECURSIVE_MARKER: &str = "**";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Classification of a single file pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Literal,
    Wildcard,
    Recursive,
}

impl PatternKind {
    /// Classify a pattern (separators already normalized to `/`)
    pub fn classify(pattern: &str) -> Self {
        if pattern.split('/').any(|segment| segment == RECURSIVE_MARKER) {
            Self::Recursive
        } else if has_wildcard(pattern) {
            Self::Wildcard
        } else {
            Self::Literal
        }
    }
}

fn has_wildcard(s: &str) -> bool {
    s.contains(['*', '?'])
}

/// Make `[` and `]` match themselves in a glob expression
fn escape_brackets(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '[' => out.push_str("[[]"),
            ']' => out.push_str("[]]"),
            _ => out.push(c),
        }
    }
    out
}

/// Resolve `patterns` against `base_directory`
///
/// Returns existing regular files in first-seen order with duplicates
/// removed. Resolving twice over an unchanged filesystem yields the same
/// list.
pub fn resolve<S: AsRef<str>>(patterns: &[S], base_directory: &Path) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for raw in patterns {
        let pattern = raw.as_ref().replace('\\', "/");
        let kind = PatternKind::classify(&pattern);
        let matches = match kind {
            PatternKind::Literal => resolve_literal(&pattern, base_directory)
                .into_iter()
                .collect(),
            PatternKind::Wildcard => resolve_wildcard(&pattern, base_directory),
            PatternKind::Recursive => resolve_recursive(&pattern, base_directory),
        };
        debug!(
            "Pattern '{}' ({:?}) matched {} file(s)",
            raw.as_ref(),
            kind,
            matches.len()
        );

        for path in matches {
            let path = normalize(&path);
            if seen.insert(path.clone()) {
                resolved.push(path);
            }
        }
    }

    resolved
}

fn anchor(pattern: &str, base_directory: &Path) -> PathBuf {
    let path = Path::new(pattern);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_directory.join(path)
    }
}

fn resolve_literal(pattern: &str, base_directory: &Path) -> Option<PathBuf> {
    let path = anchor(pattern, base_directory);
    if path.is_file() {
        Some(path)
    } else {
        debug!("Skipping {:?}: not an existing file", path);
        None
    }
}

/// Glob expression for `pattern` with any base directory text escaped
fn glob_expression(pattern: &str, base_directory: &Path) -> String {
    let pattern = escape_brackets(pattern);
    if Path::new(&pattern).is_absolute() {
        return pattern;
    }
    let base = base_directory.to_string_lossy().replace('\\', "/");
    let base = Pattern::escape(base.trim_end_matches('/'));
    format!("{}/{}", base, pattern)
}

fn glob_paths(expression: &str) -> Vec<PathBuf> {
    let paths = match glob::glob_with(expression, MATCH_OPTIONS) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Invalid file pattern '{}': {}", expression, e);
            return Vec::new();
        }
    };

    paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable path while matching '{}': {}", expression, e);
                None
            }
        })
        .collect()
}

fn resolve_wildcard(pattern: &str, base_directory: &Path) -> Vec<PathBuf> {
    glob_paths(&glob_expression(pattern, base_directory))
        .into_iter()
        .filter(|path| path.is_file())
        .collect()
}

fn resolve_recursive(pattern: &str, base_directory: &Path) -> Vec<PathBuf> {
    let segments: Vec<&str> = pattern.split('/').collect();
    let Some(marker) = segments.iter().position(|s| *s == RECURSIVE_MARKER) else {
        return Vec::new();
    };

    let prefix = segments[..marker].join("/");
    let trailing: Vec<&str> = segments[marker + 1..]
        .iter()
        .copied()
        .filter(|s| !s.is_empty())
        .collect();

    let matcher = if trailing.is_empty() {
        None
    } else {
        match Pattern::new(&escape_brackets(&trailing.join("/"))) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Invalid file pattern '{}': {}", pattern, e);
                return Vec::new();
            }
        }
    };

    let roots = if has_wildcard(&prefix) {
        glob_paths(&glob_expression(&prefix, base_directory))
            .into_iter()
            .filter(|p| p.is_dir())
            .collect()
    } else if prefix.is_empty() && pattern.starts_with('/') {
        vec![PathBuf::from("/")]
    } else {
        vec![anchor(&prefix, base_directory)]
    };

    let mut out = Vec::new();
    for root in roots {
        if !root.is_dir() {
            debug!("Skipping recursive match under {:?}: not a directory", root);
            continue;
        }
        walk_matching(&root, matcher.as_ref(), trailing.len(), &mut out);
    }
    out
}

fn walk_matching(root: &Path, matcher: Option<&Pattern>, depth: usize, out: &mut Vec<PathBuf>) {
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry under {:?}: {}", root, e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let matched = match matcher {
            None => true,
            Some(matcher) => {
                let rel = path.strip_prefix(root).unwrap_or(path);
                trailing_components(rel, depth)
                    .is_some_and(|tail| matcher.matches_with(&tail, MATCH_OPTIONS))
            }
        };
        if matched {
            out.push(path.to_path_buf());
        }
    }
}

/// The last `count` normal components of `path`, joined with `/`
fn trailing_components(path: &Path, count: usize) -> Option<String> {
    let parts: Vec<_> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    if parts.len() < count {
        return None;
    }
    Some(parts[parts.len() - count..].join("/"))
}

/// Lexically remove `.` and `..` components
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
