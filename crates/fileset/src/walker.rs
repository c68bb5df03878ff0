//! Directory tree walking for a managed root.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FilesetError, Result};

/// Which part of the managed root a walk covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeScope {
    /// Path segments, relative to the root, of the directory to start from.
    pub base_path: Vec<String>,
    /// When false only the start directory itself is returned.
    pub recursive: bool,
}

impl Default for TreeScope {
    fn default() -> Self {
        Self {
            base_path: Vec::new(),
            recursive: true,
        }
    }
}

impl TreeScope {
    pub fn new(base_path: Vec<String>, recursive: bool) -> Self {
        Self {
            base_path,
            recursive,
        }
    }
}

/// Rejects path segments that would escape the managed root.
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(FilesetError::InvalidInput(format!(
            "invalid path segment {segment:?}"
        )));
    }
    if segment.contains('/') || segment.contains('\\') {
        return Err(FilesetError::InvalidInput(format!(
            "invalid path segment {segment:?}"
        )));
    }
    Ok(())
}

/// Joins validated segments onto the root.
pub fn resolve_segments(root: &Path, segments: &[String]) -> Result<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in segments {
        validate_segment(segment)?;
        path.push(segment);
    }
    Ok(path)
}

/// Converts a directory under `root` back into relative path segments.
pub fn relative_segments(root: &Path, dir: &Path) -> Vec<String> {
    let Ok(relative) = dir.strip_prefix(root) else {
        return Vec::new();
    };
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Returns the directories of the subtree rooted at `root/base_path`.
///
/// The start directory comes first, followed by its descendants in
/// depth-first preorder. Children appear in directory-listing order.
/// Symlinked directories are not followed. Any unreadable directory fails
/// the whole walk.
pub fn walk_tree(root: &Path, scope: &TreeScope) -> Result<Vec<PathBuf>> {
    let start = resolve_segments(root, &scope.base_path)?;
    let metadata = fs::metadata(&start).map_err(|error| match error.kind() {
        ErrorKind::NotFound => FilesetError::PathNotFound(start.clone()),
        _ => FilesetError::Io(error),
    })?;
    if !metadata.is_dir() {
        return Err(FilesetError::InvalidInput(format!(
            "not a directory: {}",
            start.display()
        )));
    }

    if !scope.recursive {
        return Ok(vec![start]);
    }

    let mut tree = Vec::new();
    walk_directory(&start, &mut tree)?;
    Ok(tree)
}

fn walk_directory(dir: &Path, tree: &mut Vec<PathBuf>) -> Result<()> {
    tree.push(dir.to_path_buf());
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            walk_directory(&entry.path(), tree)?;
        }
    }
    Ok(())
}

/// Lists the regular, non-hidden files directly inside `root/base_path`,
/// sorted by name.
pub fn list_data_files(root: &Path, base_path: &[String]) -> Result<Vec<String>> {
    let dir = resolve_segments(root, base_path)?;
    let entries = fs::read_dir(&dir).map_err(|error| match error.kind() {
        ErrorKind::NotFound => FilesetError::PathNotFound(dir.clone()),
        _ => FilesetError::Io(error),
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !name.starts_with('.') {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
