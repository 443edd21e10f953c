//! Path utility functions for normalization and containment checks.

use anyhow::{Result, bail};
use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
/// This does not access the filesystem and does not follow symlinks.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match result.components().next_back() {
                Some(Component::Normal(_)) => {
                    result.pop();
                }
                // `..` at the root stays at the root.
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => result.push(component),
            },
            _ => result.push(component),
        }
    }
    result
}

/// Check if a path is under a given directory by comparing normalized path components.
///
/// `/opt/root/pkg/../../etc` is NOT under `/opt/root`.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    let normalized_path = normalize_path(path);
    let normalized_dir = normalize_path(dir);

    let path_components: Vec<_> = normalized_path.components().collect();
    let dir_components: Vec<_> = normalized_dir.components().collect();

    if path_components.len() < dir_components.len() {
        return false;
    }

    dir_components
        .iter()
        .zip(path_components.iter())
        .all(|(d, p)| d == p)
}

/// Join a relative path onto `base`, refusing results that escape `base`.
/// Absolute paths are rejected.
pub fn resolve_under(base: &Path, relative: &Path) -> Result<PathBuf> {
    if relative.is_absolute() {
        bail!("Expected a relative path, got {:?}", relative);
    }
    let joined = normalize_path(&base.join(relative));
    if !is_path_under(&joined, base) || joined == normalize_path(base) {
        bail!("Path {:?} escapes {:?}", relative, base);
    }
    Ok(joined)
}
