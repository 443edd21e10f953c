//! Completion marker written after a successful build.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::package::{PackageDescriptor, SourceRef};
use crate::runtime::{Runtime, write_atomic};

/// File name of the marker inside an install directory.
pub const MARKER_FILE: &str = ".modstrap-install.json";

/// Record of a completed install. Its presence, not the directory's, means
/// the package is installed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InstallMarker {
    pub name: String,
    pub version: String,
    pub source: SourceRef,
    /// Seconds since the unix epoch.
    pub completed_at: u64,
}

impl InstallMarker {
    pub fn for_package(package: &PackageDescriptor) -> Self {
        let completed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            name: package.name.clone(),
            version: package.version.clone(),
            source: package.source.clone(),
            completed_at,
        }
    }

    pub fn path_in(install_dir: &Path) -> PathBuf {
        install_dir.join(MARKER_FILE)
    }

    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime.read_to_string(path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse install marker {:?}", path))
    }

    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime + ?Sized>(&self, runtime: &R, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(runtime, path, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use tempfile::tempdir;

    #[test]
    fn test_marker_save_and_load() {
        let dir = tempdir().unwrap();
        let package = PackageDescriptor {
            name: "toolA".into(),
            version: "1.0.2".into(),
            source: SourceRef::Archive {
                url: "https://example.org/toolA-1.0.2.tar.gz".into(),
                sha256: "ab".repeat(32),
            },
            install_dir: dir.path().to_path_buf(),
            build_dir: None,
            build: vec![],
        };
        let marker = InstallMarker::for_package(&package);
        let path = InstallMarker::path_in(dir.path());

        marker.save(&RealRuntime, &path).unwrap();

        assert_eq!(path, dir.path().join(".modstrap-install.json"));
        assert_eq!(InstallMarker::load(&RealRuntime, &path).unwrap(), marker);
        assert!(marker.completed_at > 0);
    }

    #[test]
    fn test_marker_load_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MARKER_FILE);
        std::fs::write(&path, "{ half written").unwrap();

        let err = InstallMarker::load(&RealRuntime, &path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse install marker"));
    }
}
