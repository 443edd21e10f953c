use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Pinned source location of a package.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceRef {
    /// A git repository checked out at a tag, branch or commit.
    Git { url: String, rev: String },
    /// A prebuilt or source archive verified against a sha256 digest.
    Archive { url: String, sha256: String },
}

impl SourceRef {
    pub fn url(&self) -> &str {
        match self {
            SourceRef::Git { url, .. } | SourceRef::Archive { url, .. } => url,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Git { url, rev } => write!(f, "{}@{}", url, rev),
            SourceRef::Archive { url, .. } => write!(f, "{}", url),
        }
    }
}

/// A package to fetch and build exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
    pub source: SourceRef,
    /// Absolute directory the source is fetched into and built in.
    pub install_dir: PathBuf,
    /// Out-of-source build directory, relative to `install_dir`.
    pub build_dir: Option<PathBuf>,
    /// Shell commands run in order from `install_dir`.
    pub build: Vec<String>,
}

impl PackageDescriptor {
    /// Directory holding the build artifacts: `build_dir` if declared, else `install_dir`.
    pub fn artifact_dir(&self) -> PathBuf {
        match &self.build_dir {
            Some(dir) => self.install_dir.join(dir),
            None => self.install_dir.clone(),
        }
    }
}

impl fmt::Display for PackageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}
