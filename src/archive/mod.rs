//! Archive extraction for downloaded sources.
//!
//! Extractors unpack into a scratch directory next to the destination and
//! then move the contents into place, dropping a single top-level directory
//! (`toolA-1.0.2/...`) if the archive has one.

mod tar_gz;
mod zip;

use crate::runtime::Runtime;
use anyhow::{Context, Result, anyhow};
use log::debug;
use std::path::{Path, PathBuf};

pub use tar_gz::TarGzExtractor;
pub use zip::ZipExtractor;

/// Archive suffixes we can extract, longest first.
const SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".zip"];

/// The archive suffix of a file name or URL, if it is one we can extract.
pub fn archive_suffix(name: &str) -> Option<&'static str> {
    let lower = name
        .split(['?', '#'])
        .next()
        .unwrap_or(name)
        .to_lowercase();
    SUFFIXES.iter().copied().find(|s| lower.ends_with(s))
}

/// Trait for format-specific archive extractors
pub trait ArchiveExtractor: Send + Sync {
    /// Check if this extractor can handle the given archive format
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Extract the archive into `extract_to`, which must exist.
    fn extract<R: Runtime + ?Sized>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()>;
}

/// Dispatcher that selects the appropriate extractor based on archive format.
pub struct ArchiveExtractorImpl {
    tar_gz: TarGzExtractor,
    zip: ZipExtractor,
}

impl Default for ArchiveExtractorImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveExtractorImpl {
    pub fn new() -> Self {
        Self {
            tar_gz: TarGzExtractor,
            zip: ZipExtractor,
        }
    }
}

impl ArchiveExtractor for ArchiveExtractorImpl {
    fn can_handle(&self, archive_path: &Path) -> bool {
        self.tar_gz.can_handle(archive_path) || self.zip.can_handle(archive_path)
    }

    #[tracing::instrument(skip(self, runtime))]
    fn extract<R: Runtime + ?Sized>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        if self.tar_gz.can_handle(archive_path) {
            return self.tar_gz.extract(runtime, archive_path, extract_to);
        }
        if self.zip.can_handle(archive_path) {
            return self.zip.extract(runtime, archive_path, extract_to);
        }
        Err(anyhow!(
            "Unsupported archive format: {}",
            archive_path.display()
        ))
    }
}

/// Fresh scratch directory next to `extract_to`.
fn prepare_temp_dir<R: Runtime + ?Sized>(runtime: &R, extract_to: &Path) -> Result<PathBuf> {
    let file_name = extract_to
        .file_name()
        .ok_or_else(|| anyhow!("Invalid extraction target {:?}", extract_to))?;
    let temp_dir = extract_to.with_file_name(format!(
        "{}_temp_extract",
        file_name.to_string_lossy()
    ));
    if runtime.exists(&temp_dir) {
        runtime.remove_dir_all(&temp_dir)?;
    }
    runtime.create_dir_all(&temp_dir)?;
    debug!("Unpacking to temp dir: {:?}", temp_dir);
    Ok(temp_dir)
}

/// Move the unpacked tree from `temp_dir` into `extract_to`, then remove `temp_dir`.
fn move_into_place<R: Runtime + ?Sized>(
    runtime: &R,
    temp_dir: &Path,
    extract_to: &Path,
) -> Result<()> {
    let entries = runtime
        .read_dir(temp_dir)
        .context("Failed to read temp extraction directory")?;

    let source_dir = match entries.as_slice() {
        [] => {
            runtime.remove_dir_all(temp_dir)?;
            return Err(anyhow!("Archive appears to be empty."));
        }
        [only] if runtime.is_dir(only) => only.clone(),
        _ => temp_dir.to_path_buf(),
    };

    debug!("Moving contents from {:?} to {:?}", source_dir, extract_to);
    for item in runtime.read_dir(&source_dir)? {
        let name = item
            .file_name()
            .ok_or_else(|| anyhow!("Invalid archive entry {:?}", item))?;
        runtime.rename(&item, &extract_to.join(name))?;
    }

    runtime.remove_dir_all(temp_dir)?;
    Ok(())
}
