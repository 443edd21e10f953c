use crate::runtime::Runtime;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{debug, info};
use std::path::Path;
use tar::Archive;

use super::{ArchiveExtractor, move_into_place, prepare_temp_dir};

/// Extractor for .tar.gz and .tgz archives
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    /// Entries are unpacked with `tar`'s own `unpack_in`, which writes to the
    /// real filesystem, keeps symlinks and refuses paths outside the target.
    fn extract<R: Runtime + ?Sized>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        debug!("Extracting tar.gz archive to {:?}...", extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        let temp_dir = prepare_temp_dir(runtime, extract_to)?;

        let mut archive = Archive::new(GzDecoder::new(file));
        archive.set_preserve_permissions(true);

        for entry in archive.entries().context("Failed to read tar.gz archive")? {
            let mut entry = entry.context("Failed to read tar entry")?;
            let unpacked = entry
                .unpack_in(&temp_dir)
                .with_context(|| format!("Failed to extract {:?}", entry.path()))?;
            if !unpacked {
                debug!("Skipping entry outside the archive root: {:?}", entry.path());
            }
        }

        move_into_place(runtime, &temp_dir, extract_to)?;
        info!("Extraction complete.");
        Ok(())
    }
}
