use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::archive::{ArchiveExtractor, archive_suffix};
use crate::http::HttpClient;
use crate::runtime::Runtime;

pub(super) struct ArchiveSource<'s> {
    pub url: &'s str,
    pub sha256: &'s str,
    /// Downloaded file name without the archive suffix.
    pub file_stem: String,
}

/// Download, verify and extract an archive into `dest`.
///
/// The downloaded file is removed afterwards whether or not the steps succeed.
pub(super) async fn fetch_archive<R, E>(
    runtime: &R,
    http: &HttpClient,
    extractor: &E,
    scratch_dir: &Path,
    source: &ArchiveSource<'_>,
    dest: &Path,
) -> Result<()>
where
    R: Runtime + ?Sized,
    E: ArchiveExtractor,
{
    let suffix = archive_suffix(source.url)
        .ok_or_else(|| anyhow!("Cannot tell the archive format of {}", source.url))?;

    runtime.create_dir_all(scratch_dir)?;
    let archive_path = scratch_dir.join(format!("{}{}", source.file_stem, suffix));

    let result = download_and_extract(runtime, http, extractor, source, &archive_path, dest).await;

    if runtime.exists(&archive_path) {
        debug!("Removing downloaded archive {:?}", archive_path);
        let _ = runtime.remove_file(&archive_path);
    }
    result
}

async fn download_and_extract<R, E>(
    runtime: &R,
    http: &HttpClient,
    extractor: &E,
    source: &ArchiveSource<'_>,
    archive_path: &Path,
    dest: &Path,
) -> Result<()>
where
    R: Runtime + ?Sized,
    E: ArchiveExtractor,
{
    info!("Downloading {}...", source.url);
    http.download_file(source.url, || {
        runtime
            .create_file(archive_path)
            .with_context(|| format!("Failed to create temporary file at {:?}", archive_path))
    })
    .await?;

    verify_sha256(runtime, archive_path, source.sha256)?;

    runtime.create_dir_all(dest)?;
    extractor.extract(runtime, archive_path, dest)
}

/// Lowercase hex sha256 of a file.
pub fn sha256_file<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<String> {
    let mut reader = runtime.open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("Failed to read {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fail unless the file's sha256 equals `expected` (hex, case-insensitive).
pub fn verify_sha256<R: Runtime + ?Sized>(runtime: &R, path: &Path, expected: &str) -> Result<()> {
    let actual = sha256_file(runtime, path)?;
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        bail!(
            "Checksum mismatch for {:?}: expected {}, got {}",
            path,
            expected,
            actual
        );
    }
    debug!("Checksum verified for {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use tempfile::tempdir;

    // sha256("hello world")
    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_sha256_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, "hello world").unwrap();

        assert_eq!(sha256_file(&RealRuntime, &path).unwrap(), HELLO_SHA256);
    }

    #[test]
    fn test_verify_sha256_is_case_insensitive() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_open()
            .returning(|_| Ok(Box::new(std::io::Cursor::new(b"hello world".to_vec()))));

        let upper = HELLO_SHA256.to_uppercase();
        assert!(verify_sha256(&runtime, Path::new("/tmp/a.tar.gz"), &upper).is_ok());
    }

    #[test]
    fn test_verify_sha256_mismatch() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_open()
            .returning(|_| Ok(Box::new(std::io::Cursor::new(b"tampered".to_vec()))));

        let err = verify_sha256(&runtime, Path::new("/tmp/a.tar.gz"), HELLO_SHA256).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }
}
