//! Source retrieval.
//!
//! Every source is pinned: git sources name a revision to check out and
//! archive sources carry a sha256 digest that is verified before anything is
//! extracted.

mod download;
mod git;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::archive::ArchiveExtractorImpl;
use crate::error::BootstrapError;
use crate::http::HttpClient;
use crate::package::{PackageDescriptor, SourceRef};
use crate::runtime::Runtime;

pub use download::{sha256_file, verify_sha256};

/// Retrieves a package's source tree into a directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Populate `dest` with the source of `package`. `dest` must not exist yet.
    async fn fetch(&self, package: &PackageDescriptor, dest: &Path) -> Result<()>;
}

/// Fetcher for the source kinds a manifest can declare.
pub struct SourceFetcher<'a, R: Runtime> {
    runtime: &'a R,
    http: HttpClient,
    extractor: ArchiveExtractorImpl,
    scratch_dir: PathBuf,
}

impl<'a, R: Runtime> SourceFetcher<'a, R> {
    /// `scratch_dir` holds downloaded archives until they are extracted.
    pub fn new(runtime: &'a R, http: HttpClient, scratch_dir: PathBuf) -> Self {
        Self {
            runtime,
            http,
            extractor: ArchiveExtractorImpl::new(),
            scratch_dir,
        }
    }
}

#[async_trait]
impl<'a, R: Runtime> Fetcher for SourceFetcher<'a, R> {
    #[tracing::instrument(skip(self, package), fields(package = %package.name))]
    async fn fetch(&self, package: &PackageDescriptor, dest: &Path) -> Result<()> {
        let result = match &package.source {
            SourceRef::Git { url, rev } => git::clone_pinned(self.runtime, url, rev, dest),
            SourceRef::Archive { url, sha256 } => {
                let archive = download::ArchiveSource {
                    url,
                    sha256,
                    file_stem: format!("{}-{}", package.name, package.version),
                };
                download::fetch_archive(
                    self.runtime,
                    &self.http,
                    &self.extractor,
                    &self.scratch_dir,
                    &archive,
                    dest,
                )
                .await
            }
        };

        result.with_context(|| BootstrapError::Fetch {
            package: package.name.clone(),
            url: package.source.url().to_string(),
        })
    }
}
