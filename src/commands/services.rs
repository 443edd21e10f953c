//! Construction of the network-facing services a command needs.

use anyhow::Result;
use std::path::Path;

use crate::fetch::SourceFetcher;
use crate::http::HttpClient;
use crate::install::SCRATCH_DIR;
use crate::runtime::Runtime;

/// Build an HTTP client identifying this build of modstrap.
pub fn build_http_client() -> Result<HttpClient> {
    HttpClient::with_user_agent(concat!("modstrap/", env!("MODSTRAP_VERSION")))
}

/// Build the fetcher used for installs under `install_root`.
pub fn build_fetcher<'a, R: Runtime>(
    runtime: &'a R,
    install_root: &Path,
) -> Result<SourceFetcher<'a, R>> {
    Ok(SourceFetcher::new(
        runtime,
        build_http_client()?,
        install_root.join(SCRATCH_DIR),
    ))
}
