//! Idempotent fetch-and-build.
//!
//! A package counts as installed only when its completion marker exists.
//! A directory without a marker is left over from an interrupted or failed
//! run; it is removed and the install is attempted again.

mod marker;

pub use marker::{InstallMarker, MARKER_FILE};

use anyhow::{Result, bail};
use log::{debug, info, warn};
use std::fmt;
use std::path::PathBuf;

use crate::error::Outcome;
use crate::fetch::Fetcher;
use crate::package::PackageDescriptor;
use crate::recipe;
use crate::runtime::{Runtime, is_path_under};

/// Name of the scratch directory under the install root.
pub const SCRATCH_DIR: &str = ".modstrap-tmp";

/// Name of the lock file under the install root.
pub const LOCK_FILE: &str = ".modstrap.lock";

/// Install state derived from the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    NotInstalled,
    /// The install directory exists without a completion marker.
    Incomplete,
    /// The completion marker records a different version at the same directory.
    OtherVersion(InstallMarker),
    Installed(InstallMarker),
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallState::NotInstalled => write!(f, "not installed"),
            InstallState::Incomplete => write!(f, "incomplete"),
            InstallState::OtherVersion(marker) => write!(f, "holds {}", marker.version),
            InstallState::Installed(marker) => write!(f, "installed ({})", marker.version),
        }
    }
}

/// Read the install state of `package` without touching anything.
#[tracing::instrument(skip(runtime, package), fields(package = %package.name))]
pub fn install_state<R: Runtime + ?Sized>(
    runtime: &R,
    package: &PackageDescriptor,
) -> Result<InstallState> {
    let install_dir = &package.install_dir;
    if !runtime.exists(install_dir) {
        return Ok(InstallState::NotInstalled);
    }

    let marker_path = InstallMarker::path_in(install_dir);
    if !runtime.exists(&marker_path) {
        return Ok(InstallState::Incomplete);
    }

    match InstallMarker::load(runtime, &marker_path) {
        Ok(marker) if marker.version != package.version => Ok(InstallState::OtherVersion(marker)),
        Ok(marker) => Ok(InstallState::Installed(marker)),
        Err(e) => {
            warn!("Ignoring unreadable install marker {:?}: {:#}", marker_path, e);
            Ok(InstallState::Incomplete)
        }
    }
}

pub struct Installer<'a, R: Runtime, F: Fetcher> {
    runtime: &'a R,
    fetcher: &'a F,
    install_root: PathBuf,
}

impl<'a, R: Runtime, F: Fetcher> Installer<'a, R, F> {
    pub fn new(runtime: &'a R, fetcher: &'a F, install_root: PathBuf) -> Self {
        Self {
            runtime,
            fetcher,
            install_root,
        }
    }

    pub fn state(&self, package: &PackageDescriptor) -> Result<InstallState> {
        install_state(self.runtime, package)
    }

    /// Fetch and build `package` unless its completion marker already exists.
    #[tracing::instrument(skip(self, package), fields(package = %package.name))]
    pub async fn ensure_installed(&self, package: &PackageDescriptor) -> Result<Outcome> {
        let install_dir = &package.install_dir;
        if !is_path_under(install_dir, &self.install_root) || install_dir == &self.install_root {
            bail!(
                "Install directory {:?} of {} is not inside install root {:?}",
                install_dir,
                package.name,
                self.install_root
            );
        }

        match self.state(package)? {
            InstallState::OtherVersion(marker) => {
                bail!(
                    "{:?} already holds {} {}, not {}. Remove it or give the package an \
                     install_dir containing {{version}}.",
                    install_dir,
                    package.name,
                    marker.version,
                    package.version
                );
            }
            InstallState::Installed(_) => {
                info!("{} is already installed at {:?}, skipping", package, install_dir);
                return Ok(Outcome::Skipped);
            }
            InstallState::Incomplete => {
                warn!(
                    "{:?} has no completion marker; removing it and installing {} again",
                    install_dir, package
                );
                self.runtime.remove_dir_all(install_dir)?;
            }
            InstallState::NotInstalled => {}
        }

        if let Some(parent) = install_dir.parent() {
            debug!("Creating {:?}", parent);
            self.runtime.create_dir_all(parent)?;
        }

        info!("Fetching {} from {}...", package, package.source);
        self.fetcher.fetch(package, install_dir).await?;

        info!("Building {}...", package);
        recipe::run_build(self.runtime, package)?;

        InstallMarker::for_package(package)
            .save(self.runtime, &InstallMarker::path_in(install_dir))?;

        info!("Installed {} at {:?}", package, install_dir);
        Ok(Outcome::Performed)
    }
}
