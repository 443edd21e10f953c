//! Directory roots and the manifest path, resolved once per invocation.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::manifest::DEFAULT_MANIFEST;
use crate::runtime::Runtime;
use crate::runtime::path::normalize_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub install_root: PathBuf,
    pub module_root: PathBuf,
    pub manifest: PathBuf,
}

impl Config {
    /// Build the configuration from optional overrides (CLI flags or their
    /// environment variables). Relative paths are taken from the current directory.
    #[tracing::instrument(skip(runtime))]
    pub fn resolve<R: Runtime + ?Sized>(
        runtime: &R,
        install_root: Option<PathBuf>,
        module_root: Option<PathBuf>,
        manifest: Option<PathBuf>,
    ) -> Result<Self> {
        let cwd = runtime.current_dir()?;

        let install_root = match install_root {
            Some(path) => absolute(&cwd, &path),
            None => default_base(runtime)?.join("packages"),
        };
        let module_root = match module_root {
            Some(path) => absolute(&cwd, &path),
            None => default_base(runtime)?.join("modulefiles"),
        };
        let manifest = absolute(&cwd, &manifest.unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST)));

        let config = Config {
            install_root,
            module_root,
            manifest,
        };
        debug!("Using {:?}", config);
        Ok(config)
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    normalize_path(&cwd.join(path))
}

/// `~/.modstrap`, or the system location for privileged users.
#[tracing::instrument(skip(runtime))]
fn default_base<R: Runtime + ?Sized>(runtime: &R) -> Result<PathBuf> {
    if runtime.is_privileged() {
        Ok(system_base())
    } else {
        let home_dir = runtime
            .home_dir()
            .context("Could not find home directory")?;
        Ok(home_dir.join(".modstrap"))
    }
}

#[cfg(target_os = "windows")]
fn system_base() -> PathBuf {
    PathBuf::from(r"C:\ProgramData\modstrap")
}

#[cfg(not(target_os = "windows"))]
fn system_base() -> PathBuf {
    PathBuf::from("/usr/local/modstrap")
}
