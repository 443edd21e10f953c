//! Use cases behind each CLI subcommand.

mod avail;
mod install;
mod register;
mod services;
mod show;
mod status;

pub use avail::avail;
pub use install::{install, run_install};
pub use register::register;
pub use show::show;
pub use status::status;

use anyhow::Result;
use log::debug;

use crate::config::Config;
use crate::manifest::{Manifest, PackagePlan};
use crate::package::PackageSpec;
use crate::runtime::Runtime;

/// Load the manifest and resolve the selected packages against the install root.
#[tracing::instrument(skip(runtime, config))]
pub(crate) fn load_plans<R: Runtime + ?Sized>(
    runtime: &R,
    config: &Config,
    specs: &[PackageSpec],
) -> Result<Vec<PackagePlan>> {
    let manifest = Manifest::load(runtime, &config.manifest)?;
    let plans = manifest.plans(specs, &config.install_root)?;
    debug!("Selected {} package(s) from {:?}", plans.len(), config.manifest);
    Ok(plans)
}
