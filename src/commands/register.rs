use anyhow::Result;
use log::debug;

use crate::config::Config;
use crate::error::BootstrapError;
use crate::install::{InstallState, LOCK_FILE, install_state};
use crate::manifest::PackagePlan;
use crate::module::ModuleRegistry;
use crate::package::PackageSpec;
use crate::runtime::Runtime;

use super::load_plans;

/// Write module descriptors for packages that are already installed.
#[tracing::instrument(skip(runtime, config))]
pub fn register<R: Runtime>(runtime: &R, config: &Config, specs: &[PackageSpec]) -> Result<()> {
    let plans = load_plans(runtime, config, specs)?;
    run_register(runtime, config, &plans)
}

fn run_register<R: Runtime>(runtime: &R, config: &Config, plans: &[PackagePlan]) -> Result<()> {
    let _lock = runtime.lock_exclusive(&config.install_root.join(LOCK_FILE))?;
    let registry = ModuleRegistry::new(runtime, config.module_root.clone());

    for plan in plans {
        let package = &plan.package;
        let state = install_state(runtime, package)?;
        debug!("{} is {}", package, state);
        if !matches!(state, InstallState::Installed(_)) {
            return Err(BootstrapError::NotInstalled {
                package: package.name.clone(),
                version: package.version.clone(),
            }
            .into());
        }

        let outcome = registry.register(&plan.module)?;
        let verb = if outcome.is_skipped() {
            "already registered"
        } else {
            "registered"
        };
        println!("{}: {}", plan.module.module_id(), verb);
    }

    Ok(())
}
