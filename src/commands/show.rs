use anyhow::{Result, bail};

use crate::config::Config;
use crate::package::PackageSpec;
use crate::runtime::Runtime;

use super::load_plans;

/// Print the modulefile that `install` would write for `spec`.
#[tracing::instrument(skip(runtime, config))]
pub fn show<R: Runtime>(runtime: &R, config: &Config, spec: &PackageSpec) -> Result<()> {
    print!("{}", descriptor(runtime, config, spec)?);
    Ok(())
}

fn descriptor<R: Runtime>(runtime: &R, config: &Config, spec: &PackageSpec) -> Result<String> {
    let plans = load_plans(runtime, config, std::slice::from_ref(spec))?;
    match plans.as_slice() {
        [plan] => Ok(plan.module.render()),
        _ => bail!("Expected exactly one package for {}", spec),
    }
}
