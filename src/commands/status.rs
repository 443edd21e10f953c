use anyhow::Result;

use crate::config::Config;
use crate::install::install_state;
use crate::manifest::PackagePlan;
use crate::module::ModuleRegistry;
use crate::package::PackageSpec;
use crate::runtime::Runtime;

use super::load_plans;

/// Print install and registration state for the selected packages.
#[tracing::instrument(skip(runtime, config))]
pub fn status<R: Runtime>(runtime: &R, config: &Config, specs: &[PackageSpec]) -> Result<()> {
    let plans = load_plans(runtime, config, specs)?;
    if plans.is_empty() {
        println!("No packages in {}.", config.manifest.display());
        return Ok(());
    }

    let registry = ModuleRegistry::new(runtime, config.module_root.clone());
    for line in status_lines(runtime, &registry, &plans)? {
        println!("{}", line);
    }
    Ok(())
}

fn status_lines<R: Runtime>(
    runtime: &R,
    registry: &ModuleRegistry<'_, R>,
    plans: &[PackagePlan],
) -> Result<Vec<String>> {
    plans
        .iter()
        .map(|plan| {
            let state = install_state(runtime, &plan.package)?;
            let registered = if registry.is_registered(&plan.module) {
                "registered"
            } else {
                "not registered"
            };
            Ok(format!(
                "{:<32} {:<24} {}",
                plan.module.module_id(),
                state.to_string(),
                registered
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{TOOL_A, Workspace};
    use crate::manifest::Manifest;
    use crate::runtime::RealRuntime;

    #[test]
    fn test_status_lines_track_progress() {
        let ws = Workspace::new(TOOL_A);
        let plans = Manifest::load(&RealRuntime, &ws.config.manifest)
            .unwrap()
            .plans(&[], &ws.config.install_root)
            .unwrap();
        let registry = ModuleRegistry::new(&RealRuntime, ws.config.module_root.clone());

        let lines = status_lines(&RealRuntime, &registry, &plans).unwrap();
        assert!(lines[0].starts_with("toolA/1.0.2"));
        assert!(lines[0].contains("not installed"));
        assert!(lines[0].ends_with("not registered"));

        std::fs::create_dir_all(ws.path("packages/toolA")).unwrap();
        let lines = status_lines(&RealRuntime, &registry, &plans).unwrap();
        assert!(lines[0].contains("incomplete"));

        registry.register(&plans[0].module).unwrap();
        let lines = status_lines(&RealRuntime, &registry, &plans).unwrap();
        assert!(lines[0].ends_with(" registered"));
        assert!(!lines[0].contains("not registered"));
    }
}
