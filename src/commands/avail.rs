use anyhow::Result;

use crate::config::Config;
use crate::module::ModuleRegistry;
use crate::runtime::Runtime;

/// List the modulefiles under the module root as `name/version`.
#[tracing::instrument(skip(runtime, config))]
pub fn avail<R: Runtime>(runtime: &R, config: &Config) -> Result<()> {
    let registry = ModuleRegistry::new(runtime, config.module_root.clone());
    let modules = registry.available()?;
    if modules.is_empty() {
        println!("No modules registered under {}.", config.module_root.display());
        return Ok(());
    }

    for module in modules {
        println!("{}", module.module_id());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    #[test]
    fn test_avail_missing_root() {
        let config = Config {
            install_root: PathBuf::from("/opt/root/packages"),
            module_root: PathBuf::from("/opt/root/modulefiles"),
            manifest: PathBuf::from("/work/modstrap.toml"),
        };
        let mut runtime = MockRuntime::new();
        runtime
            .expect_is_dir()
            .with(eq(PathBuf::from("/opt/root/modulefiles")))
            .returning(|_| false);

        avail(&runtime, &config).unwrap();
    }
}
