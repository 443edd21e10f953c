use anyhow::Result;
use log::{debug, info};

use crate::config::Config;
use crate::error::Outcome;
use crate::fetch::Fetcher;
use crate::install::{Installer, LOCK_FILE};
use crate::manifest::PackagePlan;
use crate::module::ModuleRegistry;
use crate::package::PackageSpec;
use crate::runtime::Runtime;

use super::load_plans;
use super::services::build_fetcher;

/// Install and register the selected packages (all of them when `specs` is empty).
#[tracing::instrument(skip(runtime, config))]
pub async fn install<R: Runtime>(runtime: &R, config: &Config, specs: &[PackageSpec]) -> Result<()> {
    let plans = load_plans(runtime, config, specs)?;
    let fetcher = build_fetcher(runtime, &config.install_root)?;
    run_install(runtime, &fetcher, config, &plans).await
}

/// Process `plans` in order under the install-root lock. The first failure stops the run.
#[tracing::instrument(skip_all)]
pub async fn run_install<R: Runtime, F: Fetcher>(
    runtime: &R,
    fetcher: &F,
    config: &Config,
    plans: &[PackagePlan],
) -> Result<()> {
    let _lock = runtime.lock_exclusive(&config.install_root.join(LOCK_FILE))?;
    debug!("Holding lock on {:?}", config.install_root);

    let installer = Installer::new(runtime, fetcher, config.install_root.clone());
    let registry = ModuleRegistry::new(runtime, config.module_root.clone());

    for plan in plans {
        info!("Processing {}", plan.package);
        let installed = installer.ensure_installed(&plan.package).await?;
        let registered = registry.register(&plan.module)?;

        println!(
            "{}: {}, {}",
            plan.module.module_id(),
            describe(installed, "installed", "already installed"),
            describe(registered, "registered", "already registered"),
        );
    }

    Ok(())
}

fn describe(outcome: Outcome, performed: &'static str, skipped: &'static str) -> &'static str {
    match outcome {
        Outcome::Performed => performed,
        Outcome::Skipped => skipped,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::commands::fixtures::{TOOL_A, Workspace};
    use crate::error::BootstrapError;
    use crate::fetch::MockFetcher;
    use crate::install::InstallMarker;
    use crate::manifest::Manifest;
    use crate::package::PackageSpec;
    use crate::runtime::{FileLock, MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn plans(ws: &Workspace) -> Vec<PackagePlan> {
        let manifest = Manifest::load(&RealRuntime, &ws.config.manifest).unwrap();
        manifest.plans(&[], &ws.config.install_root).unwrap()
    }

    fn fetcher(times: usize) -> MockFetcher {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(times).returning(|_, dest| {
            std::fs::create_dir_all(dest)?;
            std::fs::write(dest.join("Makefile"), "all:")?;
            Ok(())
        });
        fetcher
    }

    #[test_log::test(tokio::test)]
    async fn test_install_then_register() {
        let ws = Workspace::new(TOOL_A);
        let plans = plans(&ws);

        run_install(&RealRuntime, &fetcher(1), &ws.config, &plans)
            .await
            .unwrap();

        assert!(ws.exists("packages/toolA/build/bin/toolA"));
        assert!(ws.exists("packages/toolA/.modstrap-install.json"));
        let descriptor = std::fs::read_to_string(ws.path("modulefiles/toolA/1.0.2")).unwrap();
        assert!(descriptor.starts_with("#%Module1.0"));
        assert_eq!(descriptor.matches("conflict toolA").count(), 1);
        assert_eq!(descriptor.matches("prepend-path").count(), 2);
    }

    #[tokio::test]
    async fn test_rerun_skips_both_steps() {
        let ws = Workspace::new(TOOL_A);
        let plans = plans(&ws);
        // times(1) across both runs
        let fetcher = fetcher(1);

        run_install(&RealRuntime, &fetcher, &ws.config, &plans).await.unwrap();
        let descriptor = ws.path("modulefiles/toolA/1.0.2");
        std::fs::write(&descriptor, "#%Module1.0\n# edited by hand\n").unwrap();

        run_install(&RealRuntime, &fetcher, &ws.config, &plans).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&descriptor).unwrap(),
            "#%Module1.0\n# edited by hand\n"
        );
    }

    #[tokio::test]
    async fn test_installed_but_unregistered_only_registers() {
        let ws = Workspace::new(TOOL_A);
        let plans = plans(&ws);
        run_install(&RealRuntime, &fetcher(1), &ws.config, &plans).await.unwrap();
        std::fs::remove_dir_all(ws.path("modulefiles")).unwrap();

        // No fetch expected.
        run_install(&RealRuntime, &MockFetcher::new(), &ws.config, &plans)
            .await
            .unwrap();

        assert!(ws.exists("modulefiles/toolA/1.0.2"));
    }

    #[tokio::test]
    async fn test_first_failure_stops_the_run() {
        let ws = Workspace::new(
            r#"
            [[package]]
            name = "broken"
            version = "1"
            source = { git = "https://example.org/broken.git", rev = "v1" }
            build = ["exit 3"]

            [[package]]
            name = "toolB"
            version = "2"
            source = { git = "https://example.org/toolB.git", rev = "v2" }
            "#,
        );
        let plans = plans(&ws);

        let err = run_install(&RealRuntime, &fetcher(1), &ws.config, &plans)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BootstrapError>(),
            Some(BootstrapError::Build { code: 3, .. })
        ));
        assert!(!ws.exists("modulefiles/broken"));
        assert!(!ws.exists("packages/toolB"));
    }

    #[tokio::test]
    async fn test_other_installed_version_is_not_registered() {
        let ws = Workspace::new(TOOL_A);
        run_install(&RealRuntime, &fetcher(1), &ws.config, &plans(&ws))
            .await
            .unwrap();

        let manifest = Manifest::load(&RealRuntime, &ws.config.manifest).unwrap();
        let specs = vec!["toolA@1.1.0".parse::<PackageSpec>().unwrap()];
        let newer = manifest.plans(&specs, &ws.config.install_root).unwrap();

        // No fetch expected: the directory already holds 1.0.2.
        let err = run_install(&RealRuntime, &MockFetcher::new(), &ws.config, &newer)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("already holds toolA 1.0.2"));
        assert!(!ws.exists("modulefiles/toolA/1.1.0"));
        assert!(ws.exists("modulefiles/toolA/1.0.2"));
    }

    fn mock_config() -> Config {
        Config {
            install_root: PathBuf::from("/opt/root/packages"),
            module_root: PathBuf::from("/opt/root/modulefiles"),
            manifest: PathBuf::from("/work/modstrap.toml"),
        }
    }

    fn expect_lock(runtime: &mut MockRuntime) -> Arc<AtomicBool> {
        let locked = Arc::new(AtomicBool::new(false));
        let flag = locked.clone();
        runtime
            .expect_lock_exclusive()
            .with(eq(PathBuf::from("/opt/root/packages/.modstrap.lock")))
            .times(1)
            .returning(move |_| {
                flag.store(true, Ordering::SeqCst);
                Ok(FileLock::unlocked())
            });
        locked
    }

    #[tokio::test]
    async fn test_lock_is_held_before_registration() {
        let config = mock_config();
        let plans = Manifest::parse(TOOL_A)
            .unwrap()
            .plans(&[], &config.install_root)
            .unwrap();
        let marker = serde_json::to_string(&InstallMarker::for_package(&plans[0].package)).unwrap();

        let mut runtime = MockRuntime::new();
        let locked = expect_lock(&mut runtime);

        let flag = locked.clone();
        runtime.expect_exists().returning(move |p| {
            assert!(flag.load(Ordering::SeqCst), "{:?} checked before locking", p);
            !p.starts_with("/opt/root/modulefiles")
        });
        runtime
            .expect_read_to_string()
            .returning(move |_| Ok(marker.clone()));
        let flag = locked.clone();
        runtime.expect_create_dir_all().returning(move |_| {
            assert!(flag.load(Ordering::SeqCst));
            Ok(())
        });
        let flag = locked.clone();
        runtime.expect_write().times(1).returning(move |_, _| {
            assert!(flag.load(Ordering::SeqCst));
            Ok(())
        });
        runtime.expect_rename().times(1).returning(|_, _| Ok(()));

        run_install(&runtime, &MockFetcher::new(), &config, &plans)
            .await
            .unwrap();
        assert!(locked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_lock_is_held_before_fetch() {
        let config = mock_config();
        let plans = Manifest::parse(TOOL_A)
            .unwrap()
            .plans(&[], &config.install_root)
            .unwrap();

        let mut runtime = MockRuntime::new();
        let locked = expect_lock(&mut runtime);
        let flag = locked.clone();
        runtime.expect_exists().returning(move |_| {
            assert!(flag.load(Ordering::SeqCst));
            false
        });
        runtime.expect_create_dir_all().returning(|_| Ok(()));

        let mut fetcher = MockFetcher::new();
        let flag = locked.clone();
        fetcher.expect_fetch().times(1).returning(move |_, _| {
            assert!(flag.load(Ordering::SeqCst), "fetched before locking");
            Err(anyhow::anyhow!("offline"))
        });

        let err = run_install(&runtime, &fetcher, &config, &plans)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("offline"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(Outcome::Performed, "installed", "already installed"), "installed");
        assert_eq!(
            describe(Outcome::Skipped, "installed", "already installed"),
            "already installed"
        );
    }
}
