//! Build recipe execution.
//!
//! Steps run one at a time through `sh -c` from the package's install
//! directory. The first step that exits non-zero stops the recipe.

use anyhow::{Result, bail};
use log::{debug, info};

use crate::error::BootstrapError;
use crate::package::PackageDescriptor;
use crate::runtime::{CommandSpec, Runtime};

/// Lines of stderr kept in a build failure.
const STDERR_TAIL_LINES: usize = 20;

/// Run every build step of `package` in order.
#[tracing::instrument(skip(runtime, package), fields(package = %package.name))]
pub fn run_build<R: Runtime + ?Sized>(runtime: &R, package: &PackageDescriptor) -> Result<()> {
    if package.build_dir.is_some() {
        let dir = package.artifact_dir();
        debug!("Creating build directory {:?}", dir);
        runtime.create_dir_all(&dir)?;
    }

    if package.build.is_empty() {
        debug!("No build steps for {}", package);
        return Ok(());
    }
    if runtime.find_program("sh").is_none() {
        bail!("sh is not installed or not on PATH; cannot run build steps");
    }

    let total = package.build.len();
    for (index, step) in package.build.iter().enumerate() {
        let number = index + 1;
        info!("[{}/{}] {}", number, total, step);

        let spec = step_command(package, step);
        let output = runtime.run_command(&spec)?;
        if !output.stdout.is_empty() {
            debug!("{}", output.stdout.trim_end());
        }

        if !output.success() {
            return Err(BootstrapError::Build {
                package: package.name.clone(),
                step: number,
                command: step.clone(),
                code: output.code_or_signal(),
                stderr: output.stderr_tail(STDERR_TAIL_LINES),
            }
            .into());
        }
    }

    Ok(())
}

fn step_command(package: &PackageDescriptor, step: &str) -> CommandSpec {
    CommandSpec::new("sh")
        .arg("-c")
        .arg(step)
        .dir(&package.install_dir)
        .env("MODSTRAP_NAME", &package.name)
        .env("MODSTRAP_VERSION", &package.version)
        .env("MODSTRAP_PREFIX", package.install_dir.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::SourceRef;
    use crate::runtime::{CommandOutput, MockRuntime, RealRuntime};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn package(install_dir: PathBuf, build: &[&str]) -> PackageDescriptor {
        PackageDescriptor {
            name: "toolA".into(),
            version: "1.0.2".into(),
            source: SourceRef::Git {
                url: "https://example.org/toolA.git".into(),
                rev: "v1.0.2".into(),
            },
            install_dir,
            build_dir: Some(PathBuf::from("build")),
            build: build.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_steps_run_in_order_with_env() {
        let dir = tempdir().unwrap();
        let pkg = package(
            dir.path().to_path_buf(),
            &[
                "echo one > build/log",
                "echo $MODSTRAP_NAME-$MODSTRAP_VERSION >> build/log",
            ],
        );

        run_build(&RealRuntime, &pkg).unwrap();

        let log = std::fs::read_to_string(dir.path().join("build/log")).unwrap();
        assert_eq!(log, "one\ntoolA-1.0.2\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_step_stops_the_recipe() {
        let dir = tempdir().unwrap();
        let pkg = package(
            dir.path().to_path_buf(),
            &[
                "touch first",
                "echo 'cc: not found' >&2; exit 127",
                "touch third",
            ],
        );

        let err = run_build(&RealRuntime, &pkg).unwrap_err();

        match err.downcast_ref::<BootstrapError>() {
            Some(BootstrapError::Build {
                step, code, stderr, ..
            }) => {
                assert_eq!(*step, 2);
                assert_eq!(*code, 127);
                assert_eq!(stderr, "cc: not found");
            }
            other => panic!("expected build error, got {:?}", other),
        }
        assert!(dir.path().join("first").exists());
        assert!(!dir.path().join("third").exists());
    }

    #[test]
    fn test_empty_recipe_only_creates_build_dir() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_create_dir_all()
            .with(mockall::predicate::eq(PathBuf::from("/opt/root/toolA/build")))
            .times(1)
            .returning(|_| Ok(()));

        run_build(&runtime, &package(PathBuf::from("/opt/root/toolA"), &[])).unwrap();
    }

    #[test]
    fn test_step_command_runs_from_install_dir() {
        let mut runtime = MockRuntime::new();
        runtime.expect_create_dir_all().returning(|_| Ok(()));
        runtime
            .expect_find_program()
            .returning(|_| Some(PathBuf::from("/bin/sh")));
        runtime
            .expect_run_command()
            .withf(|spec| {
                spec.program == "sh"
                    && spec.args == ["-c", "make"]
                    && spec.current_dir == Some(PathBuf::from("/opt/root/toolA"))
                    && spec
                        .envs
                        .contains(&("MODSTRAP_PREFIX".into(), "/opt/root/toolA".into()))
            })
            .times(1)
            .returning(|_| {
                Ok(CommandOutput {
                    code: Some(0),
                    ..Default::default()
                })
            });

        run_build(&runtime, &package(PathBuf::from("/opt/root/toolA"), &["make"])).unwrap();
    }
}
