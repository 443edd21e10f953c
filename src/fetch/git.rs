use anyhow::{Result, bail};
use log::info;
use std::path::Path;

use crate::runtime::{CommandSpec, Runtime};

/// Clone `url` into `dest` and detach at `rev` (tag, commit, or `origin/<branch>`).
#[tracing::instrument(skip(runtime))]
pub(super) fn clone_pinned<R: Runtime + ?Sized>(
    runtime: &R,
    url: &str,
    rev: &str,
    dest: &Path,
) -> Result<()> {
    if runtime.find_program("git").is_none() {
        bail!("git is not installed or not on PATH");
    }
    if let Some(parent) = dest.parent() {
        runtime.create_dir_all(parent)?;
    }

    info!("Cloning {} into {:?}...", url, dest);
    run_git(
        runtime,
        git().arg("clone").arg("--quiet").arg(url).arg_path(dest),
    )?;

    info!("Checking out {}...", rev);
    run_git(
        runtime,
        git()
            .arg("-C")
            .arg_path(dest)
            .arg("checkout")
            .arg("--quiet")
            .arg("--detach")
            .arg(rev),
    )
}

fn git() -> CommandSpec {
    // Fail instead of waiting for credentials on a terminal.
    CommandSpec::new("git").env("GIT_TERMINAL_PROMPT", "0")
}

fn run_git<R: Runtime + ?Sized>(runtime: &R, spec: CommandSpec) -> Result<()> {
    let output = runtime.run_command(&spec)?;
    if !output.success() {
        bail!(
            "`{}` failed (exit code {}): {}",
            spec.display(),
            output.code_or_signal(),
            output.stderr_tail(20)
        );
    }
    Ok(())
}
