//! Runtime abstraction for system operations.
//!
//! Every filesystem, environment and process side effect of the installer
//! goes through the [`Runtime`] trait so the orchestration code can be tested
//! against `MockRuntime`.
//!
//! # Structure
//!
//! - `path` - Lexical path helpers (normalize, is_path_under, resolve_under)
//! - `env` - Home and current directories, privilege
//! - `fs` - File system operations (read, write, directory, atomic write)
//! - `process` - External command execution
//! - `lock` - Advisory file locks

mod env;
mod fs;
mod lock;
pub mod path;
mod process;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use lock::FileLock;
pub use path::{is_path_under, resolve_under};
pub use process::{CommandOutput, CommandSpec};

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // File System
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>>;
    fn open(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>>;

    /// Set file permissions (mode) on Unix systems. No-op on Windows.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()>;

    // Directories
    fn home_dir(&self) -> Option<PathBuf>;
    fn current_dir(&self) -> Result<PathBuf>;

    // Privilege
    fn is_privileged(&self) -> bool;

    // Processes
    /// Look up an executable on PATH.
    fn find_program(&self, name: &str) -> Option<PathBuf>;

    /// Run a command to completion, capturing stdout and stderr.
    /// A non-zero exit is reported through [`CommandOutput`], not as an error.
    fn run_command(&self, command: &CommandSpec) -> Result<CommandOutput>;

    // Locking
    /// Block until an exclusive advisory lock on `path` is held.
    /// The lock is released when the returned guard is dropped.
    fn lock_exclusive(&self, path: &Path) -> Result<FileLock>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_impl(path, contents)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.rename_impl(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.remove_file_impl(path)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.remove_dir_all_impl(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.is_dir_impl(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>> {
        self.create_file_impl(path)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>> {
        self.open_impl(path)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        self.set_permissions_impl(path, mode)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home_dir_impl()
    }

    fn current_dir(&self) -> Result<PathBuf> {
        self.current_dir_impl()
    }

    fn is_privileged(&self) -> bool {
        self.is_privileged_impl()
    }

    fn find_program(&self, name: &str) -> Option<PathBuf> {
        self.find_program_impl(name)
    }

    fn run_command(&self, command: &CommandSpec) -> Result<CommandOutput> {
        self.run_command_impl(command)
    }

    fn lock_exclusive(&self, path: &Path) -> Result<FileLock> {
        self.lock_exclusive_impl(path)
    }
}

/// Write `contents` to `path` so that readers never observe a partial file.
///
/// The bytes go to a dot-prefixed sibling first and are then renamed over
/// the destination.
#[tracing::instrument(skip(runtime, contents))]
pub fn write_atomic<R: Runtime + ?Sized>(runtime: &R, path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Cannot write to {:?}: no file name", path))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    runtime.write(&tmp, contents)?;
    if let Err(e) = runtime.rename(&tmp, path) {
        let _ = runtime.remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
