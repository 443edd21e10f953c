//! Error categories and step outcomes shared by the install and registration flows.

use std::fmt;

/// Fatal failure categories.
///
/// These travel inside `anyhow::Error`, either as the root error or as
/// context, so callers can `downcast_ref::<BootstrapError>()` to tell a
/// fetch failure from a build or registration failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    /// Source retrieval failed (network, bad URL, checksum mismatch, missing git).
    Fetch { package: String, url: String },
    /// A build step exited non-zero.
    Build {
        package: String,
        step: usize,
        command: String,
        code: i32,
        stderr: String,
    },
    /// Writing the module descriptor failed.
    Registration { module: String, version: String },
    /// Registration was requested for a package without a completed install.
    NotInstalled { package: String, version: String },
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Fetch { package, url } => {
                write!(f, "Failed to fetch {} from {}", package, url)
            }
            BootstrapError::Build {
                package,
                step,
                command,
                code,
                stderr,
            } => {
                write!(
                    f,
                    "Build step {} of {} failed (exit code {}): {}",
                    step, package, code, command
                )?;
                if !stderr.is_empty() {
                    write!(f, "\n{}", stderr)?;
                }
                Ok(())
            }
            BootstrapError::Registration { module, version } => {
                write!(f, "Failed to register module {}/{}", module, version)
            }
            BootstrapError::NotInstalled { package, version } => {
                write!(
                    f,
                    "Package {} {} is not installed. Run `modstrap install {}` first.",
                    package, version, package
                )
            }
        }
    }
}

impl std::error::Error for BootstrapError {}

/// What an idempotent step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The step did its work.
    Performed,
    /// The sentinel was already present; nothing was touched.
    Skipped,
}

impl Outcome {
    pub fn is_skipped(self) -> bool {
        self == Outcome::Skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_build_error_includes_stderr() {
        let err = BootstrapError::Build {
            package: "toolA".into(),
            step: 2,
            command: "make".into(),
            code: 127,
            stderr: "make: command not found".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Build step 2 of toolA failed (exit code 127): make"));
        assert!(msg.ends_with("make: command not found"));
    }

    #[test]
    fn test_context_is_downcastable() {
        let result: anyhow::Result<()> = Err(anyhow::anyhow!("disk full")).context(
            BootstrapError::Registration {
                module: "toolA".into(),
                version: "1.0.2".into(),
            },
        );
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BootstrapError>(),
            Some(BootstrapError::Registration { .. })
        ));
        assert!(format!("{:#}", err).contains("disk full"));
    }
}
