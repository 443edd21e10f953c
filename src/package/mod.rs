//! Package definitions
//!
//! A [`PackageDescriptor`] names one buildable package: where its pinned
//! source lives, where it is installed, and the build recipe to run there.

mod descriptor;
mod spec;

pub use descriptor::{PackageDescriptor, SourceRef};
pub use spec::PackageSpec;

use anyhow::{Result, bail};

/// Check that `value` can be used as one path component
/// (package names, module names, versions).
pub fn validate_component(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        bail!("{} cannot be empty", kind);
    }
    if value.starts_with('.') {
        bail!("{} '{}' cannot start with '.'", kind, value);
    }
    if value
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control())
    {
        bail!(
            "{} '{}' cannot contain path separators or whitespace",
            kind,
            value
        );
    }
    Ok(())
}
