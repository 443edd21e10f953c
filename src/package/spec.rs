//! `name[@version]` arguments on the command line.

use anyhow::{Result, anyhow};
use std::str::FromStr;

use super::validate_component;

/// A package selector that may override the manifest version.
/// Format: "name" or "name@version"
#[derive(Debug, PartialEq, Clone)]
pub struct PackageSpec {
    pub name: String,
    pub version: Option<String>,
}

impl std::fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for PackageSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, version) = match s.split_once('@') {
            Some((name, ver)) => {
                if ver.is_empty() {
                    return Err(anyhow!(
                        "Invalid format: version after @ cannot be empty. Expected 'name@version'."
                    ));
                }
                if ver.contains('@') {
                    return Err(anyhow!("Invalid format: expected 'name@version', got '{}'.", s));
                }
                validate_component("version", ver)?;
                (name, Some(ver.to_string()))
            }
            None => (s, None),
        };

        validate_component("package name", name)?;
        Ok(PackageSpec {
            name: name.to_string(),
            version,
        })
    }
}
