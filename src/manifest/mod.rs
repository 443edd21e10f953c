//! Package manifest (`modstrap.toml`).
//!
//! ```toml
//! [[package]]
//! name = "toolA"
//! version = "1.0.2"
//! source = { git = "https://example.org/toolA.git", rev = "v{version}" }
//! build_dir = "build"
//! build = ["cd build && cmake .. && make"]
//!
//! [package.module]
//! paths = { PATH = ["build/bin"], LD_LIBRARY_PATH = ["build/lib"] }
//! env = { TOOLA_VERSION = "{version}" }
//! ```
//!
//! Entries are resolved into [`PackagePlan`]s against an install root.
//! Templates are expanded and every path is checked at that point, so
//! nothing downstream reads raw manifest strings.

mod template;

pub use template::expand;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::module::{ModuleDescriptor, PathPrepend};
use crate::package::{PackageDescriptor, PackageSpec, SourceRef, validate_component};
use crate::runtime::path::normalize_path;
use crate::runtime::{Runtime, is_path_under, resolve_under};

/// Default manifest file name, looked up in the current directory.
pub const DEFAULT_MANIFEST: &str = "modstrap.toml";

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default, rename = "package")]
    pub packages: Vec<PackageEntry>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct PackageEntry {
    pub name: String,
    pub version: String,
    pub source: SourceEntry,
    /// Relative to the install root. Defaults to `{name}`.
    pub install_dir: Option<String>,
    pub build_dir: Option<String>,
    #[serde(default)]
    pub build: Vec<String>,
    #[serde(default)]
    pub module: ModuleEntry,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct SourceEntry {
    pub git: Option<String>,
    pub rev: Option<String>,
    pub url: Option<String>,
    pub sha256: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ModuleEntry {
    pub name: Option<String>,
    pub help: Option<String>,
    pub whatis: Option<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
    /// Variable -> directories, relative to the install directory unless absolute.
    pub paths: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A manifest entry resolved for one install root and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePlan {
    pub package: PackageDescriptor,
    pub module: ModuleDescriptor,
}

impl Manifest {
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content).context("Invalid manifest")?;

        let mut seen = HashSet::new();
        for entry in &manifest.packages {
            if !seen.insert(entry.name.as_str()) {
                bail!("Package {} is declared more than once", entry.name);
            }
        }
        Ok(manifest)
    }

    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read manifest {:?}", path))?;
        Self::parse(&content).with_context(|| format!("In manifest {:?}", path))
    }

    pub fn entry(&self, name: &str) -> Option<&PackageEntry> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Resolve the selected packages, or every package when `specs` is empty.
    ///
    /// Two plans may not register the same module name and version.
    pub fn plans(&self, specs: &[PackageSpec], install_root: &Path) -> Result<Vec<PackagePlan>> {
        let plans = if specs.is_empty() {
            self.packages
                .iter()
                .map(|entry| entry.plan(None, install_root))
                .collect::<Result<Vec<_>>>()?
        } else {
            specs
                .iter()
                .map(|spec| {
                    let entry = self
                        .entry(&spec.name)
                        .ok_or_else(|| anyhow!("Package {} is not in the manifest", spec.name))?;
                    entry.plan(spec.version.as_deref(), install_root)
                })
                .collect::<Result<Vec<_>>>()?
        };

        let mut modules = HashMap::new();
        for plan in &plans {
            if let Some(other) = modules.insert(plan.module.module_id(), &plan.package.name)
                && *other != plan.package.name
            {
                bail!(
                    "Packages {} and {} both register module {}",
                    other,
                    plan.package.name,
                    plan.module.module_id()
                );
            }
        }
        Ok(plans)
    }
}

impl PackageEntry {
    /// Resolve this entry, optionally overriding its version.
    pub fn plan(&self, version: Option<&str>, install_root: &Path) -> Result<PackagePlan> {
        self.plan_inner(version, install_root)
            .with_context(|| format!("Invalid manifest entry for {}", self.name))
    }

    fn plan_inner(&self, version: Option<&str>, install_root: &Path) -> Result<PackagePlan> {
        let name = self.name.as_str();
        let version = version.unwrap_or(&self.version);
        validate_component("package name", name)?;
        validate_component("version", version)?;

        let vars = [("name", name), ("version", version)];

        let source = self.source.resolve(&vars)?;

        let install_dir_template = self.install_dir.as_deref().unwrap_or("{name}");
        let install_dir = resolve_under(
            install_root,
            Path::new(&expand(install_dir_template, &vars)?),
        )
        .context("install_dir must stay inside the install root")?;

        let build_dir = match &self.build_dir {
            Some(dir) => {
                let dir = PathBuf::from(expand(dir, &vars)?);
                resolve_under(&install_dir, &dir)
                    .context("build_dir must stay inside the install directory")?;
                Some(dir)
            }
            None => None,
        };

        let package = PackageDescriptor {
            name: name.to_string(),
            version: version.to_string(),
            source,
            install_dir,
            build_dir,
            build: self.build.clone(),
        };
        let module = self.module.resolve(&package, &vars)?;

        Ok(PackagePlan { package, module })
    }
}

impl SourceEntry {
    fn resolve(&self, vars: &[(&str, &str)]) -> Result<SourceRef> {
        match (&self.git, &self.url) {
            (Some(git), None) => {
                if self.sha256.is_some() {
                    bail!("`sha256` only applies to `url` sources");
                }
                let rev = self.rev.as_deref().ok_or_else(|| {
                    anyhow!("git source requires `rev` (a tag, commit, or origin/<branch>)")
                })?;
                Ok(SourceRef::Git {
                    url: expand(git, vars)?,
                    rev: expand(rev, vars)?,
                })
            }
            (None, Some(url)) => {
                if self.rev.is_some() {
                    bail!("`rev` only applies to `git` sources");
                }
                let sha256 = self
                    .sha256
                    .as_deref()
                    .ok_or_else(|| anyhow!("url source requires `sha256`"))?;
                if sha256.len() != 64 || !sha256.chars().all(|c| c.is_ascii_hexdigit()) {
                    bail!("`sha256` must be 64 hex characters, got '{}'", sha256);
                }
                Ok(SourceRef::Archive {
                    url: expand(url, vars)?,
                    sha256: sha256.to_lowercase(),
                })
            }
            (Some(_), Some(_)) => bail!("source must set either `git` or `url`, not both"),
            (None, None) => bail!("source must set `git` or `url`"),
        }
    }
}

impl ModuleEntry {
    fn resolve(&self, package: &PackageDescriptor, vars: &[(&str, &str)]) -> Result<ModuleDescriptor> {
        let name = match &self.name {
            Some(template) => expand(template, vars)?,
            None => package.name.clone(),
        };
        validate_component("module name", &name)?;

        let mut module = ModuleDescriptor::new(name, package.version.clone());
        if let Some(help) = &self.help {
            module.help = expand(help, vars)?;
        }
        if let Some(whatis) = &self.whatis {
            module.whatis = expand(whatis, vars)?;
        }

        for conflict in &self.conflicts {
            validate_component("conflict", conflict)?;
            module.conflicts.push(conflict.clone());
        }

        let default_paths;
        let paths = match &self.paths {
            Some(paths) => paths,
            None => {
                let bin = match &package.build_dir {
                    Some(dir) => dir.join("bin").to_string_lossy().into_owned(),
                    None => "bin".to_string(),
                };
                default_paths = BTreeMap::from([("PATH".to_string(), vec![bin])]);
                &default_paths
            }
        };
        for (var, dirs) in paths {
            validate_env_name(var)?;
            for dir in dirs {
                let path = module_path(&package.install_dir, &expand(dir, vars)?)?;
                module.path_prepends.push(PathPrepend::new(var.clone(), path));
            }
        }

        let prefix = package.install_dir.to_string_lossy();
        let env_vars = [vars[0], vars[1], ("prefix", prefix.as_ref())];
        for (var, value) in &self.env {
            validate_env_name(var)?;
            module.env_sets.push((var.clone(), expand(value, &env_vars)?));
        }

        Ok(module)
    }
}

/// Absolute path for a module directory entry.
fn module_path(install_dir: &Path, dir: &str) -> Result<PathBuf> {
    let dir = Path::new(dir);
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let joined = normalize_path(&install_dir.join(dir));
    if !is_path_under(&joined, install_dir) {
        bail!("Module path {:?} escapes {:?}", dir, install_dir);
    }
    Ok(joined)
}

fn validate_env_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        bail!("'{}' is not a valid environment variable name", name);
    }
    Ok(())
}
