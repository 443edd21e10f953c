use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

use super::descriptor::{MODULE_HEADER, ModuleDescriptor};
use crate::error::{BootstrapError, Outcome};
use crate::runtime::{Runtime, write_atomic};

/// A modulefile found under the module root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredModule {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

impl RegisteredModule {
    pub fn module_id(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}

/// Module root holding `<module>/<version>` modulefiles.
pub struct ModuleRegistry<'a, R: Runtime> {
    runtime: &'a R,
    root: PathBuf,
}

impl<'a, R: Runtime> ModuleRegistry<'a, R> {
    pub fn new(runtime: &'a R, root: PathBuf) -> Self {
        Self { runtime, root }
    }

    pub fn descriptor_path(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version)
    }

    /// The version file itself is the registration sentinel.
    pub fn is_registered(&self, module: &ModuleDescriptor) -> bool {
        self.runtime
            .exists(&self.descriptor_path(&module.name, &module.version))
    }

    /// Write the modulefile unless one already exists for this name and version.
    #[tracing::instrument(skip(self, module))]
    pub fn register(&self, module: &ModuleDescriptor) -> Result<Outcome> {
        let path = self.descriptor_path(&module.name, &module.version);

        if self.runtime.exists(&path) {
            info!(
                "Module {} already registered at {:?}, skipping",
                module.module_id(),
                path
            );
            return Ok(Outcome::Skipped);
        }

        self.write_descriptor(module, &path)
            .with_context(|| BootstrapError::Registration {
                module: module.name.clone(),
                version: module.version.clone(),
            })?;

        info!("Registered module {} at {:?}", module.module_id(), path);
        Ok(Outcome::Performed)
    }

    fn write_descriptor(&self, module: &ModuleDescriptor, path: &Path) -> Result<()> {
        let dir = self.root.join(&module.name);
        self.runtime.create_dir_all(&dir)?;
        write_atomic(self.runtime, path, module.render().as_bytes())
    }

    /// All modulefiles under the root, sorted by name then version.
    #[tracing::instrument(skip(self))]
    pub fn available(&self) -> Result<Vec<RegisteredModule>> {
        let mut modules = Vec::new();
        if !self.runtime.is_dir(&self.root) {
            debug!("Module root {:?} does not exist", self.root);
            return Ok(modules);
        }

        for module_dir in self.runtime.read_dir(&self.root)? {
            let Some(name) = visible_file_name(&module_dir) else {
                continue;
            };
            if !self.runtime.is_dir(&module_dir) {
                continue;
            }

            for file in self.runtime.read_dir(&module_dir)? {
                let Some(version) = visible_file_name(&file) else {
                    continue;
                };
                if self.runtime.is_dir(&file) {
                    continue;
                }
                match self.runtime.read_to_string(&file) {
                    Ok(content) if content.starts_with(MODULE_HEADER) => {
                        modules.push(RegisteredModule {
                            name: name.clone(),
                            version,
                            path: file,
                        });
                    }
                    Ok(_) => debug!("Skipping {:?}: not a modulefile", file),
                    Err(e) => debug!("Skipping {:?}: {}", file, e),
                }
            }
        }

        modules.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
        Ok(modules)
    }
}

fn visible_file_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    if name.starts_with('.') {
        None
    } else {
        Some(name)
    }
}
