//! Environment-module descriptors
//!
//! Renders `#%Module1.0` modulefiles and registers them under a module root
//! as `<module_root>/<module>/<version>`.

mod descriptor;
mod registry;

pub use descriptor::{MODULE_HEADER, ModuleDescriptor, PathPrepend};
pub use registry::{ModuleRegistry, RegisteredModule};
