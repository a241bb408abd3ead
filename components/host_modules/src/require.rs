//! `require`: hands out the built-in host modules.
//!
//! Built-in modules are created once and cached, so every `require("fs")`
//! returns the same instance. Loading script files needs an evaluator and
//! is not supported; such names fail like any unknown module.

use crate::error::HostError;
use crate::fs::FileSystem;
use crate::path::PathModule;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// A module returned by [`ModuleRegistry::require`].
#[derive(Debug, Clone)]
pub enum HostModule {
    /// `require("fs")`
    Fs(Rc<FileSystem>),
    /// `require("path")`
    Path(Rc<PathModule>),
}

impl HostModule {
    /// The module's registered name.
    pub fn name(&self) -> &'static str {
        match self {
            HostModule::Fs(_) => "fs",
            HostModule::Path(_) => "path",
        }
    }

    /// The `fs` module, or an error naming what was found instead.
    pub fn into_fs(self) -> Result<Rc<FileSystem>, HostError> {
        match self {
            HostModule::Fs(fs) => Ok(fs),
            other => Err(HostError::InvalidArgument(format!(
                "expected module 'fs', got '{}'",
                other.name()
            ))),
        }
    }

    /// The `path` module, or an error naming what was found instead.
    pub fn into_path(self) -> Result<Rc<PathModule>, HostError> {
        match self {
            HostModule::Path(path) => Ok(path),
            other => Err(HostError::InvalidArgument(format!(
                "expected module 'path', got '{}'",
                other.name()
            ))),
        }
    }
}

/// Module cache behind `require`.
///
/// # Examples
///
/// ```
/// use host_modules::ModuleRegistry;
///
/// let modules = ModuleRegistry::new("/srv/app");
/// let path = modules.require("path").unwrap().into_path().unwrap();
/// assert_eq!(path.resolve(&["index.js"]), "/srv/app/index.js");
///
/// let err = modules.require("left-pad").unwrap_err();
/// assert_eq!(err.to_string(), "Cannot find module 'left-pad'");
/// ```
#[derive(Debug)]
pub struct ModuleRegistry {
    cache: RefCell<HashMap<String, HostModule>>,
}

impl ModuleRegistry {
    /// Registers `fs` and `path`, both rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let registry = Self {
            cache: RefCell::new(HashMap::new()),
        };
        registry.register(
            "path",
            HostModule::Path(Rc::new(PathModule::new(base_dir.to_string_lossy()))),
        );
        registry.register("fs", HostModule::Fs(Rc::new(FileSystem::new(base_dir))));
        registry
    }

    /// Adds or replaces a cached module.
    pub fn register(&self, name: &str, module: HostModule) {
        tracing::debug!(module = name, "registered host module");
        self.cache.borrow_mut().insert(name.to_string(), module);
    }

    /// Looks a module up by name.
    pub fn require(&self, name: &str) -> Result<HostModule, HostError> {
        if name.is_empty() {
            return Err(HostError::InvalidArgument(
                "require() requires a module name".to_string(),
            ));
        }
        self.cache
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::ModuleNotFound(name.to_string()))
    }

    /// Shorthand for `require("fs")`.
    pub fn fs(&self) -> Result<Rc<FileSystem>, HostError> {
        self.require("fs")?.into_fs()
    }

    /// Shorthand for `require("path")`.
    pub fn path(&self) -> Result<Rc<PathModule>, HostError> {
        self.require("path")?.into_path()
    }

    /// Names of the registered modules, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}
