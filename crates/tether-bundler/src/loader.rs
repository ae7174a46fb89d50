//! Module loader runtime
//!
//! Every artifact starts with [`LOADER_SOURCE`], a small JavaScript runtime that
//! registers module definitions and instantiates them lazily on first
//! `require`. [`ModuleLoader`] is the host-side model of the same algorithm:
//! definitions are Rust closures and exports are shared `serde_json` values.
//!
//! Both forms share these rules:
//! - a definition runs at most once; later requires hit the instance table
//! - the instance is recorded *before* its definition runs, so a cyclic
//!   require observes the partially populated exports
//! - relative requests (`./`, `../`) resolve against the requester's
//!   directory, see [`crate::canonical`]
//! - a missing module is either a soft `None`/`null` or `ModuleNotFound`

use crate::canonical;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// JavaScript source of the runtime injected at the head of every artifact
pub const LOADER_SOURCE: &str = include_str!("runtime/loader.js");

/// Virtual source name used when the runtime itself is eval-wrapped
pub const LOADER_SOURCE_NAME: &str = "tether-loader.js";

/// Global registering a definition in the artifact
pub const DEFINE_GLOBAL: &str = "tetherDefine";

/// Global requiring a module in the artifact
pub const REQUIRE_GLOBAL: &str = "tetherRequire";

/// Errors raised while loading modules
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// No definition registered under the requested name
    #[error("Cannot find module {name}")]
    ModuleNotFound { name: String },
}

/// Shared, rebindable exports value of a module
pub type Exports = Rc<RefCell<Value>>;

/// Definition function: receives the module record, its exports and a
/// requirer bound to the module's directory
pub type Definition = Rc<dyn Fn(&Module, Exports, &RelativeRequire<'_>) -> Result<(), LoaderError>>;

/// An instantiated module
pub struct Module {
    name: String,
    exports: RefCell<Exports>,
}

impl Module {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            exports: RefCell::new(Rc::new(RefCell::new(Value::Object(Default::default())))),
        }
    }

    /// Canonical module name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current exports (what `require` hands out)
    pub fn exports(&self) -> Exports {
        Rc::clone(&self.exports.borrow())
    }

    /// Rebind the exports, as `module.exports = ...` does
    pub fn set_exports(&self, exports: Exports) {
        *self.exports.borrow_mut() = exports;
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("exports", &self.exports.borrow())
            .finish()
    }
}

/// Registry of module definitions plus the memo of instantiated modules
#[derive(Default)]
pub struct ModuleLoader {
    entries: RefCell<HashMap<String, Definition>>,
    modules: RefCell<HashMap<String, Rc<Module>>>,
}

impl ModuleLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, replacing any earlier one under the same name
    pub fn define<F>(&self, name: impl Into<String>, definition: F)
    where
        F: Fn(&Module, Exports, &RelativeRequire<'_>) -> Result<(), LoaderError> + 'static,
    {
        self.entries
            .borrow_mut()
            .insert(name.into(), Rc::new(definition));
    }

    /// Instantiate `name`, running its definition
    ///
    /// Returns `Ok(None)` for an unknown name when `allow_missing` is set.
    pub fn load(&self, name: &str, allow_missing: bool) -> Result<Option<Rc<Module>>, LoaderError> {
        let definition = self.entries.borrow().get(name).cloned();
        let Some(definition) = definition else {
            if allow_missing {
                return Ok(None);
            }
            return Err(LoaderError::ModuleNotFound {
                name: name.to_string(),
            });
        };

        let module = Rc::new(Module::new(name));
        self.modules
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&module));

        let require = self.relative_require(name);
        definition(&module, module.exports(), &require)?;

        Ok(Some(module))
    }

    /// Exports of `name`, instantiating it on first use
    pub fn require(&self, name: &str, allow_missing: bool) -> Result<Option<Exports>, LoaderError> {
        let existing = self.modules.borrow().get(name).cloned();
        if let Some(module) = existing {
            return Ok(Some(module.exports()));
        }

        Ok(self.load(name, allow_missing)?.map(|module| module.exports()))
    }

    /// Requirer bound to `requester`'s directory
    pub fn relative_require(&self, requester: &str) -> RelativeRequire<'_> {
        RelativeRequire {
            loader: self,
            requester: requester.to_string(),
        }
    }

    /// Whether a definition is registered under `name`
    pub fn is_defined(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    /// Whether `name` has been instantiated
    pub fn is_instantiated(&self, name: &str) -> bool {
        self.modules.borrow().contains_key(name)
    }

    /// Registered names, sorted
    pub fn entry_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Requirer handed to a definition, resolving requests relative to its module
pub struct RelativeRequire<'a> {
    loader: &'a ModuleLoader,
    requester: String,
}

impl RelativeRequire<'_> {
    /// Canonical name a request refers to, without loading it
    pub fn resolve(&self, request: &str) -> String {
        canonical::resolve_request(&self.requester, request)
    }

    /// Resolve then require
    pub fn require(&self, request: &str, allow_missing: bool) -> Result<Option<Exports>, LoaderError> {
        self.loader.require(&self.resolve(request), allow_missing)
    }

    /// Name of the module this requirer belongs to
    pub fn requester(&self) -> &str {
        &self.requester
    }
}
