//! Build configuration (tether.toml)
//!
//! The configuration is a plain structure with documented defaults. It is
//! validated once, when a [`crate::Bundler`] is constructed.
//!
//! ```toml
//! output_file = "app.js"
//! legacy_files = ["vendor/jquery.js"]
//!
//! [packages]
//! widgets = true
//! charts = { main = "lib/charts", include = ["lib"] }
//! experimental = false
//!
//! [shims]
//! jquery = "jQuery"
//! ```

use crate::manifest::OneOrMany;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Default per-package manifest file name
pub const DEFAULT_MANIFEST_NAME: &str = "bower.json";

/// Default build-tool section inside a manifest
pub const DEFAULT_MANIFEST_KEY: &str = "tether";

/// Errors that can occur while loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Complete configuration of one bundler
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildConfig {
    /// Artifact path, relative to the output root
    #[serde(default)]
    pub output_file: String,

    /// Declared packages by namespace
    #[serde(default)]
    pub packages: BTreeMap<String, PackageEntry>,

    /// Files appended verbatim after the modules, in this order
    #[serde(default)]
    pub legacy_files: Vec<String>,

    /// Shim modules: module name -> global variable
    #[serde(default)]
    pub shims: BTreeMap<String, String>,

    /// Prefix the module-loader runtime (default: true)
    #[serde(default = "default_true")]
    pub inject_loader: bool,

    /// Wrap code files in eval with a sourceURL annotation (default: true)
    #[serde(default = "default_true")]
    pub wrap_sources: bool,

    /// Per-package manifest file name (default: "bower.json")
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,

    /// Build-tool section inside manifests (default: "tether")
    #[serde(default = "default_manifest_key")]
    pub manifest_key: String,
}

fn default_true() -> bool {
    true
}

fn default_manifest_name() -> String {
    DEFAULT_MANIFEST_NAME.to_string()
}

fn default_manifest_key() -> String {
    DEFAULT_MANIFEST_KEY.to_string()
}

/// How a declared package is configured
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PackageEntry {
    /// `true`: manifest-derived defaults only; `false`: skipped
    Enabled(bool),

    /// Field-by-field overrides of the manifest
    Override(PackageOverride),
}

/// Per-package overrides taking precedence over the manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageOverride {
    /// Entry file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<OneOrMany>,

    /// Included directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<OneOrMany>,
}

impl PackageEntry {
    /// Overrides to apply, or `None` when the package is disabled
    pub fn overrides(&self) -> Option<PackageOverride> {
        match self {
            PackageEntry::Enabled(true) => Some(PackageOverride::default()),
            PackageEntry::Enabled(false) => None,
            PackageEntry::Override(overrides) => Some(overrides.clone()),
        }
    }
}

impl BuildConfig {
    /// Configuration with defaults for everything but the output file
    pub fn new(output_file: impl Into<String>) -> Self {
        Self {
            output_file: output_file.into(),
            packages: BTreeMap::new(),
            legacy_files: Vec::new(),
            shims: BTreeMap::new(),
            inject_loader: true,
            wrap_sources: true,
            manifest_name: default_manifest_name(),
            manifest_key: default_manifest_key(),
        }
    }

    /// Parse a configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BuildConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Declare a package
    pub fn with_package(mut self, namespace: impl Into<String>, entry: PackageEntry) -> Self {
        self.packages.insert(namespace.into(), entry);
        self
    }

    /// Append a legacy file
    pub fn with_legacy_file(mut self, path: impl Into<String>) -> Self {
        self.legacy_files.push(path.into());
        self
    }

    /// Add a shim module re-exporting a global
    pub fn with_shim(mut self, module: impl Into<String>, global: impl Into<String>) -> Self {
        self.shims.insert(module.into(), global.into());
        self
    }

    pub fn with_inject_loader(mut self, inject: bool) -> Self {
        self.inject_loader = inject;
        self
    }

    pub fn with_wrap_sources(mut self, wrap: bool) -> Self {
        self.wrap_sources = wrap;
        self
    }

    /// Enabled packages and their overrides, in namespace order
    pub fn enabled_packages(&self) -> Vec<(String, PackageOverride)> {
        self.packages
            .iter()
            .filter_map(|(namespace, entry)| {
                entry
                    .overrides()
                    .map(|overrides| (namespace.clone(), overrides))
            })
            .collect()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_file.is_empty() {
            return Err(ConfigError::MissingField("output_file".to_string()));
        }

        if !is_contained_relative_path(&self.output_file) {
            return Err(ConfigError::ValidationError(format!(
                "output_file must be a relative path inside the output directory: {}",
                self.output_file
            )));
        }

        for namespace in self.packages.keys() {
            if !is_valid_namespace(namespace) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid package namespace: {:?}. Must be a non-empty directory name not starting with '.'",
                    namespace
                )));
            }
        }

        for path in &self.legacy_files {
            if !is_contained_relative_path(path) {
                return Err(ConfigError::ValidationError(format!(
                    "Legacy file must be a relative path inside the input directory: {:?}",
                    path
                )));
            }
        }

        for (module, global) in &self.shims {
            if module.is_empty() || global.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Shim {:?} -> {:?} needs both a module name and a global name",
                    module, global
                )));
            }
        }

        if self.manifest_name.is_empty() || self.manifest_name.contains(['/', '\\']) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid manifest_name: {:?}",
                self.manifest_name
            )));
        }

        if self.manifest_key.is_empty() {
            return Err(ConfigError::MissingField("manifest_key".to_string()));
        }

        Ok(())
    }
}

/// A package namespace is a single directory name
fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty() && !namespace.starts_with('.') && !namespace.contains(['/', '\\'])
}

/// Non-empty, relative, and never climbing above its root
fn is_contained_relative_path(path: &str) -> bool {
    if path.is_empty() || Path::new(path).is_absolute() || path.starts_with('/') {
        return false;
    }

    let mut depth: usize = 0;
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => match depth.checked_sub(1) {
                Some(parent) => depth = parent,
                None => return false,
            },
            _ => depth += 1,
        }
    }

    depth > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::from_toml_str(r#"output_file = "app.js""#).unwrap();
        assert!(config.inject_loader);
        assert!(config.wrap_sources);
        assert_eq!(config.manifest_name, "bower.json");
        assert_eq!(config.manifest_key, "tether");
        assert!(config.packages.is_empty());
        assert!(config.legacy_files.is_empty());
        assert!(config.shims.is_empty());
    }

    #[test]
    fn test_package_entries() {
        let toml = r#"
output_file = "app.js"

[packages]
widgets = true
disabled = false
charts = { main = "lib/charts", include = "lib" }
"#;
        let config = BuildConfig::from_toml_str(toml).unwrap();

        assert_eq!(config.packages["widgets"], PackageEntry::Enabled(true));
        let enabled = config.enabled_packages();
        let names: Vec<&str> = enabled.iter().map(|(ns, _)| ns.as_str()).collect();
        assert_eq!(names, vec!["charts", "widgets"]);

        let charts = &enabled[0].1;
        assert_eq!(charts.main.as_ref().unwrap().first(), Some("lib/charts"));
        assert_eq!(charts.include.as_ref().unwrap().to_vec(), vec!["lib".to_string()]);
    }

    #[test]
    fn test_missing_output_file() {
        let result = BuildConfig::from_toml_str("legacy_files = []");
        assert!(matches!(result, Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_output_file_must_stay_inside_root() {
        assert!(BuildConfig::new("../app.js").validate().is_err());
        assert!(BuildConfig::new("/tmp/app.js").validate().is_err());
        assert!(BuildConfig::new("a/../../app.js").validate().is_err());
        assert!(BuildConfig::new("js/../app.js").validate().is_ok());
        assert!(BuildConfig::new("assets/app.js").validate().is_ok());
    }

    #[test]
    fn test_invalid_namespace() {
        for namespace in ["", ".hidden", "a/b", "a\\b"] {
            let config = BuildConfig::new("app.js").with_package(namespace, PackageEntry::Enabled(true));
            assert!(config.validate().is_err(), "accepted {:?}", namespace);
        }
    }

    #[test]
    fn test_invalid_shim() {
        let config = BuildConfig::new("app.js").with_shim("jquery", "");
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_legacy_files_keep_order() {
        let toml = r#"
output_file = "app.js"
legacy_files = ["b.js", "a.js"]
"#;
        let config = BuildConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.legacy_files, vec!["b.js".to_string(), "a.js".to_string()]);
    }

    #[test]
    fn test_toggles() {
        let toml = r#"
output_file = "app.js"
inject_loader = false
wrap_sources = false
"#;
        let config = BuildConfig::from_toml_str(toml).unwrap();
        assert!(!config.inject_loader);
        assert!(!config.wrap_sources);
    }
}
