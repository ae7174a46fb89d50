//! Package configuration resolution
//!
//! Turns a declared namespace into a [`PackageConfig`]: which file is the
//! package entry point and which directories are bundled. Values come from, in
//! order of precedence:
//! 1. the package override in the build configuration
//! 2. the build-tool section of the package manifest
//! 3. the manifest's top-level `main` (entry file only)
//! 4. the first of `<namespace>.js` / `index.js` that exists in the package
//!    directory (entry file only)

use crate::cache::FileCache;
use crate::canonical;
use crate::config::PackageOverride;
use crate::error::BundleError;
use crate::manifest::{OneOrMany, PackageManifest};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Extension of code files, stripped from entry file names
pub const CODE_EXTENSION: &str = ".js";

/// Resolved configuration of one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageConfig {
    /// Package namespace (its directory name)
    pub namespace: String,

    /// Entry file relative to the package directory, without extension
    pub main: Option<String>,

    /// Included directories relative to the package directory
    pub include: Vec<String>,
}

impl PackageConfig {
    /// Canonical module name of the entry file (`<namespace>/<main>`)
    pub fn entry_module(&self) -> Option<String> {
        self.main
            .as_ref()
            .map(|main| canonical::join(&self.namespace, main))
    }

    /// Path of the entry file relative to the input root
    pub fn entry_file(&self) -> Option<String> {
        self.entry_module()
            .map(|module| format!("{}{}", module, CODE_EXTENSION))
    }

    /// Apply build-configuration overrides on top of this configuration
    pub fn with_overrides(mut self, overrides: &PackageOverride) -> Self {
        if let Some(main) = overrides.main.as_ref() {
            self.main = normalize_main(main);
        }
        if let Some(include) = overrides.include.as_ref() {
            self.include = include.to_vec();
        }
        self
    }
}

/// Reads package manifests below an input root
#[derive(Debug, Clone)]
pub struct PackageResolver {
    root: PathBuf,
    manifest_name: String,
    manifest_key: String,
}

impl PackageResolver {
    /// Create a resolver for packages below `root`
    pub fn new(root: impl Into<PathBuf>, manifest_name: impl Into<String>, manifest_key: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            manifest_name: manifest_name.into(),
            manifest_key: manifest_key.into(),
        }
    }

    /// Directory of package `namespace`
    pub fn package_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    /// Manifest path of package `namespace`
    pub fn manifest_path(&self, namespace: &str) -> PathBuf {
        self.package_dir(namespace).join(&self.manifest_name)
    }

    /// Name of the manifest file inside each package
    pub fn manifest_name(&self) -> &str {
        &self.manifest_name
    }

    /// Resolve `namespace`, using the cache for the manifest-derived part
    pub fn resolve(
        &self,
        cache: &FileCache,
        namespace: &str,
        overrides: &PackageOverride,
    ) -> Result<PackageConfig, BundleError> {
        let base = cache.package_config(namespace, || {
            self.manifest_config(namespace).map(Arc::new)
        })?;
        let config = (*base).clone().with_overrides(overrides);

        debug!(
            namespace,
            main = config.main.as_deref().unwrap_or("<none>"),
            include = ?config.include,
            "resolved package"
        );
        Ok(config)
    }

    /// Configuration derived from the manifest and the package directory alone
    pub fn manifest_config(&self, namespace: &str) -> Result<PackageConfig, BundleError> {
        let manifest_path = self.manifest_path(namespace);
        let manifest = PackageManifest::read(&manifest_path)?.unwrap_or_default();
        let section = manifest
            .tool_section(&self.manifest_key)
            .map_err(|e| BundleError::ManifestParse {
                path: manifest_path.clone(),
                message: format!("invalid \"{}\" section: {}", self.manifest_key, e),
            })?
            .unwrap_or_default();

        // An empty `main` counts as absent at every level
        let main = section
            .main
            .as_ref()
            .and_then(normalize_main)
            .or_else(|| manifest.main.as_ref().and_then(normalize_main))
            .or_else(|| self.probe_main(namespace));

        let include = section
            .include
            .as_ref()
            .map(OneOrMany::to_vec)
            .unwrap_or_default();

        Ok(PackageConfig {
            namespace: namespace.to_string(),
            main,
            include,
        })
    }

    /// First default entry file present in the package directory
    fn probe_main(&self, namespace: &str) -> Option<String> {
        let package_dir = self.package_dir(namespace);
        let candidates = [format!("{}{}", namespace, CODE_EXTENSION), format!("index{}", CODE_EXTENSION)];

        candidates
            .iter()
            .find(|candidate| package_dir.join(candidate).is_file())
            .and_then(|candidate| strip_code_extension(candidate))
    }

    /// Input root this resolver reads from
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// First entry of a `main` field with the code extension removed
fn normalize_main(main: &OneOrMany) -> Option<String> {
    main.first().and_then(strip_code_extension)
}

fn strip_code_extension(main: &str) -> Option<String> {
    let stripped = main.strip_suffix(CODE_EXTENSION).unwrap_or(main);
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}
