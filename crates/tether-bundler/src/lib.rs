//! Tether bundler library
//!
//! Concatenates the code files of a set of packages into a single script
//! artifact that registers every file as a named module with a small embedded
//! loader runtime:
//! - Package configuration from manifests and build overrides
//! - Module discovery below package include directories
//! - Source wrapping (eval + sourceURL, JSON data modules, shims)
//! - A two-generation build cache keyed by file stat fingerprints
//! - Legacy scripts appended verbatim in declaration order
//! - The loader runtime, shipped as JavaScript and modeled in Rust

pub mod cache;
pub mod canonical;
pub mod config;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod pipeline;
pub mod resolver;
pub mod tree;
pub mod wrap;

pub use cache::{CacheStats, FileCache, FileCacheStats, Fingerprint};
pub use config::{BuildConfig, ConfigError, PackageEntry, PackageOverride};
pub use discovery::{DiscoveredFile, ModuleDiscovery};
pub use error::BundleError;
pub use loader::{LoaderError, Module, ModuleLoader, LOADER_SOURCE};
pub use manifest::{OneOrMany, PackageManifest};
pub use pipeline::{BuildReport, Bundler, ModuleDefinition, OutputFragment, Producer};
pub use resolver::{PackageConfig, PackageResolver};
pub use tree::{DirectoryTree, InputTree};
pub use wrap::FileKind;
