//! Bundling pipeline
//!
//! One build runs five stages, each depending on the previous:
//! 1. acquire the input root from the [`InputTree`]
//! 2. compile modules: per package (concurrently) resolve its configuration,
//!    synthesize the entry module, discover and wrap its files; add shims
//! 3. compile the module registry fragment: definitions sorted by name,
//!    optionally prefixed by the loader runtime
//! 4. compile legacy fragments (concurrently), keeping declaration order
//! 5. serialize all fragments by priority, write the artifact, commit the cache
//!
//! Any error aborts the build before the write, so no partial artifact is
//! produced and the cache generation is not committed.

use crate::cache::{FileCache, FileCacheStats, Fingerprint};
use crate::config::{BuildConfig, ConfigError, PackageOverride};
use crate::discovery::ModuleDiscovery;
use crate::error::BundleError;
use crate::loader::{LOADER_SOURCE, LOADER_SOURCE_NAME};
use crate::resolver::PackageResolver;
use crate::tree::InputTree;
use crate::wrap::{self, FileKind};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Priority of the module registry fragment; sorts before every legacy file
pub const MODULE_REGISTRY_PRIORITY: &str = "a";

/// Priority of the legacy file declared at `index`
pub fn legacy_priority(index: usize) -> String {
    format!("b-{:05}", index)
}

/// Produces an output from an input snapshot
pub trait Producer {
    /// Build from `input_root` into `output_root`
    fn produce(&mut self, input_root: &Path, output_root: &Path) -> Result<BuildReport, BundleError>;
}

/// A named module registered with the loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDefinition {
    /// Canonical module name
    pub name: String,
    /// File the definition was read from, relative to the input root;
    /// empty for shims
    pub source: String,
    /// Definition body
    pub contents: Arc<str>,
}

/// A priority-ordered chunk of the artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFragment {
    pub priority: String,
    pub contents: Arc<str>,
}

/// Outcome of a successful build
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Path of the written artifact
    pub output_path: PathBuf,
    /// Registered module names, in artifact order
    pub modules: Vec<String>,
    /// Number of legacy files appended
    pub legacy_files: usize,
    /// Artifact size in bytes
    pub bytes: usize,
    /// Cache statistics for this build
    pub cache: FileCacheStats,
    /// Wall time of the build
    pub elapsed: Duration,
}

/// Order used for module names and fragment priorities
///
/// Case-folded code point order first, then lowercase before uppercase at
/// the first differing position, then raw code point. Total and independent
/// of the host locale; punctuation sorts by code point, so `a-b` < `a.b` <
/// `a1` < `a_b`.
pub fn collate(a: &str, b: &str) -> Ordering {
    let folded = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<Vec<_>>();

    folded(a)
        .cmp(&folded(b))
        .then_with(|| {
            a.chars()
                .zip(b.chars())
                .map(|(x, y)| x.is_uppercase().cmp(&y.is_uppercase()))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.cmp(b))
}

/// The bundler: configuration plus the cache carried across builds
#[derive(Debug)]
pub struct Bundler {
    config: BuildConfig,
    cache: FileCache,
    loader_prelude: Arc<str>,
    previous_output: Option<PathBuf>,
}

impl Bundler {
    /// Create a bundler, validating `config`
    pub fn new(config: BuildConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let loader_prelude = wrap::wrap_code(LOADER_SOURCE, LOADER_SOURCE_NAME, config.wrap_sources);

        Ok(Self {
            config,
            cache: FileCache::new(),
            loader_prelude: Arc::from(loader_prelude),
            previous_output: None,
        })
    }

    /// The configuration this bundler was built with
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// The build cache
    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    /// Run a full build: take a snapshot from `tree`, then produce
    pub fn build(&mut self, tree: &mut dyn InputTree, output_root: &Path) -> Result<BuildReport, BundleError> {
        let input_root = tree.snapshot(self.previous_output.as_deref())?;
        let report = self.produce(&input_root, output_root)?;
        self.previous_output = Some(output_root.to_path_buf());
        Ok(report)
    }
}

impl Producer for Bundler {
    fn produce(&mut self, input_root: &Path, output_root: &Path) -> Result<BuildReport, BundleError> {
        let started = Instant::now();
        self.cache.begin_generation();

        let run = BuildRun {
            config: &self.config,
            cache: &self.cache,
            root: input_root,
            loader_prelude: &self.loader_prelude,
        };

        let definitions = run.compile_modules()?;
        debug!(count = definitions.len(), "modules compiled");

        let (registry, modules) = run.compile_module_registry(definitions);
        let legacy = run.compile_legacy_fragments()?;
        debug!(count = legacy.len(), "legacy files compiled");

        let legacy_files = legacy.len();
        let contents = serialize(registry.into_iter().chain(legacy).collect());

        let output_path = output_root.join(&self.config.output_file);
        write_artifact(&output_path, &contents)?;
        self.cache.commit_generation();

        let report = BuildReport {
            output_path,
            modules,
            legacy_files,
            bytes: contents.len(),
            cache: self.cache.stats(),
            elapsed: started.elapsed(),
        };

        info!(
            output = %report.output_path.display(),
            modules = report.modules.len(),
            legacy_files = report.legacy_files,
            bytes = report.bytes,
            file_hits = report.cache.files.hits,
            file_misses = report.cache.files.misses,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "bundle written"
        );

        Ok(report)
    }
}

/// State shared by the stages of one build
struct BuildRun<'a> {
    config: &'a BuildConfig,
    cache: &'a FileCache,
    root: &'a Path,
    loader_prelude: &'a Arc<str>,
}

impl BuildRun<'_> {
    /// Stage 2: definitions of every enabled package, plus shims
    fn compile_modules(&self) -> Result<Vec<ModuleDefinition>, BundleError> {
        let packages = self.config.enabled_packages();

        let per_package = fan_out(
            &packages,
            |(namespace, _)| format!("package {}", namespace),
            |(namespace, overrides)| self.compile_package(namespace, overrides),
        )?;

        let mut definitions: Vec<ModuleDefinition> = per_package.into_iter().flatten().collect();

        for (module, global) in &self.config.shims {
            definitions.push(ModuleDefinition {
                name: module.clone(),
                source: String::new(),
                contents: Arc::from(wrap::shim(global)),
            });
        }

        Ok(definitions)
    }

    fn compile_package(
        &self,
        namespace: &str,
        overrides: &PackageOverride,
    ) -> Result<Vec<ModuleDefinition>, BundleError> {
        let resolver = PackageResolver::new(self.root, &self.config.manifest_name, &self.config.manifest_key);
        let config = resolver.resolve(self.cache, namespace, overrides)?;

        let mut definitions = Vec::new();

        if let Some(entry_module) = config.entry_module() {
            let body = wrap::reexport(&entry_module);
            let source_name = format!("{}.js", namespace);
            definitions.push(ModuleDefinition {
                name: namespace.to_string(),
                contents: Arc::from(wrap::wrap_code(&body, &source_name, self.config.wrap_sources)),
                source: source_name,
            });
        }

        let discovery = ModuleDiscovery::new(self.root, &self.config.manifest_name);
        for file in discovery.files_for(&config)? {
            let Some(kind) = file.kind() else {
                continue;
            };
            let contents = self.read_cached(&file.relative_path, kind)?;
            definitions.push(ModuleDefinition {
                name: file.module_name(),
                source: file.relative_path.clone(),
                contents,
            });
        }

        debug!(namespace, modules = definitions.len(), "package compiled");
        Ok(definitions)
    }

    /// Stage 3: the module registry fragment and the registered names in order
    fn compile_module_registry(
        &self,
        mut definitions: Vec<ModuleDefinition>,
    ) -> (Option<OutputFragment>, Vec<String>) {
        // Same-named definitions (`foo.js` and `foo.json`) keep a fixed
        // order; the later one is registered last and wins
        definitions.sort_by(|a, b| {
            collate(&a.name, &b.name).then_with(|| collate(&a.source, &b.source))
        });

        let mut blocks: Vec<String> = Vec::with_capacity(definitions.len() + 1);
        if self.config.inject_loader {
            blocks.push(self.loader_prelude.to_string());
        }
        blocks.extend(
            definitions
                .iter()
                .map(|definition| wrap::define_statement(&definition.name, &definition.contents)),
        );

        let names = definitions.into_iter().map(|definition| definition.name).collect();
        if blocks.is_empty() {
            return (None, names);
        }

        let fragment = OutputFragment {
            priority: MODULE_REGISTRY_PRIORITY.to_string(),
            contents: Arc::from(blocks.join("\n\n")),
        };
        (Some(fragment), names)
    }

    /// Stage 4: one verbatim fragment per legacy file
    fn compile_legacy_fragments(&self) -> Result<Vec<OutputFragment>, BundleError> {
        let indexed: Vec<(usize, &String)> = self.config.legacy_files.iter().enumerate().collect();

        fan_out(
            &indexed,
            |(_, path)| format!("legacy file {}", path),
            |(index, path)| {
                Ok(OutputFragment {
                    priority: legacy_priority(*index),
                    contents: self.read_cached(path, FileKind::Verbatim)?,
                })
            },
        )
    }

    /// File contents as artifact text, through the file cache
    fn read_cached(&self, relative_path: &str, kind: FileKind) -> Result<Arc<str>, BundleError> {
        let file = self.root.join(relative_path);
        let fingerprint = Fingerprint::stat(&file, relative_path, kind.tag())
            .map_err(|e| BundleError::io(&file, e))?;

        self.cache.file_contents(&fingerprint, || {
            trace!(path = relative_path, "cache miss");
            let bytes = fs::read(&file).map_err(|e| BundleError::io(&file, e))?;
            let text = String::from_utf8_lossy(&bytes);
            Ok(Arc::from(kind.wrap(&text, relative_path, self.config.wrap_sources)))
        })
    }
}

/// Run `task` for every item on its own scoped thread
///
/// Results come back in item order; the first error in that order wins.
fn fan_out<T, R, D, F>(items: &[T], describe: D, task: F) -> Result<Vec<R>, BundleError>
where
    T: Sync,
    R: Send,
    D: Fn(&T) -> String,
    F: Fn(&T) -> Result<R, BundleError> + Sync,
{
    let task = &task;
    let joined = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = items
            .iter()
            .map(|item| scope.spawn(move |_| task(item)))
            .collect();

        handles
            .into_iter()
            .zip(items)
            .map(|(handle, item)| {
                handle.join().unwrap_or_else(|_| {
                    Err(BundleError::WorkerPanicked {
                        task: describe(item),
                    })
                })
            })
            .collect::<Vec<_>>()
    })
    .map_err(|_| BundleError::WorkerPanicked {
        task: "build stage".to_string(),
    })?;

    joined.into_iter().collect()
}

/// Stage 5: fragments sorted by priority, separated by blank lines
fn serialize(mut fragments: Vec<OutputFragment>) -> String {
    fragments.sort_by(|a, b| collate(&a.priority, &b.priority));

    let mut contents = fragments
        .iter()
        .map(|fragment| fragment.contents.as_ref())
        .collect::<Vec<_>>()
        .join("\n\n");
    if !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents
}

/// Write `contents` to `path` through a temporary sibling file
fn write_artifact(path: &Path, contents: &str) -> Result<(), BundleError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BundleError::io(parent, e))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, contents).map_err(|e| BundleError::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| BundleError::io(path, e))?;
    Ok(())
}
