//! Module file discovery
//!
//! Lists the files of a resolved package: its entry file (when present) and
//! every recognized file below its include directories. Order follows the
//! include directories' declaration order; within one directory it is whatever
//! the filesystem yields. Module names are sorted later, so this order never
//! reaches the artifact.

use crate::canonical;
use crate::error::BundleError;
use crate::resolver::PackageConfig;
use crate::wrap::FileKind;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// A file belonging to a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Path relative to the input root, `/`-separated
    pub relative_path: String,

    /// Namespace of the owning package
    pub namespace: String,
}

impl DiscoveredFile {
    /// Module name: the relative path without its extension
    pub fn module_name(&self) -> String {
        let name_start = self.relative_path.rfind('/').map_or(0, |idx| idx + 1);
        match self.relative_path[name_start..].rfind('.') {
            Some(dot) if dot > 0 => self.relative_path[..name_start + dot].to_string(),
            _ => self.relative_path.clone(),
        }
    }

    /// How the file is wrapped
    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_path(&self.relative_path)
    }
}

/// Enumerates package files below an input root
#[derive(Debug, Clone)]
pub struct ModuleDiscovery<'a> {
    root: &'a Path,
    manifest_name: &'a str,
}

impl<'a> ModuleDiscovery<'a> {
    /// Create a discovery over `root`; `manifest_name` files are never listed
    pub fn new(root: &'a Path, manifest_name: &'a str) -> Self {
        Self { root, manifest_name }
    }

    /// All files of the package described by `config`
    ///
    /// A missing include directory contributes nothing; any other traversal
    /// error aborts.
    pub fn files_for(&self, config: &PackageConfig) -> Result<Vec<DiscoveredFile>, BundleError> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        let manifest = canonical::join(&config.namespace, self.manifest_name);

        let mut push = |relative_path: String, files: &mut Vec<DiscoveredFile>| {
            if relative_path != manifest && seen.insert(relative_path.clone()) {
                files.push(DiscoveredFile {
                    relative_path,
                    namespace: config.namespace.clone(),
                });
            }
        };

        if let Some(entry_file) = config.entry_file() {
            if self.root.join(&entry_file).is_file() {
                push(entry_file, &mut files);
            } else {
                warn!(
                    namespace = %config.namespace,
                    entry = %entry_file,
                    "entry file does not exist"
                );
            }
        }

        for dir in &config.include {
            let relative_dir = canonical::join(&config.namespace, dir);
            let full_dir = self.root.join(&relative_dir);
            let entries = match fs::read_dir(&full_dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    trace!(dir = %relative_dir, "include directory missing");
                    continue;
                }
                Err(e) => return Err(BundleError::io(&full_dir, e)),
            };

            let mut found = Vec::new();
            self.walk(entries, &full_dir, &relative_dir, &mut found)?;
            for relative_path in found {
                push(relative_path, &mut files);
            }
        }

        Ok(files)
    }

    /// Recursively collect recognized, non-hidden files from a directory listing
    fn walk(
        &self,
        entries: fs::ReadDir,
        dir: &Path,
        relative_dir: &str,
        files: &mut Vec<String>,
    ) -> Result<(), BundleError> {
        for entry in entries {
            let entry = entry.map_err(|e| BundleError::io(dir, e))?;
            let path: PathBuf = entry.path();
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                warn!(path = %path.display(), "skipping non UTF-8 file name");
                continue;
            };

            let relative_path = if relative_dir.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", relative_dir, name)
            };
            let metadata = fs::metadata(&path).map_err(|e| BundleError::io(&path, e))?;

            if metadata.is_dir() {
                let children = fs::read_dir(&path).map_err(|e| BundleError::io(&path, e))?;
                self.walk(children, &path, &relative_path, files)?;
            } else if !name.starts_with('.') && FileKind::from_path(name).is_some() {
                files.push(relative_path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(namespace: &str, main: Option<&str>, include: &[&str]) -> PackageConfig {
        PackageConfig {
            namespace: namespace.to_string(),
            main: main.map(str::to_string),
            include: include.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn sorted_paths(files: &[DiscoveredFile]) -> Vec<String> {
        let mut paths: Vec<String> = files.iter().map(|f| f.relative_path.clone()).collect();
        paths.sort();
        paths
    }

    #[test]
    fn test_filters_extensions_and_hidden_files() {
        let temp = TempDir::new().unwrap();
        let lib = temp.path().join("widgets/lib");
        fs::create_dir_all(lib.join("nested")).unwrap();
        fs::write(lib.join("foo.js"), "").unwrap();
        fs::write(lib.join("data.json"), "{}").unwrap();
        fs::write(lib.join(".hidden.js"), "").unwrap();
        fs::write(lib.join("notes.md"), "").unwrap();
        fs::write(lib.join("nested/bar.js"), "").unwrap();

        let discovery = ModuleDiscovery::new(temp.path(), "bower.json");
        let files = discovery.files_for(&config("widgets", None, &["lib"])).unwrap();

        assert_eq!(
            sorted_paths(&files),
            vec![
                "widgets/lib/data.json".to_string(),
                "widgets/lib/foo.js".to_string(),
                "widgets/lib/nested/bar.js".to_string(),
            ]
        );
        assert!(files.iter().all(|f| f.namespace == "widgets"));
    }

    #[test]
    fn test_missing_include_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("widgets")).unwrap();

        let discovery = ModuleDiscovery::new(temp.path(), "bower.json");
        let files = discovery.files_for(&config("widgets", None, &["nope"])).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_include_dirs_in_declaration_order() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("widgets/b")).unwrap();
        fs::create_dir_all(temp.path().join("widgets/a")).unwrap();
        fs::write(temp.path().join("widgets/b/one.js"), "").unwrap();
        fs::write(temp.path().join("widgets/a/two.js"), "").unwrap();

        let discovery = ModuleDiscovery::new(temp.path(), "bower.json");
        let files = discovery.files_for(&config("widgets", None, &["b", "a"])).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["widgets/b/one.js", "widgets/a/two.js"]);
    }

    #[test]
    fn test_entry_file_first_and_deduplicated() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("widgets");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("index.js"), "").unwrap();
        fs::write(dir.join("bower.json"), "{}").unwrap();

        let discovery = ModuleDiscovery::new(temp.path(), "bower.json");
        let files = discovery.files_for(&config("widgets", Some("index"), &["."])).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["widgets/index.js"]);
    }

    #[test]
    fn test_missing_entry_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("widgets")).unwrap();

        let discovery = ModuleDiscovery::new(temp.path(), "bower.json");
        let files = discovery.files_for(&config("widgets", Some("index"), &[])).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_module_name() {
        let file = DiscoveredFile {
            relative_path: "widgets/lib/foo.js".to_string(),
            namespace: "widgets".to_string(),
        };
        assert_eq!(file.module_name(), "widgets/lib/foo");
        assert_eq!(file.kind(), Some(FileKind::Code));

        let dotted = DiscoveredFile {
            relative_path: "widgets/v1.2/foo.min.js".to_string(),
            namespace: "widgets".to_string(),
        };
        assert_eq!(dotted.module_name(), "widgets/v1.2/foo.min");
    }
}
