//! Input tree provider
//!
//! A build reads from a directory snapshot handed out by an [`InputTree`]. The
//! bundler never inspects how the snapshot was produced; invalidation relies
//! on the build cache alone.

use crate::error::BundleError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Supplies the directory a build reads from
pub trait InputTree {
    /// Directory snapshot for the next build
    ///
    /// `previous` is the output root of the last successful build made from
    /// this tree, if any.
    fn snapshot(&mut self, previous: Option<&Path>) -> Result<PathBuf, BundleError>;
}

/// A plain directory read in place
#[derive(Debug, Clone)]
pub struct DirectoryTree {
    root: PathBuf,
}

impl DirectoryTree {
    /// Create a tree rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl InputTree for DirectoryTree {
    fn snapshot(&mut self, _previous: Option<&Path>) -> Result<PathBuf, BundleError> {
        let metadata = fs::metadata(&self.root).map_err(|e| BundleError::io(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(BundleError::Io {
                path: self.root.clone(),
                source: io::Error::new(io::ErrorKind::NotADirectory, "input root is not a directory"),
            });
        }
        Ok(self.root.clone())
    }
}
