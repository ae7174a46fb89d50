//! Build errors

use crate::config::ConfigError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a build
///
/// A failed build writes no artifact and does not commit the cache.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A file the build needs does not exist
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// A package manifest could not be parsed
    #[error("Could not parse {}: {message}", path.display())]
    ManifestParse { path: PathBuf, message: String },

    /// Any other filesystem failure
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid build configuration
    #[error("Invalid build configuration: {0}")]
    Config(#[from] ConfigError),

    /// A concurrent build task panicked
    #[error("Build task panicked: {task}")]
    WorkerPanicked { task: String },
}

impl BundleError {
    /// Classify an I/O failure on `path`
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == io::ErrorKind::NotFound {
            BundleError::NotFound { path }
        } else {
            BundleError::Io { path, source }
        }
    }

    /// Whether this error reports a missing file
    pub fn is_not_found(&self) -> bool {
        matches!(self, BundleError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        let missing = BundleError::io("a.js", io::Error::from(io::ErrorKind::NotFound));
        assert!(missing.is_not_found());
        assert_eq!(missing.to_string(), "File not found: a.js");

        let denied = BundleError::io("a.js", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(denied, BundleError::Io { .. }));
    }

    #[test]
    fn test_manifest_parse_message() {
        let err = BundleError::ManifestParse {
            path: PathBuf::from("widgets/bower.json"),
            message: "expected value at line 1 column 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Could not parse widgets/bower.json: expected value at line 1 column 1"
        );
    }
}
