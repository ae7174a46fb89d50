//! Stat-derived cache keys
//!
//! A fingerprint stands in for a file's content identity without reading the
//! file: it hashes the path together with size, modification time and, on
//! Unix, mode and inode. Two files with equal fingerprints are assumed to have
//! equal contents.
//!
//! This is the usual stat-cache tradeoff. A copy that preserves mtime and size,
//! or a clock that moves backwards onto a previous mtime, yields a stale hit.
//! In exchange a rebuild never reads an unchanged file.

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Hex-encoded SHA-256 over a file's stat metadata, path and variant tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a file from already fetched metadata
    ///
    /// # Arguments
    /// * `metadata` - Result of `stat` on the file
    /// * `path` - Path identifying the file (relative to the input root)
    /// * `variant` - Tag distinguishing different computations over one file
    pub fn from_metadata(metadata: &fs::Metadata, path: &str, variant: &str) -> Self {
        let mut hasher = Sha256::new();

        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(variant.as_bytes());
        hasher.update([0u8]);
        hasher.update(metadata.len().to_le_bytes());

        let mtime = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or(0);
        hasher.update(mtime.to_le_bytes());

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            hasher.update(metadata.mode().to_le_bytes());
            hasher.update(metadata.ino().to_le_bytes());
            hasher.update(metadata.dev().to_le_bytes());
        }

        Self(hex::encode(hasher.finalize()))
    }

    /// Stat `file` and fingerprint it under the name `path`
    pub fn stat(file: &Path, path: &str, variant: &str) -> io::Result<Self> {
        let metadata = fs::metadata(file)?;
        Ok(Self::from_metadata(&metadata, path, variant))
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
