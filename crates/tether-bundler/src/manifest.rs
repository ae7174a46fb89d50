//! Package manifest parsing (bower.json)
//!
//! Only two things are read from a package manifest: the top-level `main`
//! entry and the build-tool section (by default `"tether"`) holding `main` and
//! `include` overrides. Everything else in the document is ignored.

use crate::error::BundleError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::Path;

/// A string or a list of strings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// The scalar, or the first element of a list
    pub fn first(&self) -> Option<&str> {
        match self {
            OneOrMany::One(value) => Some(value.as_str()),
            OneOrMany::Many(values) => values.first().map(String::as_str),
        }
    }

    /// All values, wrapping a scalar into a one-element list
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value.clone()],
            OneOrMany::Many(values) => values.clone(),
        }
    }
}

/// Build-tool section of a manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolSection {
    /// Entry file override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<OneOrMany>,

    /// Directories whose files are bundled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<OneOrMany>,
}

/// Per-package manifest document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageManifest {
    /// Declared entry file(s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<OneOrMany>,

    /// Every other top-level field, including the tool section
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackageManifest {
    /// Parse a manifest from a string
    pub fn from_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Read the manifest at `path`
    ///
    /// # Returns
    /// * `Ok(None)` - No manifest exists
    /// * `Ok(Some(manifest))` - Parsed manifest
    /// * `Err(BundleError::ManifestParse)` - Manifest is malformed
    /// * `Err(BundleError::Io)` - Reading failed for another reason
    pub fn read(path: &Path) -> Result<Option<Self>, BundleError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BundleError::io(path, e)),
        };

        Self::from_str(&content)
            .map(Some)
            .map_err(|e| BundleError::ManifestParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    /// The build-tool section stored under `key`, if present
    pub fn tool_section(&self, key: &str) -> Result<Option<ToolSection>, serde_json::Error> {
        match self.extra.get(key) {
            Some(value) => serde_json::from_value(value.clone()).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_main_scalar_and_list() {
        let scalar = PackageManifest::from_str(r#"{"main": "index.js"}"#).unwrap();
        assert_eq!(scalar.main.unwrap().first(), Some("index.js"));

        let list = PackageManifest::from_str(r#"{"main": ["dist/app.js", "dist/app.css"]}"#).unwrap();
        assert_eq!(list.main.unwrap().first(), Some("dist/app.js"));
    }

    #[test]
    fn test_unrelated_fields_ignored() {
        let manifest = PackageManifest::from_str(
            r#"{"name": "widgets", "version": "1.0.0", "dependencies": {"x": "^1"}}"#,
        )
        .unwrap();
        assert!(manifest.main.is_none());
        assert!(manifest.tool_section("tether").unwrap().is_none());
    }

    #[test]
    fn test_tool_section() {
        let manifest = PackageManifest::from_str(
            r#"{"main": "index.js", "tether": {"include": "lib"}}"#,
        )
        .unwrap();
        let section = manifest.tool_section("tether").unwrap().unwrap();
        assert_eq!(section.include.unwrap().to_vec(), vec!["lib".to_string()]);
        assert!(section.main.is_none());
    }

    #[test]
    fn test_malformed_tool_section() {
        let manifest = PackageManifest::from_str(r#"{"tether": {"include": 5}}"#).unwrap();
        assert!(manifest.tool_section("tether").is_err());
    }

    #[test]
    fn test_read_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let result = PackageManifest::read(&temp.path().join("bower.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_read_malformed_names_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bower.json");
        fs::write(&path, "{ not json").unwrap();

        let err = PackageManifest::read(&path).unwrap_err();
        match err {
            BundleError::ManifestParse { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
