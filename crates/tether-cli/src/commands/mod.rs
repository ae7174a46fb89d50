//! Command implementations

pub mod build;
pub mod watch;

use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use tether_bundler::{BuildConfig, Bundler, DirectoryTree};

/// Options shared by `build` and `watch`
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Build configuration file
    #[arg(short, long, default_value = "tether.toml")]
    pub config: PathBuf,

    /// Input directory (default: the configuration file's directory)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "dist")]
    pub out: PathBuf,
}

/// Everything a build needs, assembled from the command line
pub struct Session {
    pub bundler: Bundler,
    pub tree: DirectoryTree,
    pub output_root: PathBuf,
}

impl BuildArgs {
    /// Input directory, falling back to the configuration file's directory
    pub fn input_root(&self) -> PathBuf {
        match &self.input {
            Some(input) => input.clone(),
            None => match self.config.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }

    /// Load the configuration and create the bundler
    pub fn session(&self) -> anyhow::Result<Session> {
        let config = load_config(&self.config)?;
        let bundler = Bundler::new(config)
            .with_context(|| format!("Invalid configuration in {}", self.config.display()))?;

        Ok(Session {
            bundler,
            tree: DirectoryTree::new(self.input_root()),
            output_root: self.out.clone(),
        })
    }
}

fn load_config(path: &Path) -> anyhow::Result<BuildConfig> {
    BuildConfig::from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(config: PathBuf, input: Option<PathBuf>) -> BuildArgs {
        BuildArgs {
            config,
            input,
            out: PathBuf::from("dist"),
        }
    }

    #[test]
    fn test_input_root_defaults_to_config_dir() {
        assert_eq!(
            args(PathBuf::from("site/tether.toml"), None).input_root(),
            PathBuf::from("site")
        );
        assert_eq!(
            args(PathBuf::from("tether.toml"), None).input_root(),
            PathBuf::from(".")
        );
        assert_eq!(
            args(PathBuf::from("site/tether.toml"), Some(PathBuf::from("src"))).input_root(),
            PathBuf::from("src")
        );
    }

    #[test]
    fn test_session_from_config_file() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("tether.toml");
        fs::write(&config, "output_file = \"app.js\"\n").unwrap();

        let session = args(config, None).session().unwrap();
        assert_eq!(session.tree.root(), temp.path());
        assert_eq!(session.bundler.config().output_file, "app.js");
    }

    #[test]
    fn test_session_rejects_invalid_config() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("tether.toml");
        fs::write(&config, "output_file = \"../escape.js\"\n").unwrap();

        assert!(args(config, None).session().is_err());
        assert!(args(temp.path().join("missing.toml"), None).session().is_err());
    }
}
