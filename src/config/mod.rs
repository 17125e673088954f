//! Optional project configuration, `justmark.toml`.
//!
//! # Example
//!
//! ```toml
//! [build]
//! targets = ["blog-bundle", "export.md"]
//!
//! [bundle]
//! command = ["npx", "esbuild"]   # bundler command line prefix
//! inline_limit = 10000           # inline assets below this size (bytes)
//! add_path_to_meta = true
//! blog_root_dir = ".."           # relative to this file
//! ```
//!
//! Every field is optional. Values set here are defaults for the command
//! line, which overrides them.

mod error;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::options::{CompileOptions, Target};

pub use error::ConfigError;

/// Looked up inside the input directory when no path is given.
pub const CONFIG_FILE: &str = "justmark.toml";

/// Root configuration structure representing `justmark.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `[build]` section
    pub build: BuildSection,
    /// `[bundle]` section
    pub bundle: BundleSection,
}

/// `[build]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSection {
    pub targets: Vec<Target>,
}

/// `[bundle]` section. Unset fields keep the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleSection {
    pub command: Option<Vec<String>>,
    pub inline_limit: Option<u64>,
    pub add_path_to_meta: Option<bool>,
    pub blog_root_dir: Option<PathBuf>,
}

impl Config {
    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file. Relative paths inside it are resolved
    /// against the file's directory.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;

        let root = path.parent().unwrap_or_else(|| Path::new(""));
        if let Some(dir) = config.bundle.blog_root_dir.take() {
            config.bundle.blog_root_dir = Some(root.join(dir));
        }
        Ok(config)
    }

    /// Load `explicit` if given, otherwise `justmark.toml` in `input_dir`
    /// when it exists, otherwise the defaults.
    pub fn load(explicit: Option<&Path>, input_dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        let candidate = input_dir.join(CONFIG_FILE);
        if candidate.is_file() {
            crate::debug!("config"; "using {}", candidate.display());
            Self::from_path(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Fill `options` with the values this file sets.
    pub fn apply(&self, options: &mut CompileOptions) {
        if !self.build.targets.is_empty() {
            options.targets = self.build.targets.clone();
        }

        let bundle = &self.bundle;
        if let Some(command) = &bundle.command {
            options.bundle.command = command.clone();
        }
        if let Some(limit) = bundle.inline_limit {
            options.bundle.inline_limit = limit;
        }
        if let Some(enabled) = bundle.add_path_to_meta {
            options.bundle.add_path_to_meta = enabled;
        }
        if let Some(root) = &bundle.blog_root_dir {
            options.bundle.blog_root_dir = Some(root.clone());
        }
    }
}
