//! `distbump.toml` loading. Every key is optional; command-line flags
//! override whatever the file says.

use crate::error::{BumpError, Result};
use crate::upstream::gnome::{DEFAULT_MIRROR, validate_mirror_url};
use crate::utils::console;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "distbump.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Where package checkouts are kept between runs.
    pub cache_dir: PathBuf,
    pub modules: PathBuf,
    pub branches: PathBuf,
    pub upstream_url: String,
    /// Run a local mock build before committing.
    pub mockbuild: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            modules: PathBuf::from("modules.xml"),
            branches: PathBuf::from("branches.xml"),
            upstream_url: DEFAULT_MIRROR.to_string(),
            mockbuild: true,
        }
    }
}

impl Config {
    /// Load `path`, or `distbump.toml` from the working directory when no
    /// path is given. Only an explicitly named file has to exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if explicit {
                return Err(BumpError::Config(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
            console::debug(format!("No {} found, using defaults", path.display()));
            return Ok(Self::default());
        }

        console::debug(format!("Loading configuration from {}", path.display()));
        Self::parse(&fs::read_to_string(&path)?)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        validate_mirror_url(&config.upstream_url)?;
        Ok(config)
    }
}
