// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// File name looked up in the current directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "Piperun.toml";

/// Read and deserialize `path` without any validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let text = fs::read_to_string(path.as_ref())?;
    Ok(toml::from_str(&text)?)
}

/// Read `path` and run it through `ConfigFile::try_from`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    load_from_path(path)?.try_into()
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
