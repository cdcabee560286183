// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{CommandTemplate, RunMode};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [runner]
/// working_dir = "."
/// mode = "pipe"
/// timeout = "30s"
///
/// [[command]]
/// cmd = "echo hello"
///
/// [[command]]
/// cmd = ["tr", "a-z", "A-Z"]
/// ```
///
/// This is the unvalidated form; convert it with `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runner: RunnerSection,

    /// All `[[command]]` entries, in execution order.
    #[serde(default, rename = "command")]
    pub commands: Vec<CommandEntry>,
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RunnerSection {
    /// Directory every command runs in. Relative paths are resolved against
    /// the directory containing the config file.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// `"pipe"` (default) or `"concurrent"`.
    #[serde(default)]
    pub mode: RunMode,

    /// Per-command timeout such as `"500ms"`, `"30s"`, `"2m"`.
    #[serde(default)]
    pub timeout: Option<String>,
}

/// One `[[command]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandEntry {
    pub cmd: CommandSource,
}

/// A command written either as one line or as a list of tokens.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CommandSource {
    Line(String),
    Tokens(Vec<String>),
}

impl CommandSource {
    pub fn to_template(&self) -> CommandTemplate {
        match self {
            CommandSource::Line(line) => CommandTemplate::from(line),
            CommandSource::Tokens(tokens) => CommandTemplate::from_tokens(tokens),
        }
    }
}

/// A validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub working_dir: Option<PathBuf>,
    pub mode: RunMode,
    pub timeout: Option<Duration>,
    pub commands: Vec<CommandTemplate>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        working_dir: Option<PathBuf>,
        mode: RunMode,
        timeout: Option<Duration>,
        commands: Vec<CommandTemplate>,
    ) -> Self {
        Self {
            working_dir,
            mode,
            timeout,
            commands,
        }
    }
}
