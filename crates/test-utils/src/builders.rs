#![allow(dead_code)]

use std::path::PathBuf;

use piperun::config::{CommandEntry, CommandSource, ConfigFile, RawConfigFile, RunnerSection};
use piperun::types::RunMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                runner: RunnerSection::default(),
                commands: Vec::new(),
            },
        }
    }

    pub fn with_command(mut self, line: &str) -> Self {
        self.config.commands.push(CommandEntry {
            cmd: CommandSource::Line(line.to_string()),
        });
        self
    }

    pub fn with_tokens(mut self, tokens: &[&str]) -> Self {
        self.config.commands.push(CommandEntry {
            cmd: CommandSource::Tokens(tokens.iter().map(|t| t.to_string()).collect()),
        });
        self
    }

    pub fn mode(mut self, mode: RunMode) -> Self {
        self.config.runner.mode = mode;
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.config.runner.timeout = Some(timeout.to_string());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.runner.working_dir = Some(dir.into());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
