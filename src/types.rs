// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// 1-based position of a command within the runner's command list.
pub type Ordinal = usize;

/// Which orchestration strategy a runner is driven with.
///
/// - `Pipe`: run commands one at a time, feeding each trimmed stdout into the
///   next command as a trailing argument (default).
/// - `Concurrent`: launch every command at once and wait for all to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Pipe,
    Concurrent,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pipe" => Ok(RunMode::Pipe),
            "concurrent" | "concurrently" => Ok(RunMode::Concurrent),
            other => Err(format!(
                "invalid mode: {other} (expected \"pipe\" or \"concurrent\")"
            )),
        }
    }
}

/// A command as enqueued on the runner.
///
/// Token sequences are joined with single spaces, so `["echo", "hi"]` and
/// `"echo hi"` produce equal templates. A template is never modified after
/// it has been added; pipe mode builds the command it actually runs with
/// [`CommandTemplate::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandTemplate(String);

impl CommandTemplate {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = tokens
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Self(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the command line to execute, appending the previous stage's
    /// output (trimmed) after a single space.
    ///
    /// The appended text is not escaped or parsed in any way.
    pub fn resolve(&self, upstream_stdout: Option<&str>) -> String {
        match upstream_stdout {
            Some(out) => format!("{} {}", self.0, out.trim()),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommandTemplate {
    fn from(line: &str) -> Self {
        Self::new(line)
    }
}

impl From<String> for CommandTemplate {
    fn from(line: String) -> Self {
        Self::new(line)
    }
}

impl From<&String> for CommandTemplate {
    fn from(line: &String) -> Self {
        Self::new(line.as_str())
    }
}

impl From<Vec<String>> for CommandTemplate {
    fn from(tokens: Vec<String>) -> Self {
        Self::from_tokens(tokens)
    }
}

impl From<Vec<&str>> for CommandTemplate {
    fn from(tokens: Vec<&str>) -> Self {
        Self::from_tokens(tokens)
    }
}

impl From<&[&str]> for CommandTemplate {
    fn from(tokens: &[&str]) -> Self {
        Self::from_tokens(tokens)
    }
}

impl<const N: usize> From<[&str; N]> for CommandTemplate {
    fn from(tokens: [&str; N]) -> Self {
        Self::from_tokens(tokens)
    }
}

/// Outcome of one successfully executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub ordinal: Ordinal,
    /// The command line as actually executed.
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Aggregate returned by a successful pipe run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipeOutput {
    /// Trimmed stdout of every stage, joined with `\n` in stage order.
    pub stdout: String,
    /// Stderr of every stage exactly as emitted, joined with `\n` in stage
    /// order.
    pub stderr: String,
    pub exit_codes: Vec<i32>,
}

impl PipeOutput {
    pub(crate) fn from_results(results: &[ProcessResult]) -> Self {
        let stdout = results
            .iter()
            .map(|r| r.stdout.trim())
            .collect::<Vec<_>>()
            .join("\n");
        let stderr = results
            .iter()
            .map(|r| r.stderr.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            stdout,
            stderr,
            exit_codes: results.iter().map(|r| r.exit_code).collect(),
        }
    }
}
