// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PiperunError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PiperunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_commands(&raw)?;
        let commands = raw
            .commands
            .iter()
            .map(|entry| entry.cmd.to_template())
            .collect::<Vec<_>>();

        for (index, cmd) in commands.iter().enumerate() {
            if cmd.as_str().trim().is_empty() {
                return Err(PiperunError::ConfigError(format!(
                    "command {} is empty",
                    index + 1
                )));
            }
        }

        let timeout = match raw.runner.timeout.as_deref() {
            Some(s) => Some(parse_timeout(s)?),
            None => None,
        };

        Ok(ConfigFile::new_unchecked(
            raw.runner.working_dir,
            raw.runner.mode,
            timeout,
            commands,
        ))
    }
}

fn ensure_has_commands(cfg: &RawConfigFile) -> Result<()> {
    if cfg.commands.is_empty() {
        return Err(PiperunError::ConfigError(
            "config must contain at least one [[command]] entry".to_string(),
        ));
    }
    Ok(())
}

fn parse_timeout(s: &str) -> Result<Duration> {
    let dur = parse_duration(s)
        .map_err(|e| PiperunError::ConfigError(format!("[runner].timeout: {e}")))?;
    if dur.is_zero() {
        return Err(PiperunError::ConfigError(
            "[runner].timeout must be greater than zero".to_string(),
        ));
    }
    Ok(dur)
}

/// Parse a duration written as an integer followed by a unit: `ms`, `s`,
/// `m` or `h` (case-insensitive), e.g. `"500ms"` or `"2m"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let text = s.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = (&text[..split], text[split..].trim());

    if digits.is_empty() {
        return Err(format!("duration '{text}' must start with a number"));
    }
    if unit.is_empty() {
        return Err(format!("duration '{text}' needs a unit (ms, s, m or h)"));
    }

    let amount: u64 = digits
        .parse()
        .map_err(|e| format!("duration '{text}': {e}"))?;

    let seconds_per_unit = match unit.to_ascii_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(amount)),
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        other => return Err(format!("unknown duration unit '{other}' (expected ms, s, m or h)")),
    };

    amount
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{text}' is too large"))
}
