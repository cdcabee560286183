// tests/logging_filter.rs

use piperun::cli::LogLevel;
use piperun::logging::build_filter;

#[test]
fn cli_flag_overrides_the_environment() {
    let filter = build_filter(Some(LogLevel::Warn), Some("trace"));
    assert_eq!(filter.to_string(), "warn");
}

#[test]
fn environment_directives_are_used_verbatim() {
    let filter = build_filter(None, Some("piperun=debug"));
    assert_eq!(filter.to_string(), "piperun=debug");
}

#[test]
fn missing_blank_or_invalid_environment_falls_back_to_info() {
    assert_eq!(build_filter(None, None).to_string(), "info");
    assert_eq!(build_filter(None, Some("   ")).to_string(), "info");
    assert_eq!(build_filter(None, Some("piperun=loud")).to_string(), "info");
}
