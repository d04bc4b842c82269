//! Environment variable processing for runtime configuration overrides.
//!
//! Env var prefix: `VENOM_`
//!
//! - `VENOM_PARALLEL`: number of suites run concurrently
//! - `VENOM_FORMAT`: report format (json/yaml/xml)
//! - `VENOM_OUTPUT_DIR`: report output directory
//! - `VENOM_DETAILS`: progress detail level (low/medium/high)
//! - `VENOM_ALIAS`: command aliases (whitespace-split, each `alias:real`)
//! - `VENOM_LOG_LEVEL`: log level for the binary
//! - `VENOM_HTTP_TIMEOUT`: HTTP request timeout in seconds
//! - `VENOM_HTTP_INSECURE`: accept invalid TLS certificates (1/true/yes)

use super::{Config, DetailsLevel, OutputFormat};
use std::path::PathBuf;

const PREFIX: &str = "VENOM_";

/// Apply individual env var overrides to a config.
///
/// Each override is applied only if the env var is set and parses correctly.
/// Invalid values are logged and ignored.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(val) = env_parse::<usize>("PARALLEL") {
        config.run.parallel = val;
    }

    if let Some(val) = env_plain::<OutputFormat>("FORMAT") {
        config.output.format = val;
    }

    if let Some(val) = env_str("OUTPUT_DIR") {
        config.output.dir = Some(PathBuf::from(val));
    }

    if let Some(val) = env_plain::<DetailsLevel>("DETAILS") {
        config.run.details = val;
    }

    if let Some(val) = env_str("ALIAS") {
        config.run.alias = val.split_whitespace().map(String::from).collect();
    }

    if let Some(val) = env_str("LOG_LEVEL") {
        config.run.log_level = val;
    }

    if let Some(val) = env_parse::<u64>("HTTP_TIMEOUT") {
        config.http.timeout_secs = Some(val);
    }

    if let Some(val) = env_bool("HTTP_INSECURE") {
        config.http.insecure = val;
    }
}

/// Summarize which env var overrides are currently active.
///
/// Returns a list of `(env_var_name, value)` pairs for display in `check`.
pub fn detect_active_overrides() -> Vec<(String, String)> {
    let keys = [
        "PARALLEL",
        "FORMAT",
        "OUTPUT_DIR",
        "DETAILS",
        "ALIAS",
        "LOG_LEVEL",
        "HTTP_TIMEOUT",
        "HTTP_INSECURE",
    ];

    let mut active = Vec::new();
    for key in keys {
        let full = format!("{PREFIX}{key}");
        if let Ok(val) = std::env::var(&full) {
            if !val.is_empty() {
                active.push((full, val));
            }
        }
    }
    active
}

// --- helpers ---

fn env_str(suffix: &str) -> Option<String> {
    std::env::var(format!("{PREFIX}{suffix}"))
        .ok()
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(suffix: &str) -> Option<T> {
    let raw = env_str(suffix)?;
    match raw.parse() {
        Ok(val) => Some(val),
        Err(_) => {
            log::warn!("ignoring invalid {PREFIX}{suffix}={raw}");
            None
        }
    }
}

fn env_plain<T: serde::de::DeserializeOwned>(suffix: &str) -> Option<T> {
    let raw = env_str(suffix)?;
    match serde_plain::from_str(&raw.to_lowercase()) {
        Ok(val) => Some(val),
        Err(_) => {
            log::warn!("ignoring invalid {PREFIX}{suffix}={raw}");
            None
        }
    }
}

fn env_bool(suffix: &str) -> Option<bool> {
    env_str(suffix).map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
}
