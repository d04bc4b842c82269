//! Configuration types and loading from `venom.toml`, `VENOM_*` env vars and CLI flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::{Error, Result};

pub mod env;
mod loader;
pub use loader::ConfigLoader;

/// Complete configuration for a run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Execution configuration.
    #[serde(default)]
    pub run: RunConfig,

    /// Report output configuration.
    #[serde(default)]
    pub output: OutputConfig,

    /// HTTP executor configuration.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Number of suites executed concurrently (at least 1).
    pub parallel: usize,

    /// Progress display detail level.
    pub details: DetailsLevel,

    /// Command aliases, each written `alias:real-command`.
    pub alias: Vec<String>,

    /// Pattern used to expand a directory into suite documents.
    pub glob: String,

    /// Log level for the binary (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(rename = "log-level")]
    pub log_level: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: 1,
            details: DetailsLevel::default(),
            alias: Vec::new(),
            glob: default_glob(),
            log_level: "warn".to_string(),
        }
    }
}

fn default_glob() -> String {
    "*.yml".to_string()
}

/// How much live progress is shown while suites run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetailsLevel {
    /// One text line per finished suite.
    Low,
    /// One progress bar per suite.
    #[default]
    Medium,
    /// Progress bars with step counters, failed case diagnostics in the summary.
    High,
}

/// Report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Report format.
    pub format: OutputFormat,

    /// Directory receiving report files. Reports go to stdout when unset.
    pub dir: Option<PathBuf>,
}

/// Report serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Whole result tree as one JSON document.
    Json,
    /// Whole result tree as one YAML document.
    Yaml,
    /// One JUnit-style document per suite.
    #[default]
    Xml,
}

impl OutputFormat {
    /// File extension used for report files.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yml",
            OutputFormat::Xml => "xml",
        }
    }
}

/// HTTP executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds. No timeout when unset.
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: Option<u64>,

    /// Accept invalid TLS certificates.
    pub insecure: bool,
}

impl Config {
    /// Parse a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Load a configuration from a standalone TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Effective parallelism, never below 1.
    pub fn parallelism(&self) -> usize {
        self.run.parallel.max(1)
    }

    /// Check configuration-level problems that must abort before any suite runs.
    ///
    /// Creates the output directory when it does not exist yet.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref dir) = self.output.dir {
            if dir.exists() && !dir.is_dir() {
                return Err(Error::InvalidConfig {
                    field: "output.dir".to_string(),
                    value: format!("{} is not a directory", dir.display()),
                });
            }
            crate::util::ensure_dir_exists(dir).map_err(|e| {
                Error::config(format!(
                    "cannot create output directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        if glob::Pattern::new(&self.run.glob).is_err() {
            return Err(Error::InvalidConfig {
                field: "run.glob".to_string(),
                value: self.run.glob.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();
        assert_eq!(config.run.parallel, 1);
        assert_eq!(config.run.details, DetailsLevel::Medium);
        assert!(config.run.alias.is_empty());
        assert_eq!(config.run.glob, "*.yml");
        assert_eq!(config.run.log_level, "warn");
        assert_eq!(config.output.format, OutputFormat::Xml);
        assert!(config.output.dir.is_none());
        assert!(config.http.timeout_secs.is_none());
        assert!(!config.http.insecure);
    }

    #[test]
    fn test_config_deserialize_full() {
        let toml_str = r#"
        [run]
        parallel = 4
        details = "low"
        alias = ["cds:cdsctl --config /tmp/cds"]
        glob = "*.yaml"
        log-level = "debug"

        [output]
        format = "json"
        dir = "results"

        [http]
        timeout-secs = 30
        insecure = true
        "#;
        let config = Config::from_toml_str(toml_str).unwrap();
        assert_eq!(config.run.parallel, 4);
        assert_eq!(config.run.details, DetailsLevel::Low);
        assert_eq!(config.run.alias, vec!["cds:cdsctl --config /tmp/cds"]);
        assert_eq!(config.run.glob, "*.yaml");
        assert_eq!(config.run.log_level, "debug");
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.dir, Some(PathBuf::from("results")));
        assert_eq!(config.http.timeout_secs, Some(30));
        assert!(config.http.insecure);
    }

    #[test]
    fn test_config_deserialize_partial_section_keeps_defaults() {
        let config = Config::from_toml_str("[run]\nparallel = 3\n").unwrap();
        assert_eq!(config.run.parallel, 3);
        assert_eq!(config.run.glob, "*.yml");
        assert_eq!(config.output.format, OutputFormat::Xml);
    }

    #[test]
    fn test_config_deserialize_invalid_format() {
        let result = Config::from_toml_str("[output]\nformat = \"csv\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parallelism_never_zero() {
        let mut config = Config::default();
        config.run.parallel = 0;
        assert_eq!(config.parallelism(), 1);
    }

    #[test]
    fn test_output_format_extension() {
        assert_eq!(OutputFormat::Json.extension(), "json");
        assert_eq!(OutputFormat::Yaml.extension(), "yml");
        assert_eq!(OutputFormat::Xml.extension(), "xml");
    }

    #[test]
    fn test_validate_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.dir = Some(dir.path().join("reports"));
        config.validate().unwrap();
        assert!(dir.path().join("reports").is_dir());
    }

    #[test]
    fn test_validate_rejects_file_as_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let mut config = Config::default();
        config.output.dir = Some(file);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.dir"));
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let mut config = Config::default();
        config.run.glob = "[".to_string();
        assert!(config.validate().is_err());
    }
}
