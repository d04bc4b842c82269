use std::path::PathBuf;

/// Result type alias for venom operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for venom.
///
/// Only problems that prevent a run from starting (configuration, discovery)
/// or from being written out (reporting) are raised as errors. Everything that
/// goes wrong inside a suite is recorded in the result tree instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Suite discovery or parsing errors.
    #[error("Loader error: {0}")]
    Loader(String),

    /// Executor construction errors.
    #[error("Executor error: {0}")]
    Executor(String),

    /// Report serialization or writing errors.
    #[error("Report error: {0}")]
    Report(String),

    /// File not found.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {field}: {value}")]
    InvalidConfig { field: String, value: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error.
    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// XML writer error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid glob pattern.
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Error::Loader(msg.into())
    }

    /// Create an executor error.
    pub fn executor(msg: impl Into<String>) -> Self {
        Error::Executor(msg.into())
    }

    /// Create a report error.
    pub fn report(msg: impl Into<String>) -> Self {
        Error::Report(msg.into())
    }
}
