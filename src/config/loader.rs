use super::Config;
use crate::core::error::{Error, Result};
use std::path::PathBuf;

/// Name of the configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "venom.toml";

/// Configuration loader that supports multiple sources.
pub struct ConfigLoader {
    /// Directory searched for `venom.toml` when no explicit file is given.
    working_dir: Option<PathBuf>,
    /// Path to an explicit config file.
    config_file: Option<PathBuf>,
    /// Whether to apply `VENOM_*` env var overrides.
    use_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader.
    pub fn new() -> Self {
        Self {
            working_dir: None,
            config_file: None,
            use_env: true,
        }
    }

    /// Set the directory searched for `venom.toml`.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set an explicit configuration file path.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Disable `VENOM_*` env var overrides.
    pub fn no_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Load configuration from all enabled sources.
    ///
    /// Priority (later sources override earlier):
    /// 1. Default values
    /// 2. `venom.toml` in the working directory, or the explicit config file
    /// 3. Individual env var overrides (`VENOM_*`)
    ///
    /// An explicit config file must exist; the implicit `venom.toml` is optional.
    pub fn load(self) -> Result<Config> {
        let mut config = Config::default();

        if let Some(ref path) = self.config_file {
            if !path.exists() {
                return Err(Error::FileNotFound(path.clone()));
            }
            config = Config::from_toml_file(path)?;
        } else if let Some(ref dir) = self.working_dir {
            let implicit = dir.join(DEFAULT_CONFIG_FILE);
            if implicit.is_file() {
                log::debug!("using config file {}", implicit.display());
                config = Config::from_toml_file(&implicit)?;
            }
        }

        if self.use_env {
            super::env::apply_env_overrides(&mut config);
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
