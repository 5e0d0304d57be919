//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::bot::spawner::SpawnConfig;
use crate::{AppError, Result};

fn default_interpreter() -> String {
    if cfg!(windows) {
        "python".into()
    } else {
        "python3".into()
    }
}

fn default_ipc_name() -> String {
    "botshell".into()
}

fn default_query_timeout_seconds() -> u64 {
    30
}

fn default_event_buffer() -> usize {
    256
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Path to the bot script executed as the supervised child process.
    pub script_path: PathBuf,
    /// Interpreter used to run the bot script.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Named pipe / Unix socket identifier for the UI bridge.
    #[serde(default = "default_ipc_name")]
    pub ipc_name: String,
    /// Bound (seconds) on auxiliary one-shot queries before the child is killed.
    #[serde(default = "default_query_timeout_seconds")]
    pub query_timeout_seconds: u64,
    /// Capacity of the supervisor-to-bridge event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize paths.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Spawn parameters derived from this configuration.
    #[must_use]
    pub fn spawn_config(&self) -> SpawnConfig {
        SpawnConfig {
            interpreter: self.interpreter.clone(),
            script_path: self.script_path.clone(),
            query_timeout: Duration::from_secs(self.query_timeout_seconds),
        }
    }

    fn validate(&mut self) -> Result<()> {
        if self.interpreter.is_empty() {
            return Err(AppError::Config("interpreter must not be empty".into()));
        }

        if self.query_timeout_seconds == 0 {
            return Err(AppError::Config(
                "query_timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.event_buffer == 0 {
            return Err(AppError::Config(
                "event_buffer must be greater than zero".into(),
            ));
        }

        let canonical_script = self
            .script_path
            .canonicalize()
            .map_err(|err| AppError::Config(format!("script_path invalid: {err}")))?;
        self.script_path = canonical_script;

        Ok(())
    }
}
