//! Layered settings: TOML file, then environment, then command-line flags

use anyhow::{Context, Result};
use optidb_ai::AzureOpenAiConfig;
use optidb_analyzer::RuleEngineConfig;
use optidb_monitor::PostgresConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.toml";

/// `~/.config/optidb`, or the platform equivalent
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("optidb"))
}

/// Default location of the settings file
pub fn default_config_file() -> Result<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE_NAME))
}

/// Directory for JSON log files when none is configured
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("optidb")
        .join("logs")
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: PostgresConfig,
    pub engine: RuleEngineConfig,
    pub ai: AiSettings,
    pub logging: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Use the Azure OpenAI augmenter when its environment is configured
    pub enabled: bool,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: AzureOpenAiConfig::DEFAULT_TIMEOUT.as_secs(),
            max_tokens: AzureOpenAiConfig::DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directives; `RUST_LOG` wins when set
    pub filter: String,
    /// Also write JSON logs to daily rolling files
    pub json: bool,
    pub directory: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "warn,optidb_cli=info,optidb_analyzer=info,optidb_ai=info,optidb_monitor=info"
                .to_string(),
            json: false,
            directory: None,
        }
    }
}

impl Settings {
    /// Reads the given file (or the default one, if present) and overlays the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_file() {
                Ok(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        settings.merge_env(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid settings file: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse settings")
    }

    /// Overlays the database environment variables
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        self.database = self
            .database
            .merge_env(lookup)
            .context("Invalid database environment")?;
        Ok(self)
    }

    /// Augmenter settings, if AI is enabled and all four variables are present
    pub fn azure_config(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<AzureOpenAiConfig> {
        if !self.ai.enabled {
            return None;
        }
        AzureOpenAiConfig::from_lookup(lookup).map(|config| {
            config
                .with_timeout(Duration::from_secs(self.ai.timeout_secs))
                .with_max_tokens(self.ai.max_tokens)
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .directory
            .clone()
            .unwrap_or_else(default_log_dir)
    }
}
