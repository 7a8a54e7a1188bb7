//! Configuration management

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::errors::ConfigError;
use crate::infrastructure::llm::LLMConfig;

/// `<bot id>:<secret>` as issued by BotFather
static TELEGRAM_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+:[A-Za-z0-9_-]{20,}$").expect("telegram token pattern"));

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub telegram: TelegramConfig,
    pub llm: LLMConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    /// Command marker
    pub prefix: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "chatlog-bot".to_string(),
            prefix: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TelegramConfig {
    pub token: Option<String>,
    /// Long-poll timeout for getUpdates
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorageConfig {
    /// SQLite database file
    pub database: PathBuf,
    /// Where `/export` writes its snapshot
    pub export_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("messages.db"),
            export_path: PathBuf::from("messages.csv"),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config {}: {}", path.display(), e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    /// The config file if it exists, otherwise defaults; environment on top
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            Self::load(path)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Config::default()
        };

        Ok(config.with_env())
    }

    pub fn with_env(mut self) -> Self {
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            self.telegram.token = Some(token);
        }

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            self.bot.prefix = prefix;
        }

        if let Ok(path) = std::env::var("DB_FILE") {
            self.storage.database = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("EXPORT_FILE") {
            self.storage.export_path = PathBuf::from(path);
        }

        self.llm = self.llm.with_env();
        self
    }

    /// Checks needed by every mode that dispatches commands
    pub fn validate_core(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue("bot.prefix must not be empty".to_string()));
        }

        self.llm.validate()
    }

    pub fn validate_telegram(&self) -> Result<(), ConfigError> {
        let token = self.telegram.token.as_deref().map(str::trim).unwrap_or_default();
        if token.is_empty() {
            return Err(ConfigError::MissingField("telegram.token (or BOT_TOKEN)".to_string()));
        }

        if !TELEGRAM_TOKEN.is_match(token) {
            return Err(ConfigError::InvalidValue(
                "telegram.token should look like '<bot id>:<secret>'".to_string(),
            ));
        }

        if self.telegram.poll_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("telegram.poll-timeout-secs must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// Everything `run` needs: bot token and AI key
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_telegram()?;
        self.validate_core()
    }
}
