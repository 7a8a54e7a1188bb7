//! LLM Configuration

use serde::{Deserialize, Serialize};
use crate::application::errors::ConfigError;

/// Default persona sent as the system preamble
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant answering inside a group chat. Reply in plain text and keep answers short.";

/// LLM Provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    #[default]
    Gemini,
    Groq,
}

impl LLMProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(Self::Gemini),
            "groq" => Some(Self::Groq),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LLMProvider::Gemini => "gemini",
            LLMProvider::Groq => "groq",
        }
    }

    /// Prefix every well-formed key for this provider starts with
    pub fn key_prefix(&self) -> &'static str {
        match self {
            LLMProvider::Gemini => "AIza",
            LLMProvider::Groq => "gsk_",
        }
    }

    /// Provider-specific environment variable holding the key
    pub fn key_env(&self) -> &'static str {
        match self {
            LLMProvider::Gemini => "GEMINI_API_KEY",
            LLMProvider::Groq => "GROQ_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LLMProvider::Gemini => "gemini-1.5-flash",
            LLMProvider::Groq => "llama-3.1-8b-instant",
        }
    }
}

/// LLM Configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub api_key: Option<String>,
    /// Falls back to the provider default
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Request timeout for one completion call
    pub timeout_secs: u64,
    pub system_prompt: Option<String>,
    /// Override the provider endpoint (proxies, tests)
    pub base_url: Option<String>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Gemini,
            api_key: None,
            model: None,
            temperature: 0.7,
            max_tokens: Some(1024),
            timeout_secs: 60,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            base_url: None,
        }
    }
}

impl LLMConfig {
    /// Apply environment overrides on top of file values
    pub fn with_env(mut self) -> Self {
        if let Some(provider) = std::env::var("LLM_PROVIDER").ok().and_then(|p| LLMProvider::parse(&p)) {
            self.provider = provider;
        }

        // Provider-specific key wins over the generic one.
        if let Ok(key) = std::env::var(self.provider.key_env()) {
            self.api_key = Some(key);
        } else if let Ok(key) = std::env::var("AI_API_KEY") {
            self.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("LLM_MODEL") {
            self.model = Some(model);
        }

        if let Ok(prompt) = std::env::var("LLM_SYSTEM_PROMPT") {
            self.system_prompt = Some(prompt);
        }

        if let Ok(temp) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(t) = temp.parse() {
                self.temperature = t;
            }
        }

        self
    }

    /// Get the configured model, or the provider default
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(self.provider.default_model())
    }

    /// Check the key is present and shaped like one for the selected provider
    pub fn validate(&self) -> Result<(), ConfigError> {
        let key = self.api_key.as_deref().map(str::trim).unwrap_or_default();
        if key.is_empty() {
            return Err(ConfigError::MissingField(format!(
                "llm.api-key (or {} / AI_API_KEY)",
                self.provider.key_env()
            )));
        }

        let prefix = self.provider.key_prefix();
        if !key.starts_with(prefix) {
            return Err(ConfigError::InvalidValue(format!(
                "{} API key should start with '{}'",
                self.provider.as_str(),
                prefix
            )));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue("llm.temperature must be between 0 and 2".to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("llm.timeout-secs must be greater than 0".to_string()));
        }

        Ok(())
    }
}
