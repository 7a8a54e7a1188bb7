//! LLM Providers

pub mod gemini;
pub mod groq;

pub use gemini::GeminiProvider;
pub use groq::GroqProvider;

use std::sync::Arc;
use std::time::Duration;

use crate::application::errors::ConfigError;
use super::{LLMConfig, LLMProvider, LLM};

/// Build the configured provider. Call after `LLMConfig::validate`.
pub fn from_config(config: &LLMConfig) -> Result<Arc<dyn LLM>, ConfigError> {
    let api_key = config.api_key.clone()
        .ok_or_else(|| ConfigError::MissingField("llm.api-key".to_string()))?;
    let timeout = Duration::from_secs(config.timeout_secs);
    let model = Some(config.model());

    let provider: Arc<dyn LLM> = match config.provider {
        LLMProvider::Gemini => {
            let mut provider = GeminiProvider::new(api_key, model)
                .with_timeout(timeout)
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url);
            }
            Arc::new(provider)
        }
        LLMProvider::Groq => {
            let mut provider = GroqProvider::new(api_key, model)
                .with_timeout(timeout)
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url);
            }
            Arc::new(provider)
        }
    };

    tracing::info!("Using {} ({}) for AI responses", provider.name(), config.model());
    Ok(provider)
}
