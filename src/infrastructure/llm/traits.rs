//! LLM traits - Unified AI interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Chat message for LLM conversations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,
    /// Message content
    pub content: String,
}

impl LLMMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

/// LLM response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Response content
    pub content: String,
    /// Model used
    pub model: String,
    /// Number of tokens used (if available)
    pub usage: Option<LLMUsage>,
    /// Finish reason
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// LLM errors
///
/// Variants carry provider detail for logs. None of them include the API key
/// or the request URL.
#[derive(Debug)]
pub enum LLMError {
    /// Key rejected (401/403)
    Auth,
    /// Quota or rate limit hit (429)
    RateLimited,
    /// Other non-success status from the provider
    ApiError { status: u16, body: String },
    /// Transport failure
    NetworkError(String),
    /// Request exceeded the client timeout
    Timeout,
    /// Response body did not match the expected shape
    ParseError(String),
    /// Provider answered without any text
    EmptyResponse,
    /// Provider refused the prompt
    Blocked(String),
    /// Client could not be built
    ConfigError(String),
}

impl LLMError {
    /// Classify a reqwest failure, dropping the URL from the message
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LLMError::Timeout
        } else if e.is_decode() {
            LLMError::ParseError(e.without_url().to_string())
        } else {
            LLMError::NetworkError(e.without_url().to_string())
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => LLMError::Auth,
            429 => LLMError::RateLimited,
            code => LLMError::ApiError {
                status: code,
                body: body.chars().take(200).collect(),
            },
        }
    }
}

impl std::fmt::Display for LLMError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMError::Auth => write!(f, "API key rejected"),
            LLMError::RateLimited => write!(f, "Rate limited"),
            LLMError::ApiError { status, body } => write!(f, "API error: status {}, body: {}", status, body),
            LLMError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            LLMError::Timeout => write!(f, "Request timed out"),
            LLMError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            LLMError::EmptyResponse => write!(f, "Empty response"),
            LLMError::Blocked(reason) => write!(f, "Prompt blocked: {}", reason),
            LLMError::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for LLMError {}

/// Result type for LLM operations
pub type LLMResult<T> = Result<T, LLMError>;

/// LLM Provider trait
#[async_trait]
pub trait LLM: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Chat completion
    async fn chat(
        &self,
        messages: Vec<LLMMessage>,
        model: Option<&str>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> LLMResult<LLMResponse>;
}
