//! LLM integration - Gemini and Groq providers behind one trait

pub mod traits;
pub mod config;
pub mod providers;


pub use traits::{LLM, LLMMessage, LLMResponse, LLMError, LLMResult, LLMUsage};
pub use config::{LLMConfig, LLMProvider, DEFAULT_SYSTEM_PROMPT};
pub use providers::{from_config, GeminiProvider, GroqProvider};
