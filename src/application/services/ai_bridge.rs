use std::sync::Arc;
use crate::infrastructure::llm::{LLMConfig, LLMError, LLMMessage, LLM};

/// Reply sent when the provider is rate limiting us
pub const AI_BUSY_REPLY: &str = "Sorry, the AI service is busy right now. Please try again in a moment.";

/// Reply sent for every other provider failure
pub const AI_FAILED_REPLY: &str = "Sorry, I couldn't get an answer from the AI service. Please try again later.";

/// Result of one `/ai` round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiOutcome {
    Answer(String),
    /// Normalized, user-safe failure text
    Failed(String),
}

/// One prompt and its outcome. Never persisted.
#[derive(Debug, Clone)]
pub struct AiExchange {
    pub prompt: String,
    pub outcome: AiOutcome,
}

impl AiExchange {
    /// Text to send back, whichever way the call went
    pub fn reply_text(&self) -> &str {
        match &self.outcome {
            AiOutcome::Answer(text) | AiOutcome::Failed(text) => text,
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self.outcome, AiOutcome::Answer(_))
    }
}

/// Single-turn adapter over an [`LLM`] provider
///
/// Failures never escape `ask`: they are logged and turned into a generic
/// reply that carries no provider detail.
pub struct AiBridge {
    llm: Arc<dyn LLM>,
    system_prompt: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl AiBridge {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self {
            llm,
            system_prompt: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_config(llm: Arc<dyn LLM>, config: &LLMConfig) -> Self {
        Self {
            llm,
            system_prompt: config.system_prompt.clone().filter(|p| !p.trim().is_empty()),
            temperature: Some(config.temperature),
            max_tokens: config.max_tokens,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Ask the provider. `prompt` is expected to be non-empty.
    ///
    /// The provider call runs on its own task so a panic inside it still
    /// produces a reply.
    pub async fn ask(&self, prompt: &str) -> AiExchange {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(LLMMessage::system(system.clone()));
        }
        messages.push(LLMMessage::user(prompt));

        let llm = Arc::clone(&self.llm);
        let temperature = self.temperature;
        let max_tokens = self.max_tokens;
        let call = tokio::spawn(async move { llm.chat(messages, None, temperature, max_tokens).await });

        let outcome = match call.await {
            Ok(Ok(response)) => {
                tracing::debug!(
                    provider = self.llm.name(),
                    model = %response.model,
                    finish_reason = ?response.finish_reason,
                    "AI answered"
                );
                AiOutcome::Answer(response.content)
            }
            Ok(Err(e)) => {
                tracing::warn!(provider = self.llm.name(), error = %e, "AI request failed");
                AiOutcome::Failed(normalize(&e).to_string())
            }
            Err(e) => {
                tracing::error!(provider = self.llm.name(), error = %e, "AI task aborted");
                AiOutcome::Failed(AI_FAILED_REPLY.to_string())
            }
        };

        AiExchange {
            prompt: prompt.to_string(),
            outcome,
        }
    }
}

fn normalize(error: &LLMError) -> &'static str {
    match error {
        LLMError::RateLimited => AI_BUSY_REPLY,
        _ => AI_FAILED_REPLY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use crate::infrastructure::llm::{LLMResponse, LLMResult};

    /// Records the messages it receives and answers with a canned result
    struct ScriptedLLM {
        seen: Mutex<Vec<Vec<LLMMessage>>>,
        result: fn() -> LLMResult<LLMResponse>,
    }

    impl ScriptedLLM {
        fn new(result: fn() -> LLMResult<LLMResponse>) -> Arc<Self> {
            Arc::new(Self { seen: Mutex::new(Vec::new()), result })
        }
    }

    #[async_trait]
    impl LLM for ScriptedLLM {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, messages: Vec<LLMMessage>, _: Option<&str>, _: Option<f32>, _: Option<u32>) -> LLMResult<LLMResponse> {
            self.seen.lock().unwrap().push(messages);
            (self.result)()
        }
    }

    struct PanickingLLM;

    #[async_trait]
    impl LLM for PanickingLLM {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn chat(&self, _: Vec<LLMMessage>, _: Option<&str>, _: Option<f32>, _: Option<u32>) -> LLMResult<LLMResponse> {
            panic!("provider bug");
        }
    }

    fn answer() -> LLMResult<LLMResponse> {
        Ok(LLMResponse {
            content: "Paris".to_string(),
            model: "test".to_string(),
            usage: None,
            finish_reason: Some("stop".to_string()),
        })
    }

    #[tokio::test]
    async fn test_answer_is_returned_verbatim_with_preamble() {
        let llm = ScriptedLLM::new(answer);
        let bridge = AiBridge::new(llm.clone()).with_system_prompt("Be brief.");

        let exchange = bridge.ask("Capital of France?").await;
        assert_eq!(exchange.outcome, AiOutcome::Answer("Paris".to_string()));
        assert_eq!(exchange.prompt, "Capital of France?");

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0][0].is_system());
        assert_eq!(seen[0][1].content, "Capital of France?");
    }

    #[tokio::test]
    async fn test_failures_are_normalized() {
        let bridge = AiBridge::new(ScriptedLLM::new(|| Err(LLMError::RateLimited)));
        assert_eq!(bridge.ask("hi").await.reply_text(), AI_BUSY_REPLY);

        let bridge = AiBridge::new(ScriptedLLM::new(|| {
            Err(LLMError::ApiError { status: 500, body: "secret internals".to_string() })
        }));
        let exchange = bridge.ask("hi").await;
        assert!(!exchange.is_answer());
        assert_eq!(exchange.reply_text(), AI_FAILED_REPLY);
    }

    #[tokio::test]
    async fn test_provider_panic_becomes_failure() {
        let bridge = AiBridge::new(Arc::new(PanickingLLM));
        let exchange = bridge.ask("hi").await;
        assert_eq!(exchange.outcome, AiOutcome::Failed(AI_FAILED_REPLY.to_string()));
    }
}
