use async_trait::async_trait;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// What a provider hands back. Providers with native JSON modes return
/// `Json`; the rest return `Text` and leave extraction to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructuredOutput {
    Json(serde_json::Value),
    Text(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("provider returned an empty response")]
    EmptyResponse,
    #[error("provider did not respond within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("provider failure: {0}")]
    Provider(String),
}

/// Provider-agnostic chat completion with a structured-output contract.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate_structured(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<StructuredOutput, LlmError>;
}

/// Stand-in client for wiring and tests. Always reports an empty
/// response, which callers surface as "nothing to do".
#[derive(Default)]
pub struct NoopLlmClient;

#[async_trait]
impl LlmClient for NoopLlmClient {
    async fn generate_structured(
        &self,
        _system_prompt: &str,
        _messages: &[ChatMessage],
    ) -> Result<StructuredOutput, LlmError> {
        Err(LlmError::EmptyResponse)
    }
}
