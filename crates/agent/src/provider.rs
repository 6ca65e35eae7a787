//! reqwest-backed chat-completion client behind the `LlmClient` seam.
//!
//! Speaks three wire dialects: the OpenAI chat-completions shape (also used
//! by Ollama's compatibility endpoint) and the Anthropic messages shape.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, warn};

use rotabot_core::config::{LlmConfig, LlmProvider};

use crate::llm::{ChatMessage, ChatRole, LlmClient, LlmError, StructuredOutput};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_RESPONSE_TOKENS: u32 = 1024;

pub struct HttpLlmClient {
    http: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    timeout_secs: u64,
    max_retries: u32,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Provider(error.to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(config.provider).to_string());

        Ok(Self {
            http,
            provider: config.provider,
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.provider {
            LlmProvider::OpenAi => format!("{base}/chat/completions"),
            // Ollama exposes the OpenAI shape under /v1.
            LlmProvider::Ollama => format!("{base}/v1/chat/completions"),
            LlmProvider::Anthropic => format!("{base}/messages"),
        }
    }

    fn request_body(&self, system_prompt: &str, messages: &[ChatMessage]) -> serde_json::Value {
        match self.provider {
            LlmProvider::OpenAi | LlmProvider::Ollama => {
                let mut wire = vec![json!({"role": "system", "content": system_prompt})];
                wire.extend(messages.iter().map(chat_message_json));
                json!({
                    "model": self.model,
                    "messages": wire,
                    "response_format": {"type": "json_object"},
                })
            }
            LlmProvider::Anthropic => json!({
                "model": self.model,
                "max_tokens": MAX_RESPONSE_TOKENS,
                "system": system_prompt,
                "messages": messages.iter().map(chat_message_json).collect::<Vec<_>>(),
            }),
        }
    }

    async fn call_once(&self, body: &serde_json::Value) -> Result<serde_json::Value, LlmError> {
        let mut request = self.http.post(self.endpoint()).json(body);
        request = match (self.provider, &self.api_key) {
            (LlmProvider::Anthropic, Some(key)) => request
                .header("x-api-key", key.expose_secret())
                .header("anthropic-version", ANTHROPIC_VERSION),
            (_, Some(key)) => request.bearer_auth(key.expose_secret()),
            (_, None) => request,
        };

        let response = request.send().await.map_err(|error| self.classify(error))?;
        let status = response.status();
        let payload: serde_json::Value =
            response.json().await.map_err(|error| self.classify(error))?;

        if !status.is_success() {
            return Err(LlmError::Provider(provider_failure(status.as_u16(), &payload)));
        }
        Ok(payload)
    }

    fn classify(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout { timeout_secs: self.timeout_secs }
        } else {
            LlmError::Provider(error.to_string())
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate_structured(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<StructuredOutput, LlmError> {
        let body = self.request_body(system_prompt, messages);

        let mut attempt = 0;
        let payload = loop {
            match self.call_once(&body).await {
                Ok(payload) => break payload,
                // An empty response is a model answer, not a transport
                // fault, so only transport faults are retried.
                Err(error) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "egress.llm.retry",
                        provider = ?self.provider,
                        attempt,
                        error = %error,
                        "llm call failed, retrying"
                    );
                }
                Err(error) => return Err(error),
            }
        };

        let content = content_from_payload(self.provider, &payload)?;
        debug!(
            event_name = "egress.llm.completed",
            provider = ?self.provider,
            model = %self.model,
            "llm call succeeded"
        );
        Ok(structured_from_content(content))
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => OPENAI_BASE_URL,
        LlmProvider::Anthropic => ANTHROPIC_BASE_URL,
        // Ollama has no hosted default; config validation requires an
        // explicit base_url for it, so this is never reached in practice.
        LlmProvider::Ollama => "http://localhost:11434",
    }
}

fn chat_message_json(message: &ChatMessage) -> serde_json::Value {
    let role = match message.role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    };
    json!({"role": role, "content": message.content})
}

fn provider_failure(status: u16, payload: &serde_json::Value) -> String {
    let detail = payload
        .pointer("/error/message")
        .or_else(|| payload.get("error"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown error");
    format!("http {status}: {detail}")
}

/// Pulls the assistant text out of a success payload for the given dialect.
fn content_from_payload(
    provider: LlmProvider,
    payload: &serde_json::Value,
) -> Result<String, LlmError> {
    let content = match provider {
        LlmProvider::OpenAi | LlmProvider::Ollama => {
            payload.pointer("/choices/0/message/content").and_then(serde_json::Value::as_str)
        }
        LlmProvider::Anthropic => {
            payload.pointer("/content/0/text").and_then(serde_json::Value::as_str)
        }
    };

    match content {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(LlmError::EmptyResponse),
    }
}

fn structured_from_content(content: String) -> StructuredOutput {
    match serde_json::from_str(&content) {
        Ok(value) => StructuredOutput::Json(value),
        Err(_) => StructuredOutput::Text(content),
    }
}
