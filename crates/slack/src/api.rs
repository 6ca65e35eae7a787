//! reqwest-backed Slack Web API implementation of the `Messenger` seam.
//!
//! Covers exactly the four calls the reconciliation core needs:
//! `chat.postMessage`, `chat.update`, `conversations.replies`, `auth.test`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::blocks::{wire_blocks, Block};
use crate::messenger::{MessageHandle, MessageRole, Messenger, ThreadMessage, TransportError};

const DEFAULT_BASE_URL: &str = "https://slack.com/api";

pub struct SlackApiClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
    timeout_secs: u64,
    cached_bot_user_id: OnceCell<String>,
}

impl SlackApiClient {
    pub fn new(bot_token: SecretString, timeout_secs: u64) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|error| TransportError::Request(error.to_string()))?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            bot_token,
            timeout_secs,
            cached_bot_user_id: OnceCell::new(),
        })
    }

    /// Points the client at a different API root. Test hook.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, TransportError> {
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| self.classify(error))?;

        let payload: serde_json::Value =
            response.json().await.map_err(|error| self.classify(error))?;

        check_ok(method, &payload)?;
        debug!(event_name = "egress.slack.api_call", method, "slack api call succeeded");
        Ok(payload)
    }

    // Read methods take query parameters, not a JSON body.
    async fn call_get(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, TransportError> {
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.bot_token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|error| self.classify(error))?;

        let payload: serde_json::Value =
            response.json().await.map_err(|error| self.classify(error))?;

        check_ok(method, &payload)?;
        Ok(payload)
    }

    fn classify(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout { timeout_secs: self.timeout_secs }
        } else {
            TransportError::Request(error.to_string())
        }
    }
}

fn check_ok(method: &str, payload: &serde_json::Value) -> Result<(), TransportError> {
    if payload.get("ok").and_then(serde_json::Value::as_bool) == Some(true) {
        return Ok(());
    }
    let reason = payload.get("error").and_then(serde_json::Value::as_str).unwrap_or("unknown_error");
    Err(TransportError::Api(format!("{method}: {reason}")))
}

fn handle_from_payload(payload: &serde_json::Value) -> MessageHandle {
    let timestamp =
        payload.get("ts").and_then(serde_json::Value::as_str).unwrap_or_default().to_string();
    MessageHandle { timestamp }
}

/// Maps a `conversations.replies` payload to the read model. A message is
/// bot-authored when Slack attributes it to a bot or to our own user id.
fn replies_from_payload(payload: &serde_json::Value, bot_user_id: &str) -> Vec<ThreadMessage> {
    let Some(messages) = payload.get("messages").and_then(serde_json::Value::as_array) else {
        return Vec::new();
    };

    messages
        .iter()
        .map(|message| {
            let author = message.get("user").and_then(serde_json::Value::as_str).unwrap_or_default();
            let is_bot = message.get("bot_id").map(|id| id.is_string()).unwrap_or(false)
                || (!bot_user_id.is_empty() && author == bot_user_id);

            ThreadMessage {
                role: if is_bot { MessageRole::Assistant } else { MessageRole::User },
                timestamp: message
                    .get("ts")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                text: message
                    .get("text")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                blocks: message
                    .get("blocks")
                    .and_then(serde_json::Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            }
        })
        .collect()
}

#[async_trait]
impl Messenger for SlackApiClient {
    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        blocks: &[Block],
    ) -> Result<MessageHandle, TransportError> {
        let payload = self
            .call(
                "chat.postMessage",
                json!({
                    "channel": channel_id,
                    "text": text,
                    "blocks": wire_blocks(blocks),
                }),
            )
            .await?;
        Ok(handle_from_payload(&payload))
    }

    async fn update_message(
        &self,
        channel_id: &str,
        timestamp: &str,
        text: &str,
        blocks: &[Block],
    ) -> Result<MessageHandle, TransportError> {
        let payload = self
            .call(
                "chat.update",
                json!({
                    "channel": channel_id,
                    "ts": timestamp,
                    "text": text,
                    "blocks": wire_blocks(blocks),
                }),
            )
            .await?;
        Ok(handle_from_payload(&payload))
    }

    async fn fetch_thread_replies(
        &self,
        channel_id: &str,
        thread_timestamp: &str,
        limit: u32,
    ) -> Result<Vec<ThreadMessage>, TransportError> {
        // Replies cannot be classified without knowing our own user id, so a
        // failed `auth.test` fails the fetch instead of mislabeling the root.
        let bot_user_id = self.bot_user_id().await?;
        let payload = self
            .call_get(
                "conversations.replies",
                &[
                    ("channel", channel_id.to_string()),
                    ("ts", thread_timestamp.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(replies_from_payload(&payload, &bot_user_id))
    }

    async fn bot_user_id(&self) -> Result<String, TransportError> {
        self.cached_bot_user_id
            .get_or_try_init(|| async {
                let payload = self.call("auth.test", json!({})).await?;
                Ok(payload
                    .get("user_id")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string())
            })
            .await
            .cloned()
    }
}
