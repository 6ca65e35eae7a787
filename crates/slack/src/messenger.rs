use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::Block;

/// Who authored a thread message, as far as reconciliation cares: the bot's
/// own renders are `Assistant`, everything else is `User`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageRole {
    Assistant,
    User,
}

/// Read-only view of one Slack message. The timestamp is the message's
/// immutable identity within its thread; blocks are raw wire JSON because
/// only the codec decides whether they fit the typed grammar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadMessage {
    pub role: MessageRole,
    pub timestamp: String,
    pub text: String,
    pub blocks: Vec<serde_json::Value>,
}

/// Handle to a posted or updated message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageHandle {
    pub timestamp: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("slack transport request failed: {0}")]
    Request(String),
    #[error("slack transport timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("slack api rejected the call: {0}")]
    Api(String),
}

/// Narrow transport seam to Slack. Everything above this trait is pure
/// reconciliation logic; everything below it is wire plumbing.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn post_message(
        &self,
        channel_id: &str,
        text: &str,
        blocks: &[Block],
    ) -> Result<MessageHandle, TransportError>;

    async fn update_message(
        &self,
        channel_id: &str,
        timestamp: &str,
        text: &str,
        blocks: &[Block],
    ) -> Result<MessageHandle, TransportError>;

    /// Replies ordered oldest-first, root message included, capped at `limit`.
    async fn fetch_thread_replies(
        &self,
        channel_id: &str,
        thread_timestamp: &str,
        limit: u32,
    ) -> Result<Vec<ThreadMessage>, TransportError>;

    async fn bot_user_id(&self) -> Result<String, TransportError>;
}
