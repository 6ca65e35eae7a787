use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::codec::{self, EncodeError, MessageView};
use crate::messenger::{MessageHandle, Messenger, TransportError};

/// Standing footer on every rota render. Kept identical across edits so a
/// re-render of unchanged state produces byte-identical blocks.
pub const FOOTER: &str = "Reply in this thread to reshuffle, or toggle your progress above.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error("posting rota message to {channel_id} failed")]
    PostFailed { channel_id: String },
    #[error("cannot update a message without a timestamp")]
    UpdateFailed,
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The only component that writes rota messages. Every write is a full
/// replacement of text and blocks, so repeating a write with the same view
/// is a no-op as far as readers can tell.
pub struct MessageWriter {
    messenger: Arc<dyn Messenger>,
}

impl MessageWriter {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    /// Posts a fresh rota render, returning the handle later updates need.
    pub async fn post_rota(
        &self,
        channel_id: &str,
        view: &MessageView<'_>,
    ) -> Result<MessageHandle, WriteError> {
        let blocks = codec::encode(view)?;
        let handle = self
            .messenger
            .post_message(channel_id, &notification_text(view), &blocks)
            .await
            .map_err(|error| match error {
                TransportError::Api(_) => {
                    WriteError::PostFailed { channel_id: channel_id.to_string() }
                }
                other => WriteError::Transport(other),
            })?;

        // A post without a timestamp cannot be updated later; treat it as
        // failed rather than handing back an unusable handle.
        if handle.timestamp.trim().is_empty() {
            return Err(WriteError::PostFailed { channel_id: channel_id.to_string() });
        }

        info!(
            event_name = "writer.posted",
            channel_id,
            timestamp = %handle.timestamp,
            "posted rota message"
        );
        Ok(handle)
    }

    /// Replaces an existing render in place.
    pub async fn update_rota(
        &self,
        channel_id: &str,
        timestamp: &str,
        view: &MessageView<'_>,
    ) -> Result<MessageHandle, WriteError> {
        if timestamp.trim().is_empty() {
            return Err(WriteError::UpdateFailed);
        }

        let blocks = codec::encode(view)?;
        let handle = self
            .messenger
            .update_message(channel_id, timestamp, &notification_text(view), &blocks)
            .await?;

        // Same rule as posting: a reply without a timestamp means the
        // transport did not actually replace anything.
        if handle.timestamp.trim().is_empty() {
            return Err(WriteError::UpdateFailed);
        }

        info!(
            event_name = "writer.updated",
            channel_id,
            timestamp = %handle.timestamp,
            "updated rota message"
        );
        Ok(handle)
    }
}

/// Plain-text fallback shown in notifications and clients without Block Kit.
fn notification_text(view: &MessageView<'_>) -> String {
    format!("{} ({})", view.title, view.description)
}
