use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use rotabot_core::assignment::UserTagsAssignment;
use rotabot_core::mention::strip_leading_mention;

use crate::codec;
use crate::messenger::{Messenger, TransportError};

/// How much thread history one reconciliation pass looks at.
pub const THREAD_FETCH_LIMIT: u32 = 50;

/// Everything the reorder path needs from one thread: the root render's
/// state and the human's latest edit request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadContext {
    pub title: String,
    pub current_assignment: UserTagsAssignment,
    pub root_timestamp: String,
    pub latest_user_query: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ThreadReadError {
    #[error("thread has {count} message(s); reconciliation needs the root post plus a reply")]
    InsufficientHistory { count: usize },
    #[error("reply contained no actionable text after stripping the bot mention")]
    EmptyQuery,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Read-only recovery of thread state. Performs no writes of any kind.
pub struct ThreadReader {
    messenger: Arc<dyn Messenger>,
}

impl ThreadReader {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    pub async fn read_thread(
        &self,
        channel_id: &str,
        thread_timestamp: &str,
    ) -> Result<ThreadContext, ThreadReadError> {
        let bot_user_id = self.messenger.bot_user_id().await?;
        let messages = self
            .messenger
            .fetch_thread_replies(channel_id, thread_timestamp, THREAD_FETCH_LIMIT)
            .await?;

        if messages.len() < 2 {
            return Err(ThreadReadError::InsufficientHistory { count: messages.len() });
        }

        // The root is the bot's render; the last message is the edit request.
        let root = &messages[0];
        let latest = &messages[messages.len() - 1];

        let title = codec::extract_title(&root.blocks);
        let current_assignment = codec::decode(&root.blocks);

        let latest_user_query = strip_leading_mention(&latest.text, &bot_user_id);
        if latest_user_query.is_empty() {
            return Err(ThreadReadError::EmptyQuery);
        }

        debug!(
            event_name = "thread.read",
            channel_id,
            thread_timestamp,
            message_count = messages.len(),
            online = current_assignment.online.len(),
            offline = current_assignment.offline.len(),
            "recovered thread context"
        );

        Ok(ThreadContext {
            title,
            current_assignment,
            root_timestamp: root.timestamp.clone(),
            latest_user_query,
        })
    }
}
