use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use rotabot_agent::reorder::{ReorderEngine, ReorderError};
use rotabot_core::repository::RepositoryError;
use rotabot_core::slot::{slot_for_title, SlotRepository};
use rotabot_core::user::UserRepository;
use rotabot_slack::codec::MessageView;
use rotabot_slack::events::ThreadMentionEvent;
use rotabot_slack::thread::{ThreadReadError, ThreadReader};
use rotabot_slack::writer::{MessageWriter, WriteError, FOOTER};

#[derive(Debug, Error)]
pub enum MentionFlowError {
    #[error(transparent)]
    ThreadRead(#[from] ThreadReadError),
    #[error(transparent)]
    Reorder(#[from] ReorderError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// The reconciliation path behind an @-mention in a rota thread: recover
/// state from the live message, ask the reorder engine for the new
/// assignment, and re-render the root in place.
pub struct ThreadMentionFlow {
    reader: ThreadReader,
    engine: ReorderEngine,
    writer: MessageWriter,
    users: Arc<dyn UserRepository>,
    slots: Arc<dyn SlotRepository>,
}

impl ThreadMentionFlow {
    pub fn new(
        reader: ThreadReader,
        engine: ReorderEngine,
        writer: MessageWriter,
        users: Arc<dyn UserRepository>,
        slots: Arc<dyn SlotRepository>,
    ) -> Self {
        Self { reader, engine, writer, users, slots }
    }

    pub async fn handle(&self, event: &ThreadMentionEvent) -> Result<(), MentionFlowError> {
        let context = self.reader.read_thread(&event.channel_id, &event.thread_ts).await?;

        let next =
            self.engine.reorder(&context.current_assignment, &context.latest_user_query).await?;

        let users = self.users.users().await?;
        let slots = self.slots.upcoming_slots().await?;
        let completed = slot_for_title(&slots, &event.channel_id, &context.title)
            .map(|slot| slot.completed_user_ids.clone())
            .unwrap_or_else(BTreeSet::new);

        let description = format!("updated {}", Utc::now().format("%Y-%m-%d %H:%M UTC"));
        let view = MessageView {
            title: &context.title,
            description: &description,
            bottom_content: FOOTER,
            assignment: &next,
            users: &users,
            completed_user_ids: &completed,
        };

        self.writer.update_rota(&event.channel_id, &context.root_timestamp, &view).await?;

        info!(
            event_name = "mention.reconciled",
            channel_id = %event.channel_id,
            thread_ts = %event.thread_ts,
            requested_by = %event.user_id,
            online = next.online.len(),
            offline = next.offline.len(),
            "thread mention handled"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex;

    use rotabot_agent::llm::{ChatMessage, LlmClient, LlmError, StructuredOutput};
    use rotabot_agent::reorder::ReorderEngine;
    use rotabot_core::assignment::UserTagsAssignment;
    use rotabot_core::repository::RepositoryError;
    use rotabot_core::slot::{SlotRepository, UpcomingSlot};
    use rotabot_core::user::{UserProfile, UserRepository};
    use rotabot_slack::blocks::{wire_blocks, Block};
    use rotabot_slack::codec::{encode, MessageView};
    use rotabot_slack::events::ThreadMentionEvent;
    use rotabot_slack::messenger::{
        MessageHandle, MessageRole, Messenger, ThreadMessage, TransportError,
    };
    use rotabot_slack::thread::ThreadReader;
    use rotabot_slack::writer::{MessageWriter, FOOTER};

    use super::{MentionFlowError, ThreadMentionFlow};

    struct FakeMessenger {
        replies: Vec<ThreadMessage>,
        updates: Mutex<Vec<(String, String, Vec<serde_json::Value>)>>,
    }

    #[async_trait]
    impl Messenger for FakeMessenger {
        async fn post_message(
            &self,
            _channel_id: &str,
            _text: &str,
            _blocks: &[Block],
        ) -> Result<MessageHandle, TransportError> {
            unimplemented!("flow only updates")
        }

        async fn update_message(
            &self,
            channel_id: &str,
            timestamp: &str,
            _text: &str,
            blocks: &[Block],
        ) -> Result<MessageHandle, TransportError> {
            self.updates.lock().await.push((
                channel_id.to_string(),
                timestamp.to_string(),
                wire_blocks(blocks),
            ));
            Ok(MessageHandle { timestamp: timestamp.to_string() })
        }

        async fn fetch_thread_replies(
            &self,
            _channel_id: &str,
            _thread_timestamp: &str,
            _limit: u32,
        ) -> Result<Vec<ThreadMessage>, TransportError> {
            Ok(self.replies.clone())
        }

        async fn bot_user_id(&self) -> Result<String, TransportError> {
            Ok("UBOT".to_string())
        }
    }

    struct FixedUsers(Vec<UserProfile>);

    #[async_trait]
    impl UserRepository for FixedUsers {
        async fn users(&self) -> Result<Vec<UserProfile>, RepositoryError> {
            Ok(self.0.clone())
        }
    }

    struct FixedSlots(Vec<UpcomingSlot>);

    #[async_trait]
    impl SlotRepository for FixedSlots {
        async fn upcoming_slots(&self) -> Result<Vec<UpcomingSlot>, RepositoryError> {
            Ok(self.0.clone())
        }

        async fn add_completed_user(&self, _: &str, _: &str) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn remove_completed_user(&self, _: &str, _: &str) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    struct ScriptedLlm(StructuredOutput);

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate_structured(
            &self,
            _system_prompt: &str,
            _messages: &[ChatMessage],
        ) -> Result<StructuredOutput, LlmError> {
            Ok(self.0.clone())
        }
    }

    fn tags(mentions: &[&str]) -> Vec<String> {
        mentions.iter().map(|mention| (*mention).to_string()).collect()
    }

    fn root_message(assignment: &UserTagsAssignment) -> ThreadMessage {
        let completed = BTreeSet::new();
        let blocks = encode(&MessageView {
            title: "1on1 backend 2026-09-01",
            description: "updated earlier",
            bottom_content: FOOTER,
            assignment,
            users: &[],
            completed_user_ids: &completed,
        })
        .expect("test render");

        ThreadMessage {
            role: MessageRole::Assistant,
            timestamp: "1730000000.1000".to_string(),
            text: "rota".to_string(),
            blocks: wire_blocks(&blocks),
        }
    }

    fn flow(
        messenger: Arc<FakeMessenger>,
        llm_output: StructuredOutput,
    ) -> ThreadMentionFlow {
        ThreadMentionFlow::new(
            ThreadReader::new(messenger.clone()),
            ReorderEngine::new(Arc::new(ScriptedLlm(llm_output))),
            MessageWriter::new(messenger),
            Arc::new(FixedUsers(Vec::new())),
            Arc::new(FixedSlots(Vec::new())),
        )
    }

    fn mention_event() -> ThreadMentionEvent {
        ThreadMentionEvent {
            channel_id: "C1".to_string(),
            thread_ts: "1730000000.1000".to_string(),
            user_id: "U9".to_string(),
            text: "<@UBOT> move U2 to online".to_string(),
        }
    }

    #[tokio::test]
    async fn mention_rewrites_the_root_message_with_the_new_assignment() {
        let initial = UserTagsAssignment::new(vec![], tags(&["<@U1>", "<@U2>", "<@U3>"]));
        let messenger = Arc::new(FakeMessenger {
            replies: vec![
                root_message(&initial),
                ThreadMessage {
                    role: MessageRole::User,
                    timestamp: "1730000000.2000".to_string(),
                    text: "<@UBOT> move U2 to online".to_string(),
                    blocks: Vec::new(),
                },
            ],
            updates: Mutex::new(Vec::new()),
        });

        let flow = flow(
            messenger.clone(),
            StructuredOutput::Json(json!({
                "online": ["<@U2>"],
                "offline": ["<@U1>", "<@U3>"]
            })),
        );

        flow.handle(&mention_event()).await.expect("flow");

        let updates = messenger.updates.lock().await;
        assert_eq!(updates.len(), 1);
        let (channel_id, timestamp, blocks) = &updates[0];
        assert_eq!(channel_id, "C1");
        assert_eq!(timestamp, "1730000000.1000");

        let decoded = rotabot_slack::codec::decode(blocks);
        assert_eq!(decoded.online, tags(&["<@U2>"]));
        assert_eq!(decoded.offline, tags(&["<@U1>", "<@U3>"]));
    }

    #[tokio::test]
    async fn thread_without_a_reply_writes_nothing() {
        let initial = UserTagsAssignment::new(vec![], tags(&["<@U1>"]));
        let messenger = Arc::new(FakeMessenger {
            replies: vec![root_message(&initial)],
            updates: Mutex::new(Vec::new()),
        });

        let flow =
            flow(messenger.clone(), StructuredOutput::Json(json!({"online": [], "offline": []})));

        let error = flow.handle(&mention_event()).await.unwrap_err();
        assert!(matches!(error, MentionFlowError::ThreadRead(_)));
        assert!(messenger.updates.lock().await.is_empty());
    }
}
