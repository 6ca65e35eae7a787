use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use rotabot_core::repository::RepositoryError;
use rotabot_core::slot::{slot_for_title, SlotRepository};
use rotabot_core::user::UserRepository;
use rotabot_slack::codec::{self, MessageView};
use rotabot_slack::events::ProgressToggleEvent;
use rotabot_slack::writer::{MessageWriter, WriteError, FOOTER};

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("no upcoming slot matches message `{title}` in {channel_id}")]
    NoMatchingSlot { channel_id: String, title: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Flips one user's completion marker on one slot.
///
/// The live message, not the repository, is the source of truth for the
/// assignment: state is decoded from the blocks the interaction payload
/// carried, so a toggle on a message the repository has drifted from still
/// renders what the user was looking at.
pub struct ProgressToggle {
    writer: MessageWriter,
    users: Arc<dyn UserRepository>,
    slots: Arc<dyn SlotRepository>,
}

impl ProgressToggle {
    pub fn new(
        writer: MessageWriter,
        users: Arc<dyn UserRepository>,
        slots: Arc<dyn SlotRepository>,
    ) -> Self {
        Self { writer, users, slots }
    }

    pub async fn handle(&self, event: &ProgressToggleEvent) -> Result<(), ToggleError> {
        let title = codec::extract_title(&event.blocks);
        let assignment = codec::decode(&event.blocks);

        let slots = self.slots.upcoming_slots().await?;
        let slot = slot_for_title(&slots, &event.channel_id, &title).ok_or_else(|| {
            ToggleError::NoMatchingSlot { channel_id: event.channel_id.clone(), title: title.clone() }
        })?;

        let mut completed = slot.completed_user_ids.clone();
        let now_completed = if completed.contains(&event.user_id) {
            self.slots.remove_completed_user(&event.channel_id, &event.user_id).await?;
            completed.remove(&event.user_id);
            false
        } else {
            self.slots.add_completed_user(&event.channel_id, &event.user_id).await?;
            completed.insert(event.user_id.clone());
            true
        };

        let users = self.users.users().await?;
        let description = format!("updated {}", Utc::now().format("%Y-%m-%d %H:%M UTC"));
        let view = MessageView {
            title: &title,
            description: &description,
            bottom_content: FOOTER,
            assignment: &assignment,
            users: &users,
            completed_user_ids: &completed,
        };

        self.writer.update_rota(&event.channel_id, &event.message_ts, &view).await?;

        info!(
            event_name = "toggle.flipped",
            channel_id = %event.channel_id,
            message_ts = %event.message_ts,
            user_id = %event.user_id,
            now_completed,
            "progress toggle handled"
        );
        Ok(())
    }
}
