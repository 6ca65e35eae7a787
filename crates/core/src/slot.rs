use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::repository::RepositoryError;

/// One upcoming 1on1 slot as persisted by the external scheduler. The
/// completion set records which attendees are already done for this slot;
/// it is the only shared mutable state in the system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingSlot {
    pub channel_id: String,
    pub meeting_date: NaiveDate,
    pub completed_user_ids: BTreeSet<String>,
}

/// External slot store. Implementations must make the per-user add/remove
/// operations atomic so concurrent toggles from different users never race
/// through a read-modify-write cycle.
#[async_trait]
pub trait SlotRepository: Send + Sync {
    async fn upcoming_slots(&self) -> Result<Vec<UpcomingSlot>, RepositoryError>;

    async fn add_completed_user(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<(), RepositoryError>;

    async fn remove_completed_user(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<(), RepositoryError>;
}

/// Scans free text (typically a rendered message title such as
/// `1on1 backend 2026-09-01`) for the first ISO `YYYY-MM-DD` token.
pub fn date_in_text(text: &str) -> Option<NaiveDate> {
    text.split_whitespace().find_map(|token| {
        let candidate = token.trim_matches(|ch: char| !ch.is_ascii_digit());
        NaiveDate::parse_from_str(candidate, "%Y-%m-%d").ok()
    })
}

/// Finds the slot a live message belongs to: same channel, and a meeting
/// date equal to the date embedded in the message title. `None` means the
/// message is stale relative to a rotation that has since advanced.
pub fn slot_for_title<'a>(
    slots: &'a [UpcomingSlot],
    channel_id: &str,
    title: &str,
) -> Option<&'a UpcomingSlot> {
    let title_date = date_in_text(title)?;
    slots
        .iter()
        .find(|slot| slot.channel_id == channel_id && slot.meeting_date == title_date)
}
