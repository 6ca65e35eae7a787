//! Encodes a rota assignment into Block Kit and parses it back out.
//!
//! The rendered message is the system of record for attendee ordering, so
//! both directions are deliberately strict in what they emit and liberal in
//! what they accept: `encode` refuses to render anything but canonical
//! mentions, while `decode` survives block lists produced by hand, by an
//! older bot version, or mangled in transit.

use std::collections::BTreeSet;

use thiserror::Error;

use rotabot_core::assignment::UserTagsAssignment;
use rotabot_core::mention::{find_mention, is_canonical_mention};
use rotabot_core::user::{profile_for_mention, UserProfile};

use crate::blocks::{typed_blocks, Block, ButtonElement, TextObject};

/// Routed by the interactivity handler to the progress-toggle flow.
pub const TOGGLE_ACTION_ID: &str = "rota.progress.toggle.v1";
/// Link-button action id on every per-attendee section.
pub const HUDDLE_ACTION_ID: &str = "rota.huddle.join.v1";

/// Where the huddle button points when a user has no huddle link on file.
pub const FALLBACK_HUDDLE_URL: &str =
    "https://slack.com/help/articles/4402059015315-Use-huddles-in-Slack";

const ONLINE_HEADER: &str = "🟢 Online";
const OFFLINE_HEADER: &str = "📴 Offline";
const DONE_GLYPH: &str = "✅";
const PENDING_GLYPH: &str = "⬜";

/// Everything one render needs. The completion set holds bare user IDs, not
/// mentions, because that is what the slot repository persists.
pub struct MessageView<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub bottom_content: &'a str,
    pub assignment: &'a UserTagsAssignment,
    pub users: &'a [UserProfile],
    pub completed_user_ids: &'a BTreeSet<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("refusing to render malformed mention `{mention}`")]
    MalformedMention { mention: String },
}

/// Renders an assignment to the fixed block layout:
/// two-field top section, toggle affordance, online header + per-mention
/// section/divider pairs, offline likewise, footer. Empty groups render
/// nothing at all, not an empty header.
///
/// Precondition: every mention canonical. A violation means un-normalized
/// input leaked past the repair layer, and the whole render is refused so a
/// partial message can never reach Slack.
pub fn encode(view: &MessageView<'_>) -> Result<Vec<Block>, EncodeError> {
    for mention in view.assignment.mentions() {
        if !is_canonical_mention(mention) {
            return Err(EncodeError::MalformedMention { mention: mention.to_string() });
        }
    }

    let mut blocks = Vec::with_capacity(4 + 2 * (view.assignment.online.len() + view.assignment.offline.len()));
    blocks.push(Block::two_field_section(view.title, view.description));
    blocks.push(Block::section_with_accessory(
        "Done with your 1on1? Toggle your progress.",
        ButtonElement::new(TOGGLE_ACTION_ID, "Toggle progress").value("toggle"),
    ));

    if !view.assignment.online.is_empty() {
        blocks.push(Block::header(ONLINE_HEADER));
        push_mention_sections(&mut blocks, &view.assignment.online, view);
    }
    if !view.assignment.offline.is_empty() {
        blocks.push(Block::header(OFFLINE_HEADER));
        push_mention_sections(&mut blocks, &view.assignment.offline, view);
    }

    blocks.push(Block::section(view.bottom_content));
    Ok(blocks)
}

fn push_mention_sections(blocks: &mut Vec<Block>, mentions: &[String], view: &MessageView<'_>) {
    for mention in mentions {
        let user_id = mention.trim_start_matches("<@").trim_end_matches('>');
        let glyph =
            if view.completed_user_ids.contains(user_id) { DONE_GLYPH } else { PENDING_GLYPH };

        let button = match profile_for_mention(view.users, mention).and_then(|p| p.huddle_url.as_deref())
        {
            Some(huddle_url) => ButtonElement::new(HUDDLE_ACTION_ID, "Join Huddle").url(huddle_url),
            None => ButtonElement::new(HUDDLE_ACTION_ID, "No huddle link").url(FALLBACK_HUDDLE_URL),
        };

        blocks.push(Block::section_with_accessory(format!("{glyph} {mention}"), button));
        blocks.push(Block::divider());
    }
}

/// Recovers the assignment from a message's raw blocks.
///
/// When the list fits the grammar, walks it with a section cursor that
/// starts at `online` and is re-aimed by any header mentioning "offline" or
/// "online" (case-insensitive); every mention-bearing section lands in the
/// cursor's group. When the list does not fit the grammar at all, the
/// fallback is the empty assignment: decode never errors, and downstream
/// guards (`InsufficientHistory`, empty-edit checks) handle the rest.
pub fn decode(raw: &[serde_json::Value]) -> UserTagsAssignment {
    let Some(blocks) = typed_blocks(raw) else {
        return UserTagsAssignment::default();
    };
    if !matches_message_grammar(&blocks) {
        return UserTagsAssignment::default();
    }

    let mut assignment = UserTagsAssignment::default();
    let mut cursor_online = true;

    for block in &blocks {
        match block {
            Block::Header { text } => {
                let label = text.raw().to_lowercase();
                if label.contains("offline") {
                    cursor_online = false;
                } else if label.contains("online") {
                    cursor_online = true;
                }
            }
            Block::Section { text: Some(text), .. } => {
                if let Some(mention) = find_mention(text.raw()) {
                    let group =
                        if cursor_online { &mut assignment.online } else { &mut assignment.offline };
                    group.push(mention.to_string());
                }
            }
            Block::Section { .. } | Block::Divider => {}
        }
    }

    assignment
}

/// Pulls just the top-left title out of the first block, independent of full
/// assignment parsing. Empty string when the first block is not the
/// two-field shape — callers treat that the same as an untitled message.
pub fn extract_title(raw: &[serde_json::Value]) -> String {
    let Some(first) = raw.first() else {
        return String::new();
    };
    match serde_json::from_value::<Block>(first.clone()) {
        Ok(Block::Section { fields: Some(fields), .. }) if fields.len() >= 2 => {
            fields[0].raw().to_string()
        }
        _ => String::new(),
    }
}

fn matches_message_grammar(blocks: &[Block]) -> bool {
    let Some(Block::Section { fields: Some(fields), .. }) = blocks.first() else {
        return false;
    };
    fields.len() >= 2
}
