//! Inbound event shapes and the parsers that lift them out of Slack's
//! Events API and interactivity payloads.
//!
//! Parsing is total: anything that is not a well-formed event we care about
//! comes back as `None` or `Unsupported` so the ingress layer can ack it
//! and move on.

use serde_json::Value;

use crate::codec::TOGGLE_ACTION_ID;

/// Every inbound event the service reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RotaEvent {
    ThreadMention(ThreadMentionEvent),
    ProgressToggle(ProgressToggleEvent),
    Unsupported { event_type: String },
}

/// The bot was @-mentioned in a message, usually a thread reply asking for
/// a reshuffle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadMentionEvent {
    pub channel_id: String,
    /// Root timestamp of the thread. For a top-level mention this equals
    /// the message's own `ts`.
    pub thread_ts: String,
    pub user_id: String,
    pub text: String,
}

/// Someone pressed the progress-toggle button on a rota message. Carries
/// the message's blocks verbatim so the toggle flow can decode state
/// without an extra history fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressToggleEvent {
    pub channel_id: String,
    pub message_ts: String,
    pub user_id: String,
    pub action_id: String,
    pub blocks: Vec<Value>,
}

/// Parses an Events API `event_callback` body into a [`RotaEvent`].
///
/// Returns `None` for payloads with no inner event and `Unsupported` for
/// event types the service does not handle. Messages authored by bots are
/// dropped here so the service never replies to itself.
pub fn event_from_callback(body: &Value) -> Option<RotaEvent> {
    let event = body.get("event")?;
    let event_type = event.get("type").and_then(Value::as_str)?;

    if event_type != "app_mention" {
        return Some(RotaEvent::Unsupported { event_type: event_type.to_string() });
    }
    if event.get("bot_id").is_some() || event.get("subtype").is_some() {
        return None;
    }

    let channel_id = event.get("channel").and_then(Value::as_str)?;
    let user_id = event.get("user").and_then(Value::as_str)?;
    let ts = event.get("ts").and_then(Value::as_str)?;
    let thread_ts = event.get("thread_ts").and_then(Value::as_str).unwrap_or(ts);
    let text = event.get("text").and_then(Value::as_str).unwrap_or_default();

    Some(RotaEvent::ThreadMention(ThreadMentionEvent {
        channel_id: channel_id.to_string(),
        thread_ts: thread_ts.to_string(),
        user_id: user_id.to_string(),
        text: text.to_string(),
    }))
}

/// Parses a `block_actions` interactivity payload into a toggle event.
///
/// Only the progress-toggle action id is recognized; huddle buttons are
/// plain link buttons and never reach the interactivity endpoint with
/// anything the service needs to do.
pub fn toggle_from_interaction(payload: &Value) -> Option<ProgressToggleEvent> {
    if payload.get("type").and_then(Value::as_str) != Some("block_actions") {
        return None;
    }

    let action = payload.get("actions").and_then(Value::as_array)?.first()?;
    let action_id = action.get("action_id").and_then(Value::as_str)?;
    if action_id != TOGGLE_ACTION_ID {
        return None;
    }

    let channel_id = payload.get("channel").and_then(|c| c.get("id")).and_then(Value::as_str)?;
    let user_id = payload.get("user").and_then(|u| u.get("id")).and_then(Value::as_str)?;
    let message = payload.get("message")?;
    let message_ts = message.get("ts").and_then(Value::as_str)?;
    let blocks =
        message.get("blocks").and_then(Value::as_array).cloned().unwrap_or_default();

    Some(ProgressToggleEvent {
        channel_id: channel_id.to_string(),
        message_ts: message_ts.to_string(),
        user_id: user_id.to_string(),
        action_id: action_id.to_string(),
        blocks,
    })
}
