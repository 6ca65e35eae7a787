use serde::{Deserialize, Serialize};

/// Block Kit text object. Slack tags these `plain_text` / `mrkdwn` on the
/// wire; unknown sibling fields (`emoji`, `verbatim`) are ignored on decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn raw(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

/// A section accessory button. Link buttons carry `url`; interactive
/// buttons carry `value` and are routed by `action_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "button")]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { action_id: action_id.into(), text: TextObject::plain(label), url: None, value: None }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// The block grammar this system emits and expects back. Anything Slack can
/// throw at us that falls outside these three shapes fails typed parsing and
/// is handled by the codec's fallback path instead of here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: TextObject,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        fields: Option<Vec<TextObject>>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        accessory: Option<ButtonElement>,
    },
    Divider,
}

impl Block {
    pub fn header(label: impl Into<String>) -> Self {
        Self::Header { text: TextObject::plain(label) }
    }

    pub fn section(text: impl Into<String>) -> Self {
        Self::Section { text: Some(TextObject::mrkdwn(text)), fields: None, accessory: None }
    }

    pub fn section_with_accessory(text: impl Into<String>, accessory: ButtonElement) -> Self {
        Self::Section {
            text: Some(TextObject::mrkdwn(text)),
            fields: None,
            accessory: Some(accessory),
        }
    }

    pub fn two_field_section(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::Section {
            text: None,
            fields: Some(vec![TextObject::mrkdwn(left), TextObject::mrkdwn(right)]),
            accessory: None,
        }
    }

    pub fn divider() -> Self {
        Self::Divider
    }
}

/// Converts raw wire blocks into the typed grammar. `None` means at least
/// one block does not fit the grammar; callers fall back rather than guess.
pub fn typed_blocks(raw: &[serde_json::Value]) -> Option<Vec<Block>> {
    raw.iter().map(|value| serde_json::from_value(value.clone()).ok()).collect()
}

/// Serializes typed blocks back to wire JSON for transport payloads.
pub fn wire_blocks(blocks: &[Block]) -> Vec<serde_json::Value> {
    blocks
        .iter()
        .map(|block| serde_json::to_value(block).unwrap_or(serde_json::Value::Null))
        .collect()
}
