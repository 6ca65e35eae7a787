use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use rotabot_core::assignment::UserTagsAssignment;

use crate::llm::{ChatMessage, LlmClient, LlmError, StructuredOutput};

/// Fixed instruction for every reorder call. The rules here are load
/// bearing: re-derive from the initial order, no invented attendees, and
/// unqualified edits land in `offline`.
pub const REORDER_SYSTEM_PROMPT: &str = "\
You manage a 1on1 attendee list split into two ordered groups, `online` and `offline`.
You will receive the current assignment as JSON and a free-text edit request.
Return ONLY a JSON object of the shape {\"online\": [...], \"offline\": [...]}.
Rules:
- Re-derive both lists from the initial order plus the request. Keep the \
relative order of everyone the request does not move.
- Never invent attendees who are not already present, unless the request \
explicitly names a new user mention.
- Every entry must be a Slack mention of the form <@USERID>.
- A user must appear in at most one group.
- If the request does not say online or offline, apply the edit to `offline`.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReorderError {
    #[error("model returned no content")]
    EmptyResponse,
    #[error("model output did not match the assignment shape: {0}")]
    SchemaValidation(String),
    #[error(transparent)]
    Llm(LlmError),
}

impl From<LlmError> for ReorderError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::EmptyResponse => Self::EmptyResponse,
            other => Self::Llm(other),
        }
    }
}

/// Single-call reordering. No retries here; the caller owns retry policy.
pub struct ReorderEngine {
    llm: Arc<dyn LlmClient>,
}

impl ReorderEngine {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn reorder(
        &self,
        current: &UserTagsAssignment,
        user_query: &str,
    ) -> Result<UserTagsAssignment, ReorderError> {
        let state = serde_json::to_string(current)
            .map_err(|error| ReorderError::SchemaValidation(error.to_string()))?;
        let request = format!("Current assignment:\n{state}\n\nEdit request:\n{user_query}");

        let output = self
            .llm
            .generate_structured(REORDER_SYSTEM_PROMPT, &[ChatMessage::user(request)])
            .await?;

        let raw: UserTagsAssignment = match output {
            StructuredOutput::Json(value) => serde_json::from_value(value)
                .map_err(|error| ReorderError::SchemaValidation(error.to_string()))?,
            StructuredOutput::Text(text) => parse_assignment_text(&text)?,
        };

        // Normalization and keep-first dedup repair model drift: dropped
        // <@...> wrappers and users echoed into both groups.
        let repaired = raw.repaired();

        debug!(
            event_name = "reorder.completed",
            online = repaired.online.len(),
            offline = repaired.offline.len(),
            "reorder call finished"
        );
        Ok(repaired)
    }
}

/// Pulls the assignment object out of a free-text completion. Models
/// without a JSON mode wrap the object in prose or code fences.
fn parse_assignment_text(text: &str) -> Result<UserTagsAssignment, ReorderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ReorderError::EmptyResponse);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    let candidate = match (start, end) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => {
            return Err(ReorderError::SchemaValidation(
                "no JSON object in model output".to_string(),
            ))
        }
    };

    serde_json::from_str(candidate)
        .map_err(|error| ReorderError::SchemaValidation(error.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use rotabot_core::assignment::UserTagsAssignment;

    use crate::llm::{ChatMessage, LlmClient, LlmError, NoopLlmClient, StructuredOutput};

    use super::{ReorderEngine, ReorderError};

    struct ScriptedLlm {
        output: StructuredOutput,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate_structured(
            &self,
            _system_prompt: &str,
            _messages: &[ChatMessage],
        ) -> Result<StructuredOutput, LlmError> {
            Ok(self.output.clone())
        }
    }

    fn engine(output: StructuredOutput) -> ReorderEngine {
        ReorderEngine::new(Arc::new(ScriptedLlm { output }))
    }

    fn tags(mentions: &[&str]) -> Vec<String> {
        mentions.iter().map(|mention| (*mention).to_string()).collect()
    }

    #[tokio::test]
    async fn move_to_online_scenario() {
        let engine = engine(StructuredOutput::Json(json!({
            "online": ["<@U2>"],
            "offline": ["<@U1>", "<@U3>"]
        })));
        let current = UserTagsAssignment::new(vec![], tags(&["<@U1>", "<@U2>", "<@U3>"]));

        let next = engine.reorder(&current, "move U2 to online").await.expect("reorder");
        assert_eq!(next.online, tags(&["<@U2>"]));
        assert_eq!(next.offline, tags(&["<@U1>", "<@U3>"]));
    }

    #[tokio::test]
    async fn duplicate_across_groups_keeps_the_first_occurrence() {
        // The online list is scanned first, so a user echoed into both
        // groups stays online. Pinned deliberately.
        let engine = engine(StructuredOutput::Json(json!({
            "online": ["<@U2>"],
            "offline": ["<@U2>", "<@U1>"]
        })));
        let current = UserTagsAssignment::new(vec![], tags(&["<@U1>", "<@U2>"]));

        let next = engine.reorder(&current, "move U2 to online").await.expect("reorder");
        assert_eq!(next.online, tags(&["<@U2>"]));
        assert_eq!(next.offline, tags(&["<@U1>"]));
    }

    #[tokio::test]
    async fn bare_user_ids_are_repaired_to_canonical_mentions() {
        let engine = engine(StructuredOutput::Json(json!({
            "online": ["U2"],
            "offline": ["<@U1>"]
        })));
        let current = UserTagsAssignment::new(vec![], tags(&["<@U1>", "<@U2>"]));

        let next = engine.reorder(&current, "U2 is online now").await.expect("reorder");
        assert_eq!(next.online, tags(&["<@U2>"]));
        assert_eq!(next.offline, tags(&["<@U1>"]));
    }

    #[tokio::test]
    async fn text_output_wrapped_in_prose_still_parses() {
        let engine = engine(StructuredOutput::Text(
            "Here you go:\n```json\n{\"online\": [], \"offline\": [\"<@U1>\"]}\n```".to_string(),
        ));
        let current = UserTagsAssignment::new(vec![], tags(&["<@U1>"]));

        let next = engine.reorder(&current, "keep as is").await.expect("reorder");
        assert_eq!(next.offline, tags(&["<@U1>"]));
    }

    #[tokio::test]
    async fn garbage_text_fails_schema_validation() {
        let engine = engine(StructuredOutput::Text("I cannot help with that.".to_string()));
        let current = UserTagsAssignment::new(vec![], tags(&["<@U1>"]));

        let error = engine.reorder(&current, "shuffle").await.unwrap_err();
        assert!(matches!(error, ReorderError::SchemaValidation(_)));
    }

    #[tokio::test]
    async fn wrong_shape_json_fails_schema_validation() {
        let engine = engine(StructuredOutput::Json(json!({"online": "not-a-list"})));
        let current = UserTagsAssignment::new(vec![], tags(&["<@U1>"]));

        let error = engine.reorder(&current, "shuffle").await.unwrap_err();
        assert!(matches!(error, ReorderError::SchemaValidation(_)));
    }

    #[tokio::test]
    async fn provider_empty_response_maps_to_empty_response() {
        let engine = ReorderEngine::new(Arc::new(NoopLlmClient));
        let current = UserTagsAssignment::new(vec![], tags(&["<@U1>"]));

        let error = engine.reorder(&current, "shuffle").await.unwrap_err();
        assert_eq!(error, ReorderError::EmptyResponse);
    }
}
