use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use rotabot_slack::events::{event_from_callback, toggle_from_interaction, RotaEvent};
use rotabot_slack::signature;

use crate::handlers::ThreadMentionFlow;
use crate::health;
use crate::tasks::TaskSupervisor;
use crate::toggle::ProgressToggle;

const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const SIGNATURE_HEADER: &str = "x-slack-signature";

#[derive(Clone)]
pub struct IngressState {
    inner: Arc<Inner>,
}

struct Inner {
    signing_secret: SecretString,
    mention_flow: Arc<ThreadMentionFlow>,
    toggle: Arc<ProgressToggle>,
    tasks: Arc<TaskSupervisor>,
}

impl IngressState {
    pub fn new(
        signing_secret: SecretString,
        mention_flow: Arc<ThreadMentionFlow>,
        toggle: Arc<ProgressToggle>,
        tasks: Arc<TaskSupervisor>,
    ) -> Self {
        Self { inner: Arc::new(Inner { signing_secret, mention_flow, toggle, tasks }) }
    }
}

pub fn router(state: IngressState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/slack/events", post(receive_event))
        .route("/slack/interactions", post(receive_interaction))
        .with_state(state)
}

/// Events API endpoint. Everything past the signature check is acked with
/// 200 immediately; real work happens in supervised background tasks so
/// Slack's 3-second delivery deadline is never at risk.
async fn receive_event(
    State(state): State<IngressState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Err(status) = check_signature(&state, &headers, &body) {
        return status.into_response();
    }

    let Ok(payload) = serde_json::from_slice::<Value>(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    if payload.get("type").and_then(Value::as_str) == Some("url_verification") {
        let challenge = payload.get("challenge").and_then(Value::as_str).unwrap_or_default();
        return Json(json!({ "challenge": challenge })).into_response();
    }

    let correlation_id = Uuid::new_v4().to_string();
    match event_from_callback(&payload) {
        Some(RotaEvent::ThreadMention(event)) => {
            info!(
                event_name = "ingress.mention_received",
                correlation_id = %correlation_id,
                channel_id = %event.channel_id,
                thread_ts = %event.thread_ts,
                "queueing thread mention"
            );
            let flow = state.inner.mention_flow.clone();
            state
                .inner
                .tasks
                .spawn("thread_mention", &correlation_id, async move { flow.handle(&event).await })
                .await;
        }
        Some(RotaEvent::ProgressToggle(_)) => {
            // Toggles arrive on the interactivity endpoint, never here.
        }
        Some(RotaEvent::Unsupported { event_type }) => {
            info!(
                event_name = "ingress.event_ignored",
                correlation_id = %correlation_id,
                event_type = %event_type,
                "unsupported event type"
            );
        }
        None => {}
    }

    StatusCode::OK.into_response()
}

/// Interactivity endpoint. Payloads arrive form-encoded as `payload=<json>`.
async fn receive_interaction(
    State(state): State<IngressState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Err(status) = check_signature(&state, &headers, &body) {
        return status.into_response();
    }

    let Some(raw_payload) = form_payload(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Ok(payload) = serde_json::from_str::<Value>(&raw_payload) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let correlation_id = Uuid::new_v4().to_string();
    if let Some(event) = toggle_from_interaction(&payload) {
        info!(
            event_name = "ingress.toggle_received",
            correlation_id = %correlation_id,
            channel_id = %event.channel_id,
            message_ts = %event.message_ts,
            user_id = %event.user_id,
            "queueing progress toggle"
        );
        let toggle = state.inner.toggle.clone();
        state
            .inner
            .tasks
            .spawn("progress_toggle", &correlation_id, async move { toggle.handle(&event).await })
            .await;
    }

    StatusCode::OK.into_response()
}

fn check_signature(
    state: &IngressState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), StatusCode> {
    let timestamp = header_str(headers, TIMESTAMP_HEADER);
    let provided = header_str(headers, SIGNATURE_HEADER);

    signature::verify(
        state.inner.signing_secret.expose_secret(),
        timestamp,
        provided,
        body,
        Utc::now().timestamp(),
    )
    .map_err(|error| {
        warn!(
            event_name = "ingress.signature_rejected",
            error = %error,
            "rejected request with bad signature"
        );
        StatusCode::UNAUTHORIZED
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|value| value.to_str().ok()).unwrap_or_default()
}

/// Extracts and percent-decodes the `payload` field of a form-encoded body.
fn form_payload(body: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(body).ok()?;
    text.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "payload" {
            percent_decode(value)
        } else {
            None
        }
    })
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'+' => {
                output.push(b' ');
                index += 1;
            }
            b'%' => {
                let high = hex_value(*bytes.get(index + 1)?)?;
                let low = hex_value(*bytes.get(index + 2)?)?;
                output.push(high << 4 | low);
                index += 3;
            }
            byte => {
                output.push(byte);
                index += 1;
            }
        }
    }

    String::from_utf8(output).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
