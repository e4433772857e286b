//! Events API and interactivity endpoints.
//!
//! Requests are verified (when a signing secret is configured), mapped into
//! envelopes and queued for the event runner. Slack expects an answer within
//! three seconds, so nothing here waits on command handling.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sasha_slack::events::{envelope_from_event, envelope_from_interaction, SlackEnvelope};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-slack-signature";
const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const MAX_CLOCK_SKEW_SECS: u64 = 60 * 5;

#[derive(Clone)]
pub struct IngressState {
    pub sender: mpsc::Sender<SlackEnvelope>,
    pub signing_secret: Option<SecretString>,
}

pub fn router(state: IngressState) -> Router {
    Router::new()
        .route("/slack/events", post(events))
        .route("/slack/interactions", post(interactions))
        .with_state(state)
}

#[derive(Debug, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Missing,
    Stale,
    Mismatch,
}

/// Verifies `v0=hex(hmac_sha256(secret, "v0:{timestamp}:{body}"))`.
pub fn verify_signature(
    secret: &SecretString,
    headers: &HeaderMap,
    body: &[u8],
    now_secs: i64,
) -> SignatureCheck {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
    let (Some(timestamp), Some(signature)) = (header(TIMESTAMP_HEADER), header(SIGNATURE_HEADER))
    else {
        return SignatureCheck::Missing;
    };

    match timestamp.parse::<i64>() {
        Ok(sent) if now_secs.abs_diff(sent) <= MAX_CLOCK_SKEW_SECS => {}
        _ => return SignatureCheck::Stale,
    }

    let Some(expected) = signature.strip_prefix("v0=").and_then(decode_hex) else {
        return SignatureCheck::Mismatch;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return SignatureCheck::Mismatch;
    };
    mac.update(format!("v0:{timestamp}:").as_bytes());
    mac.update(body);

    match mac.verify_slice(&expected) {
        Ok(()) => SignatureCheck::Valid,
        Err(_) => SignatureCheck::Mismatch,
    }
}

fn decode_hex(value: &str) -> Option<Vec<u8>> {
    if value.len() % 2 != 0 {
        return None;
    }
    (0..value.len())
        .step_by(2)
        .map(|index| u8::from_str_radix(value.get(index..index + 2)?, 16).ok())
        .collect()
}

fn authorize(state: &IngressState, headers: &HeaderMap, body: &[u8]) -> Result<(), Response> {
    let Some(secret) = &state.signing_secret else {
        return Ok(());
    };
    match verify_signature(secret, headers, body, Utc::now().timestamp()) {
        SignatureCheck::Valid => Ok(()),
        rejected => {
            warn!(
                event_name = "ingress.slack.signature_rejected",
                reason = ?rejected,
                "rejected unsigned or forged slack request"
            );
            Err(StatusCode::UNAUTHORIZED.into_response())
        }
    }
}

fn enqueue(state: &IngressState, envelope: SlackEnvelope) {
    let envelope_id = envelope.envelope_id.clone();
    match state.sender.try_send(envelope) {
        Ok(()) => debug!(
            event_name = "ingress.slack.envelope_queued",
            envelope_id = %envelope_id,
            "queued slack envelope"
        ),
        Err(error) => warn!(
            event_name = "ingress.slack.envelope_dropped",
            envelope_id = %envelope_id,
            error = %error,
            "event queue unavailable; dropping envelope"
        ),
    }
}

pub async fn events(
    State(state): State<IngressState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers, &body) {
        return rejection;
    }
    let Ok(payload) = serde_json::from_slice::<Value>(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match payload.get("type").and_then(Value::as_str) {
        Some("url_verification") => {
            let challenge = payload.get("challenge").and_then(Value::as_str).unwrap_or_default();
            info!(event_name = "ingress.slack.url_verification", "answered url verification");
            Json(json!({ "challenge": challenge })).into_response()
        }
        Some("event_callback") => {
            let envelope_id =
                payload.get("event_id").and_then(Value::as_str).unwrap_or("unknown-event");
            let event = payload.get("event").cloned().unwrap_or(Value::Null);
            enqueue(&state, envelope_from_event(envelope_id, &event));
            StatusCode::OK.into_response()
        }
        other => {
            debug!(payload_type = ?other, "ignoring unsupported events api payload");
            StatusCode::OK.into_response()
        }
    }
}

#[derive(Deserialize)]
struct InteractionForm {
    payload: String,
}

pub async fn interactions(
    State(state): State<IngressState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers, &body) {
        return rejection;
    }
    let Ok(form) = serde_urlencoded::from_bytes::<InteractionForm>(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Ok(payload) = serde_json::from_str::<Value>(&form.payload) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let envelope_id = payload
        .get("trigger_id")
        .or_else(|| payload.get("container").and_then(|container| container.get("message_ts")))
        .and_then(Value::as_str)
        .unwrap_or("unknown-interaction");
    enqueue(&state, envelope_from_interaction(envelope_id, &payload));
    StatusCode::OK.into_response()
}
