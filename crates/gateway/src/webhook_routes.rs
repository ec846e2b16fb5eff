//! Platform webhook endpoints: the subscription handshake and message
//! delivery.
//!
//! Delivery is acknowledged immediately; extracted messages go onto the
//! inbound queue, and the worker runs each turn on its own task, so one
//! slow or failing turn never delays the platform's webhook retry clock.

use std::collections::HashMap;

use {
    axum::{
        Json,
        body::Bytes,
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
    },
    secrecy::ExposeSecret,
    tracing::{debug, warn},
};

use voicebridge_whatsapp::{
    ConnectionEvent, WebhookPayload, extract_messages, verify_signature, verify_subscription,
};

use crate::server::AppState;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// `GET /webhook`: the subscription handshake. Echo `hub.challenge` as
/// plain text when the verify token matches, 403 otherwise.
pub async fn verify_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge").map(String::as_str);

    match verify_subscription(mode, token, challenge, &state.config.whatsapp) {
        Some(challenge) => {
            debug!("webhook subscription verified");
            challenge.into_response()
        },
        None => {
            warn!(?mode, "webhook subscription rejected");
            StatusCode::FORBIDDEN.into_response()
        },
    }
}

/// `POST /webhook`: a message delivery.
///
/// The signature is checked over the raw body before any parsing. A
/// missing `whatsapp.app_secret` skips the check entirely (warned about
/// at startup).
pub async fn receive_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Some(app_secret) = &state.config.whatsapp.app_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(&body, signature, app_secret.expose_secret()) {
            warn!("webhook delivery rejected, signature check failed");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "invalid signature" })),
            )
                .into_response();
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "webhook delivery rejected, unparseable payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "invalid payload" })),
            )
                .into_response();
        },
    };

    let messages = extract_messages(&payload, &state.config.whatsapp);
    debug!(count = messages.len(), "webhook delivery accepted");
    for message in messages {
        state
            .manager
            .handle_event(ConnectionEvent::Inbound(message))
            .await;
    }

    Json(serde_json::json!({ "status": "ok" })).into_response()
}
