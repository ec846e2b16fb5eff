//! Webhook verification and payload normalization.

use {
    hmac::{Hmac, Mac},
    sha2::Sha256,
    tracing::{debug, warn},
};

use {voicebridge_common::InboundMessage, voicebridge_config::WhatsAppConfig};

use crate::types::WebhookPayload;

type HmacSha256 = Hmac<Sha256>;

/// Verify `X-Hub-Signature-256` against the raw request body.
///
/// The header carries `sha256=<hex>` where the hex digest is an HMAC-SHA256
/// of the body keyed with the app secret. The comparison is constant-time;
/// the header value is attacker-controlled.
pub fn verify_signature(body: &[u8], signature_header: &str, app_secret: &str) -> bool {
    let Some(claimed) = signature_header.strip_prefix("sha256=") else {
        warn!("signature header missing sha256= prefix");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        warn!("app secret rejected by HMAC");
        return false;
    };
    mac.update(body);
    let computed = hex::encode(mac.finalize().into_bytes());

    constant_time_eq(computed.as_bytes(), claimed.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Answer the platform's subscription handshake (GET /webhook).
///
/// Returns the challenge to echo back when `hub.mode` is `subscribe` and
/// the token matches the configured verify token.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    config: &WhatsAppConfig,
) -> Option<String> {
    let mode = mode?;
    let token = token?;
    let challenge = challenge?;

    if mode == "subscribe" && !config.verify_token.is_empty() && token == config.verify_token {
        Some(challenge.to_string())
    } else {
        None
    }
}

/// Normalize a webhook payload into the inbound messages the pipeline
/// consumes.
///
/// Walks `entry[].changes[].value.messages[]`, keeping only `messages`
/// field changes addressed to the configured phone number id, and only
/// `text` typed messages. A single webhook call can yield several messages.
pub fn extract_messages(payload: &WebhookPayload, config: &WhatsAppConfig) -> Vec<InboundMessage> {
    let mut out = Vec::new();

    for entry in &payload.entry {
        for change in &entry.changes {
            if change.field != "messages" {
                debug!(field = %change.field, "ignoring non-message webhook change");
                continue;
            }

            if let Some(ref metadata) = change.value.metadata
                && metadata.phone_number_id != config.phone_number_id
            {
                warn!(
                    expected = %config.phone_number_id,
                    received = %metadata.phone_number_id,
                    "phone number id mismatch, dropping change"
                );
                continue;
            }

            for msg in &change.value.messages {
                if msg.message_type != "text" {
                    debug!(msg_type = %msg.message_type, "skipping non-text message");
                    continue;
                }
                let Some(text) = msg.text_body() else {
                    debug!(message_id = %msg.id, "text message without body");
                    continue;
                };

                out.push(InboundMessage {
                    sender_id: msg.from.clone(),
                    message_id: msg.id.clone(),
                    text: text.to_string(),
                    audio_url: None,
                    received_at: msg.received_at(),
                });
            }
        }
    }

    out
}
