//! Webhook payload types for the Cloud API.
//!
//! Only the fields the bridge reads are modeled; everything else in the
//! platform payload is ignored by serde.

use serde::Deserialize;

/// Top-level webhook POST body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    pub value: ChangeValue,
}

/// The `value` object of a change. Status-only deliveries carry no
/// `messages` array at all.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeValue {
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub messages: Vec<PlatformMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub phone_number_id: String,
}

/// One inbound platform message. `message_type` discriminates the payload;
/// the bridge only consumes `"text"`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformMessage {
    pub from: String,
    pub id: String,
    /// Unix seconds as a decimal string, per the platform wire format.
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: Option<TextBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    pub body: String,
}

impl PlatformMessage {
    /// The text body, present only for `type == "text"` messages.
    #[must_use]
    pub fn text_body(&self) -> Option<&str> {
        self.text.as_ref().map(|t| t.body.as_str())
    }

    /// Timestamp in unix seconds, falling back to the current clock when
    /// the field is missing or malformed.
    #[must_use]
    pub fn received_at(&self) -> i64 {
        self.timestamp
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or_else(voicebridge_common::now_ts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_text_message_delivery() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{
                "object": "whatsapp_business_account",
                "entry": [{
                    "id": "ent-1",
                    "changes": [{
                        "field": "messages",
                        "value": {
                            "messaging_product": "whatsapp",
                            "metadata": {
                                "display_phone_number": "15550001111",
                                "phone_number_id": "pn-42"
                            },
                            "messages": [{
                                "from": "923001234567",
                                "id": "wamid.abc",
                                "timestamp": "1724576400",
                                "type": "text",
                                "text": { "body": "salam" }
                            }]
                        }
                    }]
                }]
            }"#,
        )
        .unwrap();

        let msg = &payload.entry[0].changes[0].value.messages[0];
        assert_eq!(msg.text_body(), Some("salam"));
        assert_eq!(msg.received_at(), 1_724_576_400);
    }

    #[test]
    fn status_only_delivery_has_no_messages() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{
                "object": "whatsapp_business_account",
                "entry": [{
                    "id": "ent-1",
                    "changes": [{
                        "field": "messages",
                        "value": {
                            "metadata": { "phone_number_id": "pn-42" },
                            "statuses": [{ "id": "wamid.x", "status": "delivered" }]
                        }
                    }]
                }]
            }"#,
        )
        .unwrap();

        assert!(payload.entry[0].changes[0].value.messages.is_empty());
    }

    #[test]
    fn malformed_timestamp_falls_back_to_now() {
        let msg = PlatformMessage {
            from: "1".into(),
            id: "m".into(),
            timestamp: Some("not-a-number".into()),
            message_type: "text".into(),
            text: None,
        };
        assert!(msg.received_at() > 1_577_836_800);
    }
}
