//! Outbound message delivery through the Cloud API.

use std::time::Duration;

use {
    anyhow::Result,
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, warn},
};

use voicebridge_config::WhatsAppConfig;

/// Delivery seam between the pipeline and the messaging platform.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<()>;

    /// Send a voice reply as an audio message fetched from `audio_url`.
    async fn send_audio(&self, to: &str, audio_url: &str) -> Result<()>;
}

/// `ReplySender` backed by the Graph API `/{phone_number_id}/messages`
/// endpoint.
#[derive(Debug, Clone)]
pub struct CloudApiSender {
    client: reqwest::Client,
    access_token: Option<Secret<String>>,
    phone_number_id: String,
    api_base: String,
    timeout: Duration,
}

impl CloudApiSender {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: config.access_token.clone(),
            phone_number_id: config.phone_number_id.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(Secret::new(token.into()));
        self
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.access_token.is_some() && !self.phone_number_id.is_empty()
    }

    async fn post_message(&self, to: &str, payload: serde_json::Value) -> Result<()> {
        let token = self
            .access_token
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("WhatsApp access token not configured"))?;

        let url = format!("{}/{}/messages", self.api_base, self.phone_number_id);
        let resp = self
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(to, %status, "message send rejected");
            anyhow::bail!("WhatsApp API error ({status}): {body}");
        }

        debug!(to, "message sent");
        Ok(())
    }
}

#[async_trait]
impl ReplySender for CloudApiSender {
    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        self.post_message(
            to,
            serde_json::json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": text },
            }),
        )
        .await
    }

    async fn send_audio(&self, to: &str, audio_url: &str) -> Result<()> {
        // Some clients refuse extension-less links; the filename hint keeps
        // them playable.
        self.post_message(
            to,
            serde_json::json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "audio",
                "audio": { "link": audio_url, "filename": "response.mp3" },
            }),
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    use super::*;

    fn sender_for(server: &MockServer) -> CloudApiSender {
        let config = WhatsAppConfig {
            phone_number_id: "pn-42".into(),
            api_base: server.uri(),
            ..WhatsAppConfig::default()
        };
        CloudApiSender::new(&config).with_access_token("graph-token")
    }

    #[tokio::test]
    async fn send_text_posts_the_cloud_api_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pn-42/messages"))
            .and(header("authorization", "Bearer graph-token"))
            .and(body_partial_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "923001234567",
                "type": "text",
                "text": { "body": "salam" },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{ "id": "wamid.out" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        sender_for(&server)
            .send_text("923001234567", "salam")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_audio_links_the_stream_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pn-42/messages"))
            .and(body_partial_json(serde_json::json!({
                "type": "audio",
                "audio": {
                    "link": "https://api.upliftai.org/v1/synthesis/stream/m-1?token=t",
                    "filename": "response.mp3",
                },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        sender_for(&server)
            .send_audio(
                "923001234567",
                "https://api.upliftai.org/v1/synthesis/stream/m-1?token=t",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn platform_rejection_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pn-42/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "Invalid recipient" }
            })))
            .mount(&server)
            .await;

        let err = sender_for(&server)
            .send_text("bad", "hi")
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("WhatsApp API error (400"));
        assert!(msg.contains("Invalid recipient"));
    }

    #[tokio::test]
    async fn missing_token_fails_before_http() {
        let config = WhatsAppConfig {
            phone_number_id: "pn-42".into(),
            api_base: "http://127.0.0.1:1".into(),
            ..WhatsAppConfig::default()
        };
        let sender = CloudApiSender::new(&config);
        assert!(!sender.is_configured());

        let err = sender.send_text("x", "y").await.unwrap_err();
        assert!(err.to_string().contains("access token not configured"));
    }

    #[test]
    fn debug_redacts_access_token() {
        let sender = CloudApiSender::new(&WhatsAppConfig::default())
            .with_access_token("very-secret-token");
        let debugged = format!("{sender:?}");
        assert!(!debugged.contains("very-secret-token"));
    }
}
