use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, warn},
};

use voicebridge_config::SynthesisConfig;

use crate::synth::{SpeechSynthesizer, SynthesizeRequest, SynthesizedAudio};

/// UpliftAI text-to-speech client.
#[derive(Debug)]
pub struct UpliftTts {
    client: reqwest::Client,
    api_key: Option<Secret<String>>,
    default_voice_id: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisResponse {
    media_id: String,
    token: String,
}

impl UpliftTts {
    pub fn new(cfg: &SynthesisConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: cfg.api_key.clone(),
            default_voice_id: cfg.voice_id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }

    /// Override the API key after construction (per-request keys on the
    /// proxy surface).
    #[must_use]
    pub fn with_api_key(mut self, api_key: Secret<String>) -> Self {
        self.api_key = Some(api_key);
        self
    }

    fn get_api_key(&self) -> anyhow::Result<&Secret<String>> {
        self.api_key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("UpliftAI API key not configured"))
    }
}

#[async_trait]
impl SpeechSynthesizer for UpliftTts {
    fn name(&self) -> &str {
        "upliftai"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn synthesize(&self, request: &SynthesizeRequest) -> anyhow::Result<SynthesizedAudio> {
        let api_key = self.get_api_key()?;
        let voice_id = request
            .voice_id
            .as_deref()
            .unwrap_or(&self.default_voice_id);

        let body = serde_json::json!({
            "voiceId": voice_id,
            "text": request.text,
            "outputFormat": request.output_format.wire_param(),
        });

        debug!(
            voice_id,
            format = request.output_format.wire_param(),
            chars = request.text.chars().count(),
            "uplift synthesize request"
        );

        let resp = self
            .client
            .post(format!("{}/v1/synthesis/text-to-speech", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body_text, "uplift API error");
            anyhow::bail!("UpliftAI API error HTTP {status}: {body_text}");
        }

        let parsed = resp.json::<SynthesisResponse>().await?;
        Ok(SynthesizedAudio {
            media_id: parsed.media_id,
            token: parsed.token,
            format: request.output_format,
        })
    }

    fn stream_url(&self, audio: &SynthesizedAudio) -> String {
        format!(
            "{}/v1/synthesis/stream/{}?token={}",
            self.base_url,
            audio.media_id,
            urlencoding::encode(&audio.token)
        )
    }
}
