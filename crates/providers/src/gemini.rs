use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, trace, warn},
};

use {
    voicebridge_common::{ChatLine, Role},
    voicebridge_config::GenerationConfig,
};

use crate::model::{Completion, CompletionRequest, TextGenerator, Usage};

/// Built-in persona. Replies are rendered to speech, so the prompt pins the
/// register: short plain sentences in the caller's language, nothing that
/// only works on a screen.
pub const DEFAULT_SYSTEM_PROMPT: &str = "آپ ایک مددگار آواز والے اسسٹنٹ ہیں۔ ہمیشہ اردو میں جواب \
     دیں۔ مختصر اور سادہ جملے استعمال کریں کیونکہ آپ کا جواب بول کر سنایا جائے گا۔ فہرستیں، \
     نشانات یا کوئی فارمیٹنگ استعمال نہ کریں۔";

/// Gemini `generateContent` client.
#[derive(Debug)]
pub struct GeminiGenerator {
    api_key: Option<Secret<String>>,
    model: String,
    base_url: String,
    system_prompt: String,
    max_output_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(cfg: &GenerationConfig) -> Self {
        Self {
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            system_prompt: cfg
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            max_output_tokens: cfg.max_output_tokens,
            timeout: Duration::from_secs(cfg.timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    /// Override the API key after construction (per-request keys on the
    /// proxy surface).
    #[must_use]
    pub fn with_api_key(mut self, api_key: Secret<String>) -> Self {
        self.api_key = Some(api_key);
        self
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Map history lines plus the new user text into Gemini `contents` turns.
///
/// Gemini uses role "user" for the human and "model" for its own replies;
/// the new user text goes last.
fn to_gemini_contents(history: &[ChatLine], user_text: &str) -> Vec<serde_json::Value> {
    let mut contents: Vec<serde_json::Value> = history
        .iter()
        .map(|line| {
            let role = match line.role {
                Role::User => "user",
                Role::Ai => "model",
            };
            serde_json::json!({ "role": role, "parts": [{ "text": line.text }] })
        })
        .collect();

    contents.push(serde_json::json!({ "role": "user", "parts": [{ "text": user_text }] }));
    contents
}

/// Extract text content from Gemini response parts.
fn extract_text(parts: &[serde_json::Value]) -> Option<String> {
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.join(""))
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<Completion> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Gemini API key not configured"))?;

        let body = serde_json::json!({
            "contents": to_gemini_contents(&request.history, &request.user_text),
            "systemInstruction": {
                "parts": [{ "text": self.system_prompt }]
            },
            "generationConfig": {
                "maxOutputTokens": self.max_output_tokens,
            },
        });

        debug!(
            model = %self.model,
            history_len = request.history.len(),
            "gemini complete request"
        );
        trace!(body = %serde_json::to_string(&body).unwrap_or_default(), "gemini request body");

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let http_resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key.expose_secret())
            .header("content-type", "application/json")
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body_text, "gemini API error");
            anyhow::bail!("Gemini API error HTTP {status}: {body_text}");
        }

        let resp = http_resp.json::<serde_json::Value>().await?;
        trace!(response = %resp, "gemini raw response");

        let parts = resp["candidates"][0]["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let text = extract_text(&parts)
            .ok_or_else(|| anyhow::anyhow!("Gemini returned no text candidates"))?;

        let usage = Usage {
            input_tokens: resp["usageMetadata"]["promptTokenCount"]
                .as_u64()
                .unwrap_or(0) as u32,
            output_tokens: resp["usageMetadata"]["candidatesTokenCount"]
                .as_u64()
                .unwrap_or(0) as u32,
        };

        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "gemini complete done"
        );

        Ok(Completion { text, usage })
    }
}
