//! Operator API: the webhook proxy, direct synthesis, and direct send.
//!
//! The proxy runs a reduced turn (generate, then synthesize) with no
//! store behind it, which makes it the contract surface for exercising
//! the provider chain without a platform envelope.

use std::sync::Arc;

use {
    axum::{Json, extract::State, http::StatusCode, response::IntoResponse},
    secrecy::Secret,
    serde::Deserialize,
    tracing::{debug, warn},
};

use {
    voicebridge_providers::{CompletionRequest, GeminiGenerator, TextGenerator},
    voicebridge_voice::{FallbackSynthesizer, UpliftTts},
};

use crate::server::AppState;

/// Stands in for a transcript when a voice note arrives. Speech
/// recognition is out of scope on this surface.
const VOICE_STUB_TEXT: &str = "Voice message received (transcription not available)";

// ── Proxy ────────────────────────────────────────────────────────────────────

/// Body for `POST /api/proxy`. The provider keys are optional and, when
/// present, override the configured credentials for this request only.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default = "default_message_type", rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub generation_key: Option<String>,
    #[serde(default)]
    pub synthesis_key: Option<String>,
}

fn default_message_type() -> String {
    "text".to_string()
}

pub async fn proxy_handler(
    State(state): State<AppState>,
    Json(req): Json<ProxyRequest>,
) -> impl IntoResponse {
    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    if message.is_none() && req.audio_url.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Either message or audioUrl is required" })),
        )
            .into_response();
    }

    let processed_text =
        if req.audio_url.is_some() && (req.message_type == "voice" || message.is_none()) {
            VOICE_STUB_TEXT
        } else {
            message.unwrap_or_default()
        };
    debug!(kind = %req.message_type, "proxy turn started");

    let generator: Arc<dyn TextGenerator> = match &req.generation_key {
        Some(key) => Arc::new(
            GeminiGenerator::new(&state.config.generation)
                .with_api_key(Secret::new(key.clone())),
        ),
        None => Arc::clone(&state.generator),
    };
    let llm_response = match generator
        .complete(&CompletionRequest::new(Vec::new(), processed_text))
        .await
    {
        Ok(completion) => completion.text,
        Err(e) => {
            warn!(error = %e, "proxy generation failed, substituting apology");
            state.config.replies.generation_apology.clone()
        },
    };

    let synthesizer = match &req.synthesis_key {
        Some(key) => FallbackSynthesizer::new(
            Arc::new(
                UpliftTts::new(&state.config.synthesis).with_api_key(Secret::new(key.clone())),
            ),
            state.policy.clone(),
        ),
        None => FallbackSynthesizer::new(Arc::clone(&state.synthesizer), state.policy.clone()),
    };
    let voice_url = match synthesizer.synthesize(&llm_response, None).await {
        Ok(spoken) => Some(spoken.url),
        Err(e) => {
            warn!(error = %e, "proxy synthesis failed, voice omitted");
            None
        },
    };

    Json(serde_json::json!({
        "success": true,
        "originalMessage": req.message,
        "processedText": processed_text,
        "llmResponse": llm_response,
        "voiceUrl": voice_url,
    }))
    .into_response()
}

// ── Direct synthesis ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsRequest {
    pub text: String,
    #[serde(default)]
    pub voice_id: Option<String>,
}

pub async fn tts_handler(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> impl IntoResponse {
    let text = req.text.trim();
    if text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "text is required" })),
        )
            .into_response();
    }

    let synthesizer =
        FallbackSynthesizer::new(Arc::clone(&state.synthesizer), state.policy.clone());
    match synthesizer.synthesize(text, req.voice_id.as_deref()).await {
        Ok(spoken) => Json(serde_json::json!({
            "success": true,
            "voiceUrl": spoken.url,
            "format": spoken.format.as_str(),
        }))
        .into_response(),
        Err(e) => {
            warn!(error = %e, "direct synthesis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        },
    }
}

// ── Direct send ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to: String,
    pub message: String,
}

pub async fn send_handler(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> impl IntoResponse {
    if req.to.trim().is_empty() || req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "to and message are required" })),
        )
            .into_response();
    }

    match state.sender.send_text(req.to.trim(), &req.message).await {
        Ok(()) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(e) => {
            warn!(to = %req.to, error = %e, "direct send failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        },
    }
}
