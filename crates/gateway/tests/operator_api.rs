//! Integration tests for `/health` and the `/api/*` operator surface.

use std::{net::SocketAddr, sync::Arc};

use secrecy::Secret;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::net::TcpListener;

use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

use voicebridge_config::{
    BridgeConfig, GenerationConfig, ReplyStrings, SynthesisConfig, WhatsAppConfig,
};
use voicebridge_gateway::{assemble_state, build_gateway_app};
use voicebridge_store::{ConversationStore, SqliteStore};

struct TestGateway {
    addr: SocketAddr,
    providers: MockServer,
}

async fn start_gateway_server() -> TestGateway {
    let providers = MockServer::start().await;

    let config = BridgeConfig {
        generation: GenerationConfig {
            api_key: Some(Secret::new("g-key".into())),
            base_url: providers.uri(),
            ..GenerationConfig::default()
        },
        synthesis: SynthesisConfig {
            api_key: Some(Secret::new("s-key".into())),
            base_url: providers.uri(),
            ..SynthesisConfig::default()
        },
        whatsapp: WhatsAppConfig {
            access_token: Some(Secret::new("wa-token".into())),
            phone_number_id: "pn-1".into(),
            verify_token: "vt-123".into(),
            api_base: providers.uri(),
            ..WhatsAppConfig::default()
        },
        ..BridgeConfig::default()
    };

    // One connection so every task sees the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    SqliteStore::init(&pool).await.unwrap();
    let store = Arc::new(SqliteStore::new(pool));

    let state = assemble_state(Arc::new(config), store as Arc<dyn ConversationStore>).unwrap();
    let app = build_gateway_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestGateway { addr, providers }
}

fn generation_ok(reply: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": reply }] } }],
        "usageMetadata": { "promptTokenCount": 5, "candidatesTokenCount": 2 }
    }))
}

fn synthesis_ok(media_id: &str, token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "mediaId": media_id,
        "token": token
    }))
}

// ── Health ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let gw = start_gateway_server().await;

    let resp = reqwest::get(format!("http://{}/health", gw.addr))
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

// ── Proxy ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn proxy_runs_the_reduced_pipeline() {
    let gw = start_gateway_server().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
        })))
        .respond_with(generation_ok("hi there"))
        .mount(&gw.providers)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/synthesis/text-to-speech"))
        .respond_with(synthesis_ok("m-7", "t-7"))
        .mount(&gw.providers)
        .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/proxy", gw.addr))
        .json(&serde_json::json!({ "message": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["originalMessage"], "hello");
    assert_eq!(body["processedText"], "hello");
    assert_eq!(body["llmResponse"], "hi there");
    assert_eq!(
        body["voiceUrl"],
        format!("{}/v1/synthesis/stream/m-7?token=t-7", gw.providers.uri())
    );
}

#[tokio::test]
async fn proxy_requires_message_or_audio_url() {
    let gw = start_gateway_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{}/api/proxy", gw.addr))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Whitespace-only text counts as missing.
    let resp = client
        .post(format!("http://{}/api/proxy", gw.addr))
        .json(&serde_json::json!({ "message": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn proxy_voice_note_gets_a_stub_transcript() {
    let gw = start_gateway_server().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{
                "parts": [{ "text": "Voice message received (transcription not available)" }]
            }]
        })))
        .respond_with(generation_ok("heard you"))
        .mount(&gw.providers)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/synthesis/text-to-speech"))
        .respond_with(synthesis_ok("m-8", "t-8"))
        .mount(&gw.providers)
        .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/proxy", gw.addr))
        .json(&serde_json::json!({
            "audioUrl": "https://cdn.example/note.ogg",
            "type": "voice"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(
        body["processedText"],
        "Voice message received (transcription not available)"
    );
    assert_eq!(body["llmResponse"], "heard you");
}

#[tokio::test]
async fn proxy_generation_failure_degrades_to_the_apology() {
    let gw = start_gateway_server().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&gw.providers)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/synthesis/text-to-speech"))
        .respond_with(synthesis_ok("m-9", "t-9"))
        .mount(&gw.providers)
        .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/proxy", gw.addr))
        .json(&serde_json::json!({ "message": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(
        body["llmResponse"],
        ReplyStrings::default().generation_apology
    );
    // The apology itself is still spoken.
    assert!(body["voiceUrl"].as_str().unwrap().contains("/m-9?token=t-9"));
}

#[tokio::test]
async fn proxy_synthesis_failure_leaves_voice_url_null() {
    let gw = start_gateway_server().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(generation_ok("hi there"))
        .mount(&gw.providers)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/synthesis/text-to-speech"))
        .respond_with(ResponseTemplate::new(500).set_body_string("synth down"))
        .mount(&gw.providers)
        .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/proxy", gw.addr))
        .json(&serde_json::json!({ "message": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["llmResponse"], "hi there");
    assert!(body["voiceUrl"].is_null());
}

#[tokio::test]
async fn proxy_request_keys_override_the_configured_ones() {
    let gw = start_gateway_server().await;

    // These mocks only match the per-request keys, so a reply proves the
    // configured "g-key"/"s-key" were not used.
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(header("x-goog-api-key", "req-g-key"))
        .respond_with(generation_ok("keyed reply"))
        .mount(&gw.providers)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/synthesis/text-to-speech"))
        .and(header("authorization", "Bearer req-s-key"))
        .respond_with(synthesis_ok("m-10", "t-10"))
        .mount(&gw.providers)
        .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/proxy", gw.addr))
        .json(&serde_json::json!({
            "message": "hello",
            "generationKey": "req-g-key",
            "synthesisKey": "req-s-key"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["llmResponse"], "keyed reply");
    assert!(body["voiceUrl"].as_str().unwrap().contains("/m-10?"));
}

// ── Direct synthesis ─────────────────────────────────────────────────────────

#[tokio::test]
async fn tts_synthesizes_and_returns_the_stream_url() {
    let gw = start_gateway_server().await;

    Mock::given(method("POST"))
        .and(path("/v1/synthesis/text-to-speech"))
        .and(body_partial_json(serde_json::json!({
            "text": "salam",
            "outputFormat": "OGG_OPUS_22050_64"
        })))
        .respond_with(synthesis_ok("m-20", "t-20"))
        .mount(&gw.providers)
        .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/tts", gw.addr))
        .json(&serde_json::json!({ "text": "salam" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["format"], "ogg_opus");
    assert_eq!(
        body["voiceUrl"],
        format!("{}/v1/synthesis/stream/m-20?token=t-20", gw.providers.uri())
    );
}

#[tokio::test]
async fn tts_passes_the_requested_voice() {
    let gw = start_gateway_server().await;

    Mock::given(method("POST"))
        .and(path("/v1/synthesis/text-to-speech"))
        .and(body_partial_json(serde_json::json!({ "voiceId": "v_custom" })))
        .respond_with(synthesis_ok("m-21", "t-21"))
        .mount(&gw.providers)
        .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/tts", gw.addr))
        .json(&serde_json::json!({ "text": "salam", "voiceId": "v_custom" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn tts_rejects_empty_text() {
    let gw = start_gateway_server().await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/tts", gw.addr))
        .json(&serde_json::json!({ "text": "   " }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn tts_exhaustion_is_a_server_error() {
    let gw = start_gateway_server().await;

    Mock::given(method("POST"))
        .and(path("/v1/synthesis/text-to-speech"))
        .respond_with(ResponseTemplate::new(500).set_body_string("synth down"))
        .mount(&gw.providers)
        .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/tts", gw.addr))
        .json(&serde_json::json!({ "text": "salam" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("all output formats failed")
    );
}

// ── Direct send ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn send_posts_the_text_message() {
    let gw = start_gateway_server().await;

    Mock::given(method("POST"))
        .and(path("/pn-1/messages"))
        .and(body_partial_json(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": "923001112233",
            "type": "text",
            "text": { "body": "direct hello" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "messages": [{ "id": "wamid.out-2" }]
        })))
        .expect(1)
        .mount(&gw.providers)
        .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/send", gw.addr))
        .json(&serde_json::json!({ "to": "923001112233", "message": "direct hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn send_surfaces_platform_rejection() {
    let gw = start_gateway_server().await;

    Mock::given(method("POST"))
        .and(path("/pn-1/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid recipient"))
        .mount(&gw.providers)
        .await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/send", gw.addr))
        .json(&serde_json::json!({ "to": "bad", "message": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("WhatsApp API error")
    );
}

#[tokio::test]
async fn send_rejects_blank_fields() {
    let gw = start_gateway_server().await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/send", gw.addr))
        .json(&serde_json::json!({ "to": "", "message": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}
