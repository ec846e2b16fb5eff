//! Router assembly and gateway startup.

use std::sync::Arc;

use {
    anyhow::Context,
    axum::{
        Json, Router,
        routing::{get, post},
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::{info, warn},
};

use {
    voicebridge_config::BridgeConfig,
    voicebridge_pipeline::{MessagePipeline, run_inbound_worker},
    voicebridge_providers::{GeminiGenerator, TextGenerator},
    voicebridge_store::{ConversationStore, SqliteStore},
    voicebridge_voice::{FallbackSynthesizer, FormatPolicy, SpeechSynthesizer, UpliftTts},
    voicebridge_whatsapp::{CloudApiSender, ConnectionManager, ReconnectPolicy, ReplySender},
};

use crate::{api_routes, webhook_routes};

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BridgeConfig>,
    pub pipeline: Arc<MessagePipeline>,
    pub manager: Arc<ConnectionManager>,
    pub generator: Arc<dyn TextGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub policy: FormatPolicy,
    pub sender: Arc<dyn ReplySender>,
}

/// Build the gateway router with all routes and CORS.
pub fn build_gateway_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/webhook",
            get(webhook_routes::verify_handler).post(webhook_routes::receive_handler),
        )
        .route("/api/proxy", post(api_routes::proxy_handler))
        .route("/api/tts", post(api_routes::tts_handler))
        .route("/api/send", post(api_routes::send_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Wire providers, the pipeline, and the inbound queue worker around an
/// existing store.
///
/// Pool setup stays with the caller, which keeps in-memory test stores
/// possible. Must run inside the runtime; the worker is spawned here.
pub fn assemble_state(
    config: Arc<BridgeConfig>,
    store: Arc<dyn ConversationStore>,
) -> anyhow::Result<AppState> {
    let generator = GeminiGenerator::new(&config.generation);
    if !generator.is_configured() {
        warn!("generation.api_key is not set, text replies will fail");
    }
    let generator: Arc<dyn TextGenerator> = Arc::new(generator);

    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(UpliftTts::new(&config.synthesis));
    if !synthesizer.is_configured() {
        warn!("synthesis.api_key is not set, voice replies will fall back to text");
    }
    let policy = FormatPolicy::from_names(&config.synthesis.formats)?;

    let sender = CloudApiSender::new(&config.whatsapp);
    if !sender.is_configured() {
        warn!("whatsapp.access_token is not set, outbound delivery will fail");
    }
    if config.whatsapp.app_secret.is_none() {
        warn!("whatsapp.app_secret is not set, webhook signatures will not be checked");
    }
    let sender: Arc<dyn ReplySender> = Arc::new(sender);

    let pipeline = Arc::new(MessagePipeline::new(
        Arc::clone(&store),
        Arc::clone(&generator),
        FallbackSynthesizer::new(Arc::clone(&synthesizer), policy.clone()),
        Arc::clone(&sender),
        config.replies.clone(),
        config.generation.history_limit,
    ));

    let manager = Arc::new(ConnectionManager::new(ReconnectPolicy::from_config(
        &config.reconnect,
    )));
    let inbound_rx = manager
        .take_receiver()
        .context("inbound queue receiver already taken")?;
    tokio::spawn(run_inbound_worker(inbound_rx, Arc::clone(&pipeline)));

    Ok(AppState {
        config,
        pipeline,
        manager,
        generator,
        synthesizer,
        policy,
        sender,
    })
}

/// Open (creating if needed) the conversation database and assemble the
/// full app state.
pub async fn build_state(config: BridgeConfig) -> anyhow::Result<AppState> {
    let db_path = match &config.server.db_path {
        Some(path) => path.clone(),
        None => voicebridge_config::data_dir().join("voicebridge.db"),
    };
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path.display()))
        .await
        .with_context(|| format!("opening {}", db_path.display()))?;
    SqliteStore::init(&pool)
        .await
        .context("initializing conversation schema")?;
    info!(db = %db_path.display(), "conversation store ready");

    let store: Arc<dyn ConversationStore> = Arc::new(SqliteStore::new(pool));
    assemble_state(Arc::new(config), store)
}

/// Start the gateway and serve until the process is stopped.
pub async fn start_gateway(config: BridgeConfig) -> anyhow::Result<()> {
    let bind = format!("{}:{}", config.server.bind, config.server.port);
    let state = build_state(config).await?;
    let app = build_gateway_app(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(addr = %bind, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
