//! Config schema types (server, generation, synthesis, whatsapp, replies).

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub generation: GenerationConfig,
    pub synthesis: SynthesisConfig,
    pub whatsapp: WhatsAppConfig,
    pub replies: ReplyStrings,
    pub reconnect: ReconnectConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. The webhook must be reachable from the platform,
    /// so the default binds all interfaces.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Conversation database path. Defaults to `voicebridge.db` in the
    /// platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<std::path::PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
            db_path: None,
        }
    }
}

/// Text generation (LLM) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// API key (from GEMINI_API_KEY env or config).
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,

    /// Model identifier.
    pub model: String,

    /// API base URL. Overridable for tests.
    pub base_url: String,

    /// Persona / system prompt override. When unset the built-in
    /// voice-assistant prompt is used.
    pub system_prompt: Option<String>,

    /// Max tokens the model may generate per reply.
    pub max_output_tokens: u32,

    /// How many persisted messages feed the prompt history.
    pub history_limit: usize,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            system_prompt: None,
            max_output_tokens: 8192,
            history_limit: 5,
            timeout_secs: 30,
        }
    }
}

/// Speech synthesis (TTS) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// API key (from UPLIFTAI_API_KEY env or config).
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,

    /// Voice to synthesize with.
    pub voice_id: String,

    /// API base URL. Overridable for tests.
    pub base_url: String,

    /// Output format candidates, in preference order. Empty means the
    /// built-in default ladder.
    pub formats: Vec<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: "v_8eelc901".into(),
            base_url: "https://api.upliftai.org".into(),
            formats: Vec::new(),
            timeout_secs: 30,
        }
    }
}

/// WhatsApp Business Cloud API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Graph API access token (from WHATSAPP_ACCESS_TOKEN env or config).
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_token: Option<Secret<String>>,

    /// Business phone number id the webhook subscription belongs to.
    pub phone_number_id: String,

    /// Token echoed back during the webhook verification handshake.
    pub verify_token: String,

    /// App secret used to check `X-Hub-Signature-256` on webhook posts.
    /// Unset disables signature verification (warned at startup).
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub app_secret: Option<Secret<String>>,

    /// Graph API base, version included.
    pub api_base: String,

    /// Per-request timeout in seconds for outbound sends.
    pub timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: String::new(),
            verify_token: String::new(),
            app_secret: None,
            api_base: "https://graph.facebook.com/v18.0".into(),
            timeout_secs: 15,
        }
    }
}

/// Fixed user-facing reply strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyStrings {
    /// Sent when text generation fails.
    pub generation_apology: String,
    /// Sent as text when every synthesis format failed. Kept in the target
    /// language because the audience is voice-first.
    pub voice_unavailable: String,
    /// Sent when an inbound message carries neither text nor audio.
    pub empty_message: String,
}

impl Default for ReplyStrings {
    fn default() -> Self {
        Self {
            generation_apology: "Sorry, I encountered an error processing your message. Please \
                                 try again."
                .into(),
            voice_unavailable:
                "معذرت، میں آپ کا جواب تیار کرنے میں مسئلہ آ رہا ہے۔ برائے کرم دوبارہ کوشش کریں۔"
                    .into(),
            empty_message: "Please send a text or voice message so I can help you.".into(),
        }
    }
}

/// Reconnect ladder for the direct-socket transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before each reconnect attempt, in seconds. The last entry
    /// repeats once the ladder is exhausted.
    pub delays_secs: Vec<u64>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delays_secs: vec![3, 3, 6, 12, 30],
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
