//! Configuration loading and env substitution.
//!
//! Config files: `voicebridge.toml`, `voicebridge.yaml`, or `voicebridge.json`
//! searched in `./` then the platform config dir (`~/.config/voicebridge/` on
//! Linux).
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, data_dir, discover_and_load, load_config},
    schema::{
        BridgeConfig, GenerationConfig, ReconnectConfig, ReplyStrings, ServerConfig,
        SynthesisConfig, WhatsAppConfig,
    },
};
