use async_trait::async_trait;

use voicebridge_common::ChatLine;

/// Request for one reply: bounded history plus the new user text.
///
/// The history lines are whatever the context builder produced; the user
/// text appears exactly once, as the subject, never duplicated into the
/// history.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub history: Vec<ChatLine>,
    pub user_text: String,
}

impl CompletionRequest {
    pub fn new(history: Vec<ChatLine>, user_text: impl Into<String>) -> Self {
        Self {
            history,
            user_text: user_text.into(),
        }
    }
}

/// A completed generation.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

/// Token accounting reported by the provider. Logged, not billed against.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Text generation provider. Single-shot completions only; streaming is out
/// of scope for this service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Model identifier (e.g. "gemini-2.0-flash").
    fn id(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<Completion>;
}
