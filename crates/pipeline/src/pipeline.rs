//! The message pipeline: one inbound message in, one best-effort reply out.

use std::sync::Arc;

use tracing::{debug, info, warn};

use {
    voicebridge_common::{InboundMessage, Role},
    voicebridge_config::ReplyStrings,
    voicebridge_providers::{CompletionRequest, TextGenerator},
    voicebridge_store::ConversationStore,
    voicebridge_voice::{AudioFormat, FallbackSynthesizer, SynthesisError},
    voicebridge_whatsapp::ReplySender,
};

use crate::{context::ContextBuilder, error::PipelineError};

/// Subject text for a voice note without caption. Speech recognition is
/// out of scope; the model still gets something to react to.
const VOICE_NOTE_PLACEHOLDER: &str = "[voice message]";

/// How a turn ended, user-visibly.
///
/// Everything here is a completed turn; pre-provider aborts are
/// `PipelineError` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Voice note sent.
    AudioDelivered { format: AudioFormat },
    /// Every synthesis format failed; the text fallback was sent.
    TextDelivered,
    /// Reply generated and persisted, but the outbound send was rejected.
    /// No rollback, no retry.
    SendFailed { error: String },
    /// Generation failed; the fixed apology was sent best-effort and
    /// nothing beyond the user's message was persisted.
    GenerationFailed { apology: String },
    /// Neither text nor audio inbound; replied without touching providers
    /// or the store.
    EmptyMessage,
}

/// Orchestrates one conversational turn end to end.
pub struct MessagePipeline {
    store: Arc<dyn ConversationStore>,
    context: ContextBuilder,
    generator: Arc<dyn TextGenerator>,
    synthesizer: FallbackSynthesizer,
    sender: Arc<dyn ReplySender>,
    replies: ReplyStrings,
    history_limit: usize,
}

impl MessagePipeline {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        generator: Arc<dyn TextGenerator>,
        synthesizer: FallbackSynthesizer,
        sender: Arc<dyn ReplySender>,
        replies: ReplyStrings,
        history_limit: usize,
    ) -> Self {
        Self {
            context: ContextBuilder::new(Arc::clone(&store)),
            store,
            generator,
            synthesizer,
            sender,
            replies,
            history_limit,
        }
    }

    /// Process one inbound message. The step order is load-bearing: the
    /// user's message is durable before any provider call, and the AI reply
    /// is durable before any delivery attempt.
    pub async fn process(
        &self,
        inbound: InboundMessage,
    ) -> Result<DeliveryOutcome, PipelineError> {
        if inbound.sender_id.trim().is_empty() {
            return Err(PipelineError::InvalidInput("sender_id is empty".into()));
        }

        let text = inbound.text.trim();
        if text.is_empty() && inbound.audio_url.is_none() {
            debug!(message_id = %inbound.message_id, "empty inbound message, short reply");
            if let Err(e) = self
                .sender
                .send_text(&inbound.sender_id, &self.replies.empty_message)
                .await
            {
                warn!(error = %e, "failed to deliver empty-message reply");
            }
            return Ok(DeliveryOutcome::EmptyMessage);
        }
        let subject = if text.is_empty() {
            VOICE_NOTE_PLACEHOLDER
        } else {
            text
        };

        let user = self.store.find_or_create_user(&inbound.sender_id).await?;
        let inbound_row = self
            .store
            .append_message(user.id, Role::User, subject)
            .await?;
        self.store.touch_session(user.id).await?;

        let history = self
            .context
            .build(user.id, inbound_row.id, self.history_limit)
            .await?;

        let request = CompletionRequest::new(history, subject);
        let completion = match self.generator.complete(&request).await {
            Ok(c) => c,
            Err(e) => {
                warn!(user_id = user.id, error = %e, "generation failed, sending apology");
                let apology = self.replies.generation_apology.clone();
                if let Err(send_err) =
                    self.sender.send_text(&inbound.sender_id, &apology).await
                {
                    warn!(error = %send_err, "failed to deliver generation apology");
                }
                return Ok(DeliveryOutcome::GenerationFailed { apology });
            },
        };

        // Text is the durable source of truth; persist before synthesis so
        // a speech or delivery failure never loses the reply.
        let reply_row = self
            .store
            .append_message(user.id, Role::Ai, &completion.text)
            .await?;
        debug!(
            user_id = user.id,
            reply_id = reply_row.id,
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "reply persisted"
        );

        let delivery = match self.synthesizer.synthesize(&completion.text, None).await {
            Ok(spoken) => self
                .sender
                .send_audio(&inbound.sender_id, &spoken.url)
                .await
                .map(|()| DeliveryOutcome::AudioDelivered {
                    format: spoken.format,
                }),
            Err(e @ SynthesisError::AllFormatsFailed { .. }) => {
                warn!(user_id = user.id, error = %e, "synthesis exhausted, text fallback");
                self.sender
                    .send_text(&inbound.sender_id, &self.replies.voice_unavailable)
                    .await
                    .map(|()| DeliveryOutcome::TextDelivered)
            },
        };

        match delivery {
            Ok(outcome) => {
                info!(user_id = user.id, outcome = ?outcome, "turn complete");
                Ok(outcome)
            },
            Err(e) => {
                warn!(user_id = user.id, error = %e, "outbound delivery rejected");
                Ok(DeliveryOutcome::SendFailed {
                    error: e.to_string(),
                })
            },
        }
    }
}
