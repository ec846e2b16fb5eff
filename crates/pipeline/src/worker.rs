use std::sync::Arc;

use {
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use voicebridge_common::InboundMessage;

use crate::pipeline::MessagePipeline;

/// Drain the inbound queue, one spawned turn per message.
///
/// Turns run concurrently; a slow provider call on one message never
/// holds up the next. Returns when the sending half is dropped.
pub async fn run_inbound_worker(
    mut rx: mpsc::Receiver<InboundMessage>,
    pipeline: Arc<MessagePipeline>,
) {
    info!("inbound worker started");
    while let Some(msg) = rx.recv().await {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            let message_id = msg.message_id.clone();
            match pipeline.process(msg).await {
                Ok(outcome) => debug!(message_id, ?outcome, "turn finished"),
                Err(e) => warn!(message_id, error = %e, "turn failed"),
            }
        });
    }
    info!("inbound queue closed, worker exiting");
}
