use thiserror::Error;

/// Failures that abort a turn before any provider work.
///
/// Provider and delivery failures are not errors at this level; they are
/// turn outcomes (`DeliveryOutcome`), because the pipeline still owes the
/// sender a reply for them.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed inbound envelope. Nothing was persisted.
    #[error("invalid inbound message: {0}")]
    InvalidInput(String),

    /// The store failed. The turn is aborted before provider calls whose
    /// results could not be persisted anyway.
    #[error("conversation store unavailable: {0}")]
    StoreUnavailable(#[from] voicebridge_store::Error),
}
