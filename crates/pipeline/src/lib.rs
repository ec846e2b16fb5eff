//! The conversational turn: persist, prompt, speak, deliver.

pub mod context;
pub mod error;
pub mod pipeline;
pub mod worker;

pub use {
    context::ContextBuilder,
    error::PipelineError,
    pipeline::{DeliveryOutcome, MessagePipeline},
    worker::run_inbound_worker,
};
