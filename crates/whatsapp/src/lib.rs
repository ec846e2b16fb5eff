//! WhatsApp Business Cloud API integration: webhook verification and
//! parsing, the outbound message sender, and the connection state machine
//! with its inbound queue.

pub mod connection;
pub mod outbound;
pub mod types;
pub mod webhook;

pub use {
    connection::{ConnectionEvent, ConnectionManager, ConnectionState, ReconnectPolicy},
    outbound::{CloudApiSender, ReplySender},
    types::WebhookPayload,
    webhook::{extract_messages, verify_signature, verify_subscription},
};
