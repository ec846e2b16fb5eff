//! Shared types used across all voicebridge crates.

pub mod types;

pub use types::{ChatLine, InboundMessage, Role, UnknownRole, now_ts};
