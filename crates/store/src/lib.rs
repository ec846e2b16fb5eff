//! Conversation persistence: users, messages, and session liveness on SQLite.
//!
//! All mutation is append-only (`messages`) or upsert-by-key (`users`,
//! `sessions`), so concurrent turns for the same sender never need explicit
//! locking.

pub mod error;
pub mod store;

pub use {
    error::{Error, Result},
    store::{ConversationStore, Session, SqliteStore, StoredMessage, User},
};
