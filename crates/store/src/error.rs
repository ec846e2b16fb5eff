use thiserror::Error;

/// Conversation store failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// A persisted row no longer decodes (e.g. an unknown role value).
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, Error>;
