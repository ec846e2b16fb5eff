use {
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

/// Author of a persisted conversation message.
///
/// Stored as lowercase text (`"user"` / `"ai"`) so the database stays
/// readable with plain sqlite tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Ai => "ai",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a persisted role string is not one of the known values.
#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "ai" => Ok(Role::Ai),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// One line of bounded conversation history handed to the text generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub role: Role,
    pub text: String,
}

impl ChatLine {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// A normalized inbound message, whatever surface it arrived on.
///
/// `sender_id` is the platform address of the sender (a phone number for
/// WhatsApp). `message_id` is the platform's own id for the message and is
/// carried for logging only. `audio_url` is set when the sender sent a voice
/// note instead of (or in addition to) text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender_id: String,
    pub message_id: String,
    pub text: String,
    pub audio_url: Option<String>,
    pub received_at: i64,
}

/// Current unix time in whole seconds.
#[must_use]
pub fn now_ts() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
