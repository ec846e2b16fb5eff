use std::sync::Arc;

use {
    voicebridge_common::ChatLine,
    voicebridge_store::{ConversationStore, Result},
};

/// Builds the bounded prompt history for one turn. Pure read.
pub struct ContextBuilder {
    store: Arc<dyn ConversationStore>,
}

impl ContextBuilder {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// The last `limit` messages for `user_id` in chronological ascending
    /// order, excluding `exclude_id`.
    ///
    /// The excluded row is the inbound message the caller just persisted;
    /// it re-enters the prompt as the subject, so keeping it here would
    /// duplicate the user's text. Empty history is valid (first contact).
    pub async fn build(
        &self,
        user_id: i64,
        exclude_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatLine>> {
        // Fetch one extra row so the window stays full after exclusion.
        let fetch = limit.saturating_add(1) as u32;
        let mut lines: Vec<ChatLine> = self
            .store
            .recent_messages(user_id, fetch)
            .await?
            .into_iter()
            .filter(|m| m.id != exclude_id)
            .map(|m| ChatLine::new(m.role, m.text))
            .collect();

        // Concurrent writers can leave more than `limit` survivors; drop
        // the oldest.
        if lines.len() > limit {
            let excess = lines.len() - limit;
            lines.drain(..excess);
        }
        Ok(lines)
    }
}
