//! Resolution of the active conversation.

use std::sync::Arc;

use crate::store::core::conversation::Conversation;
use crate::store::engine::ConversationStore;
use crate::store::state::ChatSnapshot;

/// Conversation the active id points at, or the shared placeholder when it
/// does not resolve.
#[must_use]
pub fn resolve_active(snapshot: &ChatSnapshot) -> Arc<Conversation> {
    snapshot
        .active_conversation_id
        .as_ref()
        .and_then(|id| snapshot.conversation(id))
        .map_or_else(Conversation::missing, Arc::clone)
}

impl ConversationStore {
    /// The active conversation, see [`resolve_active`].
    #[must_use]
    pub fn active_conversation(&self) -> Arc<Conversation> {
        resolve_active(&self.snapshot())
    }
}
