//! Immutable snapshot of the whole conversation store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::core::conversation::Conversation;
use crate::store::core::ids::ConversationId;

/// The complete store state at one instant.
///
/// Snapshots are never modified in place; every mutation produces a new one
/// that shares the untouched conversations with its predecessor.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSnapshot {
    /// Conversations, newest first.
    pub conversations: Vec<Arc<Conversation>>,
    /// Pointer to the active conversation; may not resolve.
    #[serde(default)]
    pub active_conversation_id: Option<ConversationId>,
}

impl ChatSnapshot {
    /// Snapshot holding a single conversation that is also active.
    #[must_use]
    pub fn with_single(conversation: Conversation) -> Self {
        let active = conversation.id.clone();
        Self {
            conversations: vec![Arc::new(conversation)],
            active_conversation_id: Some(active),
        }
    }

    /// Find a conversation by id.
    #[must_use]
    pub fn conversation(&self, id: &ConversationId) -> Option<&Arc<Conversation>> {
        self.conversations
            .iter()
            .find(|conversation| &conversation.id == id)
    }

    /// Number of conversations.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Whether there are no conversations.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Ids in list order.
    #[must_use]
    pub fn conversation_ids(&self) -> Vec<&ConversationId> {
        self.conversations.iter().map(|conversation| &conversation.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::store::core::config::ConversationDefaults;

    #[test]
    fn test_with_single_activates_conversation() {
        let conversation = Conversation::new(
            ConversationId::from("c0"),
            &ConversationDefaults::default(),
            Utc::now(),
        );
        let snapshot = ChatSnapshot::with_single(conversation);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.active_conversation_id,
            Some(ConversationId::from("c0"))
        );
        assert!(snapshot.conversation(&ConversationId::from("c0")).is_some());
        assert!(snapshot.conversation(&ConversationId::from("c1")).is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let snapshot = ChatSnapshot::default();
        let value = serde_json::to_value(&snapshot).unwrap_or_default();
        assert!(value["conversations"].is_array());
        assert!(value["activeConversationId"].is_null());
    }
}
