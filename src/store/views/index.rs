//! Lightweight conversation listing.

use serde::Serialize;

use crate::store::core::conversation::Conversation;
use crate::store::core::ids::{ConversationId, SystemPurposeId};
use crate::store::engine::ConversationStore;
use crate::store::state::ChatSnapshot;

/// Listing entry for one conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation id.
    pub id: ConversationId,
    /// Display name.
    pub name: String,
    /// Current purpose.
    pub system_purpose_id: SystemPurposeId,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            name: conversation.name.clone(),
            system_purpose_id: conversation.system_purpose_id.clone(),
        }
    }
}

/// Summaries of every conversation, in list order.
#[must_use]
pub fn conversation_index(snapshot: &ChatSnapshot) -> Vec<ConversationSummary> {
    snapshot
        .conversations
        .iter()
        .map(|conversation| ConversationSummary::from(conversation.as_ref()))
        .collect()
}

impl ConversationStore {
    /// Summaries of the current conversations.
    #[must_use]
    pub fn conversation_index(&self) -> Vec<ConversationSummary> {
        conversation_index(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::core::config::StoreConfig;
    use crate::store::core::errors::StoreResult;

    #[test]
    fn test_index_preserves_order() -> StoreResult<()> {
        let store = ConversationStore::new(StoreConfig::default())?;
        let oldest = store.active_conversation().id.clone();
        let newest = store.create_conversation();
        store.set_system_purpose_id(newest.clone(), "Developer");

        let index = store.conversation_index();
        assert_eq!(index.len(), 2);
        assert_eq!(index[0].id, newest);
        assert_eq!(index[0].system_purpose_id.as_str(), "Developer");
        assert_eq!(index[1].id, oldest);
        assert_eq!(index[1].system_purpose_id.as_str(), "Generic");
        Ok(())
    }

    #[test]
    fn test_index_is_selectable() -> StoreResult<()> {
        let store = ConversationStore::new(StoreConfig::default())?;
        let id = store.active_conversation().id.clone();
        let mut index = store.select(conversation_index);

        // Messages are not part of the summary.
        store.add_message(id.clone(), crate::store::core::message::Message::user("hi"));
        assert!(index.poll().is_none());

        store.set_system_purpose_id(id, "Scientist");
        let purposes: Vec<_> = index
            .poll()
            .map(|entries| entries.iter().map(|e| e.system_purpose_id.to_string()).collect())
            .unwrap_or_default();
        assert_eq!(purposes, ["Scientist".to_string()]);
        Ok(())
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = ConversationSummary {
            id: ConversationId::from("c1"),
            name: "Conversation c1".to_string(),
            system_purpose_id: SystemPurposeId::from("Generic"),
        };
        let value = serde_json::to_value(&summary).unwrap_or_default();
        assert_eq!(value["systemPurposeId"], "Generic");
    }
}
