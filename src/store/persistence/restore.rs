//! Loading the persisted snapshot at startup.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::store::core::config::StoreConfig;
use crate::store::core::conversation::Conversation;
use crate::store::core::message::Message;
use crate::store::persistence::durable::DurableStorage;
use crate::store::persistence::envelope;
use crate::store::state::ChatSnapshot;

/// Read and normalize the persisted snapshot.
///
/// Returns `None` when the slot is empty, unreadable, malformed, written
/// with another version, or holds no conversations. Failures are logged and
/// otherwise swallowed.
pub async fn restore_snapshot(
    storage: &dyn DurableStorage,
    config: &StoreConfig,
) -> Option<ChatSnapshot> {
    let slot = config.persistence.slot.as_str();
    let raw = match storage.read(slot).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(slot, "No persisted conversations");
            return None;
        }
        Err(err) => {
            warn!(slot, error = %err, "Failed to read persisted conversations");
            return None;
        }
    };

    let decoded = match envelope::decode(&raw, config.persistence.version) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!(slot, bytes = raw.len(), error = %err, "Ignoring malformed persisted conversations");
            return None;
        }
    };

    let Some(restored) = normalize(decoded, config.max_conversations) else {
        debug!(slot, "Persisted state held no conversations");
        return None;
    };
    info!(slot, conversations = restored.len(), "Restored conversations");
    Some(restored)
}

/// Make a deserialized snapshot safe to use as live state.
///
/// Clears `typing` flags left over from an interrupted session, recomputes
/// every token aggregate, drops conversations whose id was already seen and
/// keeps at most `max_conversations`. Returns `None` if nothing remains.
#[must_use]
pub fn normalize(snapshot: ChatSnapshot, max_conversations: usize) -> Option<ChatSnapshot> {
    let mut seen = HashSet::new();
    let conversations: Vec<Arc<Conversation>> = snapshot
        .conversations
        .into_iter()
        .filter(|conversation| seen.insert(conversation.id.clone()))
        .take(max_conversations)
        .map(|conversation| Arc::new(settle(Arc::unwrap_or_clone(conversation))))
        .collect();

    if conversations.is_empty() {
        return None;
    }

    Some(ChatSnapshot {
        conversations,
        active_conversation_id: snapshot.active_conversation_id,
    })
}

fn settle(mut conversation: Conversation) -> Conversation {
    conversation.messages = conversation
        .messages
        .into_iter()
        .map(|message| {
            if message.typing {
                Arc::new(Message {
                    typing: false,
                    ..Arc::unwrap_or_clone(message)
                })
            } else {
                message
            }
        })
        .collect();
    conversation.cache_tokens_count = Conversation::sum_cache_tokens(&conversation.messages);
    conversation
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::store::core::config::ConversationDefaults;
    use crate::store::core::errors::StoreResult;
    use crate::store::core::ids::ConversationId;
    use crate::store::persistence::durable::MemoryDurableStorage;

    fn conversation(id: &str) -> Conversation {
        Conversation::new(
            ConversationId::from(id),
            &ConversationDefaults::default(),
            Utc::now(),
        )
    }

    fn snapshot_of(ids: &[&str]) -> ChatSnapshot {
        ChatSnapshot {
            conversations: ids.iter().map(|id| Arc::new(conversation(id))).collect(),
            active_conversation_id: ids.first().map(|id| ConversationId::from(*id)),
        }
    }

    #[test]
    fn test_normalize_repairs_aggregate_and_typing() {
        let mut broken = conversation("c0");
        broken.messages = vec![
            Arc::new(Message::user("a").with_cache_tokens(2)),
            Arc::new(Message::user("b").with_cache_tokens(7).typing(true)),
        ];
        broken.cache_tokens_count = 1000;

        let snapshot = ChatSnapshot::with_single(broken);
        let restored = normalize(snapshot, 20).unwrap_or_default();

        let conversation = &restored.conversations[0];
        assert_eq!(conversation.cache_tokens_count, 9);
        assert!(conversation.messages.iter().all(|message| !message.typing));
        assert!(conversation.aggregate_is_consistent());
    }

    #[test]
    fn test_normalize_drops_duplicates_and_excess() {
        let restored = normalize(snapshot_of(&["a", "b", "a", "c", "d"]), 3).unwrap_or_default();
        let ids: Vec<&str> = restored
            .conversation_ids()
            .into_iter()
            .map(ConversationId::as_str)
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(restored.active_conversation_id, Some(ConversationId::from("a")));
    }

    #[test]
    fn test_normalize_empty_yields_none() {
        assert!(normalize(ChatSnapshot::default(), 20).is_none());
    }

    #[tokio::test]
    async fn test_restore_reads_valid_slot() -> StoreResult<()> {
        let storage = MemoryDurableStorage::new();
        let config = StoreConfig::default();
        storage
            .write("app-chats", envelope::encode(&snapshot_of(&["x", "y"]), 0)?)
            .await?;

        let restored = restore_snapshot(&storage, &config).await;
        assert_eq!(restored.map(|snapshot| snapshot.len()), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_falls_back_silently() -> StoreResult<()> {
        let storage = MemoryDurableStorage::new();
        let config = StoreConfig::default();
        assert!(restore_snapshot(&storage, &config).await.is_none());

        storage.write("app-chats", "not json".to_string()).await?;
        assert!(restore_snapshot(&storage, &config).await.is_none());

        storage
            .write("app-chats", envelope::encode(&snapshot_of(&["x"]), 7)?)
            .await?;
        assert!(restore_snapshot(&storage, &config).await.is_none());

        storage
            .write("app-chats", envelope::encode(&ChatSnapshot::default(), 0)?)
            .await?;
        assert!(restore_snapshot(&storage, &config).await.is_none());
        Ok(())
    }
}
