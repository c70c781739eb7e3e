//! Serialized form of a snapshot in its durable slot.
//!
//! The slot holds `{"state": {"conversations": [...], "activeConversationId": ...}, "version": n}`.

use serde::{Deserialize, Serialize};

use crate::store::core::errors::{StoreError, StoreResult};
use crate::store::state::ChatSnapshot;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    state: &'a ChatSnapshot,
    version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    state: ChatSnapshot,
    version: u32,
}

/// Serialize `snapshot` under `version`.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn encode(snapshot: &ChatSnapshot, version: u32) -> StoreResult<String> {
    Ok(serde_json::to_string(&EnvelopeRef {
        state: snapshot,
        version,
    })?)
}

/// Parse a stored envelope, accepting only `expected` as its version.
///
/// # Errors
/// Returns an error if the value is malformed or has another version.
pub fn decode(raw: &str, expected: u32) -> StoreResult<ChatSnapshot> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    if envelope.version != expected {
        return Err(StoreError::VersionMismatch {
            found: envelope.version,
            expected,
        });
    }
    Ok(envelope.state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::store::core::config::{ConversationDefaults, StoreConfig};
    use crate::store::core::conversation::Conversation;
    use crate::store::core::ids::ConversationId;
    use crate::store::core::message::Message;
    use crate::store::engine::ConversationStore;

    fn snapshot() -> ChatSnapshot {
        let created = Utc.timestamp_millis_opt(1_700_000_000_000).single().unwrap_or_default();
        let conversation = Conversation::new(
            ConversationId::from("c0"),
            &ConversationDefaults::default(),
            created,
        );
        let mut message = Message::user("hi").with_id("m1").with_cache_tokens(3);
        // Whole milliseconds survive the round trip.
        message.created = created;
        let conversation = conversation.with_messages(vec![Arc::new(message)], created);
        ChatSnapshot::with_single(conversation)
    }

    #[test]
    fn test_encoded_layout() -> StoreResult<()> {
        let raw = encode(&snapshot(), 0)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;

        assert_eq!(value["version"], 0);
        assert_eq!(value["state"]["activeConversationId"], "c0");
        let conversation = &value["state"]["conversations"][0];
        assert_eq!(conversation["cacheTokensCount"], 3);
        assert_eq!(conversation["created"], 1_700_000_000_000_i64);
        assert_eq!(conversation["messages"][0]["role"], "user");
        assert_eq!(conversation["messages"][0]["sender"], "You");
        Ok(())
    }

    #[test]
    fn test_decode_accepts_matching_version() -> StoreResult<()> {
        let original = snapshot();
        let decoded = decode(&encode(&original, 2)?, 2)?;
        assert_eq!(decoded, original);
        Ok(())
    }

    #[test]
    fn test_live_snapshot_survives_unchanged() -> StoreResult<()> {
        let store = ConversationStore::new(StoreConfig::default())?;
        let created = store.create_conversation();
        store.add_message(created.clone(), Message::user("hi").with_cache_tokens(2));
        store.set_user_title(created, Some("Now".to_string()));

        let live = store.snapshot();
        assert_eq!(decode(&encode(&live, 0)?, 0)?, *live);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_other_version() -> StoreResult<()> {
        let raw = encode(&snapshot(), 1)?;
        assert!(matches!(
            decode(&raw, 0),
            Err(StoreError::VersionMismatch {
                found: 1,
                expected: 0
            })
        ));
        Ok(())
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode("{not json", 0),
            Err(StoreError::Serialization(_))
        ));
        assert!(decode(r#"{"state": 5, "version": 0}"#, 0).is_err());
    }
}
