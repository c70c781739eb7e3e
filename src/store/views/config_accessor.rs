//! Read and write the active conversation's purpose and model.

use std::sync::Arc;

use tracing::debug;

use crate::store::core::conversation::MISSING_CONVERSATION_ID;
use crate::store::core::ids::{ChatModelId, ConversationId, SystemPurposeId};
use crate::store::engine::ConversationStore;
use crate::store::views::active::resolve_active;

/// Configuration setters bound to one conversation.
///
/// The binding is fixed at creation: after the active conversation changes,
/// these setters keep writing to the conversation they were derived for.
pub struct BoundConfigSetters {
    store: ConversationStore,
    conversation_id: ConversationId,
}

impl BoundConfigSetters {
    /// Conversation the setters write to.
    #[must_use]
    pub const fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Change the bound conversation's purpose.
    pub fn set_system_purpose_id(&self, purpose_id: impl Into<SystemPurposeId>) {
        self.store
            .set_system_purpose_id(self.conversation_id.clone(), purpose_id);
    }

    /// Change the bound conversation's model.
    pub fn set_chat_model_id(&self, model_id: impl Into<ChatModelId>) {
        self.store
            .set_chat_model_id(self.conversation_id.clone(), model_id);
    }
}

/// The active conversation's configuration together with its setters.
#[derive(Clone)]
pub struct ActiveChatConfig {
    /// Purpose of the active conversation.
    pub system_purpose_id: SystemPurposeId,
    /// Model of the active conversation.
    pub chat_model_id: ChatModelId,
    /// Setters bound to the active id.
    pub setters: Arc<BoundConfigSetters>,
}

/// Produces [`ActiveChatConfig`] values, reusing the same setters for as long
/// as the active id stays the same.
pub struct ActiveConfigAccessor {
    store: ConversationStore,
    setters: Option<Arc<BoundConfigSetters>>,
}

impl ActiveConfigAccessor {
    /// Create an accessor over `store`.
    #[must_use]
    pub const fn new(store: ConversationStore) -> Self {
        Self {
            store,
            setters: None,
        }
    }

    /// Configuration of the active conversation right now.
    ///
    /// An unset or dangling active id reads the placeholder's values; its
    /// setters are bound to that id and therefore change nothing.
    pub fn current(&mut self) -> ActiveChatConfig {
        let snapshot = self.store.snapshot();
        let active = resolve_active(&snapshot);
        let bound_id = snapshot
            .active_conversation_id
            .clone()
            .unwrap_or_else(|| ConversationId::from(MISSING_CONVERSATION_ID));

        ActiveChatConfig {
            system_purpose_id: active.system_purpose_id.clone(),
            chat_model_id: active.chat_model_id.clone(),
            setters: self.setters_for(bound_id),
        }
    }

    fn setters_for(&mut self, conversation_id: ConversationId) -> Arc<BoundConfigSetters> {
        if let Some(setters) = self
            .setters
            .as_ref()
            .filter(|setters| setters.conversation_id == conversation_id)
        {
            return Arc::clone(setters);
        }

        debug!(conversation_id = %conversation_id, "Binding config setters");
        let setters = Arc::new(BoundConfigSetters {
            store: self.store.clone(),
            conversation_id,
        });
        self.setters = Some(Arc::clone(&setters));
        setters
    }
}

impl ConversationStore {
    /// Accessor for the active conversation's configuration.
    #[must_use]
    pub fn active_config(&self) -> ActiveConfigAccessor {
        ActiveConfigAccessor::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::core::config::StoreConfig;
    use crate::store::core::errors::StoreResult;

    #[test]
    fn test_reads_active_configuration() -> StoreResult<()> {
        let store = ConversationStore::new(StoreConfig::default())?;
        let config = store.active_config().current();
        assert_eq!(config.system_purpose_id.as_str(), "Generic");
        assert_eq!(config.chat_model_id.as_str(), "gpt-4");
        assert_eq!(config.setters.conversation_id(), &store.active_conversation().id);
        Ok(())
    }

    #[test]
    fn test_setters_write_and_are_reused() -> StoreResult<()> {
        let store = ConversationStore::new(StoreConfig::default())?;
        let mut accessor = store.active_config();

        let first = accessor.current();
        first.setters.set_chat_model_id("gpt-4o");
        first.setters.set_system_purpose_id("Developer");

        let second = accessor.current();
        assert_eq!(second.chat_model_id.as_str(), "gpt-4o");
        assert_eq!(second.system_purpose_id.as_str(), "Developer");
        assert!(Arc::ptr_eq(&first.setters, &second.setters));
        Ok(())
    }

    #[test]
    fn test_setters_rebind_when_active_changes() -> StoreResult<()> {
        let store = ConversationStore::new(StoreConfig::default())?;
        let original = store.active_conversation().id.clone();
        let mut accessor = store.active_config();
        let before = accessor.current();

        let created = store.create_conversation();
        let after = accessor.current();
        assert!(!Arc::ptr_eq(&before.setters, &after.setters));
        assert_eq!(after.setters.conversation_id(), &created);

        // Old setters still target the conversation they were bound to.
        before.setters.set_chat_model_id("claude");
        let snapshot = store.snapshot();
        let model = snapshot
            .conversation(&original)
            .map(|c| c.chat_model_id.to_string());
        assert_eq!(model.as_deref(), Some("claude"));
        assert_eq!(store.active_conversation().chat_model_id.as_str(), "gpt-4");
        Ok(())
    }

    #[test]
    fn test_dangling_active_reads_placeholder() -> StoreResult<()> {
        let store = ConversationStore::new(StoreConfig::default())?;
        store.set_active_conversation_id("nowhere");
        let config = store.active_config().current();
        assert_eq!(config.setters.conversation_id().as_str(), "nowhere");
        assert_eq!(config.system_purpose_id.as_str(), "Generic");

        let before = store.snapshot();
        config.setters.set_chat_model_id("ignored");
        assert_eq!(before.conversations, store.snapshot().conversations);
        Ok(())
    }
}
