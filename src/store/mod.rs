//! Conversation store for chat sessions.
//!
//! This module is organized into:
//! - `core`: Configuration, errors, IDs, messages and conversations
//! - `state`: Immutable snapshots, actions and the transition function
//! - `engine`: The observable store container and its selectors
//! - `views`: Active conversation, conversation index and config accessor
//! - `persistence`: Durable slots, the snapshot envelope and the writer task

pub mod core;
pub mod engine;
pub mod persistence;
pub mod state;
pub mod views;

// Re-export commonly used types for convenience
pub use core::{
    ChatModelId, Conversation, ConversationDefaults, ConversationId, MISSING_CONVERSATION_ID,
    Message, MessageId, MessagePatch, PersistenceConfig, Role, SENDER_BOT, SENDER_USER,
    StorageConfig, StoreConfig, StoreError, StoreResult, SystemPurposeId,
};
pub use engine::{ConversationStore, Selector, SnapshotSink, StoreBuilder};
pub use persistence::{
    DurableStorage, MemoryDurableStorage, PersistenceHandle, SqliteDurableStorage, open,
    open_sqlite,
};
pub use state::{ChatAction, ChatSnapshot, Transition};
pub use views::{
    ActiveChatConfig, ActiveConfigAccessor, BoundConfigSetters, ConversationSummary,
    conversation_index, resolve_active,
};
