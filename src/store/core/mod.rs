//! Core conversation types and identifiers.

pub mod clock;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod ids;
pub mod message;

pub use clock::now_millis;
pub use config::{ConversationDefaults, PersistenceConfig, StorageConfig, StoreConfig};
pub use conversation::{Conversation, MISSING_CONVERSATION_ID};
pub use errors::{StoreError, StoreResult};
pub use ids::{ChatModelId, ConversationId, MessageId, SystemPurposeId};
pub use message::{Message, MessagePatch, Role, SENDER_BOT, SENDER_USER};
