//! Derived read views over store snapshots.

pub mod active;
pub mod config_accessor;
pub mod index;

pub use active::resolve_active;
pub use config_accessor::{ActiveChatConfig, ActiveConfigAccessor, BoundConfigSetters};
pub use index::{conversation_index, ConversationSummary};
