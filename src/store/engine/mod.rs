//! The observable store container.

pub mod store;

pub use store::{ConversationStore, Selector, SnapshotSink, StoreBuilder};
