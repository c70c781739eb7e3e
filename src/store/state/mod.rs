//! Immutable state snapshots and the transitions between them.

pub mod actions;
pub mod cow;
pub mod snapshot;

pub use actions::{ChatAction, Transition};
pub use snapshot::ChatSnapshot;
