//! Snapshot persistence to a durable slot.

pub mod durable;
pub mod envelope;
pub mod restore;
pub mod writer;

use std::sync::Arc;

use tracing::info;

use crate::store::core::config::StoreConfig;
use crate::store::core::errors::StoreResult;
use crate::store::engine::ConversationStore;

pub use durable::{DurableStorage, MemoryDurableStorage, SqliteDurableStorage, StoreFuture};
pub use restore::{normalize, restore_snapshot};
pub use writer::{PersistenceHandle, PersistenceSink, SnapshotWriter};

/// Build a store backed by `storage`.
///
/// The persisted snapshot is restored before the store is returned, so no
/// mutation can race the restore. With persistence disabled in `config` the
/// storage is not touched and the returned handle is inert.
///
/// # Errors
/// Returns an error if the configuration is invalid. Storage failures only
/// lead to the default state.
pub async fn open(
    config: StoreConfig,
    storage: Arc<dyn DurableStorage>,
) -> StoreResult<(ConversationStore, PersistenceHandle)> {
    config.validate()?;

    if !config.persistence.enabled {
        info!("Persistence disabled, starting with default conversations");
        return Ok((ConversationStore::new(config)?, PersistenceHandle::disabled()));
    }

    let restored = restore_snapshot(storage.as_ref(), &config).await;
    let (sink, handle) = SnapshotWriter::spawn(storage, &config.persistence);

    let mut builder = ConversationStore::builder(config).sink(Arc::new(sink));
    if let Some(snapshot) = restored {
        builder = builder.initial(snapshot);
    }
    Ok((builder.build()?, handle))
}

/// Open the `SQLite` storage named in `config` and build a store on it.
///
/// # Errors
/// Returns an error if the configuration is invalid or the database cannot
/// be opened.
pub async fn open_sqlite(config: StoreConfig) -> StoreResult<(ConversationStore, PersistenceHandle)> {
    config.validate()?;
    let storage = SqliteDurableStorage::new(&config.storage).await?;
    open(config, Arc::new(storage)).await
}
