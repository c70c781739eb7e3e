//! Durable key/value slots backing snapshot persistence.

use std::future::Future;
use std::pin::Pin;

use chrono::Utc;
use dashmap::DashMap;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::store::core::config::StorageConfig;
use crate::store::core::errors::StoreResult;

/// Boxed future type for durable storage operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Named slots holding one string value each.
pub trait DurableStorage: Send + Sync {
    /// Read a slot.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn read(&self, slot: &str) -> StoreFuture<'_, StoreResult<Option<String>>>;
    /// Overwrite a slot.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn write(&self, slot: &str, value: String) -> StoreFuture<'_, StoreResult<()>>;
    /// Remove a slot if present.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn remove(&self, slot: &str) -> StoreFuture<'_, StoreResult<()>>;
}

/// `SQLite` implementation of durable slots.
pub struct SqliteDurableStorage {
    conn: Connection,
    table: String,
}

impl SqliteDurableStorage {
    /// Open the database and create the slot table.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn new(config: &StorageConfig) -> StoreResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        let table = config.table.clone();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    slot TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl DurableStorage for SqliteDurableStorage {
    fn read(&self, slot: &str) -> StoreFuture<'_, StoreResult<Option<String>>> {
        let slot = slot.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let value = self
                .conn
                .call(move |conn| {
                    let value = conn
                        .query_row(
                            &format!("SELECT value FROM {table} WHERE slot = ?1"),
                            rusqlite::params![slot],
                            |row| row.get::<_, String>(0),
                        )
                        .optional()?;
                    Ok(value)
                })
                .await?;
            Ok(value)
        })
    }

    fn write(&self, slot: &str, value: String) -> StoreFuture<'_, StoreResult<()>> {
        let slot = slot.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let updated_at = Utc::now().timestamp_millis();

            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT OR REPLACE INTO {table} (slot, value, updated_at)
                             VALUES (?1, ?2, ?3)"
                        ),
                        rusqlite::params![slot, value, updated_at],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn remove(&self, slot: &str) -> StoreFuture<'_, StoreResult<()>> {
        let slot = slot.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!("DELETE FROM {table} WHERE slot = ?1"),
                        rusqlite::params![slot],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}

/// In-process slots, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryDurableStorage {
    slots: DashMap<String, String>,
}

impl MemoryDurableStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a slot, without going through a future.
    #[must_use]
    pub fn get(&self, slot: &str) -> Option<String> {
        self.slots.get(slot).map(|entry| entry.value().clone())
    }
}

impl DurableStorage for MemoryDurableStorage {
    fn read(&self, slot: &str) -> StoreFuture<'_, StoreResult<Option<String>>> {
        let value = self.get(slot);
        Box::pin(async move { StoreResult::Ok(value) })
    }

    fn write(&self, slot: &str, value: String) -> StoreFuture<'_, StoreResult<()>> {
        self.slots.insert(slot.to_string(), value);
        Box::pin(async { StoreResult::Ok(()) })
    }

    fn remove(&self, slot: &str) -> StoreFuture<'_, StoreResult<()>> {
        self.slots.remove(slot);
        Box::pin(async { StoreResult::Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn memory_config() -> StorageConfig {
        StorageConfig {
            sqlite_path: PathBuf::from(":memory:"),
            table: "durable_slots".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_slot_roundtrip() -> StoreResult<()> {
        let storage = SqliteDurableStorage::new(&memory_config()).await?;
        assert_eq!(storage.read("app-chats").await?, None);

        storage.write("app-chats", "first".to_string()).await?;
        storage.write("app-chats", "second".to_string()).await?;
        assert_eq!(storage.read("app-chats").await?.as_deref(), Some("second"));
        assert_eq!(storage.read("other").await?, None);

        storage.remove("app-chats").await?;
        assert_eq!(storage.read("app-chats").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_slot_roundtrip() -> StoreResult<()> {
        let storage = MemoryDurableStorage::new();
        storage.write("app-chats", "value".to_string()).await?;
        assert_eq!(storage.read("app-chats").await?.as_deref(), Some("value"));
        assert_eq!(storage.get("app-chats").as_deref(), Some("value"));

        storage.remove("app-chats").await?;
        assert!(storage.get("app-chats").is_none());
        Ok(())
    }
}
