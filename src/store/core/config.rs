//! Configuration for the conversation store.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::store::core::errors::{StoreError, StoreResult};
use crate::store::core::ids::{ChatModelId, SystemPurposeId};

/// Environment variable overriding [`StorageConfig::sqlite_path`].
pub const DB_PATH_ENV: &str = "CHAT_STORE_DB";

/// Top-level configuration for the conversation store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of conversations kept; adding beyond it evicts the oldest.
    pub max_conversations: usize,
    /// Values used when synthesizing a new default conversation.
    pub defaults: ConversationDefaults,
    /// Snapshot persistence settings.
    pub persistence: PersistenceConfig,
    /// Durable storage backend settings.
    pub storage: StorageConfig,
}

impl StoreConfig {
    /// Default capacity of the conversation list.
    pub const DEFAULT_MAX_CONVERSATIONS: usize = 20;

    /// Build the default configuration, taking the database path from
    /// `CHAT_STORE_DB` when set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        config
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> StoreResult<()> {
        if self.max_conversations == 0 {
            return Err(StoreError::InvalidConfig(
                "max_conversations must be > 0".to_string(),
            ));
        }

        if self.persistence.slot.trim().is_empty() {
            return Err(StoreError::InvalidConfig(
                "persistence.slot must not be empty".to_string(),
            ));
        }

        // The table name is interpolated into SQL statements.
        let table = &self.storage.table;
        let valid_table = !table.is_empty()
            && !table.starts_with(|c: char| c.is_ascii_digit())
            && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_table {
            return Err(StoreError::InvalidConfig(format!(
                "storage.table {table:?} must be a plain identifier"
            )));
        }

        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_conversations: Self::DEFAULT_MAX_CONVERSATIONS,
            defaults: ConversationDefaults::default(),
            persistence: PersistenceConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Settings applied to freshly created conversations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationDefaults {
    /// Purpose assigned to new conversations.
    pub system_purpose_id: SystemPurposeId,
    /// Model assigned to new conversations.
    pub chat_model_id: ChatModelId,
    /// Prefix of the generated conversation name.
    pub name_prefix: String,
}

impl Default for ConversationDefaults {
    fn default() -> Self {
        Self {
            system_purpose_id: SystemPurposeId::from("Generic"),
            chat_model_id: ChatModelId::from("gpt-4"),
            name_prefix: "Conversation".to_string(),
        }
    }
}

/// Snapshot persistence settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Whether snapshots are written to durable storage at all.
    pub enabled: bool,
    /// Name of the durable slot holding the serialized state.
    pub slot: String,
    /// Envelope version; stored state with another version is ignored.
    pub version: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            slot: "app-chats".to_string(),
            version: 0,
        }
    }
}

/// Storage configuration for the `SQLite` durable slot backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Key/value table name.
    pub table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("chat_store.sqlite"),
            table: "durable_slots".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.max_conversations, 20);
        assert_eq!(config.persistence.slot, "app-chats");
        assert!(config.persistence.enabled);
        assert_eq!(config.defaults.system_purpose_id.as_str(), "Generic");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = StoreConfig::default();
        config.max_conversations = 0;
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unsafe_table_name() {
        let mut config = StoreConfig::default();
        config.storage.table = "slots; DROP TABLE x".to_string();
        assert!(config.validate().is_err());

        config.storage.table = "1slots".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_slot() {
        let mut config = StoreConfig::default();
        config.persistence.slot = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
