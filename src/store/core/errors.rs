//! Error types for the conversation store.

use thiserror::Error;

/// Conversation store error type.
///
/// Mutations on the in-memory store never fail; these errors come from
/// configuration checks and the durable storage boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Persisted state was written with another envelope version.
    #[error("persisted version {found} does not match expected {expected}")]
    VersionMismatch {
        /// Version found in storage.
        found: u32,
        /// Version this store reads and writes.
        expected: u32,
    },
    /// The background persistence writer is no longer running.
    #[error("persistence writer has shut down")]
    PersistenceClosed,
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_convert() {
        let sqlite = StoreError::from(tokio_rusqlite::Error::from(rusqlite::Error::InvalidQuery));
        assert!(matches!(sqlite, StoreError::TokioSqlite(_)));

        let json = serde_json::from_str::<u32>("x").map_err(StoreError::from);
        assert!(matches!(json, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_version_mismatch_message() {
        let err = StoreError::VersionMismatch {
            found: 3,
            expected: 0,
        };
        assert_eq!(
            err.to_string(),
            "persisted version 3 does not match expected 0"
        );
    }
}
