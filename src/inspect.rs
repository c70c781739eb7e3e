//! Startup helpers for the `chat-store` inspector binary.
//!
//! Opens the `SQLite` slot named by the environment and logs what it holds.

use std::process::ExitCode;

use crate::store::core::config::StoreConfig;
use crate::store::core::errors::StoreResult;
use crate::store::persistence;
use crate::telemetry::init_tracing;

/// Run the inspector.
///
/// With `--reset` as the first argument the stored conversations are
/// replaced by a single empty one before listing.
///
/// # Returns
/// `ExitCode::SUCCESS` on success, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();
    tracing::info!("Starting chat-store v{}", env!("CARGO_PKG_VERSION"));

    let reset = std::env::args().nth(1).is_some_and(|arg| arg == "--reset");
    let config = StoreConfig::from_env();
    tracing::info!("Database: {}", config.storage.sqlite_path.display());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(inspect_store(config, reset)) {
        tracing::error!("Inspection failed: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

async fn inspect_store(config: StoreConfig, reset: bool) -> StoreResult<()> {
    let (store, handle) = persistence::open_sqlite(config).await?;

    if reset {
        store.reset_conversations();
    }

    let active = store.active_conversation();
    tracing::info!(
        conversation_id = %active.id,
        title = active.display_title(&active.name),
        messages = active.messages.len(),
        cache_tokens = active.cache_tokens_count,
        missing = active.is_missing(),
        "Active conversation"
    );

    for summary in store.conversation_index() {
        tracing::info!(
            conversation_id = %summary.id,
            purpose = %summary.system_purpose_id,
            "{}",
            summary.name
        );
    }

    handle.shutdown().await
}
