//! Background task writing snapshots to durable storage.
//!
//! The store hands every new snapshot to a [`PersistenceSink`], which only
//! enqueues it. A single writer task serializes and stores the snapshots in
//! order. When several are queued, only the newest one is written, since
//! each snapshot is the complete state.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::core::config::PersistenceConfig;
use crate::store::core::errors::{StoreError, StoreResult};
use crate::store::engine::SnapshotSink;
use crate::store::persistence::durable::DurableStorage;
use crate::store::persistence::envelope;
use crate::store::state::ChatSnapshot;

enum WriterCommand {
    Write(Arc<ChatSnapshot>),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Store sink that queues snapshots for the writer task.
pub struct PersistenceSink {
    commands: mpsc::UnboundedSender<WriterCommand>,
}

impl SnapshotSink for PersistenceSink {
    fn snapshot_changed(&self, snapshot: &Arc<ChatSnapshot>) {
        if self
            .commands
            .send(WriterCommand::Write(Arc::clone(snapshot)))
            .is_err()
        {
            debug!("Persistence writer stopped, snapshot not persisted");
        }
    }
}

/// Control handle of the writer task.
pub struct PersistenceHandle {
    commands: Option<mpsc::UnboundedSender<WriterCommand>>,
    task: Option<JoinHandle<()>>,
}

impl PersistenceHandle {
    /// Handle for a store without persistence; every call succeeds at once.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            commands: None,
            task: None,
        }
    }

    /// Whether a writer task is attached.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.commands.is_some()
    }

    /// Wait until every snapshot queued so far has been handled.
    ///
    /// # Errors
    /// Returns [`StoreError::PersistenceClosed`] if the writer has stopped.
    pub async fn flush(&self) -> StoreResult<()> {
        let Some(commands) = &self.commands else {
            return Ok(());
        };
        let (done, wait) = oneshot::channel();
        commands
            .send(WriterCommand::Flush(done))
            .map_err(|_| StoreError::PersistenceClosed)?;
        wait.await.map_err(|_| StoreError::PersistenceClosed)
    }

    /// Write what is queued, then stop the writer task.
    ///
    /// Snapshots produced afterwards are dropped.
    ///
    /// # Errors
    /// Returns [`StoreError::PersistenceClosed`] if the writer had already
    /// stopped or its task failed.
    pub async fn shutdown(mut self) -> StoreResult<()> {
        let Some(commands) = self.commands.take() else {
            return Ok(());
        };
        let (done, wait) = oneshot::channel();
        commands
            .send(WriterCommand::Shutdown(done))
            .map_err(|_| StoreError::PersistenceClosed)?;
        wait.await.map_err(|_| StoreError::PersistenceClosed)?;

        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            warn!(?err, "Persistence writer task failed");
            return Err(StoreError::PersistenceClosed);
        }
        Ok(())
    }
}

/// Writer task state.
pub struct SnapshotWriter {
    storage: Arc<dyn DurableStorage>,
    slot: String,
    version: u32,
    commands: mpsc::UnboundedReceiver<WriterCommand>,
}

impl SnapshotWriter {
    /// Spawn the writer on the current tokio runtime.
    ///
    /// Returns the sink to register on the store and the handle controlling
    /// the task.
    #[must_use]
    pub fn spawn(
        storage: Arc<dyn DurableStorage>,
        config: &PersistenceConfig,
    ) -> (PersistenceSink, PersistenceHandle) {
        let (sender, commands) = mpsc::unbounded_channel();
        let writer = Self {
            storage,
            slot: config.slot.clone(),
            version: config.version,
            commands,
        };
        let task = tokio::spawn(async move {
            writer.run().await;
        });

        (
            PersistenceSink {
                commands: sender.clone(),
            },
            PersistenceHandle {
                commands: Some(sender),
                task: Some(task),
            },
        )
    }

    async fn run(mut self) {
        info!(slot = %self.slot, "Starting persistence writer");
        let mut next = self.commands.recv().await;

        while let Some(command) = next.take() {
            match command {
                WriterCommand::Write(snapshot) => {
                    let (latest, following) = self.coalesce(snapshot);
                    self.write(&latest).await;
                    if following.is_some() {
                        next = following;
                        continue;
                    }
                }
                WriterCommand::Flush(done) => {
                    let _ = done.send(());
                }
                WriterCommand::Shutdown(done) => {
                    info!(slot = %self.slot, "Persistence writer shutting down");
                    let _ = done.send(());
                    return;
                }
            }
            next = self.commands.recv().await;
        }
        debug!(slot = %self.slot, "Persistence writer channel closed");
    }

    /// Skip over queued writes to the newest one, stopping at the first
    /// command of another kind.
    fn coalesce(
        &mut self,
        mut snapshot: Arc<ChatSnapshot>,
    ) -> (Arc<ChatSnapshot>, Option<WriterCommand>) {
        while let Ok(queued) = self.commands.try_recv() {
            match queued {
                WriterCommand::Write(newer) => snapshot = newer,
                other => return (snapshot, Some(other)),
            }
        }
        (snapshot, None)
    }

    async fn write(&self, snapshot: &ChatSnapshot) {
        let raw = match envelope::encode(snapshot, self.version) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(slot = %self.slot, error = %err, "Failed to serialize conversations");
                return;
            }
        };

        let bytes = raw.len();
        match self.storage.write(&self.slot, raw).await {
            Ok(()) => debug!(slot = %self.slot, bytes, "Persisted conversations"),
            Err(err) => warn!(slot = %self.slot, error = %err, "Failed to persist conversations"),
        }
    }
}
