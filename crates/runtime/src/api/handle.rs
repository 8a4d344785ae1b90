//! Cloneable façade for issuing commands to the autosave worker.
//!
//! [`SaveHandle`] hides channel plumbing. Scheduling only enqueues a snapshot;
//! the worker decides when it is written.
use tokio::sync::{mpsc, oneshot};

use sheet_core::{CharacterId, CharacterState};

use super::errors::{Result, RuntimeError};
use crate::workers::Command;

/// Client-facing handle to the save scheduler
#[derive(Clone)]
pub struct SaveHandle {
    command_tx: mpsc::Sender<Command>,
}

impl SaveHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>) -> Self {
        Self { command_tx }
    }

    /// Queue a snapshot for a debounced write.
    ///
    /// A newer snapshot of the same character replaces a pending one.
    pub async fn schedule_save(&self, state: CharacterState) -> Result<()> {
        self.command_tx
            .send(Command::Save(Box::new(state)))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }

    /// Write every pending snapshot now. Returns how many documents were written.
    pub async fn flush(&self) -> Result<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::Flush { reply: reply_tx })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Cancel any pending write for `id` and forget its last fingerprint.
    ///
    /// Returns once the worker has processed the request, so a repository
    /// delete issued afterwards cannot be undone by a queued snapshot.
    pub async fn forget(&self, id: CharacterId) -> Result<bool> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::Forget { id, reply: reply_tx })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }
}
