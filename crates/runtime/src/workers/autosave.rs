//! Debounced autosave worker.
//!
//! Sessions send a full snapshot after every committed change. The worker
//! keeps only the newest snapshot per character and writes it once the
//! character has been quiet for the debounce window.
//!
//! # Guarantees
//!
//! - Last write wins: a newer snapshot replaces a pending one and restarts
//!   its debounce timer
//! - A snapshot whose document fingerprint matches the last successful write
//!   is skipped
//! - Failures are logged and published as [`PersistenceEvent::SaveFailed`];
//!   nothing is retried and the in-memory sheet is never rolled back
//! - `Flush` and shutdown write everything still pending
//! - `Forget` drops a deleted character's pending snapshot and fingerprint,
//!   so nothing writes it back

use std::collections::HashMap;
use std::sync::Arc;

use sheet_core::{CharacterId, CharacterState};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, sleep_until};
use tracing::{debug, error, info, warn};

use crate::document::CharacterDocument;
use crate::events::{EventBus, PersistenceEvent};
use crate::repository::CharacterRepository;
use crate::utils::hash;

/// Commands that can be sent to the autosave worker
pub enum Command {
    /// Queue a snapshot for a debounced write
    Save(Box<CharacterState>),

    /// Write every pending snapshot immediately
    Flush { reply: oneshot::Sender<usize> },

    /// Discard everything held for a character. Replies whether a snapshot was pending.
    Forget {
        id: CharacterId,
        reply: oneshot::Sender<bool>,
    },

    /// Write pending snapshots and stop
    Shutdown,
}

struct PendingSave {
    state: CharacterState,
    due: Instant,
}

/// Background worker that owns all character writes
pub struct AutosaveWorker {
    repository: Arc<dyn CharacterRepository>,
    events: EventBus,
    command_rx: mpsc::Receiver<Command>,
    debounce: Duration,

    pending: HashMap<CharacterId, PendingSave>,
    last_written: HashMap<CharacterId, String>,
}

impl AutosaveWorker {
    pub fn new(
        repository: Arc<dyn CharacterRepository>,
        events: EventBus,
        command_rx: mpsc::Receiver<Command>,
        debounce: Duration,
    ) -> Self {
        Self {
            repository,
            events,
            command_rx,
            debounce,
            pending: HashMap::new(),
            last_written: HashMap::new(),
        }
    }

    /// Main worker loop
    pub async fn run(mut self) {
        info!("AutosaveWorker started: debounce={:?}", self.debounce);

        loop {
            let next_due = self.pending.values().map(|pending| pending.due).min();

            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(Command::Save(state)) => self.schedule(*state),
                        Some(Command::Flush { reply }) => {
                            let written = self.write_all();
                            let _ = reply.send(written);
                        }
                        Some(Command::Forget { id, reply }) => {
                            let _ = reply.send(self.forget(&id));
                        }
                        Some(Command::Shutdown) => {
                            info!("Shutdown command received");
                            break;
                        }
                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }

                _ = wait_until(next_due) => {
                    self.write_due();
                }
            }
        }

        info!("Finalizing autosave worker...");
        let written = self.write_all();
        debug!("Final flush wrote {} character(s)", written);

        info!("AutosaveWorker stopped");
    }

    fn schedule(&mut self, state: CharacterState) {
        let Some(id) = state.id().cloned() else {
            warn!("Dropping snapshot of '{}': character has no id", state.name());
            return;
        };

        let due = Instant::now() + self.debounce;
        if self
            .pending
            .insert(id.clone(), PendingSave { state, due })
            .is_some()
        {
            debug!("Replaced pending save for character[{}]", id);
        }
    }

    fn forget(&mut self, id: &CharacterId) -> bool {
        let dropped = self.pending.remove(id).is_some();
        self.last_written.remove(id);
        if dropped {
            debug!("Dropped pending save for deleted character[{}]", id);
        }
        dropped
    }

    fn write_due(&mut self) -> usize {
        let now = Instant::now();
        let due: Vec<CharacterId> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.due <= now)
            .map(|(id, _)| id.clone())
            .collect();

        let mut written = 0;
        for id in due {
            if let Some(pending) = self.pending.remove(&id)
                && self.write(id, pending.state)
            {
                written += 1;
            }
        }
        written
    }

    fn write_all(&mut self) -> usize {
        let pending: Vec<(CharacterId, PendingSave)> = self.pending.drain().collect();

        let mut written = 0;
        for (id, pending) in pending {
            if self.write(id, pending.state) {
                written += 1;
            }
        }
        written
    }

    /// Writes one snapshot. Returns `true` when the repository was touched.
    fn write(&mut self, id: CharacterId, state: CharacterState) -> bool {
        let fingerprint = match CharacterDocument::from_state(&state).fingerprint() {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                error!("Failed to fingerprint character[{}]: {}", id, e);
                self.events.publish(PersistenceEvent::SaveFailed {
                    character: id,
                    error: e.to_string(),
                });
                return false;
            }
        };

        if self.last_written.get(&id) == Some(&fingerprint) {
            debug!(
                "Skipped unchanged character[{}] ({})",
                id,
                hash::short(&fingerprint)
            );
            return false;
        }

        match self.repository.save(&state) {
            Ok(_) => {
                debug!(
                    "Autosaved character[{}] ({})",
                    id,
                    hash::short(&fingerprint)
                );
                self.last_written.insert(id.clone(), fingerprint.clone());
                self.events.publish(PersistenceEvent::Saved {
                    character: id,
                    fingerprint,
                });
                true
            }
            Err(e) => {
                warn!("Failed to save character[{}]: {}", id, e);
                self.events.publish(PersistenceEvent::SaveFailed {
                    character: id,
                    error: e.to_string(),
                });
                false
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
