//! High-level runtime orchestrator.
//!
//! The runtime owns the autosave worker, the shared catalog and the event
//! bus, and hands out [`CharacterSession`]s for individual characters. While
//! any session for a character is alive, every `open` of that id joins it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use sheet_content::ContentFactory;
use sheet_core::{CharacterId, CharacterState, SheetConfig, TraitCatalog};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::{Result, RuntimeError, SaveHandle};
use crate::config::RuntimeConfig;
use crate::document::CharacterDocument;
use crate::events::{Event, EventBus, Topic};
use crate::repository::{
    CharacterRepository, FileCharacterRepository, RepositoryError, new_character_id,
};
use crate::session::CharacterSession;
use crate::workers::{AutosaveWorker, Command};

/// Main runtime that serves character sessions
///
/// Design: Runtime owns the worker and coordinates sessions.
/// [`SaveHandle`] and [`CharacterSession`] are cloneable façades for clients.
pub struct SheetRuntime {
    catalog: Arc<TraitCatalog>,
    sheet_config: Arc<SheetConfig>,
    repository: Arc<dyn CharacterRepository>,
    events: EventBus,
    saves: SaveHandle,
    /// Live character cells, keyed by id. Dropped sessions leave dead entries.
    sessions: RwLock<HashMap<CharacterId, Weak<Mutex<CharacterState>>>>,

    autosave_handle: JoinHandle<()>,
}

impl SheetRuntime {
    /// Create a new runtime builder
    pub fn builder() -> SheetRuntimeBuilder {
        SheetRuntimeBuilder::new()
    }

    pub fn catalog(&self) -> &TraitCatalog {
        &self.catalog
    }

    pub fn sheet_config(&self) -> &SheetConfig {
        &self.sheet_config
    }

    pub fn repository(&self) -> &Arc<dyn CharacterRepository> {
        &self.repository
    }

    pub fn saves(&self) -> SaveHandle {
        self.saves.clone()
    }

    /// Subscribe to events from a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.events.subscribe(topic)
    }

    /// Creates and stores a new character.
    ///
    /// Attributes start at their catalog minimum; the character is written
    /// immediately so it shows up in listings.
    pub fn create_character(&self, name: &str, clan: Option<&str>) -> Result<CharacterSession> {
        let mut state = CharacterState::from_catalog(name, &self.catalog);
        state.set_clan(clan);
        if let Some(clan) = state.clan()
            && self.catalog.clan(clan).is_none()
        {
            warn!("Clan '{}' is not in the catalog; disciplines price out-of-clan", clan);
        }

        let id = new_character_id();
        state.set_id(id.clone());
        self.repository.save(&state)?;
        info!("Created character[{}] '{}'", id, name);

        let cell = self.register(&id, state)?;
        Ok(self.session(id, cell))
    }

    /// Opens a stored character.
    ///
    /// If a session for `id` is still alive, the new one shares its state
    /// instead of reloading from the store.
    pub fn open(&self, id: &CharacterId) -> Result<CharacterSession> {
        if let Some(cell) = self.live(id)? {
            return Ok(self.session(id.clone(), cell));
        }

        let state = self
            .repository
            .load(id)?
            .ok_or_else(|| RuntimeError::CharacterNotFound(id.clone()))?;
        let cell = self.register(id, state)?;
        Ok(self.session(id.clone(), cell))
    }

    /// Imports a document, checking it against the catalog.
    ///
    /// A document without an id, or whose id is already taken, is stored
    /// under a fresh id unless `replace` is set. Replacing a character that
    /// has open sessions swaps their state in place.
    pub async fn import(
        &self,
        document: CharacterDocument,
        replace: bool,
    ) -> Result<CharacterSession> {
        let mut state = document.into_state_checked(&self.catalog)?;

        let id = match state.id().cloned() {
            Some(id) if replace || !self.repository.exists(&id) => id,
            _ => new_character_id(),
        };
        state.set_id(id.clone());
        self.repository.save(&state)?;
        info!("Imported character[{}] '{}'", id, state.name());

        let cell = match self.live(&id)? {
            Some(cell) => {
                {
                    let mut current = cell.lock().await;
                    *current = state.clone();
                    // A save queued before the swap would overwrite the import.
                    self.saves.schedule_save(state).await?;
                }
                cell
            }
            None => self.register(&id, state)?,
        };
        Ok(self.session(id, cell))
    }

    pub fn list(&self) -> Result<Vec<CharacterId>> {
        Ok(self.repository.list_ids()?)
    }

    /// Removes a character from the store.
    ///
    /// A pending autosave for it is dropped first so the worker cannot write
    /// it back. Sessions still held by callers keep working on their copy and
    /// store it again on their next change.
    pub async fn delete(&self, id: &CharacterId) -> Result<()> {
        if !self.repository.exists(id) {
            return Err(RuntimeError::CharacterNotFound(id.clone()));
        }

        self.sessions
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?
            .remove(id);
        self.saves.forget(id.clone()).await?;

        self.repository.delete(id)?;
        info!("Deleted character[{}]", id);
        Ok(())
    }

    /// Write every pending autosave now.
    pub async fn flush(&self) -> Result<usize> {
        self.saves.flush().await
    }

    /// Shutdown the runtime gracefully, writing pending saves first
    pub async fn shutdown(self) -> Result<()> {
        self.saves.shutdown().await?;

        self.autosave_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }

    fn live(&self, id: &CharacterId) -> Result<Option<Arc<Mutex<CharacterState>>>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(sessions.get(id).and_then(Weak::upgrade))
    }

    /// Stores `state` as the shared cell for `id`, pruning dead entries.
    ///
    /// If another caller registered the same id first, its cell wins.
    fn register(
        &self,
        id: &CharacterId,
        state: CharacterState,
    ) -> Result<Arc<Mutex<CharacterState>>> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        if let Some(cell) = sessions.get(id).and_then(Weak::upgrade) {
            return Ok(cell);
        }

        sessions.retain(|_, cell| cell.strong_count() > 0);
        let cell = Arc::new(Mutex::new(state));
        sessions.insert(id.clone(), Arc::downgrade(&cell));
        Ok(cell)
    }

    fn session(&self, id: CharacterId, state: Arc<Mutex<CharacterState>>) -> CharacterSession {
        CharacterSession::new(
            id,
            state,
            Arc::clone(&self.catalog),
            Arc::clone(&self.sheet_config),
            self.events.clone(),
            self.saves.clone(),
        )
    }
}

/// Builder for [`SheetRuntime`] with flexible configuration.
pub struct SheetRuntimeBuilder {
    config: RuntimeConfig,
    catalog: Option<TraitCatalog>,
    sheet_config: Option<SheetConfig>,
    repository: Option<Arc<dyn CharacterRepository>>,
}

impl SheetRuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            catalog: None,
            sheet_config: None,
            repository: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this catalog instead of loading one from the data directory
    pub fn catalog(mut self, catalog: TraitCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Use these engine rules instead of loading `config.toml`
    pub fn sheet_config(mut self, sheet_config: SheetConfig) -> Self {
        self.sheet_config = Some(sheet_config);
        self
    }

    /// Use this store instead of the file store under the data directory
    pub fn repository(mut self, repository: Arc<dyn CharacterRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Build the runtime and start the autosave worker
    pub async fn build(self) -> Result<SheetRuntime> {
        let factory = ContentFactory::new(&self.config.data_dir);

        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => {
                let content = factory
                    .load_catalog()
                    .map_err(|e| RuntimeError::Content(e.to_string()))?;
                for fallback in &content.fallbacks {
                    warn!(
                        "Unreadable notation '{}' for {}:{} ({}), using 1-5",
                        fallback.raw, fallback.category, fallback.key, fallback.reason
                    );
                }
                content.catalog
            }
        };

        let mut sheet_config = match self.sheet_config {
            Some(sheet_config) => sheet_config,
            None => factory
                .load_config()
                .map_err(|e| RuntimeError::Content(e.to_string()))?,
        };
        if let Some(policy) = self.config.undo_policy {
            sheet_config.undo_policy = policy;
        }

        let repository: Arc<dyn CharacterRepository> = match self.repository {
            Some(repository) => repository,
            None => Arc::new(FileCharacterRepository::new(&self.config.data_dir)?),
        };

        let events = EventBus::with_capacity(self.config.event_buffer_size);
        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);

        let worker = AutosaveWorker::new(
            Arc::clone(&repository),
            events.clone(),
            command_rx,
            self.config.autosave_debounce,
        );
        let autosave_handle = tokio::spawn(async move {
            worker.run().await;
        });

        info!(
            "Sheet runtime ready: {} catalog entries, undo policy {}",
            catalog.len(),
            sheet_config.undo_policy
        );

        Ok(SheetRuntime {
            catalog: Arc::new(catalog),
            sheet_config: Arc::new(sheet_config),
            repository,
            events,
            saves: SaveHandle::new(command_tx),
            sessions: RwLock::new(HashMap::new()),
            autosave_handle,
        })
    }
}
