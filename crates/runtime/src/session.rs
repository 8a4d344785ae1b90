//! Serialized access to one character.
//!
//! A [`CharacterSession`] holds the character behind an async mutex. The
//! runtime hands every session for one character the same mutex, and every
//! operation locks it for the whole transaction, so two purchases on the same
//! character never interleave. A change hands its snapshot to the autosave
//! worker before the lock is released, then the session publishes sheet
//! events; neither step can fail the operation.

use std::sync::Arc;

use sheet_core::{
    AcquiredPower, CharacterId, CharacterState, Confirmation, ControllerError, InstanceId,
    LevelChange, RecordId, RecordingView, SheetConfig, SpendEngine, SpendError, SpendRecord,
    TraitCatalog, TraitCategory, TraitLevelController, XpSummary,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::{Result, SaveHandle};
use crate::document::CharacterDocument;
use crate::events::{EventBus, SheetEvent};

/// Handle to one open character. Clones share the same state.
#[derive(Clone)]
pub struct CharacterSession {
    id: CharacterId,
    state: Arc<Mutex<CharacterState>>,
    catalog: Arc<TraitCatalog>,
    config: Arc<SheetConfig>,
    events: EventBus,
    saves: SaveHandle,
}

impl CharacterSession {
    /// `state` is the character's shared cell; it must already carry its id.
    pub(crate) fn new(
        id: CharacterId,
        state: Arc<Mutex<CharacterState>>,
        catalog: Arc<TraitCatalog>,
        config: Arc<SheetConfig>,
        events: EventBus,
        saves: SaveHandle,
    ) -> Self {
        Self {
            id,
            state,
            catalog,
            config,
            events,
            saves,
        }
    }

    pub fn id(&self) -> &CharacterId {
        &self.id
    }

    pub fn catalog(&self) -> &TraitCatalog {
        &self.catalog
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> CharacterState {
        self.state.lock().await.clone()
    }

    pub async fn document(&self) -> CharacterDocument {
        CharacterDocument::from_state(&*self.state.lock().await)
    }

    pub async fn xp(&self) -> XpSummary {
        self.state.lock().await.xp().summary()
    }

    pub async fn history(&self) -> Vec<SpendRecord> {
        self.state.lock().await.xp().history().to_vec()
    }

    /// Price of buying `desired`, using the clan-derived discipline context.
    pub async fn quote(&self, category: TraitCategory, key: &str, desired: u8) -> Result<u32> {
        let mut state = self.state.lock().await;
        let engine = SpendEngine::new(&self.catalog, &mut state, &self.config);
        let context = engine.context_for(category, key);
        Ok(engine.quote(category, key, desired, &context)?)
    }

    /// Buys `desired` for a trait.
    pub async fn spend(
        &self,
        category: TraitCategory,
        key: &str,
        desired: u8,
        confirmation: Confirmation,
    ) -> Result<SpendRecord> {
        let (record, view, snapshot) = self
            .transact(|engine| {
                let context = engine.context_for(category, key);
                engine.spend(category, key, desired, &context, confirmation)
            })
            .await?;

        self.publish_changes(&view);
        self.events.publish(SheetEvent::XpSpent {
            character: self.id.clone(),
            record: record.clone(),
            xp: snapshot.xp().summary(),
        });
        Ok(record)
    }

    /// Raises one instance of a repeatable trait.
    pub async fn spend_instance(
        &self,
        category: TraitCategory,
        key: &str,
        instance: InstanceId,
        desired: u8,
    ) -> Result<SpendRecord> {
        let (record, view, snapshot) = self
            .transact(|engine| {
                let context = engine.context_for(category, key);
                engine.spend_instance(category, key, instance, desired, &context)
            })
            .await?;

        self.publish_changes(&view);
        self.events.publish(SheetEvent::XpSpent {
            character: self.id.clone(),
            record: record.clone(),
            xp: snapshot.xp().summary(),
        });
        Ok(record)
    }

    pub async fn add_specialty(&self, skill: &str, name: &str) -> Result<SpendRecord> {
        let (record, _view, snapshot) = self
            .transact(|engine| engine.add_specialty(skill, name))
            .await?;

        self.events.publish(SheetEvent::SpecialtyAdded {
            character: self.id.clone(),
            skill: record.trait_key.clone(),
            name: record.specialty_name.clone().unwrap_or_default(),
            record: record.id,
        });
        self.events.publish(SheetEvent::XpSpent {
            character: self.id.clone(),
            record: record.clone(),
            xp: snapshot.xp().summary(),
        });
        Ok(record)
    }

    /// Reverses a purchase and refunds it.
    pub async fn undo(&self, record: RecordId, confirmation: Confirmation) -> Result<SpendRecord> {
        let (undone, view, snapshot) = self
            .transact(|engine| engine.undo(record, confirmation))
            .await?;

        self.publish_changes(&view);
        self.events.publish(SheetEvent::SpendUndone {
            character: self.id.clone(),
            record: undone.clone(),
            xp: snapshot.xp().summary(),
        });
        Ok(undone)
    }

    /// Undoes the most recent purchase, if any.
    pub async fn undo_latest(&self, confirmation: Confirmation) -> Result<Option<SpendRecord>> {
        let latest = self.state.lock().await.xp().latest().map(|record| record.id);
        match latest {
            Some(id) => Ok(Some(self.undo(id, confirmation).await?)),
            None => Ok(None),
        }
    }

    /// Free edit of a trait level. No experience changes hands.
    pub async fn set_level(
        &self,
        category: TraitCategory,
        key: &str,
        level: u8,
        confirmation: Confirmation,
    ) -> Result<LevelChange> {
        self.edit(|controller| controller.set_level(category, key, level, confirmation))
            .await
    }

    /// Free edit: adds an instance of a repeatable trait.
    pub async fn add_instance(
        &self,
        category: TraitCategory,
        key: &str,
        level: u8,
    ) -> Result<LevelChange> {
        self.edit(|controller| controller.add_instance(category, key, level))
            .await
    }

    pub async fn set_instance_level(
        &self,
        category: TraitCategory,
        key: &str,
        instance: InstanceId,
        level: u8,
    ) -> Result<LevelChange> {
        self.edit(|controller| controller.set_instance_level(category, key, instance, level))
            .await
    }

    pub async fn remove_instance(
        &self,
        category: TraitCategory,
        key: &str,
        instance: InstanceId,
    ) -> Result<LevelChange> {
        self.edit(|controller| controller.remove_instance(category, key, instance))
            .await
    }

    pub async fn acquire_power(&self, discipline: &str, power: &str) -> Result<AcquiredPower> {
        let (acquired, _) = self
            .with_controller(|controller| controller.acquire_power(discipline, power))
            .await?;
        debug!(
            "Character[{}] acquired {} ({})",
            self.id, acquired.name, discipline
        );
        Ok(acquired)
    }

    pub async fn release_power(&self, discipline: &str, power: &str) -> Result<AcquiredPower> {
        let (released, _) = self
            .with_controller(|controller| controller.release_power(discipline, power))
            .await?;
        Ok(released)
    }

    /// Grants experience. Returns the new totals.
    pub async fn award_xp(&self, amount: u32) -> Result<XpSummary> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.award_xp(amount);
            self.commit(&state).await
        };
        let xp = snapshot.xp().summary();

        self.events.publish(SheetEvent::XpAwarded {
            character: self.id.clone(),
            amount,
            xp,
        });
        Ok(xp)
    }

    pub async fn rename(&self, name: &str) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.rename(name);
            self.commit(&state).await;
        }
        Ok(())
    }

    pub async fn set_clan(&self, clan: Option<&str>) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.set_clan(clan);
            self.commit(&state).await;
        }
        Ok(())
    }

    /// Queue the current state and write it immediately.
    pub async fn save_now(&self) -> Result<usize> {
        {
            let state = self.state.lock().await;
            self.saves.schedule_save(state.clone()).await?;
        }
        self.saves.flush().await
    }

    /// Runs one engine operation under the lock and queues the result.
    async fn transact<T, F>(&self, op: F) -> Result<(T, RecordingView, CharacterState)>
    where
        F: FnOnce(&mut SpendEngine<'_>) -> std::result::Result<T, SpendError>,
    {
        let mut state = self.state.lock().await;
        let mut view = RecordingView::new();
        let value = {
            let mut engine =
                SpendEngine::new(&self.catalog, &mut state, &self.config).with_view(&mut view);
            op(&mut engine)?
        };
        Ok((value, view, self.commit(&state).await))
    }

    async fn with_controller<T, F>(&self, op: F) -> Result<(T, CharacterState)>
    where
        F: FnOnce(&mut TraitLevelController<'_>) -> std::result::Result<T, ControllerError>,
    {
        let mut state = self.state.lock().await;
        let value = {
            let mut controller = TraitLevelController::new(&self.catalog, &mut state);
            op(&mut controller)?
        };
        Ok((value, self.commit(&state).await))
    }

    async fn edit<F>(&self, op: F) -> Result<LevelChange>
    where
        F: FnOnce(&mut TraitLevelController<'_>) -> std::result::Result<LevelChange, ControllerError>,
    {
        let (change, _) = self.with_controller(op).await?;
        self.events.publish(SheetEvent::LevelChanged {
            character: self.id.clone(),
            change: change.clone(),
        });
        Ok(change)
    }

    fn publish_changes(&self, view: &RecordingView) {
        for change in &view.changes {
            self.events.publish(SheetEvent::LevelChanged {
                character: self.id.clone(),
                change: change.clone(),
            });
        }
    }

    /// Hands a copy of `state` to the autosave worker.
    ///
    /// Callers hold the state lock, so snapshots reach the worker in commit
    /// order even when several sessions share the character.
    async fn commit(&self, state: &CharacterState) -> CharacterState {
        let snapshot = state.clone();
        if let Err(e) = self.saves.schedule_save(snapshot.clone()).await {
            warn!("Autosave unavailable for character[{}]: {}", self.id, e);
        }
        snapshot
    }
}
