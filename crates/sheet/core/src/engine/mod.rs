//! Spend transactions.
//!
//! The [`SpendEngine`] is the only component that charges or refunds
//! experience. A purchase is priced through [`crate::pricing`], checked against
//! available XP, applied through the [`TraitLevelController`] and appended to
//! the history as a [`SpendRecord`]. Any failure leaves the character exactly
//! as it was.
//!
//! Persistence is not the engine's concern; callers schedule a save after a
//! successful call.

mod errors;

pub use errors::SpendError;

use crate::catalog::{TraitCatalog, TraitCategory, TraitEntry, normalize_key};
use crate::config::{SheetConfig, UndoPolicy};
use crate::controller::{Confirmation, ControllerError, LevelChange, TraitLevelController};
use crate::pricing::{self, PriceContext};
use crate::state::{CharacterState, InstanceId, PendingRecord, RecordId, SpendRecord};
use crate::view::SheetView;

/// Orchestrates purchases and undo against one character.
pub struct SpendEngine<'a> {
    catalog: &'a TraitCatalog,
    state: &'a mut CharacterState,
    config: &'a SheetConfig,
    view: Option<&'a mut dyn SheetView>,
}

impl<'a> SpendEngine<'a> {
    pub fn new(
        catalog: &'a TraitCatalog,
        state: &'a mut CharacterState,
        config: &'a SheetConfig,
    ) -> Self {
        Self {
            catalog,
            state,
            config,
            view: None,
        }
    }

    /// Attaches a view that is notified after every committed change.
    pub fn with_view(mut self, view: &'a mut dyn SheetView) -> Self {
        self.view = Some(view);
        self
    }

    pub fn state(&self) -> &CharacterState {
        self.state
    }

    /// Pricing context for `key`, derived from the character's clan.
    pub fn context_for(&self, category: TraitCategory, key: &str) -> PriceContext {
        PriceContext::for_trait(self.catalog, self.state.clan(), category, key)
    }

    /// Cost of buying `desired` without committing anything.
    ///
    /// For repeatable traits this is the price of a new instance.
    pub fn quote(
        &self,
        category: TraitCategory,
        key: &str,
        desired: u8,
        context: &PriceContext,
    ) -> Result<u32, SpendError> {
        let entry = self.purchasable_entry(category, key)?;
        let current = if entry.is_repeatable() {
            check_notation_level(entry, desired)?;
            0
        } else {
            check_level(entry, desired)?;
            self.state.level(category, &entry.key)
        };
        Ok(pricing::purchase_price(entry, current, desired, context)?)
    }

    /// Buys `desired` for a trait.
    ///
    /// A plain spend on a repeatable trait buys a new instance at `desired`.
    /// Zero-cost purchases are rejected with [`SpendError::InsufficientXp`].
    pub fn spend(
        &mut self,
        category: TraitCategory,
        key: &str,
        desired: u8,
        context: &PriceContext,
        confirmation: Confirmation,
    ) -> Result<SpendRecord, SpendError> {
        let entry = self.purchasable_entry(category, key)?;
        let cost = self.quote(category, key, desired, context)?;
        self.ensure_affordable(cost)?;

        let mut controller = TraitLevelController::new(self.catalog, self.state);
        let change = if entry.is_repeatable() {
            controller.add_instance(category, &entry.key, desired)?
        } else {
            controller.set_level(category, &entry.key, desired, confirmation)?
        };

        let record = self.charge(entry, &change, cost)?;
        self.notify(&change);
        Ok(record)
    }

    /// Raises one existing instance of a repeatable trait.
    pub fn spend_instance(
        &mut self,
        category: TraitCategory,
        key: &str,
        instance: InstanceId,
        desired: u8,
        context: &PriceContext,
    ) -> Result<SpendRecord, SpendError> {
        let entry = self.purchasable_entry(category, key)?;
        if !entry.is_repeatable() {
            return Err(ControllerError::NotRepeatable {
                category,
                key: entry.key.clone(),
            }
            .into());
        }
        check_notation_level(entry, desired)?;
        let current = self
            .state
            .instance(category, &entry.key, instance)
            .map(|i| i.level)
            .ok_or_else(|| ControllerError::InstanceNotFound {
                category,
                key: entry.key.clone(),
                instance,
            })?;

        let cost = pricing::purchase_price(entry, current, desired, context)?;
        self.ensure_affordable(cost)?;

        let change = TraitLevelController::new(self.catalog, self.state)
            .set_instance_level(category, &entry.key, instance, desired)?;
        let record = self.charge(entry, &change, cost)?;
        self.notify(&change);
        Ok(record)
    }

    /// Buys a specialty for a skill at the flat specialty price.
    ///
    /// The skill's level does not change; the record carries the specialty
    /// name with `from_level == to_level`.
    pub fn add_specialty(&mut self, skill: &str, name: &str) -> Result<SpendRecord, SpendError> {
        let entry = self
            .catalog
            .entry(TraitCategory::Skill, skill)
            .ok_or_else(|| SpendError::UnknownTrait {
                category: TraitCategory::Skill,
                key: normalize_key(skill),
            })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SpendError::EmptySpecialty {
                skill: entry.key.clone(),
            });
        }
        if self.state.has_specialty(&entry.key, name) {
            return Err(SpendError::DuplicateSpecialty {
                skill: entry.key.clone(),
                name: name.to_string(),
            });
        }

        let cost = pricing::dot_price(TraitCategory::Specialty, 1, &PriceContext::default())?;
        self.ensure_affordable(cost)?;

        let level = self.state.level(TraitCategory::Skill, &entry.key);
        self.state.push_specialty(&entry.key, name);
        let record = self.state.xp_mut().charge(PendingRecord {
            category: TraitCategory::Specialty,
            trait_key: entry.key.clone(),
            from_level: level,
            to_level: level,
            cost,
            note: format!("{} specialty: {name}", entry.name),
            specialty_name: Some(name.to_string()),
            instance: None,
        })?;
        self.notify_xp();
        Ok(record)
    }

    /// Reverses one history record and refunds its cost.
    ///
    /// The trait returns to `from_level`; a purchased instance or specialty is
    /// removed. Under [`UndoPolicy::MostRecentOnly`] only the latest record is
    /// accepted. A record that is no longer in history fails with
    /// [`SpendError::RecordNotFound`], so repeating an undo never refunds twice.
    pub fn undo(
        &mut self,
        id: RecordId,
        confirmation: Confirmation,
    ) -> Result<SpendRecord, SpendError> {
        let record = self
            .state
            .xp()
            .record(id)
            .cloned()
            .ok_or(SpendError::RecordNotFound(id))?;

        if self.config.undo_policy == UndoPolicy::MostRecentOnly {
            let latest = self.state.xp().latest().map(|latest| latest.id);
            if let Some(latest) = latest.filter(|latest| *latest != id) {
                return Err(SpendError::UndoOutOfOrder {
                    requested: id,
                    latest,
                });
            }
        }

        let change = self.reverse(&record, confirmation)?;
        let refunded = self
            .state
            .xp_mut()
            .refund(id)
            .ok_or(SpendError::RecordNotFound(id))?;
        match change {
            Some(change) => self.notify(&change),
            None => self.notify_xp(),
        }
        Ok(refunded)
    }

    fn reverse(
        &mut self,
        record: &SpendRecord,
        confirmation: Confirmation,
    ) -> Result<Option<LevelChange>, SpendError> {
        let category = record.category;
        let key = record.trait_key.as_str();

        if let Some(name) = &record.specialty_name {
            self.state.remove_specialty(key, name);
            return Ok(None);
        }

        let mut controller = TraitLevelController::new(self.catalog, self.state);
        let change = match record.instance {
            // A free edit may have removed the instance since the purchase; the
            // record is still refunded and nothing else on the sheet moves
            Some(instance) if record.from_level == 0 => {
                controller.remove_instance(category, key, instance).ok()
            }
            Some(instance) => controller
                .write_instance_level(category, key, instance, record.from_level)
                .ok(),
            None => Some(controller.restore_level(category, key, record.from_level, confirmation)?),
        };
        Ok(change)
    }

    fn purchasable_entry(
        &self,
        category: TraitCategory,
        key: &str,
    ) -> Result<&'a TraitEntry, SpendError> {
        if !category.is_purchasable() {
            return Err(SpendError::NotPurchasable(category));
        }
        self.catalog
            .entry(category, key)
            .ok_or_else(|| SpendError::UnknownTrait {
                category,
                key: normalize_key(key),
            })
    }

    fn ensure_affordable(&self, cost: u32) -> Result<(), SpendError> {
        let available = self.state.xp().available();
        if cost == 0 || cost > available {
            return Err(SpendError::insufficient(cost, available));
        }
        Ok(())
    }

    fn charge(
        &mut self,
        entry: &TraitEntry,
        change: &LevelChange,
        cost: u32,
    ) -> Result<SpendRecord, SpendError> {
        let note = format!("{} {} → {}", entry.name, change.from, change.to);
        let record = self.state.xp_mut().charge(PendingRecord {
            category: entry.category,
            trait_key: entry.key.clone(),
            from_level: change.from,
            to_level: change.to,
            cost,
            note,
            specialty_name: None,
            instance: change.instance,
        })?;
        Ok(record)
    }

    fn notify(&mut self, change: &LevelChange) {
        if let Some(view) = self.view.as_deref_mut() {
            view.apply_level_change(change);
        }
        self.notify_xp();
    }

    fn notify_xp(&mut self) {
        let summary = self.state.xp().summary();
        if let Some(view) = self.view.as_deref_mut() {
            view.xp_changed(summary);
        }
    }
}

fn check_level(entry: &TraitEntry, level: u8) -> Result<(), SpendError> {
    if entry.accepts_level(level) {
        return Ok(());
    }
    Err(SpendError::OutOfRange {
        category: entry.category,
        key: entry.key.clone(),
        level,
        min: entry.min_level(),
        max: entry.max_level(),
    })
}

fn check_notation_level(entry: &TraitEntry, level: u8) -> Result<(), SpendError> {
    if entry.notation.accepts(level) {
        return Ok(());
    }
    Err(SpendError::OutOfRange {
        category: entry.category,
        key: entry.key.clone(),
        level,
        min: entry.notation.min(),
        max: entry.notation.max(),
    })
}
