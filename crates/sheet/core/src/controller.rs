//! Trait level controller.
//!
//! Applies validated level changes to a [`CharacterState`] and enforces the
//! side effects that come with them: lowering a discipline strips the powers
//! it no longer supports, repeatable traits grow and shrink by instance, and a
//! trait dropping to zero becomes unowned.

use crate::catalog::{TraitCatalog, TraitCategory, TraitEntry, normalize_key};
use crate::error::{ErrorSeverity, SheetError};
use crate::state::{AcquiredPower, CharacterState, InstanceId, TraitId};

/// Whether the caller accepted a destructive side effect up front.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Confirmation {
    #[default]
    NotGiven,
    Granted,
}

impl Confirmation {
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

impl From<bool> for Confirmation {
    fn from(granted: bool) -> Self {
        if granted { Self::Granted } else { Self::NotGiven }
    }
}

/// Outcome of a committed (or planned) level change.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LevelChange {
    pub trait_id: TraitId,
    /// Set when the change targeted one instance of a repeatable trait.
    pub instance: Option<InstanceId>,
    pub from: u8,
    pub to: u8,
    /// Powers removed because their unlock level now exceeds `to`.
    pub powers_lost: Vec<AcquiredPower>,
}

impl LevelChange {
    pub fn is_removal(&self) -> bool {
        self.to == 0
    }
}

/// Errors returned by [`TraitLevelController`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("no {category} named '{key}' in the catalog")]
    UnknownTrait { category: TraitCategory, key: String },

    #[error("level {level} is outside {min}..={max} for {category} '{key}'")]
    OutOfRange {
        category: TraitCategory,
        key: String,
        level: u8,
        min: u8,
        max: u8,
    },

    #[error("lowering '{discipline}' removes {} acquired power(s)", .powers.len())]
    PowersWillBeLost {
        discipline: String,
        powers: Vec<AcquiredPower>,
    },

    #[error("{category} '{key}' is not repeatable")]
    NotRepeatable { category: TraitCategory, key: String },

    #[error("{category} '{key}' is repeatable; change one of its instances instead")]
    RepeatableRequiresInstance { category: TraitCategory, key: String },

    #[error("{category} '{key}' has no instance {instance}")]
    InstanceNotFound {
        category: TraitCategory,
        key: String,
        instance: InstanceId,
    },

    #[error("discipline '{discipline}' has no power '{power}'")]
    UnknownPower { discipline: String, power: String },

    #[error("'{power}' needs {discipline} {required}, character has {current}")]
    PowerLocked {
        discipline: String,
        power: String,
        required: u8,
        current: u8,
    },

    #[error("'{power}' is already acquired")]
    PowerAlreadyAcquired { discipline: String, power: String },
}

impl SheetError for ControllerError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::PowersWillBeLost { .. } => ErrorSeverity::Recoverable,
            Self::InstanceNotFound { .. } => ErrorSeverity::Internal,
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownTrait { .. } => "CONTROLLER_UNKNOWN_TRAIT",
            Self::OutOfRange { .. } => "CONTROLLER_OUT_OF_RANGE",
            Self::PowersWillBeLost { .. } => "CONTROLLER_POWERS_WILL_BE_LOST",
            Self::NotRepeatable { .. } => "CONTROLLER_NOT_REPEATABLE",
            Self::RepeatableRequiresInstance { .. } => "CONTROLLER_REPEATABLE_REQUIRES_INSTANCE",
            Self::InstanceNotFound { .. } => "CONTROLLER_INSTANCE_NOT_FOUND",
            Self::UnknownPower { .. } => "CONTROLLER_UNKNOWN_POWER",
            Self::PowerLocked { .. } => "CONTROLLER_POWER_LOCKED",
            Self::PowerAlreadyAcquired { .. } => "CONTROLLER_POWER_ALREADY_ACQUIRED",
        }
    }
}

/// Applies level changes to one character.
pub struct TraitLevelController<'a> {
    catalog: &'a TraitCatalog,
    state: &'a mut CharacterState,
}

impl<'a> TraitLevelController<'a> {
    pub fn new(catalog: &'a TraitCatalog, state: &'a mut CharacterState) -> Self {
        Self { catalog, state }
    }

    pub fn state(&self) -> &CharacterState {
        self.state
    }

    /// Validates a plain level change and reports what it would do.
    ///
    /// Nothing is written. `powers_lost` lists the powers the change would
    /// strip.
    pub fn plan_level(
        &self,
        category: TraitCategory,
        key: &str,
        level: u8,
    ) -> Result<LevelChange, ControllerError> {
        let entry = self.entry(category, key)?;
        if entry.is_repeatable() {
            return Err(ControllerError::RepeatableRequiresInstance {
                category,
                key: entry.key.clone(),
            });
        }
        check_level(entry, level)?;
        Ok(self.describe(category, &entry.key, level))
    }

    /// Replaces a trait level.
    ///
    /// Lowering a discipline below the unlock level of acquired powers fails
    /// with [`ControllerError::PowersWillBeLost`] unless confirmation was
    /// granted; in that case nothing changes. Level 0 removes the trait.
    pub fn set_level(
        &mut self,
        category: TraitCategory,
        key: &str,
        level: u8,
        confirmation: Confirmation,
    ) -> Result<LevelChange, ControllerError> {
        let planned = self.plan_level(category, key, level)?;
        self.commit(planned, confirmation)
    }

    /// Writes a level without catalog validation.
    ///
    /// Used by undo to return a trait to a level it legitimately held before,
    /// including 0 for traits that were bought from nothing.
    pub(crate) fn restore_level(
        &mut self,
        category: TraitCategory,
        key: &str,
        level: u8,
        confirmation: Confirmation,
    ) -> Result<LevelChange, ControllerError> {
        let planned = self.describe(category, &normalize_key(key), level);
        self.commit(planned, confirmation)
    }

    /// Buys a new independent instance of a repeatable trait.
    pub fn add_instance(
        &mut self,
        category: TraitCategory,
        key: &str,
        level: u8,
    ) -> Result<LevelChange, ControllerError> {
        let entry = self.repeatable_entry(category, key)?;
        check_instance_level(entry, level)?;
        let key = entry.key.clone();

        let instance = self.state.push_instance(category, &key, level);
        Ok(LevelChange {
            trait_id: TraitId::new(category, &key),
            instance: Some(instance),
            from: 0,
            to: level,
            powers_lost: Vec::new(),
        })
    }

    /// Changes the level of one existing instance.
    pub fn set_instance_level(
        &mut self,
        category: TraitCategory,
        key: &str,
        instance: InstanceId,
        level: u8,
    ) -> Result<LevelChange, ControllerError> {
        let entry = self.repeatable_entry(category, key)?;
        check_instance_level(entry, level)?;
        let key = entry.key.clone();
        self.write_instance_level(category, &key, instance, level)
    }

    pub(crate) fn write_instance_level(
        &mut self,
        category: TraitCategory,
        key: &str,
        instance: InstanceId,
        level: u8,
    ) -> Result<LevelChange, ControllerError> {
        let from = self
            .state
            .put_instance_level(category, key, instance, level)
            .ok_or_else(|| instance_not_found(category, key, instance))?;
        Ok(LevelChange {
            trait_id: TraitId::new(category, key),
            instance: Some(instance),
            from,
            to: level,
            powers_lost: Vec::new(),
        })
    }

    /// Deletes one instance; the trait disappears with its last instance.
    pub fn remove_instance(
        &mut self,
        category: TraitCategory,
        key: &str,
        instance: InstanceId,
    ) -> Result<LevelChange, ControllerError> {
        let key = normalize_key(key);
        let removed = self
            .state
            .take_instance(category, &key, instance)
            .ok_or_else(|| instance_not_found(category, &key, instance))?;
        Ok(LevelChange {
            trait_id: TraitId::new(category, &key),
            instance: Some(instance),
            from: removed.level,
            to: 0,
            powers_lost: Vec::new(),
        })
    }

    /// Selects a discipline power the character's current level unlocks.
    pub fn acquire_power(
        &mut self,
        discipline: &str,
        power: &str,
    ) -> Result<AcquiredPower, ControllerError> {
        let entry = self.entry(TraitCategory::Discipline, discipline)?;
        let definition = entry
            .power(power)
            .ok_or_else(|| ControllerError::UnknownPower {
                discipline: entry.key.clone(),
                power: power.trim().to_string(),
            })?;

        let current = self.state.level(TraitCategory::Discipline, &entry.key);
        if definition.level > current {
            return Err(ControllerError::PowerLocked {
                discipline: entry.key.clone(),
                power: definition.name.clone(),
                required: definition.level,
                current,
            });
        }
        if self.state.has_power(&entry.key, &definition.name) {
            return Err(ControllerError::PowerAlreadyAcquired {
                discipline: entry.key.clone(),
                power: definition.name.clone(),
            });
        }

        let acquired = AcquiredPower::new(definition.name.clone(), definition.level);
        self.state.insert_power(&entry.key, acquired.clone());
        Ok(acquired)
    }

    pub fn release_power(
        &mut self,
        discipline: &str,
        power: &str,
    ) -> Result<AcquiredPower, ControllerError> {
        let key = normalize_key(discipline);
        self.state
            .remove_power(&key, power)
            .ok_or_else(|| ControllerError::UnknownPower {
                discipline: key,
                power: power.trim().to_string(),
            })
    }

    fn entry(&self, category: TraitCategory, key: &str) -> Result<&'a TraitEntry, ControllerError> {
        self.catalog
            .entry(category, key)
            .ok_or_else(|| ControllerError::UnknownTrait {
                category,
                key: normalize_key(key),
            })
    }

    fn repeatable_entry(
        &self,
        category: TraitCategory,
        key: &str,
    ) -> Result<&'a TraitEntry, ControllerError> {
        let entry = self.entry(category, key)?;
        if !entry.is_repeatable() {
            return Err(ControllerError::NotRepeatable {
                category,
                key: entry.key.clone(),
            });
        }
        Ok(entry)
    }

    fn describe(&self, category: TraitCategory, key: &str, level: u8) -> LevelChange {
        let powers_lost = self
            .state
            .powers(key)
            .filter(|power| category == TraitCategory::Discipline && power.unlock_level > level)
            .cloned()
            .collect();
        LevelChange {
            trait_id: TraitId::new(category, key),
            instance: None,
            from: self.state.level(category, key),
            to: level,
            powers_lost,
        }
    }

    fn commit(
        &mut self,
        planned: LevelChange,
        confirmation: Confirmation,
    ) -> Result<LevelChange, ControllerError> {
        let TraitId { category, ref key } = planned.trait_id;
        if !planned.powers_lost.is_empty() && !confirmation.is_granted() {
            return Err(ControllerError::PowersWillBeLost {
                discipline: key.clone(),
                powers: planned.powers_lost,
            });
        }
        if category == TraitCategory::Discipline {
            self.state.strip_powers_above(key, planned.to);
        }
        self.state.put_level(category, key, planned.to);
        Ok(planned)
    }
}

fn check_level(entry: &TraitEntry, level: u8) -> Result<(), ControllerError> {
    if entry.accepts_level(level) {
        return Ok(());
    }
    Err(ControllerError::OutOfRange {
        category: entry.category,
        key: entry.key.clone(),
        level,
        min: entry.min_level(),
        max: entry.max_level(),
    })
}

fn check_instance_level(entry: &TraitEntry, level: u8) -> Result<(), ControllerError> {
    if entry.notation.accepts(level) {
        return Ok(());
    }
    Err(ControllerError::OutOfRange {
        category: entry.category,
        key: entry.key.clone(),
        level,
        min: entry.notation.min(),
        max: entry.notation.max(),
    })
}

fn instance_not_found(category: TraitCategory, key: &str, instance: InstanceId) -> ControllerError {
    ControllerError::InstanceNotFound {
        category,
        key: key.to_string(),
        instance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LevelNotation;

    fn catalog() -> TraitCatalog {
        TraitCatalog::from_parts(
            [
                TraitEntry::new(
                    TraitCategory::Attribute,
                    "Strength",
                    LevelNotation::Range { min: 1, max: 5 },
                ),
                TraitEntry::new(
                    TraitCategory::Discipline,
                    "Auspex",
                    LevelNotation::Range { min: 1, max: 5 },
                )
                .with_power("Heightened Senses", 1)
                .with_power("Premonition", 2)
                .with_power("Scry the Soul", 3),
                TraitEntry::new(
                    TraitCategory::Background,
                    "Allies",
                    LevelNotation::Repeatable { min: 1, max: 5 },
                ),
                TraitEntry::new(
                    TraitCategory::Merit,
                    "Iron Gullet",
                    LevelNotation::Fixed(3),
                ),
                TraitEntry::new(
                    TraitCategory::Flaw,
                    "Prey Exclusion",
                    LevelNotation::Fixed(1),
                ),
            ],
            [],
        )
        .unwrap()
    }

    fn auspex_three(catalog: &TraitCatalog) -> CharacterState {
        let mut state = CharacterState::from_catalog("Ada", catalog);
        let mut controller = TraitLevelController::new(catalog, &mut state);
        controller
            .set_level(TraitCategory::Discipline, "auspex", 3, Confirmation::NotGiven)
            .unwrap();
        controller.acquire_power("auspex", "Scry the Soul").unwrap();
        state
    }

    #[test]
    fn lowering_discipline_requires_confirmation() {
        let catalog = catalog();
        let mut state = auspex_three(&catalog);
        let before = state.clone();

        let mut controller = TraitLevelController::new(&catalog, &mut state);
        let err = controller
            .set_level(TraitCategory::Discipline, "auspex", 1, Confirmation::NotGiven)
            .unwrap_err();
        match err {
            ControllerError::PowersWillBeLost { powers, .. } => {
                assert_eq!(powers, vec![AcquiredPower::new("Scry the Soul", 3)]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(state, before);

        let mut controller = TraitLevelController::new(&catalog, &mut state);
        let change = controller
            .set_level(TraitCategory::Discipline, "auspex", 1, Confirmation::Granted)
            .unwrap();
        assert_eq!(change.from, 3);
        assert_eq!(change.to, 1);
        assert_eq!(change.powers_lost.len(), 1);
        assert_eq!(state.level(TraitCategory::Discipline, "auspex"), 1);
        assert_eq!(state.powers("auspex").count(), 0);
    }

    #[test]
    fn lowering_without_affected_powers_needs_no_confirmation() {
        let catalog = catalog();
        let mut state = auspex_three(&catalog);
        let mut controller = TraitLevelController::new(&catalog, &mut state);
        controller.release_power("auspex", "scry the soul").unwrap();
        controller
            .set_level(TraitCategory::Discipline, "auspex", 2, Confirmation::NotGiven)
            .unwrap();
        assert_eq!(state.level(TraitCategory::Discipline, "auspex"), 2);
    }

    #[test]
    fn discipline_drop_to_zero_unowns() {
        let catalog = catalog();
        let mut state = auspex_three(&catalog);
        let mut controller = TraitLevelController::new(&catalog, &mut state);
        let change = controller
            .set_level(TraitCategory::Discipline, "auspex", 0, Confirmation::Granted)
            .unwrap();
        assert!(change.is_removal());
        assert!(!state.owns(TraitCategory::Discipline, "auspex"));
    }

    #[test]
    fn out_of_range_levels_are_rejected() {
        let catalog = catalog();
        let mut state = CharacterState::from_catalog("Ada", &catalog);
        let mut controller = TraitLevelController::new(&catalog, &mut state);
        assert!(matches!(
            controller.set_level(TraitCategory::Attribute, "strength", 0, Confirmation::Granted),
            Err(ControllerError::OutOfRange { level: 0, min: 1, max: 5, .. })
        ));
        assert!(matches!(
            controller.set_level(TraitCategory::Attribute, "strength", 6, Confirmation::Granted),
            Err(ControllerError::OutOfRange { level: 6, .. })
        ));
        assert!(matches!(
            controller.set_level(TraitCategory::Merit, "iron_gullet", 2, Confirmation::Granted),
            Err(ControllerError::OutOfRange { .. })
        ));
        assert!(matches!(
            controller.set_level(TraitCategory::Skill, "occult", 1, Confirmation::Granted),
            Err(ControllerError::UnknownTrait { .. })
        ));
        assert_eq!(state.level(TraitCategory::Attribute, "strength"), 1);
    }

    #[test]
    fn flaws_set_directly() {
        let catalog = catalog();
        let mut state = CharacterState::new("Ada");
        let mut controller = TraitLevelController::new(&catalog, &mut state);
        controller
            .set_level(TraitCategory::Flaw, "prey_exclusion", 1, Confirmation::NotGiven)
            .unwrap();
        assert_eq!(state.level(TraitCategory::Flaw, "prey exclusion"), 1);
    }

    #[test]
    fn repeatable_instances_are_independent() {
        let catalog = catalog();
        let mut state = CharacterState::new("Ada");
        let mut controller = TraitLevelController::new(&catalog, &mut state);

        let first = controller
            .add_instance(TraitCategory::Background, "allies", 1)
            .unwrap()
            .instance
            .unwrap();
        let second = controller
            .add_instance(TraitCategory::Background, "allies", 2)
            .unwrap()
            .instance
            .unwrap();
        controller
            .set_instance_level(TraitCategory::Background, "allies", first, 4)
            .unwrap();
        assert_eq!(state.level(TraitCategory::Background, "allies"), 4);

        let mut controller = TraitLevelController::new(&catalog, &mut state);
        controller
            .remove_instance(TraitCategory::Background, "allies", first)
            .unwrap();
        assert_eq!(state.level(TraitCategory::Background, "allies"), 2);
        assert_eq!(state.instances(TraitCategory::Background, "allies").len(), 1);

        let mut controller = TraitLevelController::new(&catalog, &mut state);
        controller
            .remove_instance(TraitCategory::Background, "allies", second)
            .unwrap();
        assert!(!state.owns(TraitCategory::Background, "allies"));

        let mut controller = TraitLevelController::new(&catalog, &mut state);
        assert!(matches!(
            controller.remove_instance(TraitCategory::Background, "allies", second),
            Err(ControllerError::InstanceNotFound { .. })
        ));
    }

    #[test]
    fn instance_operations_require_repeatable_notation() {
        let catalog = catalog();
        let mut state = CharacterState::new("Ada");
        let mut controller = TraitLevelController::new(&catalog, &mut state);
        assert!(matches!(
            controller.add_instance(TraitCategory::Merit, "iron_gullet", 3),
            Err(ControllerError::NotRepeatable { .. })
        ));
        assert!(matches!(
            controller.set_level(TraitCategory::Background, "allies", 2, Confirmation::Granted),
            Err(ControllerError::RepeatableRequiresInstance { .. })
        ));
        assert!(matches!(
            controller.add_instance(TraitCategory::Background, "allies", 0),
            Err(ControllerError::OutOfRange { .. })
        ));
    }

    #[test]
    fn powers_gate_on_level() {
        let catalog = catalog();
        let mut state = CharacterState::new("Ada");
        let mut controller = TraitLevelController::new(&catalog, &mut state);
        controller
            .set_level(TraitCategory::Discipline, "auspex", 1, Confirmation::NotGiven)
            .unwrap();
        assert!(matches!(
            controller.acquire_power("auspex", "Premonition"),
            Err(ControllerError::PowerLocked { required: 2, current: 1, .. })
        ));
        assert!(matches!(
            controller.acquire_power("auspex", "Mind Reading"),
            Err(ControllerError::UnknownPower { .. })
        ));
        controller.acquire_power("auspex", "heightened senses").unwrap();
        assert!(matches!(
            controller.acquire_power("auspex", "Heightened Senses"),
            Err(ControllerError::PowerAlreadyAcquired { .. })
        ));
        assert!(state.has_power("auspex", "Heightened Senses"));
    }
}
