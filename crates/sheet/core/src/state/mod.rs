//! Mutable character record.
//!
//! [`CharacterState`] is the single source of truth for trait levels,
//! acquired powers, specialties and experience. Reads are public; writes are
//! crate-private so that every change flows through the
//! [`TraitLevelController`](crate::controller::TraitLevelController) or the
//! [`SpendEngine`](crate::engine::SpendEngine). Persistence layers rebuild a
//! state through [`CharacterStateBuilder`].

mod builder;
mod xp;

pub use builder::CharacterStateBuilder;
pub use xp::{RecordId, SpendRecord, XpLedger, XpSummary};

pub(crate) use xp::PendingRecord;

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{TraitCatalog, TraitCategory, normalize_key};
use crate::error::{ErrorSeverity, SheetError};

/// Errors that occur while restoring or adjusting character state.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateError {
    #[error("spent XP {spent} exceeds total {total}")]
    SpentExceedsTotal { total: u32, spent: u32 },

    #[error("instance {instance} of {category} '{key}' appears twice")]
    DuplicateInstance {
        category: TraitCategory,
        key: String,
        instance: InstanceId,
    },

    #[error("{category} '{key}' mixes a plain level with instances")]
    MixedSlot { category: TraitCategory, key: String },
}

impl SheetError for StateError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::SpentExceedsTotal { .. } => "STATE_SPENT_EXCEEDS_TOTAL",
            Self::DuplicateInstance { .. } => "STATE_DUPLICATE_INSTANCE",
            Self::MixedSlot { .. } => "STATE_MIXED_SLOT",
        }
    }
}

/// Identifier assigned by the character store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CharacterId(pub String);

impl core::fmt::Display for CharacterId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// (category, key) pair naming one trait on the sheet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraitId {
    pub category: TraitCategory,
    pub key: String,
}

impl TraitId {
    pub fn new(category: TraitCategory, key: &str) -> Self {
        Self {
            category,
            key: normalize_key(key),
        }
    }
}

impl core::fmt::Display for TraitId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.category, self.key)
    }
}

/// Stable identifier of a repeatable trait instance.
///
/// Allocated from a per-character counter and never reused, so history
/// records keep pointing at the right instance after siblings are removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct InstanceId(pub u32);

impl core::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One independent purchase of a repeatable trait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraitInstance {
    pub id: InstanceId,
    pub level: u8,
}

/// Current value of an owned trait.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum TraitSlot {
    Level(u8),
    Instances(Vec<TraitInstance>),
}

impl TraitSlot {
    /// Level shown on the sheet: the level itself, or the highest instance.
    pub fn reported_level(&self) -> u8 {
        match self {
            Self::Level(level) => *level,
            Self::Instances(instances) => instances.iter().map(|i| i.level).max().unwrap_or(0),
        }
    }

    pub fn instances(&self) -> &[TraitInstance] {
        match self {
            Self::Level(_) => &[],
            Self::Instances(instances) => instances,
        }
    }
}

/// A discipline power the character has selected.
///
/// Ordered by unlock level, then name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AcquiredPower {
    pub unlock_level: u8,
    pub name: String,
}

impl AcquiredPower {
    pub fn new(name: impl Into<String>, unlock_level: u8) -> Self {
        Self {
            unlock_level,
            name: name.into(),
        }
    }
}

/// The mutable record of one character.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CharacterState {
    id: Option<CharacterId>,
    name: String,
    clan: Option<String>,
    traits: BTreeMap<TraitCategory, BTreeMap<String, TraitSlot>>,
    powers: BTreeMap<String, BTreeSet<AcquiredPower>>,
    specialties: BTreeMap<String, Vec<String>>,
    xp: XpLedger,
    next_instance: u32,
}

impl CharacterState {
    /// Creates an empty character.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a character whose non-unownable traits start at their catalog
    /// minimum (attributes at one dot, blood potency at its floor).
    pub fn from_catalog(name: impl Into<String>, catalog: &TraitCatalog) -> Self {
        let mut state = Self::new(name);
        for category in TraitCategory::ALL
            .into_iter()
            .filter(|category| !category.can_be_unowned())
        {
            for entry in catalog.entries(category) {
                let floor = entry.notation.min();
                if floor > 0 {
                    state.put_level(category, &entry.key, floor);
                }
            }
        }
        state
    }

    pub fn builder(name: impl Into<String>) -> CharacterStateBuilder {
        CharacterStateBuilder::new(name)
    }

    pub fn id(&self) -> Option<&CharacterId> {
        self.id.as_ref()
    }

    pub fn set_id(&mut self, id: CharacterId) {
        self.id = Some(id);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Clan key, if the character has one.
    pub fn clan(&self) -> Option<&str> {
        self.clan.as_deref()
    }

    pub fn set_clan(&mut self, clan: Option<&str>) {
        self.clan = clan.map(normalize_key).filter(|key| !key.is_empty());
    }

    /// Reported level of a trait; 0 when unowned.
    pub fn level(&self, category: TraitCategory, key: &str) -> u8 {
        self.slot(category, key)
            .map(TraitSlot::reported_level)
            .unwrap_or(0)
    }

    pub fn slot(&self, category: TraitCategory, key: &str) -> Option<&TraitSlot> {
        self.traits.get(&category)?.get(&normalize_key(key))
    }

    pub fn owns(&self, category: TraitCategory, key: &str) -> bool {
        self.slot(category, key).is_some()
    }

    /// Instances of a repeatable trait (empty when unowned or not repeatable).
    pub fn instances(&self, category: TraitCategory, key: &str) -> &[TraitInstance] {
        self.slot(category, key)
            .map(TraitSlot::instances)
            .unwrap_or(&[])
    }

    pub fn instance(
        &self,
        category: TraitCategory,
        key: &str,
        instance: InstanceId,
    ) -> Option<TraitInstance> {
        self.instances(category, key)
            .iter()
            .copied()
            .find(|i| i.id == instance)
    }

    /// Owned traits of a category in key order.
    pub fn traits(&self, category: TraitCategory) -> impl Iterator<Item = (&str, &TraitSlot)> {
        self.traits
            .get(&category)
            .into_iter()
            .flat_map(|bucket| bucket.iter().map(|(key, slot)| (key.as_str(), slot)))
    }

    /// Acquired powers of a discipline ordered by unlock level.
    pub fn powers(&self, discipline: &str) -> impl Iterator<Item = &AcquiredPower> {
        self.powers
            .get(&normalize_key(discipline))
            .into_iter()
            .flat_map(|set| set.iter())
    }

    pub fn has_power(&self, discipline: &str, name: &str) -> bool {
        self.powers(discipline)
            .any(|power| power.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Specialties recorded for a skill in purchase order.
    pub fn specialties(&self, skill: &str) -> &[String] {
        self.specialties
            .get(&normalize_key(skill))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every skill with at least one specialty.
    pub fn all_specialties(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.specialties
            .iter()
            .map(|(skill, names)| (skill.as_str(), names.as_slice()))
    }

    /// Trimmed, case-insensitive duplicate check.
    pub fn has_specialty(&self, skill: &str, name: &str) -> bool {
        let name = name.trim();
        self.specialties(skill)
            .iter()
            .any(|existing| existing.trim().eq_ignore_ascii_case(name))
    }

    pub fn xp(&self) -> &XpLedger {
        &self.xp
    }

    /// Id the next purchased instance will receive.
    ///
    /// Ids are never handed out twice, even after the instance is removed,
    /// so history records keep pointing at the instance they bought.
    pub fn next_instance_id(&self) -> InstanceId {
        InstanceId(self.next_instance)
    }

    /// Grants experience points.
    pub fn award_xp(&mut self, amount: u32) -> u32 {
        self.xp.award(amount)
    }

    /// Sets the XP total; refused below the spent amount.
    pub fn set_xp_total(&mut self, total: u32) -> Result<(), StateError> {
        self.xp.set_total(total)
    }

    // ===== crate-private mutators =====

    pub(crate) fn xp_mut(&mut self) -> &mut XpLedger {
        &mut self.xp
    }

    /// Writes a plain level; level 0 removes the trait.
    pub(crate) fn put_level(&mut self, category: TraitCategory, key: &str, level: u8) {
        let key = normalize_key(key);
        if level == 0 {
            self.remove_trait(category, &key);
            return;
        }
        self.traits
            .entry(category)
            .or_default()
            .insert(key, TraitSlot::Level(level));
    }

    pub(crate) fn remove_trait(&mut self, category: TraitCategory, key: &str) {
        let key = normalize_key(key);
        if let Some(bucket) = self.traits.get_mut(&category) {
            bucket.remove(&key);
            if bucket.is_empty() {
                self.traits.remove(&category);
            }
        }
        if category == TraitCategory::Discipline {
            self.powers.remove(&key);
        }
    }

    /// Appends an instance with a fresh id.
    ///
    /// A plain level already stored for the trait is kept as an instance of
    /// its own, so nothing is lost when an entry becomes repeatable.
    pub(crate) fn push_instance(&mut self, category: TraitCategory, key: &str, level: u8) -> InstanceId {
        let key = normalize_key(key);
        let existing = match self.slot(category, &key) {
            Some(TraitSlot::Level(existing)) => Some(*existing),
            _ => None,
        };
        if let Some(existing) = existing {
            let carried = self.allocate_instance();
            self.traits.entry(category).or_default().insert(
                key.clone(),
                TraitSlot::Instances(vec![TraitInstance {
                    id: carried,
                    level: existing,
                }]),
            );
        }

        let id = self.allocate_instance();
        let slot = self
            .traits
            .entry(category)
            .or_default()
            .entry(key)
            .or_insert_with(|| TraitSlot::Instances(Vec::new()));
        if let TraitSlot::Instances(instances) = slot {
            instances.push(TraitInstance { id, level });
        }
        id
    }

    fn allocate_instance(&mut self) -> InstanceId {
        let id = InstanceId(self.next_instance);
        self.next_instance += 1;
        id
    }

    /// Changes one instance level. Returns the previous level.
    pub(crate) fn put_instance_level(
        &mut self,
        category: TraitCategory,
        key: &str,
        instance: InstanceId,
        level: u8,
    ) -> Option<u8> {
        let slot = self.traits.get_mut(&category)?.get_mut(&normalize_key(key))?;
        let TraitSlot::Instances(instances) = slot else {
            return None;
        };
        let target = instances.iter_mut().find(|i| i.id == instance)?;
        let previous = target.level;
        target.level = level;
        Some(previous)
    }

    /// Deletes one instance, dropping the trait when none remain.
    pub(crate) fn take_instance(
        &mut self,
        category: TraitCategory,
        key: &str,
        instance: InstanceId,
    ) -> Option<TraitInstance> {
        let key = normalize_key(key);
        let slot = self.traits.get_mut(&category)?.get_mut(&key)?;
        let TraitSlot::Instances(instances) = slot else {
            return None;
        };
        let index = instances.iter().position(|i| i.id == instance)?;
        let removed = instances.remove(index);
        if instances.is_empty() {
            self.remove_trait(category, &key);
        }
        Some(removed)
    }

    pub(crate) fn insert_power(&mut self, discipline: &str, power: AcquiredPower) -> bool {
        self.powers
            .entry(normalize_key(discipline))
            .or_default()
            .insert(power)
    }

    /// Removes powers whose unlock level exceeds `level`; returns them.
    pub(crate) fn strip_powers_above(&mut self, discipline: &str, level: u8) -> Vec<AcquiredPower> {
        let key = normalize_key(discipline);
        let Some(set) = self.powers.get_mut(&key) else {
            return Vec::new();
        };
        let lost: Vec<AcquiredPower> = set
            .iter()
            .filter(|power| power.unlock_level > level)
            .cloned()
            .collect();
        for power in &lost {
            set.remove(power);
        }
        if set.is_empty() {
            self.powers.remove(&key);
        }
        lost
    }

    pub(crate) fn remove_power(&mut self, discipline: &str, name: &str) -> Option<AcquiredPower> {
        let key = normalize_key(discipline);
        let set = self.powers.get_mut(&key)?;
        let found = set
            .iter()
            .find(|power| power.name.eq_ignore_ascii_case(name.trim()))
            .cloned()?;
        set.remove(&found);
        if set.is_empty() {
            self.powers.remove(&key);
        }
        Some(found)
    }

    pub(crate) fn push_specialty(&mut self, skill: &str, name: &str) {
        self.specialties
            .entry(normalize_key(skill))
            .or_default()
            .push(name.trim().to_string());
    }

    pub(crate) fn remove_specialty(&mut self, skill: &str, name: &str) -> bool {
        let key = normalize_key(skill);
        let Some(names) = self.specialties.get_mut(&key) else {
            return false;
        };
        let before = names.len();
        names.retain(|existing| !existing.trim().eq_ignore_ascii_case(name.trim()));
        let removed = names.len() != before;
        if names.is_empty() {
            self.specialties.remove(&key);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LevelNotation, TraitEntry};

    #[test]
    fn level_zero_removes_trait() {
        let mut state = CharacterState::new("Nadia");
        state.put_level(TraitCategory::Skill, "Brawl", 2);
        assert_eq!(state.level(TraitCategory::Skill, "brawl"), 2);
        state.put_level(TraitCategory::Skill, "brawl", 0);
        assert!(!state.owns(TraitCategory::Skill, "brawl"));
        assert_eq!(state.traits(TraitCategory::Skill).count(), 0);
    }

    #[test]
    fn instances_report_max_level() {
        let mut state = CharacterState::new("Nadia");
        let first = state.push_instance(TraitCategory::Background, "allies", 1);
        let second = state.push_instance(TraitCategory::Background, "allies", 3);
        assert_ne!(first, second);
        assert_eq!(state.level(TraitCategory::Background, "allies"), 3);

        state.take_instance(TraitCategory::Background, "allies", second);
        assert_eq!(state.level(TraitCategory::Background, "allies"), 1);

        state.take_instance(TraitCategory::Background, "allies", first);
        assert!(!state.owns(TraitCategory::Background, "allies"));
    }

    #[test]
    fn instance_ids_are_never_reused() {
        let mut state = CharacterState::new("Nadia");
        let first = state.push_instance(TraitCategory::Merit, "linguistics", 1);
        state.take_instance(TraitCategory::Merit, "linguistics", first);
        let second = state.push_instance(TraitCategory::Merit, "linguistics", 1);
        assert_ne!(first, second);
    }

    #[test]
    fn plain_level_survives_as_an_instance() {
        let mut state = CharacterState::new("Nadia");
        state.put_level(TraitCategory::Background, "allies", 3);

        let added = state.push_instance(TraitCategory::Background, "allies", 1);

        let instances = state.instances(TraitCategory::Background, "allies");
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].level, 3);
        assert_ne!(instances[0].id, added);
        assert_eq!(instances[1], TraitInstance { id: added, level: 1 });
        assert_eq!(state.level(TraitCategory::Background, "allies"), 3);
    }

    #[test]
    fn strips_only_powers_above_level() {
        let mut state = CharacterState::new("Nadia");
        state.put_level(TraitCategory::Discipline, "auspex", 3);
        state.insert_power("auspex", AcquiredPower::new("Heightened Senses", 1));
        state.insert_power("auspex", AcquiredPower::new("Premonition", 2));
        state.insert_power("auspex", AcquiredPower::new("Scry the Soul", 3));

        let lost = state.strip_powers_above("auspex", 1);
        let names: Vec<_> = lost.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Premonition", "Scry the Soul"]);
        assert_eq!(state.powers("auspex").count(), 1);
    }

    #[test]
    fn removing_discipline_drops_powers() {
        let mut state = CharacterState::new("Nadia");
        state.put_level(TraitCategory::Discipline, "auspex", 1);
        state.insert_power("auspex", AcquiredPower::new("Heightened Senses", 1));
        state.put_level(TraitCategory::Discipline, "auspex", 0);
        assert_eq!(state.powers("auspex").count(), 0);
    }

    #[test]
    fn specialty_duplicates_are_case_insensitive() {
        let mut state = CharacterState::new("Nadia");
        state.push_specialty("persuasion", " Interrogation ");
        assert!(state.has_specialty("Persuasion", "interrogation"));
        assert_eq!(state.specialties("persuasion"), ["Interrogation".to_string()]);
        assert!(state.remove_specialty("persuasion", "INTERROGATION"));
        assert!(state.specialties("persuasion").is_empty());
    }

    #[test]
    fn seeds_attributes_from_catalog() {
        let catalog = TraitCatalog::from_parts(
            [
                TraitEntry::new(
                    TraitCategory::Attribute,
                    "Wits",
                    LevelNotation::Range { min: 1, max: 5 },
                ),
                TraitEntry::new(
                    TraitCategory::BloodPotency,
                    "Blood Potency",
                    LevelNotation::Range { min: 0, max: 10 },
                ),
                TraitEntry::new(
                    TraitCategory::Skill,
                    "Occult",
                    LevelNotation::Range { min: 1, max: 5 },
                ),
            ],
            [],
        )
        .unwrap();
        let state = CharacterState::from_catalog("Nadia", &catalog);
        assert_eq!(state.level(TraitCategory::Attribute, "wits"), 1);
        assert!(!state.owns(TraitCategory::BloodPotency, "blood_potency"));
        assert!(!state.owns(TraitCategory::Skill, "occult"));
    }

    #[test]
    fn clan_key_is_normalized() {
        let mut state = CharacterState::new("Nadia");
        state.set_clan(Some("Tremere "));
        assert_eq!(state.clan(), Some("tremere"));
        state.set_clan(Some("  "));
        assert_eq!(state.clan(), None);
    }
}
