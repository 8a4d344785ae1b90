//! Static reference data describing purchasable traits.
//!
//! The catalog is read-only at runtime. Content crates build it once from data
//! files and hand out shared references to the engine.

mod category;
mod notation;

pub use category::{TraitCategory, normalize_key};
pub use notation::{LevelNotation, NotationError, dots};

use std::collections::BTreeMap;

use crate::error::{ErrorSeverity, SheetError};

/// Errors raised while assembling a catalog.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate {category} entry '{key}'")]
    DuplicateEntry { category: TraitCategory, key: String },

    #[error("duplicate clan '{0}'")]
    DuplicateClan(String),

    #[error("{category} entry has an empty key")]
    EmptyKey { category: TraitCategory },

    #[error("power '{power}' of discipline '{discipline}' unlocks at level {level}, outside {notation}")]
    PowerOutOfRange {
        discipline: String,
        power: String,
        level: u8,
        notation: LevelNotation,
    },
}

impl SheetError for CatalogError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateEntry { .. } => "CATALOG_DUPLICATE_ENTRY",
            Self::DuplicateClan(_) => "CATALOG_DUPLICATE_CLAN",
            Self::EmptyKey { .. } => "CATALOG_EMPTY_KEY",
            Self::PowerOutOfRange { .. } => "CATALOG_POWER_OUT_OF_RANGE",
        }
    }
}

/// A discipline power and the discipline level that unlocks it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerDefinition {
    pub name: String,
    pub level: u8,
}

impl PowerDefinition {
    pub fn new(name: impl Into<String>, level: u8) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }
}

/// Immutable reference data for one purchasable trait.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraitEntry {
    pub category: TraitCategory,
    pub key: String,
    pub name: String,
    pub notation: LevelNotation,
    /// Powers unlocked by this discipline (empty for other categories).
    pub powers: Vec<PowerDefinition>,
}

impl TraitEntry {
    pub fn new(
        category: TraitCategory,
        name: impl Into<String>,
        notation: LevelNotation,
    ) -> Self {
        let name = name.into();
        Self {
            category,
            key: normalize_key(&name),
            name,
            notation,
            powers: Vec::new(),
        }
    }

    /// Overrides the key derived from the display name.
    pub fn with_key(mut self, key: &str) -> Self {
        self.key = normalize_key(key);
        self
    }

    pub fn with_power(mut self, name: impl Into<String>, level: u8) -> Self {
        self.powers.push(PowerDefinition::new(name, level));
        self
    }

    /// Whether `level` is a legal value for this trait.
    ///
    /// Zero is legal for every category that can be unowned; otherwise the
    /// level notation decides.
    pub fn accepts_level(&self, level: u8) -> bool {
        (level == 0 && self.category.can_be_unowned()) || self.notation.accepts(level)
    }

    /// Lowest legal level, accounting for categories that can be unowned.
    pub fn min_level(&self) -> u8 {
        if self.category.can_be_unowned() {
            0
        } else {
            self.notation.min()
        }
    }

    pub fn max_level(&self) -> u8 {
        self.notation.max()
    }

    pub fn is_repeatable(&self) -> bool {
        self.notation.is_repeatable()
    }

    /// Finds a power by name (ASCII case-insensitive).
    pub fn power(&self, name: &str) -> Option<&PowerDefinition> {
        let name = name.trim();
        self.powers
            .iter()
            .find(|power| power.name.eq_ignore_ascii_case(name))
    }
}

/// A clan and its in-clan disciplines.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clan {
    pub key: String,
    pub name: String,
    pub disciplines: Vec<String>,
    /// Clanless characters pay the intermediate discipline rate.
    #[cfg_attr(feature = "serde", serde(default))]
    pub caitiff: bool,
}

impl Clan {
    pub fn new(name: impl Into<String>, disciplines: &[&str]) -> Self {
        let name = name.into();
        Self {
            key: normalize_key(&name),
            name,
            disciplines: disciplines.iter().map(|d| normalize_key(d)).collect(),
            caitiff: false,
        }
    }

    pub fn caitiff(name: impl Into<String>) -> Self {
        let mut clan = Self::new(name, &[]);
        clan.caitiff = true;
        clan
    }

    pub fn has_discipline(&self, key: &str) -> bool {
        let key = normalize_key(key);
        self.disciplines.iter().any(|d| *d == key)
    }
}

/// Read-only lookup of every catalog entry and clan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraitCatalog {
    entries: BTreeMap<TraitCategory, BTreeMap<String, TraitEntry>>,
    clans: BTreeMap<String, Clan>,
}

impl TraitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from entries and clans, rejecting duplicates.
    pub fn from_parts(
        entries: impl IntoIterator<Item = TraitEntry>,
        clans: impl IntoIterator<Item = Clan>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for entry in entries {
            catalog.insert(entry)?;
        }
        for clan in clans {
            catalog.insert_clan(clan)?;
        }
        Ok(catalog)
    }

    /// Adds an entry. Keys are normalized; power levels must fit the notation.
    pub fn insert(&mut self, mut entry: TraitEntry) -> Result<(), CatalogError> {
        entry.key = normalize_key(&entry.key);
        if entry.key.is_empty() {
            return Err(CatalogError::EmptyKey {
                category: entry.category,
            });
        }
        if let Some(power) = entry
            .powers
            .iter()
            .find(|power| power.level == 0 || power.level > entry.notation.max())
        {
            return Err(CatalogError::PowerOutOfRange {
                discipline: entry.key.clone(),
                power: power.name.clone(),
                level: power.level,
                notation: entry.notation.clone(),
            });
        }

        let bucket = self.entries.entry(entry.category).or_default();
        if bucket.contains_key(&entry.key) {
            return Err(CatalogError::DuplicateEntry {
                category: entry.category,
                key: entry.key,
            });
        }
        bucket.insert(entry.key.clone(), entry);
        Ok(())
    }

    pub fn insert_clan(&mut self, mut clan: Clan) -> Result<(), CatalogError> {
        clan.key = normalize_key(&clan.key);
        if self.clans.contains_key(&clan.key) {
            return Err(CatalogError::DuplicateClan(clan.key));
        }
        self.clans.insert(clan.key.clone(), clan);
        Ok(())
    }

    /// Looks up an entry; the key is normalized first.
    pub fn entry(&self, category: TraitCategory, key: &str) -> Option<&TraitEntry> {
        self.entries.get(&category)?.get(&normalize_key(key))
    }

    /// Iterates over the entries of one category in key order.
    pub fn entries(&self, category: TraitCategory) -> impl Iterator<Item = &TraitEntry> {
        self.entries
            .get(&category)
            .into_iter()
            .flat_map(|bucket| bucket.values())
    }

    pub fn clan(&self, key: &str) -> Option<&Clan> {
        self.clans.get(&normalize_key(key))
    }

    pub fn clans(&self) -> impl Iterator<Item = &Clan> {
        self.clans.values()
    }

    /// Total number of trait entries across categories.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TraitCatalog {
        TraitCatalog::from_parts(
            [
                TraitEntry::new(
                    TraitCategory::Attribute,
                    "Strength",
                    LevelNotation::Range { min: 1, max: 5 },
                ),
                TraitEntry::new(
                    TraitCategory::Discipline,
                    "Animalism",
                    LevelNotation::Range { min: 1, max: 5 },
                )
                .with_power("Sense the Beast", 1)
                .with_power("Feral Whispers", 2),
            ],
            [Clan::new("Gangrel", &["Animalism", "Fortitude", "Protean"])],
        )
        .unwrap()
    }

    #[test]
    fn looks_up_by_normalized_key() {
        let catalog = sample();
        assert!(catalog.entry(TraitCategory::Attribute, "Strength").is_some());
        assert!(catalog.entry(TraitCategory::Attribute, " strength ").is_some());
        assert!(catalog.entry(TraitCategory::Skill, "strength").is_none());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn rejects_duplicates() {
        let mut catalog = sample();
        let err = catalog
            .insert(TraitEntry::new(
                TraitCategory::Attribute,
                "STRENGTH",
                LevelNotation::Range { min: 1, max: 5 },
            ))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateEntry { .. }));
        assert!(catalog.insert_clan(Clan::new("gangrel", &[])).is_err());
    }

    #[test]
    fn rejects_powers_beyond_notation() {
        let mut catalog = TraitCatalog::new();
        let entry = TraitEntry::new(
            TraitCategory::Discipline,
            "Oblivion",
            LevelNotation::Range { min: 1, max: 5 },
        )
        .with_power("Impossible", 6);
        assert!(matches!(
            catalog.insert(entry),
            Err(CatalogError::PowerOutOfRange { level: 6, .. })
        ));
    }

    #[test]
    fn level_acceptance_respects_unowned_rules() {
        let catalog = sample();
        let strength = catalog.entry(TraitCategory::Attribute, "strength").unwrap();
        assert!(!strength.accepts_level(0));
        assert!(strength.accepts_level(1));
        assert_eq!(strength.min_level(), 1);

        let animalism = catalog
            .entry(TraitCategory::Discipline, "animalism")
            .unwrap();
        assert!(animalism.accepts_level(0));
        assert!(!animalism.accepts_level(6));
        assert_eq!(animalism.power("feral whispers").map(|p| p.level), Some(2));
    }

    #[test]
    fn clan_membership() {
        let catalog = sample();
        let gangrel = catalog.clan("Gangrel").unwrap();
        assert!(gangrel.has_discipline("animalism"));
        assert!(!gangrel.has_discipline("dominate"));
    }
}
