//! Trait categories and key normalization.

use core::str::FromStr;

/// Category a purchasable (or trackable) trait belongs to.
///
/// Category drives the pricing rule and which level-change side effects
/// apply. Flaws are tracked on the sheet but are never bought with XP.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum TraitCategory {
    Attribute,
    Skill,
    Discipline,
    /// Blood sorcery rituals, oblivion ceremonies and thin-blood formulae.
    Ritual,
    Merit,
    Background,
    Flaw,
    BloodPotency,
    Specialty,
}

impl TraitCategory {
    pub const ALL: [TraitCategory; 9] = [
        TraitCategory::Attribute,
        TraitCategory::Skill,
        TraitCategory::Discipline,
        TraitCategory::Ritual,
        TraitCategory::Merit,
        TraitCategory::Background,
        TraitCategory::Flaw,
        TraitCategory::BloodPotency,
        TraitCategory::Specialty,
    ];

    /// Parses a category name leniently.
    ///
    /// Accepts any ASCII casing and ignores `_`, `-` and spaces, so
    /// `"bloodPotency"`, `"bloodpotency"` and `"blood_potency"` all resolve.
    pub fn parse(name: &str) -> Option<Self> {
        let compact: String = name
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect();
        TraitCategory::from_str(&compact).ok()
    }

    /// Whether a trait of this category can drop back to level 0 (unowned).
    ///
    /// Attributes always keep their starting dot; blood potency expresses
    /// zero through its catalog range instead.
    pub const fn can_be_unowned(self) -> bool {
        !matches!(self, Self::Attribute | Self::BloodPotency)
    }

    /// Whether the category can be bought with experience points.
    pub const fn is_purchasable(self) -> bool {
        !matches!(self, Self::Flaw)
    }

    /// Merits and backgrounds price through their level notation instead of
    /// a flat per-dot multiplier.
    pub const fn uses_notation_pricing(self) -> bool {
        matches!(self, Self::Merit | Self::Background)
    }

    /// Categories whose entries may be repeatable (bought as independent instances).
    pub const fn supports_instances(self) -> bool {
        matches!(self, Self::Merit | Self::Background | Self::Flaw)
    }
}

/// Normalizes a trait or clan key: trimmed, lowercase, words joined by `_`.
///
/// `"Animal Ken"` and `"animal-ken"` both become `"animal_ken"`; apostrophes
/// are dropped (`"Dagon's Call"` is `"dagons_call"`).
pub fn normalize_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for c in raw.trim().chars() {
        if matches!(c, '\'' | '’') {
            continue;
        }
        if c.is_whitespace() || c == '-' || c == '_' {
            pending_separator = !key.is_empty();
            continue;
        }
        if pending_separator {
            key.push('_');
            pending_separator = false;
        }
        key.extend(c.to_lowercase());
    }
    key
}
