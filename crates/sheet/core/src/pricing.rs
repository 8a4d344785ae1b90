//! Experience cost rules.
//!
//! Everything here is pure: functions take a category or catalog entry plus
//! levels and return a cost. Merits and backgrounds price through their level
//! notation; every other category uses a flat per-dot multiplier.

use crate::catalog::{LevelNotation, TraitCatalog, TraitCategory, TraitEntry};
use crate::error::{ErrorSeverity, SheetError};

const ATTRIBUTE_MULTIPLIER: u32 = 5;
const SKILL_MULTIPLIER: u32 = 3;
const SPECIALTY_COST: u32 = 3;
const BLOOD_POTENCY_MULTIPLIER: u32 = 10;
const RITUAL_MULTIPLIER: u32 = 3;
const MERIT_DOT_COST: u32 = 3;
const DISCIPLINE_IN_CLAN: u32 = 5;
const DISCIPLINE_OUT_OF_CLAN: u32 = 7;
const DISCIPLINE_CAITIFF: u32 = 6;

/// Pricing failures.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("unknown trait category '{0}'")]
    UnknownTraitCategory(String),

    #[error("{0} traits cannot be bought with experience")]
    NotPurchasable(TraitCategory),
}

impl SheetError for PricingError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownTraitCategory(_) => "PRICING_UNKNOWN_CATEGORY",
            Self::NotPurchasable(_) => "PRICING_NOT_PURCHASABLE",
        }
    }
}

/// Modifiers that change discipline prices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct PriceContext {
    /// The discipline is in-clan for the character.
    pub clan_matched: bool,
    /// The character is clanless. Takes precedence over `clan_matched`.
    pub caitiff: bool,
}

impl PriceContext {
    pub const fn in_clan() -> Self {
        Self {
            clan_matched: true,
            caitiff: false,
        }
    }

    pub const fn caitiff() -> Self {
        Self {
            clan_matched: false,
            caitiff: true,
        }
    }

    /// Derives the context for buying `key` from the character's clan.
    ///
    /// Only disciplines care about the clan; other categories get the default
    /// context. An unknown or missing clan counts as out-of-clan.
    pub fn for_trait(
        catalog: &TraitCatalog,
        clan: Option<&str>,
        category: TraitCategory,
        key: &str,
    ) -> Self {
        if category != TraitCategory::Discipline {
            return Self::default();
        }
        match clan.and_then(|clan| catalog.clan(clan)) {
            Some(clan) if clan.caitiff => Self::caitiff(),
            Some(clan) => Self {
                clan_matched: clan.has_discipline(key),
                caitiff: false,
            },
            None => Self::default(),
        }
    }
}

/// Price of the single dot that takes a trait to `new_level`.
pub fn dot_price(
    category: TraitCategory,
    new_level: u8,
    context: &PriceContext,
) -> Result<u32, PricingError> {
    let level = u32::from(new_level);
    let price = match category {
        TraitCategory::Attribute => level * ATTRIBUTE_MULTIPLIER,
        TraitCategory::Skill => level * SKILL_MULTIPLIER,
        TraitCategory::Specialty => SPECIALTY_COST,
        TraitCategory::BloodPotency => level * BLOOD_POTENCY_MULTIPLIER,
        TraitCategory::Ritual => level * RITUAL_MULTIPLIER,
        TraitCategory::Merit | TraitCategory::Background => MERIT_DOT_COST,
        TraitCategory::Discipline => {
            let multiplier = if context.caitiff {
                DISCIPLINE_CAITIFF
            } else if context.clan_matched {
                DISCIPLINE_IN_CLAN
            } else {
                DISCIPLINE_OUT_OF_CLAN
            };
            level * multiplier
        }
        TraitCategory::Flaw => return Err(PricingError::NotPurchasable(category)),
    };
    Ok(price)
}

/// [`dot_price`] for a category given by name, as it arrives from user input.
pub fn dot_price_named(
    category: &str,
    new_level: u8,
    context: &PriceContext,
) -> Result<u32, PricingError> {
    let parsed = TraitCategory::parse(category)
        .ok_or_else(|| PricingError::UnknownTraitCategory(category.to_string()))?;
    dot_price(parsed, new_level, context)
}

/// Sum of [`dot_price`] for every level in `(current, desired]`.
///
/// Lowering a trait is free; the cost is zero whenever `desired <= current`.
pub fn total_price(
    category: TraitCategory,
    current: u8,
    desired: u8,
    context: &PriceContext,
) -> Result<u32, PricingError> {
    if !category.is_purchasable() {
        return Err(PricingError::NotPurchasable(category));
    }
    if desired <= current {
        return Ok(0);
    }
    let mut total = 0;
    for level in current + 1..=desired {
        total += dot_price(category, level, context)?;
    }
    Ok(total)
}

/// Merit and background cost, driven by the entry's level notation.
///
/// For repeatable notations `current == 0` means a new instance: the base dot
/// size is paid once and any extra levels at the in-place rate. Otherwise the
/// instance is raised in place at `Δ × base × 3`.
pub fn merit_cost(notation: &LevelNotation, current: u8, desired: u8) -> u32 {
    if desired <= current {
        return 0;
    }
    match notation {
        LevelNotation::Repeatable { min, .. } => {
            let base = u32::from(*min);
            let per_level = base * MERIT_DOT_COST;
            if current == 0 {
                per_level + u32::from(desired.saturating_sub(*min)) * per_level
            } else {
                u32::from(desired - current) * per_level
            }
        }
        LevelNotation::Choice(levels) => levels
            .iter()
            .filter(|level| **level > current && **level <= desired)
            .map(|level| u32::from(*level) * MERIT_DOT_COST)
            .sum(),
        LevelNotation::Range { .. } => (current + 1..=desired)
            .map(|level| u32::from(level) * MERIT_DOT_COST)
            .sum(),
        LevelNotation::Fixed(level) => {
            if current > 0 {
                0
            } else {
                u32::from(*level) * MERIT_DOT_COST
            }
        }
    }
}

/// Price of moving a catalog entry from `current` to `desired`.
///
/// This is what the spend engine charges and records, so history costs always
/// agree with the pricing rules in force at purchase time.
pub fn purchase_price(
    entry: &TraitEntry,
    current: u8,
    desired: u8,
    context: &PriceContext,
) -> Result<u32, PricingError> {
    if !entry.category.is_purchasable() {
        return Err(PricingError::NotPurchasable(entry.category));
    }
    if entry.category.uses_notation_pricing() {
        return Ok(merit_cost(&entry.notation, current, desired));
    }
    if let LevelNotation::Fixed(level) = entry.notation {
        // Fixed-level rituals and ceremonies are learned once at their level
        if current > 0 || desired < level {
            return Ok(0);
        }
        return dot_price(entry.category, level, context);
    }
    total_price(entry.category, current, desired, context)
}
