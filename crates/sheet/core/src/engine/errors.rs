//! Error types for spend transactions.

use crate::catalog::TraitCategory;
use crate::controller::ControllerError;
use crate::error::{ErrorSeverity, SheetError};
use crate::pricing::PricingError;
use crate::state::{AcquiredPower, RecordId, StateError};

/// Errors surfaced by the [`SpendEngine`](super::SpendEngine).
///
/// Every variant leaves the character unchanged.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpendError {
    #[error("unknown trait category '{0}'")]
    UnknownTraitCategory(String),

    #[error("no {category} named '{key}' in the catalog")]
    UnknownTrait { category: TraitCategory, key: String },

    #[error("{0} traits cannot be bought with experience")]
    NotPurchasable(TraitCategory),

    #[error("level {level} is outside {min}..={max} for {category} '{key}'")]
    OutOfRange {
        category: TraitCategory,
        key: String,
        level: u8,
        min: u8,
        max: u8,
    },

    #[error("purchase costs {cost} XP, {available} available")]
    InsufficientXp { cost: u32, available: u32 },

    #[error("confirm losing {} power(s) of '{discipline}'", .powers.len())]
    ConfirmationRequired {
        discipline: String,
        powers: Vec<AcquiredPower>,
    },

    #[error("'{name}' is already a specialty of '{skill}'")]
    DuplicateSpecialty { skill: String, name: String },

    #[error("specialty name for '{skill}' is empty")]
    EmptySpecialty { skill: String },

    #[error("history has no record {0}")]
    RecordNotFound(RecordId),

    #[error("record {requested} is not the most recent purchase ({latest})")]
    UndoOutOfOrder { requested: RecordId, latest: RecordId },

    #[error(transparent)]
    Controller(ControllerError),

    #[error("ledger rejected the charge: {0}")]
    Ledger(#[from] StateError),
}

impl SpendError {
    pub(crate) fn insufficient(cost: u32, available: u32) -> Self {
        Self::InsufficientXp { cost, available }
    }
}

impl From<PricingError> for SpendError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::UnknownTraitCategory(name) => Self::UnknownTraitCategory(name),
            PricingError::NotPurchasable(category) => Self::NotPurchasable(category),
        }
    }
}

impl From<ControllerError> for SpendError {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::UnknownTrait { category, key } => Self::UnknownTrait { category, key },
            ControllerError::OutOfRange {
                category,
                key,
                level,
                min,
                max,
            } => Self::OutOfRange {
                category,
                key,
                level,
                min,
                max,
            },
            ControllerError::PowersWillBeLost { discipline, powers } => {
                Self::ConfirmationRequired { discipline, powers }
            }
            other => Self::Controller(other),
        }
    }
}

impl SheetError for SpendError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InsufficientXp { .. }
            | Self::ConfirmationRequired { .. }
            | Self::DuplicateSpecialty { .. }
            | Self::UndoOutOfOrder { .. } => ErrorSeverity::Recoverable,
            Self::Controller(err) => err.severity(),
            Self::Ledger(_) => ErrorSeverity::Internal,
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownTraitCategory(_) => "SPEND_UNKNOWN_CATEGORY",
            Self::UnknownTrait { .. } => "SPEND_UNKNOWN_TRAIT",
            Self::NotPurchasable(_) => "SPEND_NOT_PURCHASABLE",
            Self::OutOfRange { .. } => "SPEND_OUT_OF_RANGE",
            Self::InsufficientXp { .. } => "SPEND_INSUFFICIENT_XP",
            Self::ConfirmationRequired { .. } => "SPEND_CONFIRMATION_REQUIRED",
            Self::DuplicateSpecialty { .. } => "SPEND_DUPLICATE_SPECIALTY",
            Self::EmptySpecialty { .. } => "SPEND_EMPTY_SPECIALTY",
            Self::RecordNotFound(_) => "SPEND_RECORD_NOT_FOUND",
            Self::UndoOutOfOrder { .. } => "SPEND_UNDO_OUT_OF_ORDER",
            Self::Controller(err) => err.error_code(),
            Self::Ledger(_) => "SPEND_LEDGER",
        }
    }
}
