//! Character sheet rules for Vampire: The Masquerade (5th edition).
//!
//! `sheet-core` holds the trait catalog model, the character record, XP
//! pricing and the spend transaction with undo. It performs no I/O. Every
//! change to a character flows through [`engine::SpendEngine`] (purchases and
//! refunds) or [`controller::TraitLevelController`] (level side effects), and
//! supporting crates depend on the types re-exported here.
pub mod catalog;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod pricing;
pub mod state;
pub mod view;

pub use catalog::{
    CatalogError, Clan, LevelNotation, NotationError, PowerDefinition, TraitCatalog,
    TraitCategory, TraitEntry, dots, normalize_key,
};
pub use config::{SheetConfig, UndoPolicy};
pub use controller::{Confirmation, ControllerError, LevelChange, TraitLevelController};
pub use engine::{SpendEngine, SpendError};
pub use error::{ErrorSeverity, SheetError};
pub use pricing::{PriceContext, PricingError, dot_price, dot_price_named, merit_cost, purchase_price, total_price};
pub use state::{
    AcquiredPower, CharacterId, CharacterState, CharacterStateBuilder, InstanceId, RecordId,
    SpendRecord, StateError, TraitId, TraitInstance, TraitSlot, XpLedger, XpSummary,
};
pub use view::{NullView, RecordingView, SheetView};
