//! Event types for different topics.

use serde::{Deserialize, Serialize};
use sheet_core::{CharacterId, LevelChange, RecordId, SpendRecord, XpSummary};

/// Events describing committed changes to a character sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SheetEvent {
    /// A trait, instance or power changed level
    LevelChanged {
        character: CharacterId,
        change: LevelChange,
    },

    /// Experience was spent on a purchase
    XpSpent {
        character: CharacterId,
        record: SpendRecord,
        xp: XpSummary,
    },

    /// A purchase was reversed and refunded
    SpendUndone {
        character: CharacterId,
        record: SpendRecord,
        xp: XpSummary,
    },

    SpecialtyAdded {
        character: CharacterId,
        skill: String,
        name: String,
        record: RecordId,
    },

    XpAwarded {
        character: CharacterId,
        amount: u32,
        xp: XpSummary,
    },
}

impl SheetEvent {
    pub fn character(&self) -> &CharacterId {
        match self {
            SheetEvent::LevelChanged { character, .. }
            | SheetEvent::XpSpent { character, .. }
            | SheetEvent::SpendUndone { character, .. }
            | SheetEvent::SpecialtyAdded { character, .. }
            | SheetEvent::XpAwarded { character, .. } => character,
        }
    }
}

/// Events emitted by the autosave worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PersistenceEvent {
    /// Character document written to the store
    Saved {
        character: CharacterId,
        fingerprint: String,
    },

    /// Write failed; the in-memory sheet is unaffected
    SaveFailed {
        character: CharacterId,
        error: String,
    },
}
