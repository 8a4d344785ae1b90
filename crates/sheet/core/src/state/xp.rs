//! Experience ledger and the append-only spend history.

use crate::catalog::TraitCategory;
use crate::state::{InstanceId, StateError};

/// Identifier of a history entry, unique per character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RecordId(pub u64);

impl core::fmt::Display for RecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One purchase in the experience history.
///
/// `cost` is always the value the pricing engine produced for this purchase,
/// so undoing the record refunds exactly what was charged.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SpendRecord {
    pub id: RecordId,
    pub category: TraitCategory,
    pub trait_key: String,
    pub from_level: u8,
    pub to_level: u8,
    pub cost: u32,
    pub note: String,
    /// Set when the purchase added a specialty instead of changing a level.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub specialty_name: Option<String>,
    /// Repeatable trait instance the purchase created or raised.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub instance: Option<InstanceId>,
}

/// Purchase details before the ledger assigns an id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PendingRecord {
    pub category: TraitCategory,
    pub trait_key: String,
    pub from_level: u8,
    pub to_level: u8,
    pub cost: u32,
    pub note: String,
    pub specialty_name: Option<String>,
    pub instance: Option<InstanceId>,
}

/// Snapshot of the XP totals handed to views.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XpSummary {
    pub total: u32,
    pub spent: u32,
    pub available: u32,
}

/// Experience totals and history.
///
/// Invariant: `spent <= total`. Only the spend engine charges or refunds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct XpLedger {
    total: u32,
    spent: u32,
    history: Vec<SpendRecord>,
    next_record: u64,
}

impl XpLedger {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Rebuilds a ledger from persisted values, checking the invariant.
    pub fn restore(total: u32, spent: u32, history: Vec<SpendRecord>) -> Result<Self, StateError> {
        if spent > total {
            return Err(StateError::SpentExceedsTotal { total, spent });
        }
        let next_record = history
            .iter()
            .map(|record| record.id.0 + 1)
            .max()
            .unwrap_or(0);
        Ok(Self {
            total,
            spent,
            history,
            next_record,
        })
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn spent(&self) -> u32 {
        self.spent
    }

    pub fn available(&self) -> u32 {
        self.total - self.spent
    }

    pub fn summary(&self) -> XpSummary {
        XpSummary {
            total: self.total,
            spent: self.spent,
            available: self.available(),
        }
    }

    /// History in purchase order (oldest first).
    pub fn history(&self) -> &[SpendRecord] {
        &self.history
    }

    pub fn record(&self, id: RecordId) -> Option<&SpendRecord> {
        self.history.iter().find(|record| record.id == id)
    }

    /// Most recent purchase still on the books.
    pub fn latest(&self) -> Option<&SpendRecord> {
        self.history.last()
    }

    /// Grants experience. Returns the new total.
    pub fn award(&mut self, amount: u32) -> u32 {
        self.total = self.total.saturating_add(amount);
        self.total
    }

    /// Overwrites the total; refused when it would drop below what is spent.
    pub fn set_total(&mut self, total: u32) -> Result<(), StateError> {
        if total < self.spent {
            return Err(StateError::SpentExceedsTotal {
                total,
                spent: self.spent,
            });
        }
        self.total = total;
        Ok(())
    }

    /// Charges `pending.cost` and appends the record.
    ///
    /// Callers check affordability first; an unaffordable charge is a bug.
    pub(crate) fn charge(&mut self, pending: PendingRecord) -> Result<SpendRecord, StateError> {
        let spent = self
            .spent
            .checked_add(pending.cost)
            .filter(|spent| *spent <= self.total)
            .ok_or(StateError::SpentExceedsTotal {
                total: self.total,
                spent: self.spent.saturating_add(pending.cost),
            })?;

        let record = SpendRecord {
            id: RecordId(self.next_record),
            category: pending.category,
            trait_key: pending.trait_key,
            from_level: pending.from_level,
            to_level: pending.to_level,
            cost: pending.cost,
            note: pending.note,
            specialty_name: pending.specialty_name,
            instance: pending.instance,
        };
        self.next_record += 1;
        self.spent = spent;
        self.history.push(record.clone());
        Ok(record)
    }

    /// Removes a record from history and refunds its cost.
    pub(crate) fn refund(&mut self, id: RecordId) -> Option<SpendRecord> {
        let index = self.history.iter().position(|record| record.id == id)?;
        let record = self.history.remove(index);
        self.spent = self.spent.saturating_sub(record.cost);
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(cost: u32) -> PendingRecord {
        PendingRecord {
            category: TraitCategory::Skill,
            trait_key: "brawl".into(),
            from_level: 0,
            to_level: 1,
            cost,
            note: "Brawl 0 → 1".into(),
            specialty_name: None,
            instance: None,
        }
    }

    #[test]
    fn charge_appends_and_assigns_ids() {
        let mut ledger = XpLedger::new(10);
        let first = ledger.charge(pending(3)).unwrap();
        let second = ledger.charge(pending(3)).unwrap();
        assert_eq!(first.id, RecordId(0));
        assert_eq!(second.id, RecordId(1));
        assert_eq!(ledger.spent(), 6);
        assert_eq!(ledger.available(), 4);
        assert_eq!(ledger.history().len(), 2);
    }

    #[test]
    fn charge_refuses_overspend() {
        let mut ledger = XpLedger::new(2);
        assert!(ledger.charge(pending(3)).is_err());
        assert_eq!(ledger.spent(), 0);
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn refund_removes_record_once() {
        let mut ledger = XpLedger::new(10);
        let record = ledger.charge(pending(3)).unwrap();
        assert!(ledger.refund(record.id).is_some());
        assert!(ledger.refund(record.id).is_none());
        assert_eq!(ledger.spent(), 0);
    }

    #[test]
    fn ids_stay_unique_after_refund() {
        let mut ledger = XpLedger::new(10);
        let first = ledger.charge(pending(3)).unwrap();
        ledger.refund(first.id);
        let next = ledger.charge(pending(3)).unwrap();
        assert_ne!(first.id, next.id);
    }

    #[test]
    fn total_cannot_drop_below_spent() {
        let mut ledger = XpLedger::new(10);
        ledger.charge(pending(6)).unwrap();
        assert!(ledger.set_total(5).is_err());
        assert!(ledger.set_total(6).is_ok());
        assert_eq!(ledger.award(4), 10);
    }

    #[test]
    fn restore_checks_invariant() {
        assert!(XpLedger::restore(5, 6, Vec::new()).is_err());
        let ledger = XpLedger::restore(10, 3, Vec::new()).unwrap();
        assert_eq!(ledger.available(), 7);
    }
}
