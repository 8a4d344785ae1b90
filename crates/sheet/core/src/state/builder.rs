//! Restores a [`CharacterState`] from persisted values.

use std::collections::BTreeMap;

use crate::catalog::{TraitCategory, normalize_key};
use crate::state::{
    AcquiredPower, CharacterId, CharacterState, InstanceId, StateError, TraitInstance, TraitSlot,
    XpLedger,
};

/// Builder used by import paths; the only public way to set levels directly.
///
/// Values are taken as-is (the document already passed through the engine
/// when it was written). `build` checks the structural invariants.
#[derive(Debug, Default)]
pub struct CharacterStateBuilder {
    id: Option<CharacterId>,
    name: String,
    clan: Option<String>,
    levels: Vec<(TraitCategory, String, u8)>,
    instances: Vec<(TraitCategory, String, TraitInstance)>,
    powers: Vec<(String, AcquiredPower)>,
    specialties: Vec<(String, String)>,
    xp: XpLedger,
    next_instance: Option<InstanceId>,
}

impl CharacterStateBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: CharacterId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn clan(mut self, clan: Option<&str>) -> Self {
        self.clan = clan.map(str::to_string);
        self
    }

    /// Plain level; zero is ignored.
    pub fn level(mut self, category: TraitCategory, key: &str, level: u8) -> Self {
        if level > 0 {
            self.levels.push((category, normalize_key(key), level));
        }
        self
    }

    pub fn instance(mut self, category: TraitCategory, key: &str, id: InstanceId, level: u8) -> Self {
        self.instances
            .push((category, normalize_key(key), TraitInstance { id, level }));
        self
    }

    pub fn power(mut self, discipline: &str, name: impl Into<String>, unlock_level: u8) -> Self {
        self.powers
            .push((normalize_key(discipline), AcquiredPower::new(name, unlock_level)));
        self
    }

    pub fn specialty(mut self, skill: &str, name: &str) -> Self {
        self.specialties
            .push((normalize_key(skill), name.trim().to_string()));
        self
    }

    pub fn xp(mut self, ledger: XpLedger) -> Self {
        self.xp = ledger;
        self
    }

    /// Stored instance counter. `build` never goes below it.
    pub fn next_instance(mut self, next: InstanceId) -> Self {
        self.next_instance = Some(next);
        self
    }

    /// Builds the state.
    ///
    /// The instance counter starts past every id a live instance or a history
    /// record uses, and past the stored counter when one was given, so an
    /// undo can never reach an instance bought after its record.
    pub fn build(self) -> Result<CharacterState, StateError> {
        let mut state = CharacterState::new(self.name);
        state.id = self.id;
        state.set_clan(self.clan.as_deref());

        for (category, key, level) in self.levels {
            state.put_level(category, &key, level);
        }

        let mut grouped: BTreeMap<(TraitCategory, String), Vec<TraitInstance>> = BTreeMap::new();
        for (category, key, instance) in self.instances {
            grouped.entry((category, key)).or_default().push(instance);
        }
        let mut next_instance = self
            .xp
            .history()
            .iter()
            .filter_map(|record| record.instance)
            .map(|instance| instance.0 + 1)
            .chain(self.next_instance.map(|next| next.0))
            .max()
            .unwrap_or(0);
        for ((category, key), instances) in grouped {
            if matches!(state.slot(category, &key), Some(TraitSlot::Level(_))) {
                return Err(StateError::MixedSlot { category, key });
            }
            for (i, instance) in instances.iter().enumerate() {
                if instances[..i].iter().any(|other| other.id == instance.id) {
                    return Err(StateError::DuplicateInstance {
                        category,
                        key,
                        instance: instance.id,
                    });
                }
                next_instance = next_instance.max(instance.id.0 + 1);
            }
            state
                .traits
                .entry(category)
                .or_default()
                .insert(key, TraitSlot::Instances(instances));
        }
        state.next_instance = next_instance;
        state.xp = self.xp;

        for (discipline, power) in self.powers {
            state.insert_power(&discipline, power);
        }
        for (skill, name) in self.specialties {
            if !state.has_specialty(&skill, &name) {
                state.push_specialty(&skill, &name);
            }
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restores_instances_and_counter() {
        let mut state = CharacterState::builder("Viktor")
            .instance(TraitCategory::Background, "allies", InstanceId(4), 2)
            .instance(TraitCategory::Background, "allies", InstanceId(7), 1)
            .build()
            .unwrap();
        assert_eq!(state.level(TraitCategory::Background, "allies"), 2);
        let next = state.push_instance(TraitCategory::Background, "allies", 1);
        assert_eq!(next, InstanceId(8));
    }

    #[test]
    fn counter_skips_ids_only_history_remembers() {
        use crate::state::SpendRecord;

        // Instance 5 was bought, then removed by a free edit
        let bought = SpendRecord {
            id: crate::state::RecordId(1),
            category: TraitCategory::Background,
            trait_key: "allies".into(),
            from_level: 0,
            to_level: 1,
            cost: 3,
            note: String::new(),
            specialty_name: None,
            instance: Some(InstanceId(5)),
        };
        let ledger = XpLedger::restore(10, 3, vec![bought]).unwrap();
        let mut state = CharacterState::builder("Viktor")
            .instance(TraitCategory::Background, "allies", InstanceId(2), 1)
            .xp(ledger)
            .build()
            .unwrap();
        assert_eq!(state.next_instance_id(), InstanceId(6));
        assert_eq!(
            state.push_instance(TraitCategory::Background, "allies", 1),
            InstanceId(6)
        );

        let stored = CharacterState::builder("Viktor")
            .next_instance(InstanceId(9))
            .build()
            .unwrap();
        assert_eq!(stored.next_instance_id(), InstanceId(9));
    }

    #[test]
    fn rejects_duplicate_instance_ids() {
        let err = CharacterState::builder("Viktor")
            .instance(TraitCategory::Merit, "linguistics", InstanceId(1), 1)
            .instance(TraitCategory::Merit, "linguistics", InstanceId(1), 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, StateError::DuplicateInstance { .. }));
    }

    #[test]
    fn rejects_mixed_slots() {
        let err = CharacterState::builder("Viktor")
            .level(TraitCategory::Merit, "linguistics", 2)
            .instance(TraitCategory::Merit, "linguistics", InstanceId(0), 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, StateError::MixedSlot { .. }));
    }

    #[test]
    fn restores_everything_else() {
        let ledger = XpLedger::restore(30, 0, Vec::new()).unwrap();
        let state = CharacterState::builder("Viktor")
            .id(CharacterId("abc".into()))
            .clan(Some("Ventrue"))
            .level(TraitCategory::Discipline, "Dominate", 2)
            .power("dominate", "Cloud Memory", 1)
            .specialty("Persuasion", "Negotiation")
            .specialty("persuasion", "negotiation")
            .xp(ledger)
            .build()
            .unwrap();
        assert_eq!(state.id().map(|id| id.0.as_str()), Some("abc"));
        assert_eq!(state.clan(), Some("ventrue"));
        assert_eq!(state.level(TraitCategory::Discipline, "dominate"), 2);
        assert!(state.has_power("dominate", "cloud memory"));
        assert_eq!(state.specialties("persuasion").len(), 1);
        assert_eq!(state.xp().available(), 30);
    }
}
