//! Persisted character document used for storage, import and export.
//!
//! The document groups traits by sheet section the way a player reads the
//! sheet. [`CharacterState`] stays the in-memory source of truth; the document
//! is only ever built from a state or turned back into one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sheet_core::{
    CharacterId, CharacterState, InstanceId, SpendRecord, StateError, TraitCatalog, TraitCategory,
    TraitSlot, XpLedger,
};

use crate::utils::hash::sha256_hex;

/// Key blood potency is stored under in the catalog and the state.
pub const BLOOD_POTENCY_KEY: &str = "blood_potency";

/// Errors raised while converting documents.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid character data: {0}")]
    InvalidState(#[from] StateError),

    #[error("document references unknown {category} '{key}'")]
    UnknownTrait { category: TraitCategory, key: String },

    #[error("document JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Discipline entry: rating plus the powers bought within it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplineEntry {
    pub level: u8,
    #[serde(default)]
    pub powers: Vec<PowerEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerEntry {
    pub name: String,
    pub level: u8,
}

/// Merit, flaw or background entry.
///
/// Repeatable traits list their instances and report the highest one as
/// `level`; everything else leaves `instances` empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedEntry {
    pub level: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<InstanceEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceEntry {
    pub id: InstanceId,
    pub level: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpData {
    pub total: u32,
    pub spent: u32,
    #[serde(default)]
    pub history: Vec<SpendRecord>,
}

/// Whole-character document in its persisted JSON shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CharacterId>,
    pub name: String,
    #[serde(default)]
    pub clan: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, u8>,
    #[serde(default)]
    pub skills: BTreeMap<String, u8>,
    #[serde(default)]
    pub specialties: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub disciplines: BTreeMap<String, DisciplineEntry>,
    #[serde(default)]
    pub rituals: BTreeMap<String, u8>,
    #[serde(default)]
    pub merits: BTreeMap<String, RatedEntry>,
    #[serde(default)]
    pub flaws: BTreeMap<String, RatedEntry>,
    #[serde(default)]
    pub backgrounds: BTreeMap<String, RatedEntry>,
    #[serde(default)]
    pub blood_potency: u8,
    #[serde(default)]
    pub xp_data: XpData,
    /// Id the next purchased instance receives; keeps ids unique across reloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_instance: Option<InstanceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CharacterDocument {
    /// Captures `state` in document form. `updated_at` is left unset.
    pub fn from_state(state: &CharacterState) -> Self {
        let mut disciplines: BTreeMap<String, DisciplineEntry> = state
            .traits(TraitCategory::Discipline)
            .map(|(key, slot)| {
                let entry = DisciplineEntry {
                    level: slot.reported_level(),
                    powers: Vec::new(),
                };
                (key.to_string(), entry)
            })
            .collect();
        for (key, entry) in disciplines.iter_mut() {
            entry.powers = state
                .powers(key)
                .map(|power| PowerEntry {
                    name: power.name.clone(),
                    level: power.unlock_level,
                })
                .collect();
        }

        let specialties = state
            .all_specialties()
            .filter(|(_, names)| !names.is_empty())
            .map(|(skill, names)| (skill.to_string(), names.to_vec()))
            .collect();

        let xp = state.xp();
        Self {
            id: state.id().cloned(),
            name: state.name().to_string(),
            clan: state.clan().map(str::to_string),
            attributes: plain_levels(state, TraitCategory::Attribute),
            skills: plain_levels(state, TraitCategory::Skill),
            specialties,
            disciplines,
            rituals: plain_levels(state, TraitCategory::Ritual),
            merits: rated(state, TraitCategory::Merit),
            flaws: rated(state, TraitCategory::Flaw),
            backgrounds: rated(state, TraitCategory::Background),
            blood_potency: state.level(TraitCategory::BloodPotency, BLOOD_POTENCY_KEY),
            xp_data: XpData {
                total: xp.total(),
                spent: xp.spent(),
                history: xp.history().to_vec(),
            },
            next_instance: Some(state.next_instance_id()),
            updated_at: None,
        }
    }

    /// Rebuilds the character, checking the XP and slot invariants.
    pub fn into_state(self) -> Result<CharacterState, DocumentError> {
        let ledger = XpLedger::restore(
            self.xp_data.total,
            self.xp_data.spent,
            self.xp_data.history,
        )?;

        let mut builder = CharacterState::builder(self.name)
            .clan(self.clan.as_deref())
            .xp(ledger)
            .level(
                TraitCategory::BloodPotency,
                BLOOD_POTENCY_KEY,
                self.blood_potency,
            );
        if let Some(id) = self.id {
            builder = builder.id(id);
        }
        if let Some(next) = self.next_instance {
            builder = builder.next_instance(next);
        }

        for (category, levels) in [
            (TraitCategory::Attribute, self.attributes),
            (TraitCategory::Skill, self.skills),
            (TraitCategory::Ritual, self.rituals),
        ] {
            for (key, level) in levels {
                builder = builder.level(category, &key, level);
            }
        }

        for (key, discipline) in self.disciplines {
            builder = builder.level(TraitCategory::Discipline, &key, discipline.level);
            for power in discipline.powers {
                builder = builder.power(&key, power.name, power.level);
            }
        }

        for (category, entries) in [
            (TraitCategory::Merit, self.merits),
            (TraitCategory::Flaw, self.flaws),
            (TraitCategory::Background, self.backgrounds),
        ] {
            for (key, entry) in entries {
                if entry.instances.is_empty() {
                    builder = builder.level(category, &key, entry.level);
                } else {
                    for instance in entry.instances {
                        builder = builder.instance(category, &key, instance.id, instance.level);
                    }
                }
            }
        }

        for (skill, names) in self.specialties {
            for name in names {
                builder = builder.specialty(&skill, &name);
            }
        }

        Ok(builder.build()?)
    }

    /// Like [`into_state`](Self::into_state), but every trait, power and
    /// specialty skill must exist in `catalog`.
    pub fn into_state_checked(self, catalog: &TraitCatalog) -> Result<CharacterState, DocumentError> {
        self.check_against(catalog)?;
        self.into_state()
    }

    /// Fingerprint of the document content, ignoring `updated_at`.
    ///
    /// BTreeMap ordering keeps the JSON canonical, so equal characters always
    /// hash the same.
    pub fn fingerprint(&self) -> Result<String, DocumentError> {
        let mut canonical = self.clone();
        canonical.updated_at = None;
        let bytes = serde_json::to_vec(&canonical)?;
        Ok(sha256_hex(&bytes))
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    fn check_against(&self, catalog: &TraitCatalog) -> Result<(), DocumentError> {
        let known = |category: TraitCategory, key: &str| {
            if catalog.entry(category, key).is_some() {
                Ok(())
            } else {
                Err(DocumentError::UnknownTrait {
                    category,
                    key: key.to_string(),
                })
            }
        };

        for (category, keys) in [
            (TraitCategory::Attribute, keys_of(&self.attributes)),
            (TraitCategory::Skill, keys_of(&self.skills)),
            (TraitCategory::Skill, keys_of(&self.specialties)),
            (TraitCategory::Discipline, keys_of(&self.disciplines)),
            (TraitCategory::Ritual, keys_of(&self.rituals)),
            (TraitCategory::Merit, keys_of(&self.merits)),
            (TraitCategory::Flaw, keys_of(&self.flaws)),
            (TraitCategory::Background, keys_of(&self.backgrounds)),
        ] {
            for key in keys {
                known(category, key)?;
            }
        }

        for (key, discipline) in &self.disciplines {
            let Some(entry) = catalog.entry(TraitCategory::Discipline, key) else {
                continue;
            };
            if let Some(power) = discipline
                .powers
                .iter()
                .find(|power| entry.power(&power.name).is_none())
            {
                return Err(DocumentError::UnknownTrait {
                    category: TraitCategory::Discipline,
                    key: format!("{key}/{}", power.name),
                });
            }
        }

        if self.blood_potency > 0 {
            known(TraitCategory::BloodPotency, BLOOD_POTENCY_KEY)?;
        }
        Ok(())
    }
}

fn keys_of<V>(map: &BTreeMap<String, V>) -> Vec<&str> {
    map.keys().map(String::as_str).collect()
}

fn plain_levels(state: &CharacterState, category: TraitCategory) -> BTreeMap<String, u8> {
    state
        .traits(category)
        .map(|(key, slot)| (key.to_string(), slot.reported_level()))
        .collect()
}

fn rated(state: &CharacterState, category: TraitCategory) -> BTreeMap<String, RatedEntry> {
    state
        .traits(category)
        .map(|(key, slot)| {
            let instances = match slot {
                TraitSlot::Level(_) => Vec::new(),
                TraitSlot::Instances(instances) => instances
                    .iter()
                    .map(|instance| InstanceEntry {
                        id: instance.id,
                        level: instance.level,
                    })
                    .collect(),
            };
            let entry = RatedEntry {
                level: slot.reported_level(),
                instances,
            };
            (key.to_string(), entry)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_core::{
        Confirmation, LevelNotation, PriceContext, SheetConfig, SpendEngine, TraitEntry,
    };

    fn catalog() -> TraitCatalog {
        TraitCatalog::from_parts(
            [
                TraitEntry::new(TraitCategory::Attribute, "Wits", LevelNotation::Range { min: 1, max: 5 }),
                TraitEntry::new(TraitCategory::Skill, "Occult", LevelNotation::Range { min: 1, max: 5 }),
                TraitEntry::new(TraitCategory::Discipline, "Auspex", LevelNotation::Range { min: 1, max: 5 })
                    .with_power("Sense the Unseen", 1)
                    .with_power("Premonition", 2),
                TraitEntry::new(TraitCategory::Background, "Allies", LevelNotation::Repeatable { min: 1, max: 5 }),
                TraitEntry::new(TraitCategory::Merit, "Iron Gullet", LevelNotation::Fixed(3)),
            ],
            [],
        )
        .unwrap()
    }

    fn played_state(catalog: &TraitCatalog) -> CharacterState {
        let mut state = CharacterState::builder("Nines Rodriguez")
            .id(CharacterId("nines".into()))
            .clan(Some("brujah"))
            .level(TraitCategory::Attribute, "wits", 2)
            .xp(XpLedger::new(60))
            .build()
            .unwrap();
        let config = SheetConfig::default();
        let ctx = PriceContext::default();
        let mut engine = SpendEngine::new(catalog, &mut state, &config);
        engine
            .spend(TraitCategory::Skill, "occult", 2, &ctx, Confirmation::NotGiven)
            .unwrap();
        engine
            .spend(TraitCategory::Discipline, "auspex", 1, &ctx, Confirmation::NotGiven)
            .unwrap();
        engine
            .spend(TraitCategory::Background, "allies", 2, &ctx, Confirmation::NotGiven)
            .unwrap();
        engine.add_specialty("occult", "Kabbalah").unwrap();
        state
    }

    #[test]
    fn round_trip_preserves_sheet() {
        let catalog = catalog();
        let mut state = played_state(&catalog);
        sheet_core::TraitLevelController::new(&catalog, &mut state)
            .acquire_power("auspex", "Sense the Unseen")
            .unwrap();

        let document = CharacterDocument::from_state(&state);
        assert_eq!(document.attributes.get("wits"), Some(&2));
        assert_eq!(document.skills.get("occult"), Some(&2));
        assert_eq!(document.disciplines["auspex"].powers.len(), 1);
        assert_eq!(document.backgrounds["allies"].instances.len(), 1);
        assert_eq!(document.specialties["occult"], vec!["Kabbalah".to_string()]);

        let json = document.to_json().unwrap();
        let restored = CharacterDocument::from_json(&json)
            .unwrap()
            .into_state_checked(&catalog)
            .unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn removed_instance_ids_stay_taken_after_reload() {
        let catalog = catalog();
        let mut state = played_state(&catalog);
        let bought = state.instances(TraitCategory::Background, "allies")[0].id;
        sheet_core::TraitLevelController::new(&catalog, &mut state)
            .remove_instance(TraitCategory::Background, "allies", bought)
            .unwrap();

        let document = CharacterDocument::from_state(&state);
        assert_eq!(document.next_instance, Some(state.next_instance_id()));
        let value: serde_json::Value = serde_json::from_str(&document.to_json().unwrap()).unwrap();
        assert_eq!(value["nextInstance"], state.next_instance_id().0);

        let restored = CharacterDocument::from_json(&document.to_json().unwrap())
            .unwrap()
            .into_state()
            .unwrap();
        assert!(restored.next_instance_id() > bought);
        assert_eq!(restored.next_instance_id(), state.next_instance_id());
    }

    #[test]
    fn json_uses_camel_case_sections() {
        let catalog = catalog();
        let document = CharacterDocument::from_state(&played_state(&catalog));
        let value: serde_json::Value = serde_json::from_str(&document.to_json().unwrap()).unwrap();

        assert_eq!(value["xpData"]["total"], 60);
        assert_eq!(value["bloodPotency"], 0);
        assert_eq!(value["xpData"]["history"][0]["traitKey"], "occult");
        assert_eq!(value["xpData"]["history"][0]["fromLevel"], 0);
        assert!(value.get("updatedAt").is_none());
    }

    #[test]
    fn rejects_spent_above_total() {
        let document = CharacterDocument {
            name: "Broke".into(),
            xp_data: XpData {
                total: 5,
                spent: 9,
                history: Vec::new(),
            },
            ..CharacterDocument::default()
        };
        assert!(matches!(
            document.into_state(),
            Err(DocumentError::InvalidState(StateError::SpentExceedsTotal { .. }))
        ));
    }

    #[test]
    fn checked_import_rejects_unknown_traits() {
        let catalog = catalog();
        let mut document = CharacterDocument::from_state(&played_state(&catalog));
        document.skills.insert("basket_weaving".into(), 2);

        let err = document.into_state_checked(&catalog).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::UnknownTrait { category: TraitCategory::Skill, ref key } if key == "basket_weaving"
        ));
    }

    #[test]
    fn fingerprint_ignores_timestamp() {
        let catalog = catalog();
        let mut document = CharacterDocument::from_state(&played_state(&catalog));
        let before = document.fingerprint().unwrap();

        document.updated_at = Some(Utc::now());
        assert_eq!(document.fingerprint().unwrap(), before);

        document.skills.insert("occult".into(), 3);
        assert_ne!(document.fingerprint().unwrap(), before);
    }
}
