//! In-memory character store for tests and headless sessions.

use std::collections::BTreeMap;
use std::sync::RwLock;

use sheet_core::{CharacterId, CharacterState};

use crate::repository::{
    CharacterRepository, RepositoryError, Result, SettingsRepository, id_or_new,
};

/// In-memory implementation of [`CharacterRepository`] and
/// [`SettingsRepository`].
///
/// Saved states are cloned in with their id filled in, so a later load
/// always returns a state that knows where it lives.
#[derive(Debug, Default)]
pub struct InMemoryCharacterRepo {
    characters: RwLock<BTreeMap<CharacterId, CharacterState>>,
    settings: RwLock<BTreeMap<String, String>>,
}

impl InMemoryCharacterRepo {
    /// Create a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored characters.
    pub fn len(&self) -> usize {
        self.characters
            .read()
            .map(|characters| characters.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CharacterRepository for InMemoryCharacterRepo {
    fn load(&self, id: &CharacterId) -> Result<Option<CharacterState>> {
        let characters = self
            .characters
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(characters.get(id).cloned())
    }

    fn save(&self, state: &CharacterState) -> Result<CharacterId> {
        let id = id_or_new(state);
        let mut stored = state.clone();
        stored.set_id(id.clone());

        let mut characters = self
            .characters
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        characters.insert(id.clone(), stored);
        Ok(id)
    }

    fn delete(&self, id: &CharacterId) -> Result<()> {
        let mut characters = self
            .characters
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        characters.remove(id);
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<CharacterId>> {
        let characters = self
            .characters
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(characters.keys().cloned().collect())
    }

    fn exists(&self, id: &CharacterId) -> bool {
        self.characters
            .read()
            .map(|characters| characters.contains_key(id))
            .unwrap_or(false)
    }
}

impl SettingsRepository for InMemoryCharacterRepo {
    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let settings = self
            .settings
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(settings.get(key).cloned())
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let mut settings = self
            .settings
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        settings.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_core::TraitCategory;

    #[test]
    fn save_assigns_id_and_load_returns_copy() {
        let repo = InMemoryCharacterRepo::new();
        let mut state = CharacterState::new("Beckett");
        state.award_xp(12);

        let id = repo.save(&state).unwrap();
        assert_eq!(id.0.len(), 16);

        let loaded = repo.load(&id).unwrap().unwrap();
        assert_eq!(loaded.id(), Some(&id));
        assert_eq!(loaded.xp().total(), 12);
        assert!(repo.exists(&id));
        assert_eq!(repo.list_ids().unwrap(), vec![id]);
    }

    #[test]
    fn save_with_id_overwrites() {
        let repo = InMemoryCharacterRepo::new();
        let id = CharacterId("sheet".into());
        let state = CharacterState::builder("Lucita")
            .id(id.clone())
            .level(TraitCategory::Skill, "melee", 2)
            .build()
            .unwrap();
        repo.save(&state).unwrap();

        let updated = CharacterState::builder("Lucita")
            .id(id.clone())
            .level(TraitCategory::Skill, "melee", 4)
            .build()
            .unwrap();
        assert_eq!(repo.save(&updated).unwrap(), id);

        let loaded = repo.load(&id).unwrap().unwrap();
        assert_eq!(loaded.level(TraitCategory::Skill, "melee"), 4);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn delete_is_idempotent() {
        let repo = InMemoryCharacterRepo::new();
        let id = repo.save(&CharacterState::new("Anatole")).unwrap();

        repo.delete(&id).unwrap();
        repo.delete(&id).unwrap();
        assert!(repo.load(&id).unwrap().is_none());
        assert!(repo.is_empty());
    }

    #[test]
    fn settings_round_trip() {
        let repo = InMemoryCharacterRepo::new();
        assert_eq!(repo.get_setting("theme").unwrap(), None);

        repo.set_setting("theme", "dark").unwrap();
        repo.set_setting("theme", "light").unwrap();
        assert_eq!(repo.get_setting("theme").unwrap().as_deref(), Some("light"));
    }
}
