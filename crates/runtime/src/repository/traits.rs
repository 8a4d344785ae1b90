//! Repository contracts for the character store.

use sheet_core::{CharacterId, CharacterState};

use super::error::Result;

/// Repository for character persistence.
///
/// Characters are stored whole; every save replaces the previous copy.
pub trait CharacterRepository: Send + Sync {
    /// Load a character by id
    fn load(&self, id: &CharacterId) -> Result<Option<CharacterState>>;

    /// Save a character and return the id it was stored under.
    ///
    /// A state without an id gets a freshly generated one.
    fn save(&self, state: &CharacterState) -> Result<CharacterId>;

    /// Delete a character. Deleting an unknown id is not an error.
    fn delete(&self, id: &CharacterId) -> Result<()>;

    /// List stored character ids in ascending order
    fn list_ids(&self) -> Result<Vec<CharacterId>>;

    /// Check if a character exists
    fn exists(&self, id: &CharacterId) -> bool {
        matches!(self.load(id), Ok(Some(_)))
    }
}

/// Repository for free-form user settings (theme, last opened sheet, ...).
pub trait SettingsRepository: Send + Sync {
    fn get_setting(&self, key: &str) -> Result<Option<String>>;

    fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}
