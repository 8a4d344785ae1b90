//! Character store adapters.
//!
//! Repositories persist whole characters and user settings. The in-memory
//! variant backs tests and headless sessions; the file variant writes one JSON
//! document per character.

mod error;
mod file;
mod memory;
mod traits;

pub use error::{RepositoryError, Result};
pub use file::FileCharacterRepository;
pub use memory::InMemoryCharacterRepo;
pub use traits::{CharacterRepository, SettingsRepository};

use sheet_core::CharacterId;

/// Generates a fresh character id (16 lowercase hex digits).
pub fn new_character_id() -> CharacterId {
    CharacterId(format!("{:016x}", rand::random::<u64>()))
}

/// Returns the id `state` already carries, or a fresh one.
pub(crate) fn id_or_new(state: &sheet_core::CharacterState) -> CharacterId {
    state.id().cloned().unwrap_or_else(new_character_id)
}
