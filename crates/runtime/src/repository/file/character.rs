//! File-based character store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use sheet_core::{CharacterId, CharacterState};

use crate::document::CharacterDocument;
use crate::repository::{
    CharacterRepository, RepositoryError, Result, SettingsRepository, id_or_new,
};

const CHARACTERS_DIR: &str = "characters";
const SETTINGS_FILE: &str = "settings.json";

/// File-based implementation of [`CharacterRepository`] and
/// [`SettingsRepository`].
///
/// # File Layout
///
/// ```text
/// {base_dir}/
///   ├── characters/
///   │   ├── {id}.json
///   │   └── ...
///   └── settings.json
/// ```
///
/// Characters are stored as pretty-printed [`CharacterDocument`] JSON. Every
/// write goes to a temp file first and is renamed into place, so a crash
/// never leaves a half-written sheet behind.
pub struct FileCharacterRepository {
    base_dir: PathBuf,
    settings_lock: Mutex<()>,
}

impl FileCharacterRepository {
    /// Create a repository rooted at `base_dir`, creating the directories.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(base_dir.join(CHARACTERS_DIR)).map_err(RepositoryError::Io)?;
        Ok(Self {
            base_dir,
            settings_lock: Mutex::new(()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the JSON document for `id`.
    pub fn character_path(&self, id: &CharacterId) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self
            .base_dir
            .join(CHARACTERS_DIR)
            .join(format!("{}.json", id.0)))
    }

    /// Load the raw document for `id` without rebuilding the state.
    pub fn load_document(&self, id: &CharacterId) -> Result<Option<CharacterDocument>> {
        let path = self.character_path(id)?;
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(RepositoryError::Io)?;
        let document: CharacterDocument =
            serde_json::from_slice(&bytes).map_err(|e| RepositoryError::Json(e.to_string()))?;

        tracing::debug!("Loaded character[{}] from {}", id, path.display());

        Ok(Some(document))
    }

    fn settings_path(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE)
    }

    fn read_settings(&self) -> Result<BTreeMap<String, String>> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = fs::read(&path).map_err(RepositoryError::Io)?;
        serde_json::from_slice(&bytes).map_err(|e| RepositoryError::Json(e.to_string()))
    }
}

impl CharacterRepository for FileCharacterRepository {
    fn load(&self, id: &CharacterId) -> Result<Option<CharacterState>> {
        let Some(document) = self.load_document(id)? else {
            return Ok(None);
        };

        let mut state = document.into_state()?;
        // The file name is authoritative; documents copied between stores keep a stale id
        state.set_id(id.clone());
        Ok(Some(state))
    }

    fn save(&self, state: &CharacterState) -> Result<CharacterId> {
        let id = id_or_new(state);
        let path = self.character_path(&id)?;

        let mut document = CharacterDocument::from_state(state);
        document.id = Some(id.clone());
        document.updated_at = Some(Utc::now());

        let bytes = serde_json::to_vec_pretty(&document)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        write_atomic(&path, &bytes)?;

        tracing::debug!("Saved character[{}] to {}", id, path.display());

        Ok(id)
    }

    fn delete(&self, id: &CharacterId) -> Result<()> {
        let path = self.character_path(id)?;

        if path.exists() {
            fs::remove_file(&path).map_err(RepositoryError::Io)?;
            tracing::debug!("Deleted character[{}]", id);
        }

        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<CharacterId>> {
        let dir = self.base_dir.join(CHARACTERS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir).map_err(RepositoryError::Io)? {
            let path = entry.map_err(RepositoryError::Io)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(CharacterId(stem.to_string()));
            }
        }

        ids.sort();
        Ok(ids)
    }

    fn exists(&self, id: &CharacterId) -> bool {
        self.character_path(id)
            .map(|path| path.exists())
            .unwrap_or(false)
    }
}

impl SettingsRepository for FileCharacterRepository {
    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            .settings_lock
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(self.read_settings()?.remove(key))
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self
            .settings_lock
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;

        let mut settings = self.read_settings()?;
        settings.insert(key.to_string(), value.to_string());

        let bytes = serde_json::to_vec_pretty(&settings)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        write_atomic(&self.settings_path(), &bytes)?;

        tracing::debug!("Saved setting '{}'", key);
        Ok(())
    }
}

/// Writes `bytes` to a sibling temp file and renames it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, bytes).map_err(RepositoryError::Io)?;
    fs::rename(&temp_path, path).map_err(RepositoryError::Io)?;
    Ok(())
}

/// Ids become file names, so only `[A-Za-z0-9_-]` is accepted.
fn validate_id(id: &CharacterId) -> Result<()> {
    let valid = !id.0.is_empty()
        && id
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(RepositoryError::InvalidId(id.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_core::{TraitCategory, XpLedger};
    use tempfile::TempDir;

    fn sample_state() -> CharacterState {
        CharacterState::builder("Theo Bell")
            .clan(Some("brujah"))
            .level(TraitCategory::Attribute, "strength", 3)
            .level(TraitCategory::Discipline, "potence", 2)
            .power("potence", "Lethal Body", 1)
            .specialty("brawl", "Grappling")
            .xp(XpLedger::new(30))
            .build()
            .unwrap()
    }

    #[test]
    fn save_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileCharacterRepository::new(temp_dir.path()).unwrap();

        let state = sample_state();
        let id = repo.save(&state).unwrap();
        assert!(repo.exists(&id));
        assert!(repo.character_path(&id).unwrap().exists());

        let loaded = repo.load(&id).unwrap().unwrap();
        assert_eq!(loaded.id(), Some(&id));
        assert_eq!(loaded.name(), "Theo Bell");
        assert_eq!(loaded.level(TraitCategory::Discipline, "potence"), 2);
        assert!(loaded.has_power("potence", "Lethal Body"));
        assert!(loaded.has_specialty("brawl", "Grappling"));
        assert_eq!(loaded.xp().total(), 30);

        let document = repo.load_document(&id).unwrap().unwrap();
        assert!(document.updated_at.is_some());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileCharacterRepository::new(temp_dir.path()).unwrap();
        let id = repo.save(&sample_state()).unwrap();

        let path = repo.character_path(&id).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn list_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileCharacterRepository::new(temp_dir.path()).unwrap();

        let mut first = sample_state();
        first.set_id(CharacterId("b-sheet".into()));
        let mut second = sample_state();
        second.set_id(CharacterId("a-sheet".into()));
        repo.save(&first).unwrap();
        repo.save(&second).unwrap();
        fs::write(temp_dir.path().join(CHARACTERS_DIR).join("notes.txt"), "x").unwrap();

        let ids = repo.list_ids().unwrap();
        assert_eq!(
            ids,
            vec![CharacterId("a-sheet".into()), CharacterId("b-sheet".into())]
        );

        repo.delete(&ids[0]).unwrap();
        repo.delete(&ids[0]).unwrap();
        assert_eq!(repo.list_ids().unwrap(), vec![CharacterId("b-sheet".into())]);
        assert!(repo.load(&ids[0]).unwrap().is_none());
    }

    #[test]
    fn rejects_path_like_ids() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileCharacterRepository::new(temp_dir.path()).unwrap();

        let bad = CharacterId("../escape".into());
        assert!(matches!(
            repo.load(&bad),
            Err(RepositoryError::InvalidId(_))
        ));
        assert!(!repo.exists(&bad));
    }

    #[test]
    fn corrupted_document_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileCharacterRepository::new(temp_dir.path()).unwrap();
        let id = CharacterId("broken".into());
        fs::write(repo.character_path(&id).unwrap(), "{ not json").unwrap();

        assert!(matches!(repo.load(&id), Err(RepositoryError::Json(_))));
    }

    #[test]
    fn settings_persist_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        {
            let repo = FileCharacterRepository::new(temp_dir.path()).unwrap();
            repo.set_setting("lastCharacter", "abc").unwrap();
            repo.set_setting("theme", "dark").unwrap();
        }

        let repo = FileCharacterRepository::new(temp_dir.path()).unwrap();
        assert_eq!(repo.get_setting("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(
            repo.get_setting("lastCharacter").unwrap().as_deref(),
            Some("abc")
        );
        assert_eq!(repo.get_setting("missing").unwrap(), None);
    }
}
