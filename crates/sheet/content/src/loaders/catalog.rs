//! Trait catalog loader.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sheet_core::{
    Clan, LevelNotation, NotationError, PowerDefinition, TraitCatalog, TraitCategory, TraitEntry,
    normalize_key,
};

use crate::bundled;
use crate::loaders::{LoadResult, read_file};

/// One catalog entry as written in RON.
///
/// `notation` uses the rulebook dot notation (`"• - •••"`, `"•• or ••••"`,
/// `"• +"`). `key` defaults to the normalized name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitSpec {
    pub category: TraitCategory,
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,
    pub notation: String,
    #[serde(default)]
    pub powers: Vec<PowerDefinition>,
}

/// Clan as written in RON. Discipline names are normalized into keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClanSpec {
    pub name: String,
    #[serde(default)]
    pub disciplines: Vec<String>,
    #[serde(default)]
    pub caitiff: bool,
}

/// Catalog file structure for RON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub traits: Vec<TraitSpec>,
    #[serde(default)]
    pub clans: Vec<ClanSpec>,
}

/// An entry whose notation did not parse and was replaced by
/// [`LevelNotation::FALLBACK`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotationFallback {
    pub category: TraitCategory,
    pub key: String,
    pub raw: String,
    pub reason: NotationError,
}

/// Loaded catalog plus the notations that needed the fallback.
#[derive(Debug, Clone)]
pub struct CatalogContent {
    pub catalog: TraitCatalog,
    pub fallbacks: Vec<NotationFallback>,
}

/// Loader for the trait catalog from RON files.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load a catalog from a RON file containing a [`CatalogFile`].
    pub fn load(path: &Path) -> LoadResult<CatalogContent> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load catalog {}: {}", path.display(), e))
    }

    /// Load the catalog compiled into the crate.
    pub fn builtin() -> LoadResult<CatalogContent> {
        Self::parse(bundled::CATALOG_RON)
    }

    /// Parse catalog RON text.
    pub fn parse(content: &str) -> LoadResult<CatalogContent> {
        let file: CatalogFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse catalog RON: {}", e))?;
        Self::build(file)
    }

    /// Turn a parsed file into a catalog, rejecting duplicate keys.
    pub fn build(file: CatalogFile) -> LoadResult<CatalogContent> {
        let mut catalog = TraitCatalog::new();
        let mut fallbacks = Vec::new();

        for spec in file.traits {
            let key = normalize_key(spec.key.as_deref().unwrap_or(&spec.name));
            let notation = match LevelNotation::try_parse(&spec.notation) {
                Ok(notation) => notation,
                Err(reason) => {
                    fallbacks.push(NotationFallback {
                        category: spec.category,
                        key: key.clone(),
                        raw: spec.notation.clone(),
                        reason,
                    });
                    LevelNotation::FALLBACK
                }
            };

            let mut entry = TraitEntry::new(spec.category, spec.name, notation).with_key(&key);
            entry.powers = spec.powers;
            catalog.insert(entry)?;
        }

        for spec in file.clans {
            let clan = if spec.caitiff {
                Clan::caitiff(spec.name)
            } else {
                let disciplines: Vec<&str> = spec.disciplines.iter().map(String::as_str).collect();
                Clan::new(spec.name, &disciplines)
            };
            catalog.insert_clan(clan)?;
        }

        Ok(CatalogContent { catalog, fallbacks })
    }
}
