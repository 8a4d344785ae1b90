//! Content factory for loading the catalog and configuration from a data directory.

use std::path::{Path, PathBuf};

use sheet_core::SheetConfig;

use crate::loaders::{CatalogContent, CatalogLoader, ConfigLoader, LoadResult};

/// Content factory that loads sheet content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── catalog.ron
/// └── config.toml
/// ```
///
/// Missing files fall back to the bundled defaults; files that exist but do
/// not parse are errors.
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load the trait catalog from `catalog.ron`.
    pub fn load_catalog(&self) -> LoadResult<CatalogContent> {
        let path = self.data_dir.join("catalog.ron");
        if path.exists() {
            CatalogLoader::load(&path)
        } else {
            CatalogLoader::builtin()
        }
    }

    /// Load engine configuration from `config.toml`.
    pub fn load_config(&self) -> LoadResult<SheetConfig> {
        let path = self.data_dir.join("config.toml");
        if path.exists() {
            ConfigLoader::load(&path)
        } else {
            ConfigLoader::builtin()
        }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
