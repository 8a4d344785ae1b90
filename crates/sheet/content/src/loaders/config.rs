//! Engine configuration loader.

use std::path::Path;

use sheet_core::SheetConfig;

use crate::bundled;
use crate::loaders::{LoadResult, read_file};

/// Loader for engine configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file containing a [`SheetConfig`].
    pub fn load(path: &Path) -> LoadResult<SheetConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Load the configuration compiled into the crate.
    pub fn builtin() -> LoadResult<SheetConfig> {
        Self::parse(bundled::CONFIG_TOML)
    }

    pub fn parse(content: &str) -> LoadResult<SheetConfig> {
        let config: SheetConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_core::UndoPolicy;

    #[test]
    fn builtin_config_is_permissive() {
        let config = ConfigLoader::builtin().unwrap();
        assert_eq!(config.undo_policy, UndoPolicy::AnyRecord);
    }

    #[test]
    fn parses_policy_and_defaults() {
        let config = ConfigLoader::parse(r#"undo_policy = "mostRecentOnly""#).unwrap();
        assert_eq!(config.undo_policy, UndoPolicy::MostRecentOnly);
        assert_eq!(ConfigLoader::parse("").unwrap(), SheetConfig::default());
        assert!(ConfigLoader::parse(r#"undo_policy = "sometimes""#).is_err());
    }
}
