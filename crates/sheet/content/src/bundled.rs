//! Data files compiled into the binary.
//!
//! Used when no data directory is configured or a file is missing from it.

/// Default trait catalog (RON).
pub const CATALOG_RON: &str = include_str!("../data/catalog.ron");

/// Default engine configuration (TOML).
pub const CONFIG_TOML: &str = include_str!("../data/config.toml");
