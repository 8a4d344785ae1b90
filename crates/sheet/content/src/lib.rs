//! Trait catalog content and loaders.
//!
//! This crate houses the bundled V5 reference data and loaders for RON/TOML files:
//! - Trait catalog: attributes, skills, disciplines with powers, rituals,
//!   merits, backgrounds, flaws, blood potency (RON)
//! - Clans and their in-clan disciplines (RON, same file)
//! - Engine configuration (TOML)
//!
//! Content is read once at startup and handed to the engine as a shared
//! [`sheet_core::TraitCatalog`]; it never appears in a character record.

pub mod bundled;

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    CatalogContent, CatalogFile, CatalogLoader, ClanSpec, ConfigLoader, ContentFactory,
    NotationFallback, TraitSpec,
};
