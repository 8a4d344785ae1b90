//! Runtime services for the character sheet engine.
//!
//! This crate wires the synchronous rule engine in [`sheet_core`] to a
//! character store, a debounced autosave worker and an event bus. Consumers
//! build a [`SheetRuntime`], open a [`CharacterSession`] per character and
//! subscribe to [`Event`]s to keep views or webhooks in sync.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`session`] serializes operations on one character
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides the topic-based event bus
//! - [`repository`] and [`document`] persist characters
//! - [`config`] reads runtime settings from the environment
pub mod api;
pub mod config;
pub mod document;
pub mod events;
pub mod repository;
pub mod runtime;
pub mod session;

mod utils;
mod workers;

pub use api::{Result, RuntimeError, SaveHandle};
pub use config::RuntimeConfig;
pub use document::{CharacterDocument, DocumentError};
pub use events::{Event, EventBus, PersistenceEvent, SheetEvent, Topic};
pub use repository::{
    CharacterRepository, FileCharacterRepository, InMemoryCharacterRepo, RepositoryError,
    SettingsRepository,
};
pub use runtime::{SheetRuntime, SheetRuntimeBuilder};
pub use session::CharacterSession;
