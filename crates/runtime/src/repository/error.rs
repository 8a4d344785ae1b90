//! Error types raised by repository implementations.

use sheet_core::CharacterId;
use thiserror::Error;

use crate::document::DocumentError;

/// Errors surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("character repository lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("character {0} does not exist")]
    NotFound(CharacterId),

    #[error("'{0}' is not a valid character id")]
    InvalidId(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
