//! Unified error types surfaced by the runtime API.
//!
//! Wraps engine rejections, repository failures and worker coordination
//! errors so clients can bubble them up with consistent context.
use sheet_core::{
    CharacterId, ControllerError, ErrorSeverity, SheetError, SpendError, StateError,
};
use thiserror::Error;
use tokio::sync::oneshot;

pub use crate::document::DocumentError;
pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Spend(#[from] SpendError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("character {0} not found")]
    CharacterNotFound(CharacterId),

    #[error("failed to load sheet content: {0}")]
    Content(String),

    #[error("autosave worker command channel closed")]
    CommandChannelClosed,

    #[error("autosave worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("autosave worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}

impl SheetError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Spend(err) => err.severity(),
            Self::Controller(err) => err.severity(),
            Self::State(err) => err.severity(),
            Self::Document(_) | Self::CharacterNotFound(_) => ErrorSeverity::Validation,
            Self::Content(_)
            | Self::Repository(_)
            | Self::CommandChannelClosed
            | Self::ReplyChannelClosed(_)
            | Self::WorkerJoin(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Spend(err) => err.error_code(),
            Self::Controller(err) => err.error_code(),
            Self::State(err) => err.error_code(),
            Self::Repository(_) => "RUNTIME_REPOSITORY",
            Self::Document(_) => "RUNTIME_DOCUMENT",
            Self::CharacterNotFound(_) => "RUNTIME_CHARACTER_NOT_FOUND",
            Self::Content(_) => "RUNTIME_CONTENT",
            Self::CommandChannelClosed => "RUNTIME_COMMAND_CHANNEL_CLOSED",
            Self::ReplyChannelClosed(_) => "RUNTIME_REPLY_CHANNEL_CLOSED",
            Self::WorkerJoin(_) => "RUNTIME_WORKER_JOIN",
        }
    }
}
