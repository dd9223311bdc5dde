//! Shared error types for the services crate.

use thiserror::Error;

use cbt_core::BankError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the session engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("question bank is empty; test is not ready to start")]
    NotReady,
    #[error("no test is in progress")]
    NotRunning,
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping the engine and its collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BootstrapError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
