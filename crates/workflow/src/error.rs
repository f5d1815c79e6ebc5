use thiserror::Error;

use vittalogic_core::directory::DirectoryError;
use vittalogic_core::errors::DomainError;
use vittalogic_db::RepositoryError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("persistence failure: {0}")]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("usage update for budget `{budget_id}` kept losing to concurrent writers")]
    Contention { budget_id: String },
}
