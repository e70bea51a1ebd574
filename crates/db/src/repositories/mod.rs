use thiserror::Error;

use reqflow_core::StorageError;

pub mod policy;
pub mod queries;
pub mod request;

pub use policy::{SqlManagerDirectory, SqlThresholdPolicy};
pub use queries::SqlRequestQueries;
pub use request::SqlWorkflowStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StorageError {
    fn from(value: RepositoryError) -> Self {
        StorageError::new(value.to_string())
    }
}
