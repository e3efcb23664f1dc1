// access/src/errors.rs

use thiserror::Error;

use storage::StorageError;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("No patient matched the given contact")]
    NotFound,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Operation not allowed in the current state: {0}")]
    InvalidState(&'static str),

    #[error("Patient-owned account records cannot be deleted from this dashboard")]
    AccountDeletionRefused,

    #[error("Failed to acquire session lock: {0}")]
    Lock(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Serialization/Deserialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AccessError>;
