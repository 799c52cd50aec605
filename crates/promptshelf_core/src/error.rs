//! Application error types for storage, wire decoding, and domain validation.
use thiserror::Error;

/// Top-level error type shared by the core crate and its front ends.
#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("Storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("Storage error: {0}")]
    StorageMessage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request failed: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,
}

impl From<redb::DatabaseError> for ShelfError {
    fn from(value: redb::DatabaseError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<redb::TransactionError> for ShelfError {
    fn from(value: redb::TransactionError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<redb::TableError> for ShelfError {
    fn from(value: redb::TableError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<redb::StorageError> for ShelfError {
    fn from(value: redb::StorageError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<redb::CommitError> for ShelfError {
    fn from(value: redb::CommitError) -> Self {
        Self::Storage(value.into())
    }
}
