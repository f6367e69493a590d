//! Storage errors

use thiserror::Error;

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No registry has been saved yet
    #[error("Registry not initialized: run `veil init` first")]
    NotInitialized,

    /// Stored snapshot does not hash to its recorded root
    #[error("Data corruption detected: {0}")]
    Corruption(String),
}

impl From<bincode::Error> for StorageError {
    fn from(e: bincode::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

impl From<veil_registry::RegistryError> for StorageError {
    fn from(e: veil_registry::RegistryError) -> Self {
        StorageError::Serialization(e.to_string())
    }
}
