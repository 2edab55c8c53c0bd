//! Storage error types

use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Storage-specific error types
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Unknown entity type: {0}")]
    UnknownEntity(String),

    #[error("Duplicate primary key in {entity}: {key}")]
    DuplicateKey { entity: String, key: String },

    #[error("Record {position} of {entity} has no usable primary key '{field}'")]
    MissingKey {
        entity: String,
        field: String,
        position: usize,
    },

    #[error("Dataset unavailable for {entity}: {reason}")]
    Unavailable { entity: String, reason: String },

    #[error("No foreign-key index on {entity}.{field}")]
    NotIndexed { entity: String, field: String },

    #[error("Invalid dataset for {entity}: {reason}")]
    InvalidDataset { entity: String, reason: String },

    #[error("Schema error: {0}")]
    Schema(#[from] holoquery_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<StorageError> for holoquery_core::Error {
    fn from(err: StorageError) -> Self {
        use holoquery_core::Error;

        match err {
            StorageError::UnknownEntity(entity) => Error::UnknownEntity(entity),
            StorageError::DuplicateKey { entity, key } => Error::DuplicateKey { entity, key },
            StorageError::MissingKey {
                entity,
                field,
                position,
            } => Error::MissingKey {
                entity,
                field,
                position,
            },
            StorageError::Unavailable { entity, reason } => {
                Error::DatasetUnavailable { entity, reason }
            }
            StorageError::Schema(err) => err,
            StorageError::Io(err) => Error::Io(err),
            StorageError::Serialization(err) => Error::Serialization(err),
            other => Error::Internal(other.to_string()),
        }
    }
}
