//! Error types for Holoquery Core

use crate::limits::LimitError;
use crate::query::FieldPath;
use serde::Serialize;
use thiserror::Error;

/// Result type alias using Holoquery's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Where in the query a parse failure happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseLocation {
    /// Position in the raw text (1-based)
    Text { line: usize, column: usize },
    /// Field path of a structurally invalid query element
    Path(FieldPath),
}

impl std::fmt::Display for ParseLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text { line, column } => write!(f, "line {}, column {}", line, column),
            Self::Path(path) => write!(f, "{}", path),
        }
    }
}

/// Holoquery error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error at {location}: {message}")]
    Parse {
        message: String,
        location: ParseLocation,
    },

    #[error("Schema validation error at {path}: {message}")]
    SchemaValidation { path: FieldPath, message: String },

    #[error("Unknown entity type: {0}")]
    UnknownEntity(String),

    #[error("Entity type already registered: {0}")]
    DuplicateEntity(String),

    #[error("Relation already declared: {entity}.{field}")]
    DuplicateRelation { entity: String, field: String },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Duplicate primary key in {entity}: {key}")]
    DuplicateKey { entity: String, key: String },

    #[error("Record {position} of {entity} has no usable primary key '{field}'")]
    MissingKey {
        entity: String,
        field: String,
        position: usize,
    },

    #[error("Dataset unavailable for {entity}: {reason}")]
    DatasetUnavailable { entity: String, reason: String },

    #[error(transparent)]
    Limit(#[from] LimitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn parse_at(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Parse {
            message: message.into(),
            location: ParseLocation::Text { line, column },
        }
    }

    pub fn parse_in(message: impl Into<String>, path: &FieldPath) -> Self {
        Self::Parse {
            message: message.into(),
            location: ParseLocation::Path(path.clone()),
        }
    }

    pub fn validation(path: &FieldPath, message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            path: path.clone(),
            message: message.into(),
        }
    }

    /// Stable category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::Parse,
            Self::SchemaValidation { .. } => ErrorKind::SchemaValidation,
            Self::UnknownEntity(_) => ErrorKind::UnknownEntity,
            Self::DuplicateEntity(_) => ErrorKind::DuplicateEntity,
            Self::DuplicateRelation { .. } => ErrorKind::DuplicateRelation,
            Self::InvalidSchema(_) => ErrorKind::InvalidSchema,
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Self::MissingKey { .. } => ErrorKind::MissingKey,
            Self::DatasetUnavailable { .. } => ErrorKind::DatasetUnavailable,
            Self::Limit(_) => ErrorKind::LimitExceeded,
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Field path the error points at, if any
    pub fn path(&self) -> Option<String> {
        match self {
            Self::SchemaValidation { path, .. } => Some(path.to_string()),
            Self::Parse {
                location: ParseLocation::Path(path),
                ..
            } => Some(path.to_string()),
            Self::DuplicateRelation { entity, field } => Some(format!("{}.{}", entity, field)),
            _ => None,
        }
    }

    /// Description without the location already carried by [`Error::path`]
    pub fn message(&self) -> String {
        match self {
            Self::SchemaValidation { message, .. } => message.clone(),
            Self::Parse {
                message,
                location: ParseLocation::Path(_),
            } => message.clone(),
            Self::Parse { message, location } => format!("{} ({})", message, location),
            other => other.to_string(),
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from(self)
    }
}

/// Error category exposed to consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "ParseError")]
    Parse,
    #[serde(rename = "SchemaValidationError")]
    SchemaValidation,
    #[serde(rename = "UnknownEntityError")]
    UnknownEntity,
    #[serde(rename = "DuplicateEntityError")]
    DuplicateEntity,
    #[serde(rename = "DuplicateRelationError")]
    DuplicateRelation,
    #[serde(rename = "InvalidSchemaError")]
    InvalidSchema,
    #[serde(rename = "DuplicateKeyError")]
    DuplicateKey,
    #[serde(rename = "MissingKeyError")]
    MissingKey,
    #[serde(rename = "DatasetUnavailableError")]
    DatasetUnavailable,
    #[serde(rename = "LimitExceededError")]
    LimitExceeded,
    #[serde(rename = "IoError")]
    Io,
    #[serde(rename = "SerializationError")]
    Serialization,
    #[serde(rename = "InternalError")]
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", self));
        f.write_str(&name)
    }
}

/// Plain, serializable view of an [`Error`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.message(),
            path: err.path(),
        }
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} at {}: {}", self.kind, path, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}
