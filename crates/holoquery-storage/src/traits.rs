//! Record source trait definitions

use crate::error::StorageResult;
use async_trait::async_trait;
use holoquery_core::{Key, Record};
use std::sync::Arc;

/// Index state of one entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Loaded and indexed
    Ready,
    /// Records loaded but indices not built yet
    Pending,
    /// Never loaded
    NotLoaded,
    /// Index construction failed
    Failed(String),
}

impl Availability {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Human readable reason the entity cannot serve queries
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Ready => None,
            Self::Pending => Some("index not built".to_string()),
            Self::NotLoaded => Some("no dataset loaded".to_string()),
            Self::Failed(reason) => Some(reason.clone()),
        }
    }
}

/// Read-only access to indexed records
///
/// The in-memory store answers immediately; a remote-backed source may
/// suspend on every lookup.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Record with the given primary key
    async fn get(&self, entity: &str, key: &Key) -> StorageResult<Option<Arc<Record>>>;

    /// Records whose `field` equals `key`, in dataset order
    async fn get_by_foreign_key(
        &self,
        entity: &str,
        field: &str,
        key: &Key,
    ) -> StorageResult<Vec<Arc<Record>>>;

    /// Every record of an entity type, in dataset order
    async fn all(&self, entity: &str) -> StorageResult<Vec<Arc<Record>>>;

    /// Index state of an entity type
    fn availability(&self, entity: &str) -> Availability;
}
