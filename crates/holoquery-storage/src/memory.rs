//! In-memory dataset store with primary-key and foreign-key indices

use crate::error::{StorageError, StorageResult};
use crate::traits::{Availability, RecordSource};
use async_trait::async_trait;
use holoquery_core::{limits, Key, Record, SchemaRegistry};
use std::collections::HashMap;
use std::sync::Arc;

type ForeignIndex = HashMap<Key, Vec<Arc<Record>>>;

/// Derived lookup structures of one entity type
#[derive(Debug, Default)]
struct EntityIndex {
    primary: HashMap<Key, Arc<Record>>,
    /// Keyed by the target-side key field of a foreign-key relation
    foreign: HashMap<String, ForeignIndex>,
}

#[derive(Debug)]
enum IndexState {
    Pending,
    Ready(EntityIndex),
    Failed(String),
}

#[derive(Debug)]
struct EntityData {
    records: Vec<Arc<Record>>,
    state: IndexState,
}

/// Mutable store under construction
///
/// Records are loaded and indexed here, then frozen with
/// [`StoreBuilder::finish`].
pub struct StoreBuilder {
    schema: Arc<SchemaRegistry>,
    data: HashMap<String, EntityData>,
}

impl StoreBuilder {
    pub fn new(schema: Arc<SchemaRegistry>) -> Self {
        Self {
            schema,
            data: HashMap::new(),
        }
    }

    /// Store the records of an entity type in the given order
    ///
    /// Loading again replaces the previous records and drops their indices.
    pub fn load(&mut self, entity: &str, records: Vec<Record>) -> StorageResult<&mut Self> {
        if !self.schema.contains(entity) {
            return Err(StorageError::UnknownEntity(entity.to_string()));
        }
        limits::validate_record_count(entity, records.len()).map_err(holoquery_core::Error::from)?;

        tracing::debug!("Loaded {} records for {}", records.len(), entity);
        self.data.insert(
            entity.to_string(),
            EntityData {
                records: records.into_iter().map(Arc::new).collect(),
                state: IndexState::Pending,
            },
        );
        Ok(self)
    }

    /// Mark an entity type unavailable without records, e.g. when its
    /// dataset could not be parsed
    pub fn fail(&mut self, entity: &str, reason: impl Into<String>) -> &mut Self {
        if self.schema.contains(entity) {
            self.data.insert(
                entity.to_string(),
                EntityData {
                    records: Vec::new(),
                    state: IndexState::Failed(reason.into()),
                },
            );
        }
        self
    }

    /// Build the primary-key index and every foreign-key index stored on
    /// this entity type
    ///
    /// A failure marks the entity as unavailable; other entity types are
    /// unaffected.
    pub fn build_index(&mut self, entity: &str) -> StorageResult<&mut Self> {
        let def = self
            .schema
            .get(entity)
            .ok_or_else(|| StorageError::UnknownEntity(entity.to_string()))?;
        let data = self
            .data
            .get_mut(entity)
            .ok_or_else(|| StorageError::Unavailable {
                entity: entity.to_string(),
                reason: "no dataset loaded".to_string(),
            })?;

        let mut foreign_fields: Vec<&str> = Vec::new();
        for relation in self.schema.foreign_keys_into(entity) {
            if !foreign_fields.contains(&relation.key_field.as_str()) {
                foreign_fields.push(&relation.key_field);
            }
        }

        match index_records(entity, &def.primary_key, &foreign_fields, &data.records) {
            Ok(index) => {
                tracing::debug!(
                    "Indexed {}: {} keys, {} foreign-key indices",
                    entity,
                    index.primary.len(),
                    index.foreign.len()
                );
                data.state = IndexState::Ready(index);
                Ok(self)
            }
            Err(err) => {
                tracing::warn!("Index construction failed for {}: {}", entity, err);
                data.state = IndexState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Index every loaded entity type not yet indexed, collecting failures
    pub fn build_all(&mut self) -> Vec<StorageError> {
        let mut entities: Vec<String> = self
            .data
            .iter()
            .filter(|(_, data)| matches!(data.state, IndexState::Pending))
            .map(|(entity, _)| entity.clone())
            .collect();
        entities.sort();

        entities
            .iter()
            .filter_map(|entity| self.build_index(entity).err())
            .collect()
    }

    /// Freeze the store
    pub fn finish(self) -> MemoryStore {
        for def in self.schema.entities() {
            if !self.data.contains_key(&def.name) {
                tracing::warn!("No dataset loaded for {}", def.name);
            }
        }

        MemoryStore {
            schema: self.schema,
            data: self.data,
        }
    }
}

fn index_records(
    entity: &str,
    primary_key: &str,
    foreign_fields: &[&str],
    records: &[Arc<Record>],
) -> StorageResult<EntityIndex> {
    let mut index = EntityIndex::default();
    for field in foreign_fields {
        index.foreign.insert(field.to_string(), HashMap::new());
    }

    for (position, record) in records.iter().enumerate() {
        let key = Key::from_field(record, primary_key).ok_or_else(|| StorageError::MissingKey {
            entity: entity.to_string(),
            field: primary_key.to_string(),
            position,
        })?;

        if index.primary.contains_key(&key) {
            return Err(StorageError::DuplicateKey {
                entity: entity.to_string(),
                key: key.to_string(),
            });
        }
        index.primary.insert(key, Arc::clone(record));

        for (field, by_value) in index.foreign.iter_mut() {
            // Records without a usable key simply never match
            if let Some(value) = Key::from_field(record, field) {
                by_value.entry(value).or_default().push(Arc::clone(record));
            }
        }
    }

    Ok(index)
}

/// Immutable, indexed in-memory store
///
/// Built once through [`StoreBuilder`] and shared read-only between queries.
#[derive(Debug)]
pub struct MemoryStore {
    schema: Arc<SchemaRegistry>,
    data: HashMap<String, EntityData>,
}

impl MemoryStore {
    pub fn builder(schema: Arc<SchemaRegistry>) -> StoreBuilder {
        StoreBuilder::new(schema)
    }

    pub fn schema(&self) -> &Arc<SchemaRegistry> {
        &self.schema
    }

    fn ready_index(&self, entity: &str) -> StorageResult<(&EntityData, &EntityIndex)> {
        let data = self.data.get(entity).ok_or_else(|| {
            if self.schema.contains(entity) {
                StorageError::Unavailable {
                    entity: entity.to_string(),
                    reason: "no dataset loaded".to_string(),
                }
            } else {
                StorageError::UnknownEntity(entity.to_string())
            }
        })?;

        match &data.state {
            IndexState::Ready(index) => Ok((data, index)),
            IndexState::Pending => Err(StorageError::Unavailable {
                entity: entity.to_string(),
                reason: "index not built".to_string(),
            }),
            IndexState::Failed(reason) => Err(StorageError::Unavailable {
                entity: entity.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    /// Record with the given primary key
    pub fn get(&self, entity: &str, key: &Key) -> StorageResult<Option<Arc<Record>>> {
        let (_, index) = self.ready_index(entity)?;
        Ok(index.primary.get(key).cloned())
    }

    /// Records whose `field` equals `key`, in dataset order
    pub fn get_by_foreign_key(
        &self,
        entity: &str,
        field: &str,
        key: &Key,
    ) -> StorageResult<Vec<Arc<Record>>> {
        let (_, index) = self.ready_index(entity)?;
        let by_value = index
            .foreign
            .get(field)
            .ok_or_else(|| StorageError::NotIndexed {
                entity: entity.to_string(),
                field: field.to_string(),
            })?;
        Ok(by_value.get(key).cloned().unwrap_or_default())
    }

    /// Every record of an indexed entity type, in dataset order
    pub fn all(&self, entity: &str) -> StorageResult<&[Arc<Record>]> {
        let (data, _) = self.ready_index(entity)?;
        Ok(&data.records)
    }

    /// Loaded records regardless of index state, for browsing
    pub fn records(&self, entity: &str) -> StorageResult<&[Arc<Record>]> {
        if !self.schema.contains(entity) {
            return Err(StorageError::UnknownEntity(entity.to_string()));
        }
        Ok(self
            .data
            .get(entity)
            .map(|d| d.records.as_slice())
            .unwrap_or_default())
    }

    pub fn availability(&self, entity: &str) -> Availability {
        match self.data.get(entity).map(|d| &d.state) {
            None => Availability::NotLoaded,
            Some(IndexState::Pending) => Availability::Pending,
            Some(IndexState::Ready(_)) => Availability::Ready,
            Some(IndexState::Failed(reason)) => Availability::Failed(reason.clone()),
        }
    }
}

#[async_trait]
impl RecordSource for MemoryStore {
    async fn get(&self, entity: &str, key: &Key) -> StorageResult<Option<Arc<Record>>> {
        MemoryStore::get(self, entity, key)
    }

    async fn get_by_foreign_key(
        &self,
        entity: &str,
        field: &str,
        key: &Key,
    ) -> StorageResult<Vec<Arc<Record>>> {
        MemoryStore::get_by_foreign_key(self, entity, field, key)
    }

    async fn all(&self, entity: &str) -> StorageResult<Vec<Arc<Record>>> {
        Ok(MemoryStore::all(self, entity)?.to_vec())
    }

    fn availability(&self, entity: &str) -> Availability {
        MemoryStore::availability(self, entity)
    }
}
