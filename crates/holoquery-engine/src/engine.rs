//! Query engine: parse, validate, resolve and assemble

use crate::assemble::assemble;
use crate::parser::parse_query;
use crate::resolver::Resolver;
use crate::validate::{touched_entities, validate};
use holoquery_core::{limits, Error, QueryResult, QueryTree, Result, SchemaRegistry};
use holoquery_storage::{MemoryStore, RecordSource};
use serde_json::Value;
use std::sync::Arc;

/// Shared entry point for executing queries
///
/// Holds only shared read-only handles, so clones are cheap and any number
/// of queries can run through one engine at the same time.
pub struct QueryEngine<S: ?Sized = MemoryStore> {
    schema: Arc<SchemaRegistry>,
    source: Arc<S>,
}

impl<S: ?Sized> Clone for QueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            source: Arc::clone(&self.source),
        }
    }
}

impl<S> QueryEngine<S>
where
    S: RecordSource + ?Sized,
{
    pub fn new(schema: Arc<SchemaRegistry>, source: Arc<S>) -> Self {
        Self { schema, source }
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    /// Parse and validate query text without touching the store
    pub fn parse(&self, text: &str) -> Result<QueryTree> {
        limits::validate_query_len(text)?;
        let tree = parse_query(text)?;
        validate(&tree, &self.schema)?;
        Ok(tree)
    }

    /// Fail if any entity type read by the query cannot serve lookups
    fn check_available(&self, tree: &QueryTree) -> Result<()> {
        for entity in touched_entities(tree, &self.schema) {
            let availability = self.source.availability(&entity);
            if let Some(reason) = availability.reason() {
                tracing::warn!("Query touches unavailable entity {}: {}", entity, reason);
                return Err(Error::DatasetUnavailable { entity, reason });
            }
        }
        Ok(())
    }

    /// Resolve a validated tree, keeping shared record handles
    pub async fn resolve(&self, tree: &QueryTree) -> Result<QueryResult> {
        self.check_available(tree)?;
        Resolver::new(&self.schema, &*self.source)
            .resolve_tree(tree)
            .await
    }

    /// Resolve a validated tree into plain JSON
    pub async fn execute_tree(&self, tree: &QueryTree) -> Result<Value> {
        let result = self.resolve(tree).await?;
        tracing::debug!("Resolved {} roots", result.roots.len());
        Ok(assemble(&result))
    }

    /// Parse, validate, resolve and assemble query text
    pub async fn execute(&self, text: &str) -> Result<Value> {
        let tree = self.parse(text)?;
        tracing::debug!("Executing query with {} roots", tree.roots.len());
        self.execute_tree(&tree).await
    }
}
