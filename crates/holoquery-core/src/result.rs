//! Resolver output tree
//!
//! These types still hold shared handles into the dataset store. The
//! engine's assembler turns them into plain JSON before they leave the crate
//! boundary.

use crate::value::Record;
use std::sync::Arc;

/// A matched record together with its resolved nested fields
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    /// Shared handle to the stored record
    pub record: Arc<Record>,

    /// Nested fields keyed by the query's field name, in query order
    pub nested: Vec<(String, ResultNode)>,
}

impl ResolvedRecord {
    pub fn leaf(record: Arc<Record>) -> Self {
        Self {
            record,
            nested: Vec::new(),
        }
    }

    pub fn nested(&self, field: &str) -> Option<&ResultNode> {
        self.nested.iter().find(|(f, _)| f == field).map(|(_, n)| n)
    }
}

/// Result of resolving one query node
#[derive(Debug, Clone, PartialEq)]
pub enum ResultNode {
    /// No matching record
    Absent,
    /// Single record (primary-key filter, parent-key, or single foreign-key)
    One(Box<ResolvedRecord>),
    /// Ordered records (unfiltered root or foreign-key)
    Many(Vec<ResolvedRecord>),
}

impl ResultNode {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Number of records directly held by this node
    pub fn len(&self) -> usize {
        match self {
            Self::Absent => 0,
            Self::One(_) => 1,
            Self::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolver output for a whole query, one entry per `get` field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub roots: Vec<(String, ResultNode)>,
}

impl QueryResult {
    pub fn get(&self, field: &str) -> Option<&ResultNode> {
        self.roots.iter().find(|(f, _)| f == field).map(|(_, n)| n)
    }
}
