//! Query tree types

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Dot-separated location of a query element, e.g. `get.species.resolve.homeworld`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn root(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// New path with `segment` appended
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.0.join("."))
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Equality filter from a query's `args`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgFilter {
    pub field: String,
    pub value: Value,
}

/// One requested entity or relation field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryNode {
    /// Entity type (at `get` level) or relation field name
    pub field: String,

    /// Filters from `args`, in query order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgFilter>,

    /// Nested relation fields from `resolve`, in query order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resolve: Vec<QueryNode>,
}

impl QueryNode {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            args: Vec::new(),
            resolve: Vec::new(),
        }
    }

    /// Add an equality filter
    pub fn with_arg(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.push(ArgFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Add a nested relation field
    pub fn with_resolve(mut self, child: QueryNode) -> Self {
        self.resolve.push(child);
        self
    }

    /// The primary-key filter of a validated node
    pub fn key_filter(&self) -> Option<&ArgFilter> {
        self.args.first()
    }

    /// Deepest nesting below and including this node
    pub fn depth(&self) -> usize {
        1 + self.resolve.iter().map(QueryNode::depth).max().unwrap_or(0)
    }
}

/// A parsed query: the entries of its `get` object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryTree {
    pub roots: Vec<QueryNode>,
}

impl QueryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, node: QueryNode) -> Self {
        self.roots.push(node);
        self
    }

    pub fn depth(&self) -> usize {
        self.roots.iter().map(QueryNode::depth).max().unwrap_or(0)
    }
}
