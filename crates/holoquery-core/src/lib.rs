//! Holoquery Core - Schema and query model for the resolution engine
//!
//! This crate provides the schema registry, the query and result trees and
//! the error taxonomy shared by the storage and engine crates.

pub mod error;
pub mod limits;
pub mod query;
pub mod result;
pub mod schema;
pub mod value;

pub use error::{Error, ErrorKind, ErrorReport, ParseLocation, Result};
pub use query::{ArgFilter, FieldPath, QueryNode, QueryTree};
pub use result::{QueryResult, ResolvedRecord, ResultNode};
pub use schema::{
    Cardinality, EntityConfig, EntityDef, NestedConfig, NewRelation, Relation, RelationKind,
    SchemaBuilder, SchemaConfig, SchemaRegistry,
};
pub use value::{Key, Record};
