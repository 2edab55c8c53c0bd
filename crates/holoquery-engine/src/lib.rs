//! Holoquery Engine - Query parsing, validation and resolution
//!
//! Turns relaxed-JSON query text into a validated query tree, resolves it
//! against a [`RecordSource`](holoquery_storage::RecordSource) and assembles
//! the result into plain JSON.

pub mod assemble;
pub mod browse;
pub mod engine;
pub mod parser;
pub mod resolver;
pub mod validate;

pub use assemble::{assemble, assemble_node};
pub use browse::RecordFilter;
pub use engine::QueryEngine;
pub use parser::{parse_query, parse_value};
pub use resolver::Resolver;
pub use validate::validate;
