//! CLI command implementations

pub mod browse;
pub mod completions;
pub mod config;
pub mod query;
pub mod samples;
pub mod schema;
