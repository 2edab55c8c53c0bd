//! Holoquery Storage - In-memory datasets and indices
//!
//! This crate holds the per-entity record collections together with their
//! primary-key and foreign-key indices, and loads them at startup.

pub mod error;
pub mod loader;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use loader::{load_dir, load_texts, parse_records, parse_schema, LoadedStore};
pub use memory::{MemoryStore, StoreBuilder};
pub use traits::{Availability, RecordSource};
