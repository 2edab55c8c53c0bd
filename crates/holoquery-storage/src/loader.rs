//! Startup loading of the schema configuration and per-entity datasets

use crate::error::{StorageError, StorageResult};
use crate::memory::MemoryStore;
use holoquery_core::{Record, SchemaConfig, SchemaRegistry};
use std::path::Path;
use std::sync::Arc;

/// Schema file names probed in a data directory, in order
pub const SCHEMA_FILES: [&str; 2] = ["schema.json", "schema.toml"];

/// A frozen store plus the entity types that failed to index
pub struct LoadedStore {
    pub schema: Arc<SchemaRegistry>,
    pub store: Arc<MemoryStore>,
    pub failures: Vec<StorageError>,
}

/// Parse a schema configuration, choosing the format by file name
pub fn parse_schema(file_name: &str, text: &str) -> StorageResult<SchemaConfig> {
    if file_name.ends_with(".toml") {
        Ok(toml::from_str(text)?)
    } else {
        Ok(serde_json::from_str(text)?)
    }
}

/// Parse a dataset file: a JSON array of objects
pub fn parse_records(entity: &str, text: &str) -> StorageResult<Vec<Record>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let serde_json::Value::Array(items) = value else {
        return Err(StorageError::InvalidDataset {
            entity: entity.to_string(),
            reason: "expected a JSON array of records".to_string(),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| match item {
            serde_json::Value::Object(record) => Ok(record),
            _ => Err(StorageError::InvalidDataset {
                entity: entity.to_string(),
                reason: format!("record {} is not an object", position),
            }),
        })
        .collect()
}

/// Build a store from a schema configuration and dataset texts
///
/// Entity types without a dataset stay unloaded. Dataset and index failures
/// are collected rather than returned, so the remaining entity types can
/// still serve queries.
pub fn load_texts<'a>(
    config: &SchemaConfig,
    datasets: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> StorageResult<LoadedStore> {
    let schema = Arc::new(config.into_registry()?);
    let mut builder = MemoryStore::builder(Arc::clone(&schema));

    let mut failures = Vec::new();
    for (entity, text) in datasets {
        let loaded = parse_records(entity, text).and_then(|records| {
            builder.load(entity, records)?;
            Ok(())
        });
        if let Err(err) = loaded {
            tracing::warn!("Dataset for {} not loaded: {}", entity, err);
            builder.fail(entity, err.to_string());
            failures.push(err);
        }
    }

    failures.extend(builder.build_all());
    let store = Arc::new(builder.finish());

    tracing::info!(
        "Loaded {} entity types ({} failed)",
        schema.entities().count(),
        failures.len()
    );

    Ok(LoadedStore {
        schema,
        store,
        failures,
    })
}

/// Load `schema.json`/`schema.toml` and `<entity>.json` files from a directory
pub async fn load_dir(dir: &Path) -> StorageResult<LoadedStore> {
    let mut config = None;
    for file_name in SCHEMA_FILES {
        let path = dir.join(file_name);
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("Reading schema from {:?}", path);
            let text = tokio::fs::read_to_string(&path).await?;
            config = Some(parse_schema(file_name, &text)?);
            break;
        }
    }
    let config = config.ok_or_else(|| {
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no schema.json or schema.toml in {}", dir.display()),
        ))
    })?;

    let mut texts: Vec<(String, String)> = Vec::new();
    for entity in config.entities.keys() {
        let path = dir.join(format!("{}.json", entity));
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("Reading dataset {:?}", path);
            texts.push((entity.clone(), tokio::fs::read_to_string(&path).await?));
        } else {
            tracing::warn!("Dataset file {:?} not found", path);
        }
    }

    load_texts(
        &config,
        texts.iter().map(|(entity, text)| (entity.as_str(), text.as_str())),
    )
}
