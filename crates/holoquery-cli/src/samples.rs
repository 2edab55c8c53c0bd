//! Built-in sample dataset and query library

use holoquery_storage::{load_texts, parse_schema, LoadedStore, StorageResult};

pub const SCHEMA: &str = include_str!("../data/schema.json");

/// Dataset texts keyed by entity type
pub const DATASETS: [(&str, &str); 3] = [
    ("character", include_str!("../data/character.json")),
    ("species", include_str!("../data/species.json")),
    ("planet", include_str!("../data/planet.json")),
];

/// A named example query
pub struct Sample {
    pub name: &'static str,
    pub title: &'static str,
    pub text: &'static str,
}

pub static SAMPLES: [Sample; 5] = [
    Sample {
        name: "all-characters",
        title: "All characters",
        text: include_str!("../queries/all-characters.json5"),
    },
    Sample {
        name: "single-species-with-nested",
        title: "Single species with nested homeworld",
        text: include_str!("../queries/single-species-with-nested.json5"),
    },
    Sample {
        name: "planet-with-residents",
        title: "Planet with its species and residents",
        text: include_str!("../queries/planet-with-residents.json5"),
    },
    Sample {
        name: "character-species-homeworld",
        title: "Character with species and the species' homeworld",
        text: include_str!("../queries/character-species-homeworld.json5"),
    },
    Sample {
        name: "missing-species",
        title: "Species that does not exist",
        text: include_str!("../queries/missing-species.json5"),
    },
];

pub fn find(name: &str) -> Option<&'static Sample> {
    SAMPLES.iter().find(|s| s.name == name)
}

/// Index the built-in datasets
pub fn load() -> StorageResult<LoadedStore> {
    let config = parse_schema("schema.json", SCHEMA)?;
    load_texts(&config, DATASETS)
}
