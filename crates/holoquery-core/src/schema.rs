//! Schema registry: entity types, primary keys and relations
//!
//! Construction is two-phase. All entity types are registered first, then
//! all relations, then [`SchemaBuilder::finish`] validates closure and
//! freezes the result into an immutable [`SchemaRegistry`].

use crate::error::{Error, Result};
use crate::limits;
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::collections::HashMap;

/// How a nested field is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    /// Key read off the current record, looked up by the target's primary key
    ParentKey,
    /// Target records whose key field equals the current record's primary key
    ForeignKey,
}

/// How many records a relation yields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

/// A declared relation of one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    /// Entity type declaring the field
    pub owner: String,

    /// Field name as used in queries and results
    pub field: String,

    /// Entity type the field resolves to
    pub target: String,

    pub kind: RelationKind,

    /// Field on the owner (parent-key) or on the target (foreign-key)
    pub key_field: String,

    pub cardinality: Cardinality,
}

/// Definition of one entity type
#[derive(Debug, Clone, Serialize)]
pub struct EntityDef {
    pub name: String,
    pub primary_key: String,
    relations: Vec<Relation>,
    #[serde(skip)]
    by_field: HashMap<String, usize>,
}

impl EntityDef {
    fn new(name: String, primary_key: String) -> Self {
        Self {
            name,
            primary_key,
            relations: Vec::new(),
            by_field: HashMap::new(),
        }
    }

    /// Relation declared under `field`, if any
    pub fn relation(&self, field: &str) -> Option<&Relation> {
        self.by_field.get(field).map(|&i| &self.relations[i])
    }

    /// Relations in declaration order
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }
}

/// Data for declaring a relation
#[derive(Debug, Clone)]
pub struct NewRelation {
    pub owner: String,
    pub field: String,
    pub target: Option<String>,
    pub kind: RelationKind,
    pub key_field: Option<String>,
    pub cardinality: Cardinality,
}

impl NewRelation {
    /// One-to-one relation resolved through a key on the owning record
    ///
    /// Target and key field both default to the field name.
    pub fn parent_key(owner: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            field: field.into(),
            target: None,
            kind: RelationKind::ParentKey,
            key_field: None,
            cardinality: Cardinality::One,
        }
    }

    /// One-to-many relation resolved by scanning the target's `key_field`
    pub fn foreign_key(
        owner: impl Into<String>,
        field: impl Into<String>,
        key_field: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            field: field.into(),
            target: None,
            kind: RelationKind::ForeignKey,
            key_field: Some(key_field.into()),
            cardinality: Cardinality::Many,
        }
    }

    /// Resolve to a differently named entity type
    pub fn from(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_key_field(mut self, key_field: impl Into<String>) -> Self {
        self.key_field = Some(key_field.into());
        self
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }
}

fn check_name(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidSchema(format!("{} cannot be empty", what)));
    }
    limits::validate_name(name)?;
    Ok(())
}

/// Mutable schema under construction
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entities: Vec<EntityDef>,
    index: HashMap<String, usize>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type with its primary-key field
    pub fn register_entity(
        &mut self,
        name: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Result<&mut Self> {
        let name = name.into();
        let primary_key = primary_key.into();
        check_name("Entity name", &name)?;
        check_name("Primary key field", &primary_key)?;

        if self.index.contains_key(&name) {
            return Err(Error::DuplicateEntity(name));
        }

        tracing::trace!("Registering entity {} (pk {})", name, primary_key);
        self.index.insert(name.clone(), self.entities.len());
        self.entities.push(EntityDef::new(name, primary_key));
        Ok(self)
    }

    /// Declare a nested field on a registered entity type
    pub fn register_relation(&mut self, relation: NewRelation) -> Result<&mut Self> {
        check_name("Relation field", &relation.field)?;

        let target = relation.target.unwrap_or_else(|| relation.field.clone());
        let key_field = match (relation.kind, relation.key_field) {
            (_, Some(key)) => key,
            (RelationKind::ParentKey, None) => relation.field.clone(),
            (RelationKind::ForeignKey, None) => {
                return Err(Error::InvalidSchema(format!(
                    "Foreign-key relation {}.{} needs a key field",
                    relation.owner, relation.field
                )))
            }
        };
        check_name("Relation key field", &key_field)?;

        if relation.kind == RelationKind::ParentKey && relation.cardinality == Cardinality::Many {
            return Err(Error::InvalidSchema(format!(
                "Parent-key relation {}.{} cannot be one-to-many",
                relation.owner, relation.field
            )));
        }

        if !self.index.contains_key(&target) {
            return Err(Error::UnknownEntity(target));
        }
        let owner_idx = *self
            .index
            .get(&relation.owner)
            .ok_or_else(|| Error::UnknownEntity(relation.owner.clone()))?;

        let owner = &mut self.entities[owner_idx];
        if owner.by_field.contains_key(&relation.field) {
            return Err(Error::DuplicateRelation {
                entity: relation.owner,
                field: relation.field,
            });
        }

        tracing::trace!(
            "Registering relation {}.{} -> {} ({:?}, key {})",
            relation.owner,
            relation.field,
            target,
            relation.kind,
            key_field
        );

        owner
            .by_field
            .insert(relation.field.clone(), owner.relations.len());
        owner.relations.push(Relation {
            owner: relation.owner,
            field: relation.field,
            target,
            kind: relation.kind,
            key_field,
            cardinality: relation.cardinality,
        });
        Ok(self)
    }

    /// Validate closure and freeze the schema
    pub fn finish(self) -> Result<SchemaRegistry> {
        for entity in &self.entities {
            for relation in &entity.relations {
                if !self.index.contains_key(&relation.target) {
                    return Err(Error::UnknownEntity(relation.target.clone()));
                }
            }
        }

        tracing::debug!("Schema finalized with {} entity types", self.entities.len());

        Ok(SchemaRegistry {
            entities: self.entities,
            index: self.index,
        })
    }
}

/// Immutable schema shared by every query
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    entities: Vec<EntityDef>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Definition of an entity type
    pub fn lookup(&self, entity: &str) -> Result<&EntityDef> {
        self.get(entity)
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))
    }

    pub fn get(&self, entity: &str) -> Option<&EntityDef> {
        self.index.get(entity).map(|&i| &self.entities[i])
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.index.contains_key(entity)
    }

    /// Relation `field` declared on `entity`
    pub fn relation(&self, entity: &str, field: &str) -> Result<Option<&Relation>> {
        Ok(self.lookup(entity)?.relation(field))
    }

    /// Entity types in registration order
    pub fn entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.iter()
    }

    /// Foreign-key relations whose records live in `entity`
    pub fn foreign_keys_into<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a Relation> {
        self.entities
            .iter()
            .flat_map(|e| e.relations.iter())
            .filter(move |r| r.kind == RelationKind::ForeignKey && r.target == entity)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration format
// ─────────────────────────────────────────────────────────────────────────────

/// Schema configuration: entity type name to entity settings, in file order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaConfig {
    pub entities: IndexMap<String, EntityConfig>,
}

/// Settings of one entity type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntityConfig {
    pub primary_key: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub nested: IndexMap<String, NestedConfig>,
}

/// Settings of one nested field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NestedConfig {
    /// Target entity type (defaults to the field name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Key field on the referring record (defaults to the field name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,

    /// Key field on the target record; selects foreign-key resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
}

impl NestedConfig {
    fn to_relation(&self, owner: &str, field: &str) -> Result<NewRelation> {
        let relation = match (&self.parent_key, &self.foreign_key) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidSchema(format!(
                    "{}.{} declares both parentKey and foreignKey",
                    owner, field
                )))
            }
            (_, Some(foreign_key)) => {
                let cardinality = if self.multiple == Some(false) {
                    Cardinality::One
                } else {
                    Cardinality::Many
                };
                NewRelation::foreign_key(owner, field, foreign_key).with_cardinality(cardinality)
            }
            (parent_key, None) => {
                if self.multiple == Some(true) {
                    return Err(Error::InvalidSchema(format!(
                        "{}.{} sets multiple without a foreignKey",
                        owner, field
                    )));
                }
                let relation = NewRelation::parent_key(owner, field);
                match parent_key {
                    Some(key) => relation.with_key_field(key),
                    None => relation,
                }
            }
        };

        Ok(match &self.from {
            Some(target) => relation.from(target),
            None => relation,
        })
    }
}

impl SchemaConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Run two-phase registration over the whole configuration
    pub fn into_registry(&self) -> Result<SchemaRegistry> {
        let mut builder = SchemaBuilder::new();

        for (name, entity) in &self.entities {
            builder.register_entity(name, &entity.primary_key)?;
        }

        for (name, entity) in &self.entities {
            for (field, nested) in &entity.nested {
                builder.register_relation(nested.to_relation(name, field)?)?;
            }
        }

        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample_builder() -> SchemaBuilder {
        let mut builder = SchemaBuilder::new();
        builder
            .register_entity("planet", "name")
            .unwrap()
            .register_entity("species", "name")
            .unwrap();
        builder
    }

    #[test]
    fn test_register_and_lookup() {
        let mut builder = sample_builder();
        builder
            .register_relation(NewRelation::parent_key("species", "homeworld").from("planet"))
            .unwrap()
            .register_relation(
                NewRelation::foreign_key("planet", "species", "homeworld"),
            )
            .unwrap();
        let schema = builder.finish().unwrap();

        let species = schema.lookup("species").unwrap();
        assert_eq!(species.primary_key, "name");

        let homeworld = species.relation("homeworld").unwrap();
        assert_eq!(homeworld.target, "planet");
        assert_eq!(homeworld.kind, RelationKind::ParentKey);
        assert_eq!(homeworld.key_field, "homeworld");
        assert_eq!(homeworld.cardinality, Cardinality::One);

        let fks: Vec<_> = schema.foreign_keys_into("species").collect();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].owner, "planet");
        assert_eq!(fks[0].cardinality, Cardinality::Many);
    }

    #[test]
    fn test_lookup_unknown_entity() {
        let schema = sample_builder().finish().unwrap();
        let err = schema.lookup("starship").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownEntity);
    }

    #[test]
    fn test_duplicate_relation_rejected() {
        let mut builder = sample_builder();
        builder
            .register_relation(NewRelation::parent_key("species", "homeworld").from("planet"))
            .unwrap();
        let err = builder
            .register_relation(NewRelation::parent_key("species", "homeworld").from("planet"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRelation { ref field, .. } if field == "homeworld"));
    }

    #[test]
    fn test_unknown_target_rejected() {
        let mut builder = sample_builder();
        // Target defaults to the field name, and there is no "homeworld" entity
        let err = builder
            .register_relation(NewRelation::parent_key("species", "homeworld"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(ref name) if name == "homeworld"));
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut builder = sample_builder();
        let err = builder.register_entity("planet", "id").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateEntity);
    }

    #[test]
    fn test_parent_key_many_rejected() {
        let mut builder = sample_builder();
        let err = builder
            .register_relation(
                NewRelation::parent_key("species", "homeworld")
                    .from("planet")
                    .with_cardinality(Cardinality::Many),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSchema);
    }

    #[test]
    fn test_config_from_json() {
        let config = SchemaConfig::from_json(
            r#"{
                "planet": {
                    "primaryKey": "name",
                    "nested": {
                        "species": { "foreignKey": "homeworld" },
                        "capital": { "from": "city", "foreignKey": "planet", "multiple": false }
                    }
                },
                "species": {
                    "primaryKey": "name",
                    "nested": { "homeworld": { "from": "planet" } }
                },
                "city": { "primaryKey": "id" }
            }"#,
        )
        .unwrap();
        let schema = config.into_registry().unwrap();

        let species = schema.relation("planet", "species").unwrap().unwrap();
        assert_eq!(species.kind, RelationKind::ForeignKey);
        assert_eq!(species.target, "species");
        assert_eq!(species.key_field, "homeworld");
        assert_eq!(species.cardinality, Cardinality::Many);

        let capital = schema.relation("planet", "capital").unwrap().unwrap();
        assert_eq!(capital.target, "city");
        assert_eq!(capital.cardinality, Cardinality::One);

        let homeworld = schema.relation("species", "homeworld").unwrap().unwrap();
        assert_eq!(homeworld.kind, RelationKind::ParentKey);
        assert_eq!(homeworld.key_field, "homeworld");
    }

    #[test]
    fn test_config_from_toml() {
        let config: SchemaConfig = toml::from_str(
            r#"
            [character]
            primaryKey = "name"

            [character.nested.homeworld]
            from = "planet"
            parentKey = "home"

            [planet]
            primaryKey = "name"
            "#,
        )
        .unwrap();
        let schema = config.into_registry().unwrap();

        let homeworld = schema.relation("character", "homeworld").unwrap().unwrap();
        assert_eq!(homeworld.target, "planet");
        assert_eq!(homeworld.key_field, "home");
    }

    #[test]
    fn test_config_conflicting_keys() {
        let config = SchemaConfig::from_json(
            r#"{
                "planet": { "primaryKey": "name" },
                "species": {
                    "primaryKey": "name",
                    "nested": {
                        "homeworld": { "from": "planet", "parentKey": "a", "foreignKey": "b" }
                    }
                }
            }"#,
        )
        .unwrap();
        let err = config.into_registry().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSchema);
    }

    #[test]
    fn test_config_multiple_without_foreign_key() {
        let config = SchemaConfig::from_json(
            r#"{
                "planet": { "primaryKey": "name" },
                "species": {
                    "primaryKey": "name",
                    "nested": { "homeworld": { "from": "planet", "multiple": true } }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.into_registry().unwrap_err().kind(),
            ErrorKind::InvalidSchema
        );
    }

    #[test]
    fn test_cyclic_relations_are_legal() {
        let mut builder = sample_builder();
        builder
            .register_relation(NewRelation::parent_key("species", "homeworld").from("planet"))
            .unwrap()
            .register_relation(NewRelation::foreign_key("planet", "species", "homeworld"))
            .unwrap();
        assert!(builder.finish().is_ok());
    }

    #[test]
    fn test_config_registers_in_file_order() {
        let json = SchemaConfig::from_json(
            r#"{
                "species": { "primaryKey": "name" },
                "planet": {
                    "primaryKey": "name",
                    "nested": {
                        "species": { "foreignKey": "homeworld" },
                        "residents": { "from": "character", "foreignKey": "homeworld" }
                    }
                },
                "character": { "primaryKey": "name" }
            }"#,
        )
        .unwrap();
        let schema = json.into_registry().unwrap();
        let names: Vec<_> = schema.entities().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["species", "planet", "character"]);
        let planet = schema.get("planet").unwrap();
        let fields: Vec<_> = planet.relations().iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["species", "residents"]);

        let toml: SchemaConfig = toml::from_str(
            r#"
            [starship]
            primaryKey = "id"

            [pilot]
            primaryKey = "id"

            [alliance]
            primaryKey = "name"
            "#,
        )
        .unwrap();
        let names: Vec<_> = toml.entities.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["starship", "pilot", "alliance"]);
    }
}
