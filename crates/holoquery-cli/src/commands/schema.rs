//! Schema command

use serde_json::{json, Map, Value};

use crate::output::{format_value, OutputFormat};
use crate::AppContext;
use holoquery_core::{Cardinality, RelationKind};

pub fn run(ctx: &AppContext) -> anyhow::Result<()> {
    let schema = ctx.engine.schema();

    if ctx.format == OutputFormat::Table {
        let mut rows = Vec::new();
        for entity in schema.entities() {
            for relation in entity.relations() {
                rows.push(json!({
                    "entity": entity.name,
                    "primary key": entity.primary_key,
                    "field": relation.field,
                    "target": relation.target,
                    "kind": describe(relation.kind, relation.cardinality),
                    "key field": relation.key_field,
                    "status": status(ctx, &entity.name),
                }));
            }
            if entity.relations().is_empty() {
                rows.push(json!({
                    "entity": entity.name,
                    "primary key": entity.primary_key,
                    "status": status(ctx, &entity.name),
                }));
            }
        }
        println!("{}", format_value(&Value::Array(rows), ctx.format));
        return Ok(());
    }

    let mut out = Map::new();
    for entity in schema.entities() {
        out.insert(
            entity.name.clone(),
            json!({
                "primaryKey": entity.primary_key,
                "relations": entity.relations(),
                "status": status(ctx, &entity.name),
            }),
        );
    }
    println!("{}", format_value(&Value::Object(out), ctx.format));
    Ok(())
}

fn describe(kind: RelationKind, cardinality: Cardinality) -> &'static str {
    match (kind, cardinality) {
        (RelationKind::ParentKey, _) => "parent key",
        (RelationKind::ForeignKey, Cardinality::Many) => "foreign key (many)",
        (RelationKind::ForeignKey, Cardinality::One) => "foreign key (one)",
    }
}

fn status(ctx: &AppContext, entity: &str) -> String {
    match ctx.store.availability(entity).reason() {
        None => "ready".to_string(),
        Some(reason) => format!("unavailable: {}", reason),
    }
}
