//! Query validation against the schema registry
//!
//! Runs entirely on the query tree and schema, before any dataset access.

use holoquery_core::limits::validate_query_depth;
use holoquery_core::value::is_scalar;
use holoquery_core::{EntityDef, Error, FieldPath, QueryNode, QueryTree, Result, SchemaRegistry};
use std::collections::BTreeSet;

/// Check every field name, relation and filter of a query
pub fn validate(tree: &QueryTree, schema: &SchemaRegistry) -> Result<()> {
    let get_path = FieldPath::root("get");

    for node in &tree.roots {
        let path = get_path.child(&node.field);
        let entity = schema.get(&node.field).ok_or_else(|| {
            Error::validation(&path, format!("unknown entity type '{}'", node.field))
        })?;
        validate_node(node, entity, &path, schema, 1)?;
    }

    tracing::debug!("Validated query with {} roots", tree.roots.len());
    Ok(())
}

fn validate_node(
    node: &QueryNode,
    entity: &EntityDef,
    path: &FieldPath,
    schema: &SchemaRegistry,
    depth: usize,
) -> Result<()> {
    validate_query_depth(depth)?;
    let args_path = path.child("args");
    if node.args.len() > 1 {
        return Err(Error::validation(
            &args_path,
            format!(
                "args accepts a single filter on the primary key '{}'",
                entity.primary_key
            ),
        ));
    }

    for arg in &node.args {
        let arg_path = args_path.child(&arg.field);
        if arg.field != entity.primary_key {
            return Err(Error::validation(
                &arg_path,
                format!(
                    "'{}' is not the primary key of {} (expected '{}')",
                    arg.field, entity.name, entity.primary_key
                ),
            ));
        }
        if !is_scalar(&arg.value) {
            return Err(Error::validation(
                &arg_path,
                "filter value must be a string, number or boolean",
            ));
        }
    }

    let resolve_path = path.child("resolve");
    for child in &node.resolve {
        let child_path = resolve_path.child(&child.field);
        let relation = entity.relation(&child.field).ok_or_else(|| {
            Error::validation(
                &child_path,
                format!("{} has no relation '{}'", entity.name, child.field),
            )
        })?;
        let target = schema.lookup(&relation.target)?;
        validate_node(child, target, &child_path, schema, depth + 1)?;
    }

    Ok(())
}

/// Every entity type a validated query reads from
pub fn touched_entities(tree: &QueryTree, schema: &SchemaRegistry) -> BTreeSet<String> {
    fn visit(node: &QueryNode, entity: &str, schema: &SchemaRegistry, out: &mut BTreeSet<String>) {
        out.insert(entity.to_string());
        let Some(def) = schema.get(entity) else {
            return;
        };
        for child in &node.resolve {
            if let Some(relation) = def.relation(&child.field) {
                visit(child, &relation.target, schema, out);
            }
        }
    }

    let mut out = BTreeSet::new();
    for node in &tree.roots {
        visit(node, &node.field, schema, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;
    use holoquery_core::{ErrorKind, NewRelation};

    fn schema() -> SchemaRegistry {
        let mut builder = SchemaRegistry::builder();
        builder
            .register_entity("character", "name")
            .unwrap()
            .register_entity("species", "name")
            .unwrap()
            .register_entity("planet", "name")
            .unwrap();
        builder
            .register_relation(NewRelation::parent_key("species", "homeworld").from("planet"))
            .unwrap()
            .register_relation(NewRelation::foreign_key("planet", "residents", "homeworld").from("character"))
            .unwrap()
            .register_relation(NewRelation::parent_key("character", "homeworld").from("planet"))
            .unwrap();
        builder.finish().unwrap()
    }

    fn check(text: &str) -> Result<()> {
        validate(&parse_query(text).unwrap(), &schema())
    }

    fn failing_path(text: &str) -> String {
        let err = check(text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaValidation);
        err.path().unwrap()
    }

    #[test]
    fn test_valid_query() {
        assert!(check("{ get: { species: { args: { name: 'Hutt' }, resolve: { homeworld: {} } } } }").is_ok());
        assert!(check("{ get: { planet: { resolve: { residents: {} } }, species: {} } }").is_ok());
    }

    #[test]
    fn test_unknown_entity() {
        assert_eq!(failing_path("{ get: { starship: {} } }"), "get.starship");
    }

    #[test]
    fn test_unknown_relation() {
        assert_eq!(
            failing_path("{ get: { species: { resolve: { homeworld: { resolve: { moons: {} } } } } } }"),
            "get.species.resolve.homeworld.resolve.moons"
        );
    }

    #[test]
    fn test_args_must_target_primary_key() {
        assert_eq!(
            failing_path("{ get: { species: { args: { classification: 'mammal' } } } }"),
            "get.species.args.classification"
        );
        assert_eq!(
            failing_path("{ get: { species: { args: { name: 'Hutt', designation: 'sentient' } } } }"),
            "get.species.args"
        );
        assert_eq!(
            failing_path("{ get: { species: { args: { name: ['Hutt'] } } } }"),
            "get.species.args.name"
        );
    }

    #[test]
    fn test_nested_args_checked_against_target() {
        assert!(check("{ get: { planet: { resolve: { residents: { args: { name: 'Luke' } } } } } }").is_ok());
        assert_eq!(
            failing_path("{ get: { planet: { resolve: { residents: { args: { id: 1 } } } } } }"),
            "get.planet.resolve.residents.args.id"
        );
    }

    #[test]
    fn test_touched_entities_follow_aliases() {
        let schema = schema();
        let tree = parse_query("{ get: { planet: { resolve: { residents: {} } } } }").unwrap();
        let touched: Vec<_> = touched_entities(&tree, &schema).into_iter().collect();
        assert_eq!(touched, vec!["character", "planet"]);
    }

    #[test]
    fn test_depth_limit_applies_to_built_trees() {
        let mut node = QueryNode::new("residents");
        for level in 0..40 {
            let field = if level % 2 == 0 { "homeworld" } else { "residents" };
            let mut parent = QueryNode::new(field);
            parent.resolve.push(node);
            node = parent;
        }
        let mut root = QueryNode::new("planet");
        root.resolve.push(node);

        let err = validate(&QueryTree::new().with_root(root), &schema()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);
    }
}
