//! Recursive query resolution
//!
//! Resolution walks the query tree, not the data graph, so cyclic relations
//! terminate at the query's depth. Sibling records and sibling fields are
//! resolved concurrently; `try_join_all` hands results back in dispatch
//! order, which keeps dataset order intact.

use futures::future::{try_join_all, BoxFuture, FutureExt};
use holoquery_core::{
    Cardinality, EntityDef, Error, Key, QueryNode, QueryResult, QueryTree, Record, Relation,
    RelationKind, ResolvedRecord, Result, ResultNode, SchemaRegistry,
};
use holoquery_storage::RecordSource;
use std::sync::Arc;

/// Resolves validated query trees against a record source
pub struct Resolver<'a, S: ?Sized> {
    schema: &'a SchemaRegistry,
    source: &'a S,
}

impl<'a, S> Resolver<'a, S>
where
    S: RecordSource + ?Sized,
{
    pub fn new(schema: &'a SchemaRegistry, source: &'a S) -> Self {
        Self { schema, source }
    }

    /// Resolve every root of a query
    pub async fn resolve_tree(&self, tree: &QueryTree) -> Result<QueryResult> {
        let roots = try_join_all(tree.roots.iter().map(|node| async move {
            let result = self.resolve(node, &node.field).await?;
            Ok::<_, Error>((node.field.clone(), result))
        }))
        .await?;

        Ok(QueryResult { roots })
    }

    /// Resolve one node against `entity`
    ///
    /// With a primary-key filter the result is the single matching record or
    /// `Absent`; otherwise it is every record of the entity type, in order.
    pub fn resolve<'q>(&'q self, node: &'q QueryNode, entity: &'q str) -> BoxFuture<'q, Result<ResultNode>>
    where
        'a: 'q,
    {
        async move {
            let def = self.schema.lookup(entity)?;

            match node.key_filter() {
                Some(filter) => {
                    let Some(key) = Key::from_value(&filter.value) else {
                        return Ok(ResultNode::Absent);
                    };
                    match self.source.get(entity, &key).await? {
                        Some(record) => {
                            let resolved = self.resolve_record(record, def, &node.resolve).await?;
                            Ok(ResultNode::One(Box::new(resolved)))
                        }
                        None => {
                            tracing::trace!("No {} with key {}", entity, key);
                            Ok(ResultNode::Absent)
                        }
                    }
                }
                None => {
                    let records = self.source.all(entity).await?;
                    Ok(ResultNode::Many(
                        self.resolve_records(records, def, &node.resolve).await?,
                    ))
                }
            }
        }
        .boxed()
    }

    fn resolve_record<'q>(
        &'q self,
        record: Arc<Record>,
        def: &'q EntityDef,
        fields: &'q [QueryNode],
    ) -> BoxFuture<'q, Result<ResolvedRecord>>
    where
        'a: 'q,
    {
        async move {
            let nested = try_join_all(fields.iter().map(|child| {
                let record = Arc::clone(&record);
                async move {
                    let relation = def.relation(&child.field).ok_or_else(|| {
                        Error::Internal(format!(
                            "{} has no relation '{}'",
                            def.name, child.field
                        ))
                    })?;
                    let result = self.follow(&record, def, relation, child).await?;
                    Ok::<_, Error>((child.field.clone(), result))
                }
            }))
            .await?;

            Ok(ResolvedRecord { record, nested })
        }
        .boxed()
    }

    async fn resolve_records(
        &self,
        records: Vec<Arc<Record>>,
        def: &EntityDef,
        fields: &[QueryNode],
    ) -> Result<Vec<ResolvedRecord>> {
        try_join_all(
            records
                .into_iter()
                .map(|record| self.resolve_record(record, def, fields)),
        )
        .await
    }

    /// Follow one relation from `record`
    async fn follow(
        &self,
        record: &Record,
        owner: &EntityDef,
        relation: &Relation,
        child: &QueryNode,
    ) -> Result<ResultNode> {
        let target = self.schema.lookup(&relation.target)?;

        match relation.kind {
            RelationKind::ParentKey => {
                let Some(key) = Key::from_field(record, &relation.key_field) else {
                    return Ok(ResultNode::Absent);
                };
                let Some(found) = self.source.get(&relation.target, &key).await? else {
                    return Ok(ResultNode::Absent);
                };
                if !matches_filter(&found, target, child) {
                    return Ok(ResultNode::Absent);
                }
                let resolved = self.resolve_record(found, target, &child.resolve).await?;
                Ok(ResultNode::One(Box::new(resolved)))
            }
            RelationKind::ForeignKey => {
                let mut matches = match Key::from_field(record, &owner.primary_key) {
                    Some(key) => {
                        self.source
                            .get_by_foreign_key(&relation.target, &relation.key_field, &key)
                            .await?
                    }
                    None => Vec::new(),
                };
                matches.retain(|m| matches_filter(m, target, child));

                match relation.cardinality {
                    Cardinality::Many => Ok(ResultNode::Many(
                        self.resolve_records(matches, target, &child.resolve).await?,
                    )),
                    Cardinality::One => match matches.into_iter().next() {
                        Some(first) => {
                            let resolved =
                                self.resolve_record(first, target, &child.resolve).await?;
                            Ok(ResultNode::One(Box::new(resolved)))
                        }
                        None => Ok(ResultNode::Absent),
                    },
                }
            }
        }
    }
}

/// Whether a related record passes the nested node's primary-key filter
fn matches_filter(record: &Record, def: &EntityDef, node: &QueryNode) -> bool {
    match node.key_filter() {
        None => true,
        Some(filter) => match Key::from_value(&filter.value) {
            Some(expected) => Key::from_field(record, &def.primary_key) == Some(expected),
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holoquery_core::NewRelation;
    use holoquery_storage::MemoryStore;
    use serde_json::json;

    fn fixture() -> MemoryStore {
        let mut builder = SchemaRegistry::builder();
        builder
            .register_entity("planet", "name")
            .unwrap()
            .register_entity("species", "name")
            .unwrap();
        builder
            .register_relation(NewRelation::parent_key("species", "homeworld").from("planet"))
            .unwrap()
            .register_relation(NewRelation::foreign_key("planet", "species", "homeworld"))
            .unwrap()
            .register_relation(
                NewRelation::foreign_key("planet", "firstSpecies", "homeworld")
                    .from("species")
                    .with_cardinality(Cardinality::One),
            )
            .unwrap();
        let schema = Arc::new(builder.finish().unwrap());

        let to_records = |v: serde_json::Value| -> Vec<Record> {
            v.as_array()
                .unwrap()
                .iter()
                .map(|r| r.as_object().unwrap().clone())
                .collect()
        };

        let mut store = MemoryStore::builder(Arc::clone(&schema));
        store
            .load("planet", to_records(json!([{"name": "Tatooine"}, {"name": "Hoth"}])))
            .unwrap()
            .load(
                "species",
                to_records(json!([
                    {"name": "Hutt", "homeworld": "Tatooine"},
                    {"name": "Wampa", "homeworld": "Hoth"},
                    {"name": "Jawa", "homeworld": "Tatooine"},
                    {"name": "Droid", "homeworld": "Unknown Regions"}
                ])),
            )
            .unwrap();
        assert!(store.build_all().is_empty());
        store.finish()
    }

    fn names(node: &ResultNode) -> Vec<String> {
        match node {
            ResultNode::Many(records) => records
                .iter()
                .map(|r| r.record["name"].as_str().unwrap().to_string())
                .collect(),
            other => panic!("expected a list, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_key_filter_absent() {
        let store = fixture();
        let resolver = Resolver::new(store.schema(), &store);
        let node = QueryNode::new("species").with_arg("name", "Ewok");
        let result = resolver.resolve(&node, "species").await.unwrap();
        assert!(result.is_absent());
    }

    #[tokio::test]
    async fn test_parent_key_missing_target_is_absent() {
        let store = fixture();
        let resolver = Resolver::new(store.schema(), &store);
        let node = QueryNode::new("species")
            .with_arg("name", "Droid")
            .with_resolve(QueryNode::new("homeworld"));

        let ResultNode::One(droid) = resolver.resolve(&node, "species").await.unwrap() else {
            panic!("expected a single record");
        };
        assert!(droid.nested("homeworld").unwrap().is_absent());
    }

    #[tokio::test]
    async fn test_foreign_key_preserves_order() {
        let store = fixture();
        let resolver = Resolver::new(store.schema(), &store);
        let node = QueryNode::new("planet").with_resolve(QueryNode::new("species"));

        let ResultNode::Many(planets) = resolver.resolve(&node, "planet").await.unwrap() else {
            panic!("expected a list");
        };
        assert_eq!(names(planets[0].nested("species").unwrap()), vec!["Hutt", "Jawa"]);
        assert_eq!(names(planets[1].nested("species").unwrap()), vec!["Wampa"]);
    }

    #[tokio::test]
    async fn test_single_foreign_key_takes_first_match() {
        let store = fixture();
        let resolver = Resolver::new(store.schema(), &store);
        let node = QueryNode::new("planet")
            .with_arg("name", "Tatooine")
            .with_resolve(QueryNode::new("firstSpecies"));

        let ResultNode::One(tatooine) = resolver.resolve(&node, "planet").await.unwrap() else {
            panic!("expected a single record");
        };
        let ResultNode::One(first) = tatooine.nested("firstSpecies").unwrap() else {
            panic!("expected a single species");
        };
        assert_eq!(first.record["name"], "Hutt");
    }

    #[tokio::test]
    async fn test_nested_filter_narrows_relation() {
        let store = fixture();
        let resolver = Resolver::new(store.schema(), &store);
        let node = QueryNode::new("planet")
            .with_arg("name", "Tatooine")
            .with_resolve(QueryNode::new("species").with_arg("name", "Jawa"));

        let ResultNode::One(tatooine) = resolver.resolve(&node, "planet").await.unwrap() else {
            panic!("expected a single record");
        };
        assert_eq!(names(tatooine.nested("species").unwrap()), vec!["Jawa"]);
    }

    #[tokio::test]
    async fn test_cycle_stops_at_query_depth() {
        let store = fixture();
        let resolver = Resolver::new(store.schema(), &store);
        let node = QueryNode::new("species").with_arg("name", "Hutt").with_resolve(
            QueryNode::new("homeworld").with_resolve(
                QueryNode::new("species").with_resolve(QueryNode::new("homeworld")),
            ),
        );

        let ResultNode::One(hutt) = resolver.resolve(&node, "species").await.unwrap() else {
            panic!("expected a single record");
        };
        let ResultNode::One(tatooine) = hutt.nested("homeworld").unwrap() else {
            panic!("expected a planet");
        };
        let ResultNode::Many(natives) = tatooine.nested("species").unwrap() else {
            panic!("expected a list");
        };
        assert_eq!(natives.len(), 2);
        for native in natives {
            let ResultNode::One(home) = native.nested("homeworld").unwrap() else {
                panic!("expected a planet");
            };
            // Deepest level carries no further nesting
            assert!(home.nested.is_empty());
        }
    }

    #[tokio::test]
    async fn test_unknown_entity_at_resolve_time() {
        let store = fixture();
        let resolver = Resolver::new(store.schema(), &store);
        let err = resolver
            .resolve(&QueryNode::new("starship"), "starship")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(_)));
    }
}
