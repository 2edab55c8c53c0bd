//! Conversion of resolver output into plain JSON

use holoquery_core::{QueryResult, ResolvedRecord, ResultNode};
use serde_json::{Map, Value};

/// Query result as a JSON object keyed by the `get` field names
pub fn assemble(result: &QueryResult) -> Value {
    let mut out = Map::new();
    for (field, node) in &result.roots {
        out.insert(field.clone(), assemble_node(node));
    }
    Value::Object(out)
}

/// `Absent` becomes `null`, `One` an object and `Many` an array
pub fn assemble_node(node: &ResultNode) -> Value {
    match node {
        ResultNode::Absent => Value::Null,
        ResultNode::One(record) => assemble_record(record),
        ResultNode::Many(records) => Value::Array(records.iter().map(assemble_record).collect()),
    }
}

fn assemble_record(resolved: &ResolvedRecord) -> Value {
    let mut out = Map::with_capacity(resolved.record.len() + resolved.nested.len());

    for (field, value) in resolved.record.iter() {
        let value = match resolved.nested(field) {
            Some(node) => assemble_node(node),
            None => value.clone(),
        };
        out.insert(field.clone(), value);
    }

    // Nested fields the record does not carry go last, in query order
    for (field, node) in &resolved.nested {
        if !out.contains_key(field) {
            out.insert(field.clone(), assemble_node(node));
        }
    }

    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use holoquery_core::Record;
    use serde_json::json;
    use std::sync::Arc;

    fn record(value: Value) -> Arc<Record> {
        match value {
            Value::Object(map) => Arc::new(map),
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_nested_field_replaces_own_value() {
        let species = ResolvedRecord {
            record: record(json!({"name": "Hutt", "homeworld": "Tatooine", "language": "Huttese"})),
            nested: vec![(
                "homeworld".to_string(),
                ResultNode::One(Box::new(ResolvedRecord::leaf(record(json!({"name": "Tatooine"}))))),
            )],
        };

        let out = assemble_node(&ResultNode::One(Box::new(species)));
        assert_eq!(
            out,
            json!({"name": "Hutt", "homeworld": {"name": "Tatooine"}, "language": "Huttese"})
        );
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "homeworld", "language"]);
    }

    #[test]
    fn test_extra_nested_fields_appended() {
        let planet = ResolvedRecord {
            record: record(json!({"name": "Hoth"})),
            nested: vec![
                ("species".to_string(), ResultNode::Many(Vec::new())),
                ("capital".to_string(), ResultNode::Absent),
            ],
        };

        let out = assemble_node(&ResultNode::Many(vec![planet]));
        assert_eq!(out, json!([{"name": "Hoth", "species": [], "capital": null}]));
        let keys: Vec<_> = out[0].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "species", "capital"]);
    }

    #[test]
    fn test_roots_keep_query_order() {
        let result = QueryResult {
            roots: vec![
                ("species".to_string(), ResultNode::Absent),
                ("planet".to_string(), ResultNode::Many(Vec::new())),
            ],
        };
        let out = assemble(&result);
        assert_eq!(out, json!({"species": null, "planet": []}));
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["species", "planet"]);
    }
}
