//! Record browser - case-insensitive substring matching over raw records

use holoquery_core::Record;
use serde_json::Value;
use std::sync::Arc;

/// Default number of records per page
pub const DEFAULT_LIMIT: usize = 50;

/// Largest accepted page size
pub const MAX_LIMIT: usize = 1000;

/// Substring filter with pagination
#[derive(Debug, Clone)]
pub struct RecordFilter {
    text: Option<String>,
    fields: Vec<String>,
    offset: usize,
    limit: usize,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            text: None,
            fields: Vec::new(),
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new().with_text(text)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into().to_lowercase());
        self
    }

    /// Only search the given field (repeatable)
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Page size, clamped to `1..=MAX_LIMIT`
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    fn searchable(&self, record: &Record) -> String {
        let mut parts = Vec::new();
        for (field, value) in record.iter() {
            if self.fields.is_empty() || self.fields.iter().any(|f| f == field) {
                collect_scalars(value, &mut parts);
            }
        }
        parts.join(" ").to_lowercase()
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self.text.as_deref() {
            None | Some("") => true,
            Some(text) => self.searchable(record).contains(text),
        }
    }

    /// Matching records in dataset order, paginated
    pub fn apply(&self, records: &[Arc<Record>]) -> Vec<Arc<Record>> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .skip(self.offset)
            .take(self.limit)
            .cloned()
            .collect()
    }

    /// Number of matching records before pagination
    pub fn count(&self, records: &[Arc<Record>]) -> usize {
        records.iter().filter(|record| self.matches(record)).count()
    }
}

fn collect_scalars(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => {
            for item in items {
                if !item.is_array() && !item.is_object() {
                    collect_scalars(item, out);
                }
            }
        }
        Value::Null | Value::Object(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<Arc<Record>> {
        json!([
            {"name": "Luke Skywalker", "homeworld": "Tatooine", "films": ["A New Hope", "Return of the Jedi"]},
            {"name": "Chewbacca", "homeworld": "Kashyyyk", "height": 228},
            {"name": "Owen Lars", "homeworld": "Tatooine", "meta": {"note": "Skywalker"}}
        ])
        .as_array()
        .unwrap()
        .iter()
        .map(|r| Arc::new(r.as_object().unwrap().clone()))
        .collect()
    }

    fn names(found: &[Arc<Record>]) -> Vec<&str> {
        found.iter().map(|r| r["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_case_insensitive_text() {
        let found = RecordFilter::text("TATOOINE").apply(&records());
        assert_eq!(names(&found), vec!["Luke Skywalker", "Owen Lars"]);
    }

    #[test]
    fn test_numbers_and_arrays_searchable() {
        assert_eq!(names(&RecordFilter::text("228").apply(&records())), vec!["Chewbacca"]);
        assert_eq!(names(&RecordFilter::text("jedi").apply(&records())), vec!["Luke Skywalker"]);
    }

    #[test]
    fn test_nested_objects_ignored() {
        // Owen's "Skywalker" sits inside an object
        let found = RecordFilter::text("skywalker").apply(&records());
        assert_eq!(names(&found), vec!["Luke Skywalker"]);
    }

    #[test]
    fn test_field_restriction() {
        assert_eq!(RecordFilter::text("k").apply(&records()).len(), 2);
        let found = RecordFilter::text("k").with_field("homeworld").apply(&records());
        assert_eq!(names(&found), vec!["Chewbacca"]);

        let found = RecordFilter::text("lars").with_field("homeworld").apply(&records());
        assert!(found.is_empty());
    }

    #[test]
    fn test_pagination() {
        let filter = RecordFilter::new().with_offset(1).with_limit(1);
        assert_eq!(names(&filter.apply(&records())), vec!["Chewbacca"]);
        assert_eq!(filter.count(&records()), 3);

        let past_end = RecordFilter::new().with_offset(10);
        assert!(past_end.apply(&records()).is_empty());
    }

    #[test]
    fn test_limit_clamped() {
        let filter = RecordFilter::new().with_limit(0);
        assert_eq!(filter.apply(&records()).len(), 1);
        assert_eq!(RecordFilter::new().with_limit(5000).limit, MAX_LIMIT);
    }
}
