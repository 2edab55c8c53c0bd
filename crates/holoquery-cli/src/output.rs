//! Output formatting utilities

use clap::ValueEnum;
use holoquery_core::Error;
use serde_json::{Map, Value};

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON on one line
    Json,
    /// Indented JSON
    #[default]
    Pretty,
    /// Plain-text tables
    Table,
}

impl OutputFormat {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        <Self as ValueEnum>::from_str(s, true)
            .map_err(|_| anyhow::anyhow!("Unknown output format: {} (json, pretty, table)", s))
    }
}

/// Format a JSON value based on format type
pub fn format_value(value: &Value, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => value.to_string(),
        OutputFormat::Pretty => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        OutputFormat::Table => match value {
            Value::Object(sections) if sections.values().all(|v| v.is_null() || !is_scalar(v)) => sections
                .iter()
                .map(|(name, section)| format!("{}\n{}", name, table(section)))
                .collect::<Vec<_>>()
                .join("\n"),
            other => table(other),
        },
    }
}

/// Error report for stderr: JSON for machine formats, one line otherwise
pub fn format_error(err: &Error, format: OutputFormat) -> String {
    let report = err.report();
    match format {
        OutputFormat::Json => serde_json::to_string(&report).unwrap_or_else(|_| err.to_string()),
        OutputFormat::Pretty | OutputFormat::Table => report.to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(is_scalar) => {
            items.iter().map(cell).collect::<Vec<_>>().join(", ")
        }
        Value::Array(items) => format!("[{} items]", items.len()),
        // Nested records show their first field, usually the key
        Value::Object(map) => map.values().next().map(cell).unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Render records as a table; columns come from the first record
fn table(value: &Value) -> String {
    let rows: Vec<&Map<String, Value>> = match value {
        Value::Null => return "(none)\n".to_string(),
        Value::Object(map) => vec![map],
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        other => return format!("{}\n", cell(other)),
    };
    let Some(first) = rows.first() else {
        return "(empty)\n".to_string();
    };

    let columns: Vec<&String> = first.keys().collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c.as_str()).map(cell).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(columns.iter().map(|c| c.as_str()).collect()));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&line(rule.iter().map(String::as_str).collect()));
    out.push('\n');
    for row in &cells {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use holoquery_core::FieldPath;
    use serde_json::json;

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("table").unwrap(), OutputFormat::Table);
        assert!(OutputFormat::parse("csv").is_err());
    }

    #[test]
    fn test_table_columns_from_first_record() {
        let value = json!({"character": [
            {"name": "Luke Skywalker", "homeworld": {"name": "Tatooine"}},
            {"name": "Yoda", "homeworld": null, "mass": 17}
        ]});
        let out = format_value(&value, OutputFormat::Table);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "character");
        assert_eq!(lines[1], "name            homeworld");
        assert_eq!(lines[3], "Luke Skywalker  Tatooine");
        assert_eq!(lines[4], "Yoda");
    }

    #[test]
    fn test_table_absent_and_empty() {
        let out = format_value(&json!({"species": null, "planet": []}), OutputFormat::Table);
        assert_eq!(out, "species\n(none)\n\nplanet\n(empty)\n");
    }

    #[test]
    fn test_format_error() {
        let err = Error::validation(&FieldPath::root("get").child("starship"), "unknown entity type");
        assert_eq!(
            format_error(&err, OutputFormat::Pretty),
            "SchemaValidationError at get.starship: unknown entity type"
        );
        let report: Value = serde_json::from_str(&format_error(&err, OutputFormat::Json)).unwrap();
        assert_eq!(report["kind"], "SchemaValidationError");
        assert_eq!(report["path"], "get.starship");
    }
}
