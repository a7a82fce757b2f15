//! JSON-backed static tables
//!
//! Input is an array of objects. Columns appear in first-seen order. Without
//! a schema, column types are inferred from the non-null values:
//!
//! | values seen            | column type |
//! |------------------------|-------------|
//! | integers (and bools)   | integer     |
//! | integers and floats    | float       |
//! | strings, or a mix      | text        |

use std::fs;
use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use super::rows::RowsTable;
use crate::observability::Logger;
use crate::schema::{ColumnDef, ColumnSet, ColumnType};
use crate::table::{Table, TableError, TableResult};
use crate::value::{Row, RowKey, Value};

pub struct JsonTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inferred {
    Unknown,
    Integer,
    Float,
    Text,
}

impl Inferred {
    fn observe(self, value: &JsonValue) -> Inferred {
        let seen = match value {
            JsonValue::Null => return self,
            JsonValue::Bool(_) => Inferred::Integer,
            JsonValue::Number(n) if n.is_i64() => Inferred::Integer,
            JsonValue::Number(_) => Inferred::Float,
            _ => Inferred::Text,
        };
        match (self, seen) {
            (Inferred::Unknown, s) => s,
            (a, b) if a == b => a,
            (Inferred::Integer, Inferred::Float) | (Inferred::Float, Inferred::Integer) => {
                Inferred::Float
            }
            _ => Inferred::Text,
        }
    }

    fn column_type(self) -> ColumnType {
        match self {
            Inferred::Integer => ColumnType::Integer,
            Inferred::Float => ColumnType::Float,
            Inferred::Unknown | Inferred::Text => ColumnType::Text,
        }
    }
}

impl JsonTable {
    pub fn from_str(text: &str, schema: Option<ColumnSet>) -> TableResult<Table> {
        let objects: Vec<Map<String, JsonValue>> = serde_json::from_str(text)?;

        let columns = match schema {
            Some(columns) => columns,
            None => infer(&objects)?,
        };

        let rows = objects
            .iter()
            .enumerate()
            .map(|(position, object)| {
                let row: Row = object
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect();
                (RowKey::from(position), row)
            })
            .collect::<Vec<_>>();

        Logger::trace(
            "JSON_LOADED",
            &[
                ("columns", &columns.len().to_string()),
                ("rows", &rows.len().to_string()),
            ],
        );
        Ok(Table::new(RowsTable::new(columns, rows, "JsonScan")?))
    }

    pub fn from_path(path: impl AsRef<Path>, schema: Option<ColumnSet>) -> TableResult<Table> {
        let text = fs::read_to_string(path)?;
        Self::from_str(&text, schema)
    }

    pub fn from_reader<R: std::io::Read>(mut reader: R, schema: Option<ColumnSet>) -> TableResult<Table> {
        let mut text = String::new();
        reader.read_to_string(&mut text).map_err(TableError::Io)?;
        Self::from_str(&text, schema)
    }
}

fn infer(objects: &[Map<String, JsonValue>]) -> TableResult<ColumnSet> {
    let mut order: Vec<(String, Inferred)> = Vec::new();
    for object in objects {
        for (name, value) in object {
            match order.iter_mut().find(|(n, _)| n == name) {
                Some((_, inferred)) => *inferred = inferred.observe(value),
                None => order.push((name.clone(), Inferred::Unknown.observe(value))),
            }
        }
    }
    let defs = order
        .into_iter()
        .map(|(name, inferred)| ColumnDef::new(name, inferred.column_type()))
        .collect();
    Ok(ColumnSet::new(defs)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_inference() {
        let text = r#"[
            {"id": 1, "score": 2, "name": "a", "tag": 1},
            {"id": 2, "score": 2.5, "name": "b", "tag": "x"},
            {"id": 3, "score": null, "name": null}
        ]"#;
        let table = JsonTable::from_str(text, None).unwrap();
        let schema = table.schema();
        assert_eq!(schema.get("id").unwrap().column_type, ColumnType::Integer);
        assert_eq!(schema.get("score").unwrap().column_type, ColumnType::Float);
        assert_eq!(schema.get("name").unwrap().column_type, ColumnType::Text);
        assert_eq!(schema.get("tag").unwrap().column_type, ColumnType::Text);
        assert_eq!(schema.names(), vec!["id", "score", "name", "tag"]);

        let rows = table.rows().unwrap();
        assert_eq!(rows[0].value("score"), &Value::Float(2.0));
        assert_eq!(rows[0].value("tag"), &Value::Text("1".into()));
        assert!(rows[2].value("tag").is_null());
    }

    #[test]
    fn test_filters_on_inferred_columns() {
        let text = r#"[{"n": 3}, {"n": 1}, {"n": 2}]"#;
        let table = JsonTable::from_str(text, None).unwrap();
        let ordered = table.gte("n", 2).unwrap().order("n").unwrap();
        let values: Vec<Value> = ordered
            .rows()
            .unwrap()
            .into_iter()
            .map(|r| r.value("n").clone())
            .collect();
        assert_eq!(values, vec![Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_non_array_rejected() {
        let err = JsonTable::from_str(r#"{"n": 1}"#, None).unwrap_err();
        assert_eq!(err.code(), "TABLE_JSON");
    }
}
