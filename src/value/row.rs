//! Rows and row keys

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Value;

static NULL: Value = Value::Null;

/// Backend-assigned row identifier.
///
/// Unique only within one backend instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowKey {
    Int(i64),
    Text(String),
}

impl RowKey {
    /// Returns the integer key, if this is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            RowKey::Int(i) => Some(*i),
            RowKey::Text(_) => None,
        }
    }

    /// Builds a key from a cell value. NULL and bytes have no key form.
    pub fn from_value(value: &Value) -> Option<RowKey> {
        match value {
            Value::Int(i) => Some(RowKey::Int(*i)),
            Value::Text(s) => Some(RowKey::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Int(i) => write!(f, "{}", i),
            RowKey::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RowKey {
    fn from(v: i64) -> Self {
        RowKey::Int(v)
    }
}

impl From<usize> for RowKey {
    fn from(v: usize) -> Self {
        RowKey::Int(v as i64)
    }
}

impl From<&str> for RowKey {
    fn from(v: &str) -> Self {
        RowKey::Text(v.to_string())
    }
}

impl From<String> for RowKey {
    fn from(v: String) -> Self {
        RowKey::Text(v)
    }
}

/// A named-field record.
///
/// Fields are kept in name order so rows print and compare deterministically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: BTreeMap<String, Value>,
}

impl Row {
    /// Creates an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Sets a field, returning the previous value
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(column.into(), value.into())
    }

    /// Returns the field value if present
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Returns the field value, treating a missing field as NULL
    pub fn value(&self, column: &str) -> &Value {
        self.fields.get(column).unwrap_or(&NULL)
    }

    /// Returns true if the field is present
    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    /// Removes a field
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.fields.remove(column)
    }

    /// Field names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// (name, value) pairs in name order
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the row has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keeps only the named fields. Missing names become NULL.
    pub fn project(&self, columns: &[String]) -> Row {
        columns
            .iter()
            .map(|c| (c.clone(), self.value(c).clone()))
            .collect()
    }

    /// Returns true if every field of `record` equals the same field here.
    pub fn matches_record(&self, record: &Row) -> bool {
        record
            .iter()
            .all(|(column, value)| self.value(column).loosely_eq(value))
    }

    /// Converts to a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Builds a [`Row`] from `column => value` pairs.
///
/// ```
/// let row = tabula::row! { "id" => 1, "name" => "Bob" };
/// assert_eq!(row.len(), 2);
/// ```
#[macro_export]
macro_rules! row {
    () => { $crate::value::Row::new() };
    ($($column:expr => $value:expr),+ $(,)?) => {
        $crate::value::Row::new()$(.with($column, $value))+
    };
}
