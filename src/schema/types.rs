//! Column value types and index kinds
//!
//! Supported types:
//! - integer: 64-bit signed integer
//! - float: 64-bit floating point
//! - text: UTF-8 string
//! - date / time / datetime: ISO text (`2024-01-31`, `13:45:00`, `2024-01-31 13:45:00`)
//! - binary: raw bytes
//! - decimal: fixed-point text with a declared scale

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::decimal;
use super::errors::{SchemaError, SchemaResult};
use crate::value::Value;

/// Column value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Date,
    Time,
    DateTime,
    Binary,
    /// Fixed-point decimal with `scale` fraction digits
    Decimal { scale: u8 },
}

impl ColumnType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::DateTime => "datetime",
            ColumnType::Binary => "binary",
            ColumnType::Decimal { .. } => "decimal",
        }
    }

    /// True for types whose values order numerically
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::Float | ColumnType::Decimal { .. }
        )
    }

    /// Combines two types for a merged schema.
    ///
    /// Identical types combine to themselves; integer and float widen to
    /// float; decimals widen to the larger scale. Anything else is a mismatch.
    pub fn common(&self, other: &ColumnType, column: &str) -> SchemaResult<ColumnType> {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => Ok(*a),
            (Integer, Float) | (Float, Integer) => Ok(Float),
            (Decimal { scale: a }, Decimal { scale: b }) => Ok(Decimal {
                scale: (*a).max(*b),
            }),
            _ => Err(SchemaError::TypeMismatch {
                column: column.to_string(),
                left: self.type_name(),
                right: other.type_name(),
            }),
        }
    }

    /// Validates and normalizes a value for storage in a column of this type.
    ///
    /// NULL passes through every type.
    pub fn coerce(&self, column: &str, value: Value) -> SchemaResult<Value> {
        if value.is_null() {
            return Ok(value);
        }
        let invalid = |value: &Value| SchemaError::InvalidValue {
            column: column.to_string(),
            expected: self.type_name(),
            found: value.to_string(),
        };
        match self {
            ColumnType::Integer => match &value {
                Value::Int(_) => Ok(value),
                Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(Value::Int(*f as i64)),
                Value::Text(s) => s.parse::<i64>().map(Value::Int).map_err(|_| invalid(&value)),
                _ => Err(invalid(&value)),
            },
            ColumnType::Float => match value.as_number() {
                Some(n) if !matches!(value, Value::Bytes(_)) => Ok(Value::Float(n.as_f64())),
                _ => Err(invalid(&value)),
            },
            ColumnType::Text => match value {
                Value::Bytes(b) => String::from_utf8(b)
                    .map(Value::Text)
                    .map_err(|e| invalid(&Value::Bytes(e.into_bytes()))),
                Value::Text(_) => Ok(value),
                other => Ok(Value::Text(other.to_text())),
            },
            ColumnType::Date | ColumnType::Time | ColumnType::DateTime => {
                let valid = value.as_text().is_some_and(|s| self.accepts_temporal(s));
                if valid {
                    Ok(value)
                } else {
                    Err(invalid(&value))
                }
            }
            ColumnType::Binary => match value {
                Value::Bytes(_) => Ok(value),
                Value::Text(s) => Ok(Value::Bytes(s.into_bytes())),
                other => Err(invalid(&other)),
            },
            ColumnType::Decimal { scale } => {
                let scaled = match &value {
                    Value::Text(s) => decimal::to_scaled(s, *scale),
                    Value::Int(_) | Value::Float(_) => value
                        .as_number()
                        .and_then(|n| decimal::number_to_scaled(n, *scale)),
                    _ => None,
                };
                scaled
                    .map(|s| Value::Text(decimal::from_scaled(s, *scale)))
                    .ok_or_else(|| invalid(&value))
            }
        }
    }
}

impl ColumnType {
    fn accepts_temporal(&self, s: &str) -> bool {
        match self {
            ColumnType::Date => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
            ColumnType::Time => NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_ok(),
            ColumnType::DateTime => {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
                    || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
                    || DateTime::parse_from_rfc3339(s).is_ok()
            }
            _ => false,
        }
    }
}

/// Index kind of a column, weakest first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    #[default]
    None,
    Index,
    Unique,
    Primary,
}

impl IndexKind {
    /// True if the column has any index
    pub fn is_indexed(&self) -> bool {
        *self != IndexKind::None
    }

    /// True for unique and primary columns
    pub fn is_unique(&self) -> bool {
        matches!(self, IndexKind::Unique | IndexKind::Primary)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::None => "none",
            IndexKind::Index => "index",
            IndexKind::Unique => "unique",
            IndexKind::Primary => "primary",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_coercion() {
        let t = ColumnType::Integer;
        assert_eq!(t.coerce("id", Value::from("42")).unwrap(), Value::Int(42));
        assert_eq!(t.coerce("id", Value::Float(3.0)).unwrap(), Value::Int(3));
        assert!(t.coerce("id", Value::from("4x")).is_err());
        assert_eq!(t.coerce("id", Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_date_validation() {
        let t = ColumnType::Date;
        assert!(t.coerce("d", Value::from("2024-02-29")).is_ok());
        assert!(t.coerce("d", Value::from("2023-02-29")).is_err());
    }

    #[test]
    fn test_datetime_accepts_iso_forms() {
        let t = ColumnType::DateTime;
        assert!(t.coerce("at", Value::from("2024-01-31 13:45:00")).is_ok());
        assert!(t.coerce("at", Value::from("2024-01-31T13:45:00")).is_ok());
        assert!(t.coerce("at", Value::from("2024-01-31T13:45:00Z")).is_ok());
        assert!(t.coerce("at", Value::from("yesterday")).is_err());
    }

    #[test]
    fn test_decimal_canonical_text() {
        let t = ColumnType::Decimal { scale: 2 };
        assert_eq!(t.coerce("p", Value::from("12.5")).unwrap(), Value::from("12.50"));
        assert_eq!(t.coerce("p", Value::Int(3)).unwrap(), Value::from("3.00"));
    }

    #[test]
    fn test_common_type() {
        assert_eq!(
            ColumnType::Integer.common(&ColumnType::Float, "x").unwrap(),
            ColumnType::Float
        );
        assert!(ColumnType::Integer.common(&ColumnType::Text, "x").is_err());
    }

    #[test]
    fn test_index_kind_order() {
        assert!(IndexKind::None < IndexKind::Index);
        assert!(IndexKind::Index < IndexKind::Unique);
        assert!(IndexKind::Unique < IndexKind::Primary);
    }
}
