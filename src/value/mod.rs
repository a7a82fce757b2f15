//! Cell values and rows
//!
//! A `Value` is one cell. Dates, times and decimals travel as text; the
//! column type decides how that text is validated and stored.
//!
//! # Ordering
//!
//! Values have one total order used by filters, sorting and index keys:
//!
//! numeric < text < bytes < NULL
//!
//! Text that parses as a number counts as numeric, so `5`, `5.0` and `"5"`
//! compare equal. Text ordering is raw byte order unless a collator is
//! installed (see [`collation`]), which only affects sorting.

pub mod collation;
mod like;
mod row;

pub use like::LikePattern;
pub use row::{Row, RowKey};

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL
    Null,
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text (also dates, times and decimals)
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
}

/// A numeric view of a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Approximate value used for the primary comparison.
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            // -0.0 + 0.0 is 0.0, so both zeros compare equal
            Number::Float(f) => *f + 0.0,
        }
    }

    /// Exact integer part used to break ties between equal approximations.
    pub fn as_i64(&self) -> i64 {
        match self {
            Number::Int(i) => *i,
            Number::Float(f) => *f as i64,
        }
    }

    /// Numeric total order: approximate value first, then the integer part.
    pub fn cmp_total(&self, other: &Number) -> Ordering {
        self.as_f64()
            .total_cmp(&other.as_f64())
            .then_with(|| self.as_i64().cmp(&other.as_i64()))
    }
}

/// Parses text as a number when it is a plain decimal literal.
///
/// Accepts an optional sign, digits, an optional fraction and an optional
/// exponent. Rejects `inf`, `NaN`, empty text and surrounding whitespace.
pub fn parse_number(text: &str) -> Option<Number> {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let mut i = 0;
    if bytes[0] == b'+' || bytes[0] == b'-' {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut has_digits = i > digits_start;
    let mut is_integer = true;
    if i < bytes.len() && bytes[i] == b'.' {
        is_integer = false;
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        has_digits |= i > frac_start;
    }
    if !has_digits {
        return None;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        is_integer = false;
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }
    if is_integer {
        if let Ok(v) = text.parse::<i64>() {
            return Some(Number::Int(v));
        }
    }
    text.parse::<f64>().ok().map(Number::Float)
}

impl Value {
    /// Returns true for NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric interpretation, if any. Numeric-looking text counts.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            Value::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Returns the text payload, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Renders the value as text for LIKE matching and display.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    fn rank(&self) -> u8 {
        if self.as_number().is_some() {
            return 0;
        }
        match self {
            Value::Text(_) => 1,
            Value::Bytes(_) => 2,
            _ => 3,
        }
    }

    /// Total order with raw byte ordering for text.
    ///
    /// Agrees with the byte order of [`crate::index::IndexKey`].
    pub fn cmp_raw(&self, other: &Value) -> Ordering {
        self.cmp_with(other, |a, b| a.as_bytes().cmp(b.as_bytes()))
    }

    /// Total order with text compared by the installed collator.
    pub fn cmp_collated(&self, other: &Value) -> Ordering {
        self.cmp_with(other, collation::compare)
    }

    fn cmp_with(&self, other: &Value, text_cmp: impl Fn(&str, &str) -> Ordering) -> Ordering {
        let (ra, rb) = (self.rank(), other.rank());
        if ra != rb {
            return ra.cmp(&rb);
        }
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return a.cmp_total(&b);
        }
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => text_cmp(a, b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }

    /// Equality with numeric coercion; NULL equals NULL.
    ///
    /// Filters never call this with a NULL cell: a NULL cell matches no
    /// comparison.
    pub fn loosely_eq(&self, other: &Value) -> bool {
        self.cmp_raw(other) == Ordering::Equal
    }

    /// Converts a JSON value. Booleans become 0/1; arrays and objects are
    /// kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Int(i64::from(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Converts to a JSON value. Bytes become an array of numbers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::from(b.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(s) => write!(f, "'{}'", s),
            other => write!(f, "{}", other.to_text()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        i64::try_from(v).map(Value::Int).unwrap_or(Value::Float(v as f64))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Text(v.format("%Y-%m-%d").to_string())
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Text(v.format("%H:%M:%S").to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Text(v.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(v: DateTime<Tz>) -> Self {
        Value::from(v.naive_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_text_coercion() {
        assert!(Value::Int(5).loosely_eq(&Value::from("5")));
        assert!(Value::Float(5.0).loosely_eq(&Value::Int(5)));
        assert!(!Value::from("5a").loosely_eq(&Value::Int(5)));
    }

    #[test]
    fn test_parse_number_rejects_specials() {
        assert_eq!(parse_number("42"), Some(Number::Int(42)));
        assert_eq!(parse_number("-1.5"), Some(Number::Float(-1.5)));
        assert_eq!(parse_number("1e3"), Some(Number::Float(1000.0)));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(" 1"), None);
        assert_eq!(parse_number("."), None);
        assert_eq!(parse_number("2024-01-01"), None);
    }

    #[test]
    fn test_type_rank_ordering() {
        let ordered = [
            Value::Int(-3),
            Value::from("2"),
            Value::Float(2.5),
            Value::from("abc"),
            Value::Bytes(vec![0]),
            Value::Null,
        ];
        for pair in ordered.windows(2) {
            assert_eq!(pair[0].cmp_raw(&pair[1]), Ordering::Less, "{:?}", pair);
        }
    }

    #[test]
    fn test_large_integers_order_exactly() {
        let a = Value::Int(i64::MAX - 1);
        let b = Value::Int(i64::MAX);
        assert_eq!(a.cmp_raw(&b), Ordering::Less);
    }

    #[test]
    fn test_null_equals_null_loosely() {
        assert!(Value::Null.loosely_eq(&Value::Null));
        assert!(!Value::Null.loosely_eq(&Value::Int(0)));
    }

    #[test]
    fn test_chrono_conversion() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::from(date), Value::from("2024-02-29"));
    }

    #[test]
    fn test_json_round_trip() {
        let json = serde_json::json!({"a": true});
        assert_eq!(Value::from_json(&json["a"]), Value::Int(1));
        assert_eq!(Value::from("x").to_json(), serde_json::json!("x"));
    }
}
