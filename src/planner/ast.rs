//! Filter and ordering vocabulary shared by every backend
//!
//! A view's filter chain is a list of [`Filter`]s combined with AND. Each
//! filter carries its operand in a [`Condition`] variant.

use std::collections::HashSet;
use std::fmt;

use crate::index::IndexKey;
use crate::table::{Table, TableError, TableResult};
use crate::value::{LikePattern, Row, Value};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Like,
}

impl Operator {
    /// SQL spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "IN",
            Operator::Like => "LIKE",
        }
    }

    /// Returns true for `<`, `<=`, `>` and `>=`
    pub fn is_range(&self) -> bool {
        matches!(self, Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An operator with its operand
#[derive(Debug, Clone)]
pub enum Condition {
    Eq(Value),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    In(InSet),
    Like(LikePattern),
}

impl Condition {
    /// Builds a condition from an operator and a single value.
    ///
    /// `In` takes the value as a one-element set; `Like` takes its text.
    pub fn new(operator: Operator, value: Value) -> TableResult<Condition> {
        Ok(match operator {
            Operator::Eq => Condition::Eq(value),
            Operator::Lt => Condition::Lt(value),
            Operator::Lte => Condition::Lte(value),
            Operator::Gt => Condition::Gt(value),
            Operator::Gte => Condition::Gte(value),
            Operator::In => Condition::In(InSet::Values(ValueSet::new("", [value]))),
            Operator::Like => {
                if value.is_null() {
                    // Kept as a comparison so the filter is statically empty
                    Condition::Eq(Value::Null)
                } else {
                    Condition::Like(LikePattern::new(&value.to_text())?)
                }
            }
        })
    }

    pub fn operator(&self) -> Operator {
        match self {
            Condition::Eq(_) => Operator::Eq,
            Condition::Lt(_) => Operator::Lt,
            Condition::Lte(_) => Operator::Lte,
            Condition::Gt(_) => Operator::Gt,
            Condition::Gte(_) => Operator::Gte,
            Condition::In(_) => Operator::In,
            Condition::Like(_) => Operator::Like,
        }
    }

    /// Operand of a scalar comparison
    pub fn value(&self) -> Option<&Value> {
        match self {
            Condition::Eq(v)
            | Condition::Lt(v)
            | Condition::Lte(v)
            | Condition::Gt(v)
            | Condition::Gte(v) => Some(v),
            Condition::In(_) | Condition::Like(_) => None,
        }
    }

    /// True if no row can satisfy the condition: a NULL operand or an empty
    /// value set.
    pub fn is_never(&self) -> bool {
        match self {
            Condition::In(InSet::Values(set)) => set.is_empty(),
            Condition::In(InSet::Query(_)) | Condition::Like(_) => false,
            other => other.value().is_some_and(Value::is_null),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::In(InSet::Values(set)) => {
                write!(f, "IN (")?;
                for (i, v) in set.values().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Condition::In(InSet::Query(_)) => write!(f, "IN (<query>)"),
            Condition::Like(p) => write!(f, "LIKE '{}'", p.as_str()),
            other => match other.value() {
                Some(v) => write!(f, "{} {}", other.operator(), v),
                None => write!(f, "{}", other.operator()),
            },
        }
    }
}

/// One column condition of a filter chain
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: String,
    pub condition: Condition,
}

impl Filter {
    pub fn new(column: impl Into<String>, condition: Condition) -> Self {
        Self {
            column: column.into(),
            condition,
        }
    }

    pub fn is_never(&self) -> bool {
        self.condition.is_never()
    }

    /// Same condition against another column name
    pub fn with_column(&self, column: impl Into<String>) -> Filter {
        Filter {
            column: column.into(),
            condition: self.condition.clone(),
        }
    }

    /// Data version of a table used as an `IN` operand, if any
    pub fn dependency_version(&self) -> u64 {
        match &self.condition {
            Condition::In(InSet::Query(table)) => table.data_version(),
            _ => 0,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.condition)
    }
}

/// Operand of an `IN` condition
#[derive(Debug, Clone)]
pub enum InSet {
    /// A literal value set
    Values(ValueSet),
    /// A view exposing exactly one column
    Query(Table),
}

impl From<ValueSet> for InSet {
    fn from(set: ValueSet) -> Self {
        InSet::Values(set)
    }
}

impl From<Table> for InSet {
    fn from(table: Table) -> Self {
        InSet::Query(table)
    }
}

impl From<&Table> for InSet {
    fn from(table: &Table) -> Self {
        InSet::Query(table.clone())
    }
}

/// A set of values for one column
///
/// NULL members are kept for display but never match.
#[derive(Debug, Clone)]
pub struct ValueSet {
    column: String,
    values: Vec<Value>,
    keys: HashSet<IndexKey>,
}

impl ValueSet {
    pub fn new<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let keys = values
            .iter()
            .filter(|v| !v.is_null())
            .map(IndexKey::from_value)
            .collect();
        Self {
            column: column.into(),
            values,
            keys,
        }
    }

    /// Builds a set from the single visible column of a view.
    pub fn from_table(column: impl Into<String>, table: &Table) -> TableResult<Self> {
        let visible = table.visible_columns();
        let [only] = visible.as_slice() else {
            return Err(TableError::InvalidOperand {
                column: column.into(),
                reason: format!("IN query must expose one column, found {}", visible.len()),
            });
        };
        let mut values = Vec::new();
        for item in table.iter() {
            let (_, row) = item?;
            values.push(row.value(only).clone());
        }
        Ok(Self::new(column, values))
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of distinct non-NULL members
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if no value can match
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Tests a single value. NULL is never a member.
    pub fn contains(&self, value: &Value) -> bool {
        !value.is_null() && self.keys.contains(&IndexKey::from_value(value))
    }

    /// Tests the set's column of a record
    pub fn has_member(&self, record: &Row) -> bool {
        self.contains(record.value(&self.column))
    }

    /// Same values for another column
    pub fn with_column(&self, column: impl Into<String>) -> ValueSet {
        ValueSet {
            column: column.into(),
            values: self.values.clone(),
            keys: self.keys.clone(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One ordering column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

/// Ordered list of sort keys
///
/// Textual form: `"col1 [ASC|DESC], col2 [ASC|DESC]"`, ascending by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OrderSpec {
    keys: Vec<SortKey>,
}

impl OrderSpec {
    /// Empty specification (no ordering)
    pub fn none() -> Self {
        Self::default()
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::none().then(column, SortDirection::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::none().then(column, SortDirection::Desc)
    }

    /// Appends a sort key
    pub fn then(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.keys.push(SortKey {
            column: column.into(),
            direction,
        });
        self
    }

    /// Parses the textual form. Blank text is the empty specification.
    pub fn parse(text: &str) -> TableResult<Self> {
        let mut spec = OrderSpec::none();
        if text.trim().is_empty() {
            return Ok(spec);
        }
        for part in text.split(',') {
            let mut words = part.split_whitespace();
            let column = words
                .next()
                .ok_or_else(|| TableError::InvalidOrder(text.to_string()))?;
            let direction = match words.next() {
                None => SortDirection::Asc,
                Some(w) if w.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                Some(w) if w.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                Some(_) => return Err(TableError::InvalidOrder(text.to_string())),
            };
            if words.next().is_some() {
                return Err(TableError::InvalidOrder(text.to_string()));
            }
            spec = spec.then(column, direction);
        }
        Ok(spec)
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.column.as_str())
    }

    /// Same directions with every column renamed through `map`
    pub fn map_columns(&self, mut map: impl FnMut(&str) -> String) -> OrderSpec {
        OrderSpec {
            keys: self
                .keys
                .iter()
                .map(|k| SortKey {
                    column: map(&k.column),
                    direction: k.direction,
                })
                .collect(),
        }
    }
}

impl fmt::Display for OrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", key.column, key.direction.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_spec_parse() {
        let spec = OrderSpec::parse("name, id DESC").unwrap();
        assert_eq!(spec, OrderSpec::asc("name").then("id", SortDirection::Desc));
        assert_eq!(spec.to_string(), "name ASC, id DESC");
        assert!(OrderSpec::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn test_order_spec_rejects_garbage() {
        assert!(OrderSpec::parse("name SIDEWAYS").is_err());
        assert!(OrderSpec::parse("a,,b").is_err());
        assert!(OrderSpec::parse("a b c").is_err());
    }

    #[test]
    fn test_value_set_membership() {
        let set = ValueSet::new("status", ["active", "pending"]);
        assert!(set.has_member(&Row::new().with("status", "active")));
        assert!(!set.has_member(&Row::new().with("status", "deleted")));
        assert!(!set.has_member(&Row::new()));
    }

    #[test]
    fn test_value_set_numeric_coercion() {
        let set = ValueSet::new("id", [1, 2]);
        assert!(set.contains(&Value::from("2")));
        assert!(set.contains(&Value::Float(1.0)));
    }

    #[test]
    fn test_never_conditions() {
        assert!(Condition::Eq(Value::Null).is_never());
        assert!(Condition::In(ValueSet::new("x", Vec::<Value>::new()).into()).is_never());
        assert!(Condition::In(ValueSet::new("x", [Value::Null]).into()).is_never());
        assert!(!Condition::Lt(Value::Int(1)).is_never());
    }

    #[test]
    fn test_filter_display() {
        let filter = Filter::new("name", Condition::Eq(Value::from("Bob")));
        assert_eq!(filter.to_string(), "name = 'Bob'");
        let filter = Filter::new("id", Condition::In(ValueSet::new("id", [1, 2]).into()));
        assert_eq!(filter.to_string(), "id IN (1, 2)");
    }
}
