//! Query state to SQL translation
//!
//! A view's filters form a [`Conjunction`]: an AND-chain of simple filters
//! plus composite clauses produced by OR pushdown and native set
//! operations. Rendering emits `?` placeholders and collects the bound
//! values in order.
//!
//! Value mapping:
//!
//! | column type              | storage   |
//! |--------------------------|-----------|
//! | integer                  | INTEGER   |
//! | float                    | REAL      |
//! | text, date, time, datetime | TEXT    |
//! | binary                   | BLOB      |
//! | decimal                  | INTEGER (scaled) |

use rusqlite::types::{Value as SqlValue, ValueRef};

use crate::planner::{Condition, Filter, InSet, OrderSpec, SortDirection};
use crate::schema::{decimal, ColumnDef, ColumnSet, ColumnType};
use crate::table::{TableError, TableResult};
use crate::value::Value;

/// AND of simple filters and composite clauses
#[derive(Debug, Clone, Default)]
pub(crate) struct Conjunction {
    pub filters: Vec<Filter>,
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone)]
pub(crate) enum Clause {
    /// OR of conjunctions
    Any(Vec<Conjunction>),
    /// No row of the same table matching `excluded` shares the paired
    /// column values (NULL equals NULL)
    NotExists {
        excluded: Conjunction,
        pairs: Vec<(String, String)>,
    },
    /// Lowest rowid of each group of equal `columns` among rows matching
    /// `within`
    FirstOf {
        within: Conjunction,
        columns: Vec<String>,
    },
}

impl Conjunction {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.clauses.is_empty()
    }
}

/// Quotes an identifier
pub(crate) fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL column type for a column
pub(crate) fn storage_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Integer | ColumnType::Decimal { .. } => "INTEGER",
        ColumnType::Float => "REAL",
        ColumnType::Text | ColumnType::Date | ColumnType::Time | ColumnType::DateTime => "TEXT",
        ColumnType::Binary => "BLOB",
    }
}

/// Converts a value for storage in or comparison against a column.
///
/// Returns `None` when a decimal column gets a value with no scaled form.
pub(crate) fn encode(column_type: ColumnType, value: &Value) -> Option<SqlValue> {
    if let ColumnType::Decimal { scale } = column_type {
        let scaled = match value {
            Value::Null => return Some(SqlValue::Null),
            Value::Text(s) => decimal::to_scaled(s, scale),
            Value::Int(_) | Value::Float(_) => value
                .as_number()
                .and_then(|n| decimal::number_to_scaled(n, scale)),
            Value::Bytes(_) => None,
        };
        return scaled.map(SqlValue::Integer);
    }
    Some(match value {
        Value::Null => SqlValue::Null,
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
    })
}

/// Converts a stored cell back to a value of the column type
pub(crate) fn decode(column_type: ColumnType, cell: ValueRef<'_>) -> TableResult<Value> {
    Ok(match (column_type, cell) {
        (_, ValueRef::Null) => Value::Null,
        (ColumnType::Decimal { scale }, ValueRef::Integer(i)) => {
            Value::Text(decimal::from_scaled(i, scale))
        }
        (ColumnType::Float, ValueRef::Integer(i)) => Value::Float(i as f64),
        (_, ValueRef::Integer(i)) => Value::Int(i),
        (_, ValueRef::Real(f)) => Value::Float(f),
        (_, ValueRef::Text(t)) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        (_, ValueRef::Blob(b)) => Value::Bytes(b.to_vec()),
    })
}

/// True if the filter has an exact SQL form against this column
pub(crate) fn translatable(def: &ColumnDef, filter: &Filter) -> bool {
    match &filter.condition {
        Condition::In(InSet::Query(_)) => false,
        Condition::In(InSet::Values(set)) => set
            .values()
            .iter()
            .all(|v| encode(def.column_type, v).is_some()),
        Condition::Like(_) => matches!(
            def.column_type,
            ColumnType::Integer
                | ColumnType::Text
                | ColumnType::Date
                | ColumnType::Time
                | ColumnType::DateTime
        ),
        other => other
            .value()
            .is_some_and(|v| encode(def.column_type, v).is_some()),
    }
}

/// Renders conditions for the table aliased `t{depth}`
pub(crate) struct Renderer<'a> {
    pub table: &'a str,
    pub columns: &'a ColumnSet,
    pub params: Vec<SqlValue>,
}

impl<'a> Renderer<'a> {
    pub fn new(table: &'a str, columns: &'a ColumnSet) -> Self {
        Self {
            table,
            columns,
            params: Vec::new(),
        }
    }

    pub fn alias(depth: usize) -> String {
        format!("t{}", depth)
    }

    fn column(&self, depth: usize, name: &str) -> String {
        format!("{}.{}", Self::alias(depth), ident(name))
    }

    fn bind(&mut self, def: &ColumnDef, value: &Value) -> TableResult<String> {
        let encoded = encode(def.column_type, value).ok_or_else(|| TableError::InvalidOperand {
            column: def.name.clone(),
            reason: format!("{} is not a {}", value, def.column_type.type_name()),
        })?;
        self.params.push(encoded);
        Ok("?".to_string())
    }

    /// WHERE body for a conjunction; `1` when it holds no conditions
    pub fn conjunction(&mut self, depth: usize, conj: &Conjunction) -> TableResult<String> {
        let mut parts = Vec::with_capacity(conj.filters.len() + conj.clauses.len());
        for filter in &conj.filters {
            parts.push(self.filter(depth, filter)?);
        }
        for clause in &conj.clauses {
            parts.push(self.clause(depth, clause)?);
        }
        Ok(match parts.len() {
            0 => "1".to_string(),
            1 => parts.remove(0),
            _ => format!("({})", parts.join(" AND ")),
        })
    }

    fn filter(&mut self, depth: usize, filter: &Filter) -> TableResult<String> {
        let def = self
            .columns
            .get(&filter.column)
            .ok_or_else(|| TableError::UnknownColumn(filter.column.clone()))?
            .clone();
        let column = self.column(depth, &filter.column);
        let op = match &filter.condition {
            Condition::Eq(_) => "=",
            Condition::Lt(_) => "<",
            Condition::Lte(_) => "<=",
            Condition::Gt(_) => ">",
            Condition::Gte(_) => ">=",
            Condition::In(InSet::Values(set)) => {
                let mut marks = Vec::with_capacity(set.len());
                for value in set.values() {
                    marks.push(self.bind(&def, value)?);
                }
                return Ok(format!("{} IN ({})", column, marks.join(", ")));
            }
            Condition::In(InSet::Query(_)) => {
                return Err(TableError::InvalidOperand {
                    column: filter.column.clone(),
                    reason: "IN over a view has no SQL form".into(),
                })
            }
            Condition::Like(pattern) => {
                self.params.push(SqlValue::Text(pattern.as_str().to_string()));
                return Ok(format!("{} LIKE ?", column));
            }
        };
        let value = filter.condition.value().cloned().unwrap_or(Value::Null);
        let mark = self.bind(&def, &value)?;
        Ok(format!("{} {} {}", column, op, mark))
    }

    fn clause(&mut self, depth: usize, clause: &Clause) -> TableResult<String> {
        match clause {
            Clause::Any(branches) => {
                if branches.is_empty() {
                    return Ok("0".to_string());
                }
                let mut parts = Vec::with_capacity(branches.len());
                for branch in branches {
                    parts.push(self.conjunction(depth, branch)?);
                }
                Ok(format!("({})", parts.join(" OR ")))
            }
            Clause::NotExists { excluded, pairs } => {
                let inner = depth + 1;
                let mut conditions = vec![self.conjunction(inner, excluded)?];
                for (own, other) in pairs {
                    conditions.push(format!(
                        "{} IS {}",
                        self.column(inner, other),
                        self.column(depth, own)
                    ));
                }
                Ok(format!(
                    "NOT EXISTS (SELECT 1 FROM {} AS {} WHERE {})",
                    ident(self.table),
                    Self::alias(inner),
                    conditions.join(" AND ")
                ))
            }
            Clause::FirstOf { within, columns } => {
                let inner = depth + 1;
                let condition = self.conjunction(inner, within)?;
                let groups: Vec<String> = columns.iter().map(|c| self.column(inner, c)).collect();
                Ok(format!(
                    "{}.rowid IN (SELECT MIN({}.rowid) FROM {} AS {} WHERE {} GROUP BY {})",
                    Self::alias(depth),
                    Self::alias(inner),
                    ident(self.table),
                    Self::alias(inner),
                    condition,
                    groups.join(", ")
                ))
            }
        }
    }

    /// ORDER BY body; NULLs sort last ascending and first descending, ties
    /// fall back to rowid
    pub fn order(&self, spec: Option<&OrderSpec>) -> String {
        let mut parts: Vec<String> = spec
            .map(|s| {
                s.keys()
                    .iter()
                    .map(|k| match k.direction {
                        SortDirection::Asc => format!("{} ASC NULLS LAST", self.column(0, &k.column)),
                        SortDirection::Desc => {
                            format!("{} DESC NULLS FIRST", self.column(0, &k.column))
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        parts.push(format!("{}.rowid", Self::alias(0)));
        parts.join(", ")
    }
}
