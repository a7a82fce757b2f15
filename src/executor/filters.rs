//! Row-level filter evaluation
//!
//! A NULL cell never matches any condition. Comparisons follow the value
//! total order, so numeric-looking text compares as a number.

use std::cmp::Ordering;

use crate::planner::{Condition, Filter, InSet, Operator, ValueSet};
use crate::table::TableResult;
use crate::value::{LikePattern, Row, Value};

/// A filter ready to test rows
///
/// `IN` operands backed by a view are materialized once at compile time.
#[derive(Debug, Clone)]
pub struct RowFilter {
    column: String,
    test: Test,
}

#[derive(Debug, Clone)]
enum Test {
    Compare(Operator, Value),
    Members(ValueSet),
    Like(LikePattern),
}

impl RowFilter {
    pub fn compile(filter: &Filter) -> TableResult<RowFilter> {
        let test = match &filter.condition {
            Condition::In(InSet::Values(set)) => Test::Members(set.clone()),
            Condition::In(InSet::Query(table)) => {
                Test::Members(ValueSet::from_table(filter.column.clone(), table)?)
            }
            Condition::Like(pattern) => Test::Like(pattern.clone()),
            other => match other.value() {
                Some(v) => Test::Compare(other.operator(), v.clone()),
                None => Test::Compare(other.operator(), Value::Null),
            },
        };
        Ok(RowFilter {
            column: filter.column.clone(),
            test,
        })
    }

    pub fn compile_all(filters: &[Filter]) -> TableResult<Vec<RowFilter>> {
        filters.iter().map(Self::compile).collect()
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Checks a row against this filter
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.value(&self.column);
        if cell.is_null() {
            return false;
        }
        match &self.test {
            Test::Compare(op, operand) => compare(*op, cell, operand),
            Test::Members(set) => set.contains(cell),
            Test::Like(pattern) => pattern.matches(&cell.to_text()),
        }
    }

    /// Checks a row against every filter (AND semantics)
    pub fn matches_all(filters: &[RowFilter], row: &Row) -> bool {
        filters.iter().all(|f| f.matches(row))
    }
}

/// Evaluates a scalar comparison. Either side being NULL never matches.
pub fn compare(op: Operator, cell: &Value, operand: &Value) -> bool {
    if cell.is_null() || operand.is_null() {
        return false;
    }
    let ord = cell.cmp_raw(operand);
    match op {
        Operator::Eq => ord == Ordering::Equal,
        Operator::Lt => ord == Ordering::Less,
        Operator::Lte => ord != Ordering::Greater,
        Operator::Gt => ord == Ordering::Greater,
        Operator::Gte => ord != Ordering::Less,
        Operator::In | Operator::Like => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(column: &str, condition: Condition) -> RowFilter {
        RowFilter::compile(&Filter::new(column, condition)).unwrap()
    }

    #[test]
    fn test_equality_coerces_numeric_text() {
        let f = compile("id", Condition::Eq(Value::Int(5)));
        assert!(f.matches(&Row::new().with("id", "5")));
        assert!(f.matches(&Row::new().with("id", 5.0)));
        assert!(!f.matches(&Row::new().with("id", "5x")));
    }

    #[test]
    fn test_range_predicates() {
        let row = Row::new().with("age", 25);
        assert!(compile("age", Condition::Gte(Value::Int(18))).matches(&row));
        assert!(compile("age", Condition::Lte(Value::Int(25))).matches(&row));
        assert!(!compile("age", Condition::Gt(Value::Int(25))).matches(&row));
        assert!(!compile("age", Condition::Lt(Value::Int(25))).matches(&row));
    }

    #[test]
    fn test_null_cell_never_matches() {
        let row = Row::new().with("name", Value::Null);
        assert!(!compile("name", Condition::Lt(Value::from("z"))).matches(&row));
        assert!(!compile("name", Condition::Like(LikePattern::new("%").unwrap())).matches(&row));
        assert!(!compile("missing", Condition::Gt(Value::Int(0))).matches(&row));
    }

    #[test]
    fn test_like_and_members() {
        let row = Row::new().with("name", "Bob").with("status", "active");
        assert!(compile("name", Condition::Like(LikePattern::new("b_B").unwrap())).matches(&row));
        let set = ValueSet::new("status", ["active", "pending"]);
        assert!(compile("status", Condition::In(set.into())).matches(&row));
    }

    #[test]
    fn test_matches_all_is_and() {
        let row = Row::new().with("a", 1).with("b", 2);
        let filters = vec![
            compile("a", Condition::Eq(Value::Int(1))),
            compile("b", Condition::Eq(Value::Int(3))),
        ];
        assert!(!RowFilter::matches_all(&filters, &row));
        assert!(RowFilter::matches_all(&filters[..1], &row));
    }
}
