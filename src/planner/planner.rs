//! Index access planning for in-memory tables
//!
//! Picks at most one indexed column to drive a scan.
//!
//! Selection priority (strict order):
//! 1. The column leading an index that satisfies the requested order
//! 2. An equality filter on an indexed column (primary, then unique, then
//!    plain index)
//! 3. A range filter on an indexed column
//!
//! Ties broken lexicographically by column name. Filters the chosen bounds
//! do not absorb are returned as residuals and re-checked per row.

use std::cmp::Reverse;

use super::ast::{Filter, OrderSpec, SortDirection};
use super::bounds::{column_bounds, KeyRange};
use super::explain::ExplainNode;
use crate::schema::{ColumnDef, ColumnSet};
use crate::value::collation;

/// How a scan reaches its rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    /// Every live row in insertion order
    Full,
    /// Index traversal in the requested order
    IndexOrder,
    /// Index lookup of one key
    IndexEquality,
    /// Index traversal of a key range
    IndexRange,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Full => "FULL_SCAN",
            ScanType::IndexOrder => "INDEX_ORDER",
            ScanType::IndexEquality => "INDEX_EQUALITY",
            ScanType::IndexRange => "INDEX_RANGE",
        }
    }
}

/// Immutable access plan (no runtime state)
#[derive(Debug, Clone)]
pub struct AccessPlan {
    pub scan: ScanType,
    /// Column leading the chosen index
    pub column: Option<String>,
    pub range: KeyRange,
    /// Traverse keys in descending order
    pub reverse: bool,
    /// Filters re-checked per row
    pub residual: Vec<Filter>,
    /// Leading index components the requested order covers; zero if the
    /// scan is unordered
    pub order_components: usize,
    /// Components in the chosen index key
    pub index_components: usize,
}

impl AccessPlan {
    fn full(filters: &[Filter]) -> Self {
        Self {
            scan: ScanType::Full,
            column: None,
            range: KeyRange::full(),
            reverse: false,
            residual: filters.to_vec(),
            order_components: 0,
            index_components: 0,
        }
    }

    /// Adds this plan's properties to an explain node
    pub fn describe(&self, mut node: ExplainNode) -> ExplainNode {
        node = node.with("scan", self.scan.as_str());
        if let Some(column) = &self.column {
            node = node.with("column", column);
        }
        if !self.range.is_full() {
            node = node.with("range", self.range.describe());
        }
        if self.reverse {
            node = node.with("direction", "reverse");
        }
        if !self.residual.is_empty() {
            let residual: Vec<String> = self.residual.iter().map(ToString::to_string).collect();
            node = node.with("residual", residual.join(" AND "));
        }
        node
    }
}

/// Plans scans against the indexes declared in a column set
pub struct IndexPlanner<'a> {
    columns: &'a ColumnSet,
}

impl<'a> IndexPlanner<'a> {
    pub fn new(columns: &'a ColumnSet) -> Self {
        Self { columns }
    }

    /// Finds the index whose key order satisfies `spec`.
    ///
    /// The order's columns must be a prefix of the index columns and share one
    /// direction. Declined while a collator is installed and any ordered
    /// column is not numeric, since index order is raw byte order.
    pub fn order_index(&self, spec: &OrderSpec) -> Option<&'a ColumnDef> {
        let first = spec.keys().first()?;
        if spec.keys().iter().any(|k| k.direction != first.direction) {
            return None;
        }
        let def = self.columns.get(&first.column)?;
        if !def.index.is_indexed() {
            return None;
        }
        let index_columns = def.index_columns();
        if spec.len() > index_columns.len()
            || !spec.columns().zip(index_columns.iter()).all(|(a, b)| a == *b)
        {
            return None;
        }
        if collation::is_installed() {
            let all_numeric = spec.columns().all(|c| {
                self.columns
                    .get(c)
                    .is_some_and(|d| d.column_type.is_numeric())
            });
            if !all_numeric {
                return None;
            }
        }
        Some(def)
    }

    /// Plans a scan for a filter chain and an optional native order.
    ///
    /// This method is deterministic: same inputs produce the same plan.
    pub fn plan(&self, filters: &[Filter], order: Option<&OrderSpec>) -> AccessPlan {
        if let Some(spec) = order {
            if let Some(def) = self.order_index(spec) {
                let mut plan = self.bounded(def, filters, ScanType::IndexOrder);
                plan.reverse = spec.keys()[0].direction == SortDirection::Desc;
                plan.order_components = spec.len();
                return plan;
            }
        }

        let mut equality: Vec<&ColumnDef> = filters
            .iter()
            .filter(|f| matches!(f.condition, super::ast::Condition::Eq(_)))
            .filter_map(|f| self.indexed(&f.column))
            .collect();
        equality.sort_by(|a, b| (Reverse(a.index), &a.name).cmp(&(Reverse(b.index), &b.name)));
        if let Some(def) = equality.first() {
            return self.bounded(def, filters, ScanType::IndexEquality);
        }

        let range = filters
            .iter()
            .filter(|f| f.condition.operator().is_range())
            .filter_map(|f| self.indexed(&f.column))
            .min_by(|a, b| a.name.cmp(&b.name));
        if let Some(def) = range {
            return self.bounded(def, filters, ScanType::IndexRange);
        }

        AccessPlan::full(filters)
    }

    fn indexed(&self, column: &str) -> Option<&'a ColumnDef> {
        self.columns.get(column).filter(|d| d.index.is_indexed())
    }

    fn bounded(&self, def: &ColumnDef, filters: &[Filter], scan: ScanType) -> AccessPlan {
        let (range, absorbed) = match column_bounds(&def.name, def.column_type, filters) {
            Some(bounds) => (bounds.range, bounds.absorbed),
            None => (KeyRange::full(), Vec::new()),
        };
        let residual = filters
            .iter()
            .enumerate()
            .filter(|(i, _)| !absorbed.contains(i))
            .map(|(_, f)| f.clone())
            .collect();
        AccessPlan {
            scan,
            column: Some(def.name.clone()),
            range,
            reverse: false,
            residual,
            order_components: 0,
            index_components: def.index_columns().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::ast::Condition;
    use crate::schema::ColumnType;
    use crate::value::Value;

    fn columns() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDef::new("id", ColumnType::Integer).primary(),
            ColumnDef::new("name", ColumnType::Text).indexed(),
            ColumnDef::new("email", ColumnType::Text).unique(),
            ColumnDef::new("age", ColumnType::Integer).indexed(),
            ColumnDef::new("city", ColumnType::Text).with_trailing(["zip"]),
            ColumnDef::new("zip", ColumnType::Text),
            ColumnDef::new("note", ColumnType::Text),
        ])
        .unwrap()
    }

    fn eq(column: &str, v: impl Into<Value>) -> Filter {
        Filter::new(column, Condition::Eq(v.into()))
    }

    #[test]
    fn test_order_column_wins() {
        let cols = columns();
        let planner = IndexPlanner::new(&cols);
        let filters = vec![eq("id", 1)];
        let plan = planner.plan(&filters, Some(&OrderSpec::desc("name")));
        assert_eq!(plan.scan, ScanType::IndexOrder);
        assert_eq!(plan.column.as_deref(), Some("name"));
        assert!(plan.reverse);
        assert_eq!(plan.residual.len(), 1);
    }

    #[test]
    fn test_equality_prefers_stronger_index() {
        let cols = columns();
        let planner = IndexPlanner::new(&cols);
        let filters = vec![eq("name", "Bob"), eq("email", "b@x"), eq("age", 3)];
        let plan = planner.plan(&filters, None);
        assert_eq!(plan.scan, ScanType::IndexEquality);
        assert_eq!(plan.column.as_deref(), Some("email"));
        assert_eq!(plan.residual.len(), 2);
    }

    #[test]
    fn test_lexicographic_equality_tie_break() {
        let cols = columns();
        let planner = IndexPlanner::new(&cols);
        let filters = vec![eq("name", "Bob"), eq("age", 3)];
        let plan = planner.plan(&filters, None);
        assert_eq!(plan.column.as_deref(), Some("age"));
    }

    #[test]
    fn test_range_plan() {
        let cols = columns();
        let planner = IndexPlanner::new(&cols);
        let filters = vec![
            Filter::new("age", Condition::Gte(Value::Int(18))),
            eq("note", "x"),
        ];
        let plan = planner.plan(&filters, None);
        assert_eq!(plan.scan, ScanType::IndexRange);
        assert_eq!(plan.residual.len(), 1);
        assert_eq!(plan.residual[0].column, "note");
    }

    #[test]
    fn test_unindexed_falls_back_to_full_scan() {
        let cols = columns();
        let planner = IndexPlanner::new(&cols);
        let plan = planner.plan(&[eq("note", "x")], Some(&OrderSpec::asc("note")));
        assert_eq!(plan.scan, ScanType::Full);
        assert_eq!(plan.residual.len(), 1);
    }

    #[test]
    fn test_composite_prefix_order() {
        let cols = columns();
        let planner = IndexPlanner::new(&cols);
        assert!(planner.order_index(&OrderSpec::asc("city")).is_some());
        assert!(planner
            .order_index(&OrderSpec::asc("city").then("zip", SortDirection::Asc))
            .is_some());
        assert!(planner
            .order_index(&OrderSpec::asc("city").then("zip", SortDirection::Desc))
            .is_none());
        assert!(planner.order_index(&OrderSpec::asc("zip")).is_none());

        let plan = planner.plan(&[], Some(&OrderSpec::asc("city")));
        assert_eq!(plan.order_components, 1);
        assert_eq!(plan.index_components, 2);
    }

    #[test]
    fn test_collator_declines_text_order() {
        let cols = columns();
        let planner = IndexPlanner::new(&cols);
        collation::install(|a: &str, b: &str| a.cmp(b));
        let text = planner.order_index(&OrderSpec::asc("name")).is_none();
        let numeric = planner.order_index(&OrderSpec::asc("age")).is_some();
        collation::reset();
        assert!(text);
        assert!(numeric);
    }
}
