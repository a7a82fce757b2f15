//! Reusable parameterized views
//!
//! A [`BoundTable`] holds a table plus conditions whose values arrive
//! later by name. Binding a name applies every pending condition that
//! references it; reading the view while any name is unresolved fails with
//! [`TableError::UnboundParameters`].
//!
//! ```ignore
//! let by_city = BoundTable::new(people).eq_bind("city", "c")?.order("name")?;
//! let oslo = by_city.bind(&HashMap::from([("c".into(), Value::from("Oslo"))]))?;
//! let rows = oslo.rows()?;
//! ```
//!
//! Order, projection and pagination are recorded and applied after all
//! conditions, so binding late never filters an already paginated page.

use std::collections::HashMap;

use crate::planner::{Condition, ExplainNode, Filter, InSet, Operator, OrderSpec, ValueSet};
use crate::table::{Table, TableError, TableResult};
use crate::value::{Row, RowKey, Value};

#[derive(Debug, Clone)]
struct Pending {
    column: String,
    operator: Operator,
    name: String,
}

/// Shape applied on top of the filtered table when resolving
#[derive(Debug, Clone, Default)]
struct Shape {
    order: Option<OrderSpec>,
    columns: Option<Vec<String>>,
    limit: Option<usize>,
    offset: usize,
}

#[derive(Clone)]
pub struct BoundTable {
    table: Table,
    pending: Vec<Pending>,
    shape: Shape,
}

impl BoundTable {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            pending: Vec::new(),
            shape: Shape::default(),
        }
    }

    fn with_table(&self, table: Table) -> Self {
        Self {
            table,
            pending: self.pending.clone(),
            shape: self.shape.clone(),
        }
    }

    fn defer(&self, column: &str, operator: Operator, name: &str) -> TableResult<Self> {
        let column = self
            .table
            .source()
            .resolve_column(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        let mut next = self.clone();
        next.pending.push(Pending {
            column,
            operator,
            name: name.to_string(),
        });
        Ok(next)
    }

    pub fn eq_bind(&self, column: &str, name: &str) -> TableResult<Self> {
        self.defer(column, Operator::Eq, name)
    }

    pub fn lt_bind(&self, column: &str, name: &str) -> TableResult<Self> {
        self.defer(column, Operator::Lt, name)
    }

    pub fn lte_bind(&self, column: &str, name: &str) -> TableResult<Self> {
        self.defer(column, Operator::Lte, name)
    }

    pub fn gt_bind(&self, column: &str, name: &str) -> TableResult<Self> {
        self.defer(column, Operator::Gt, name)
    }

    pub fn gte_bind(&self, column: &str, name: &str) -> TableResult<Self> {
        self.defer(column, Operator::Gte, name)
    }

    pub fn like_bind(&self, column: &str, name: &str) -> TableResult<Self> {
        self.defer(column, Operator::Like, name)
    }

    /// `column IN :name`. Bind a list with [`BoundTable::bind_values`]; a
    /// single value bound through [`BoundTable::bind`] acts as a one-element set.
    pub fn in_bind(&self, column: &str, name: &str) -> TableResult<Self> {
        self.defer(column, Operator::In, name)
    }

    /// Applies every pending condition whose name is in `params`.
    /// Names not referenced by any pending condition are ignored.
    pub fn bind(&self, params: &HashMap<String, Value>) -> TableResult<Self> {
        let mut table = self.table.clone();
        let mut pending = Vec::with_capacity(self.pending.len());
        for item in &self.pending {
            match params.get(&item.name) {
                Some(value) => {
                    let condition = Condition::new(item.operator, value.clone())?;
                    table = table.filter(Filter::new(item.column.as_str(), condition))?;
                }
                None => pending.push(item.clone()),
            }
        }
        Ok(Self {
            table,
            pending,
            shape: self.shape.clone(),
        })
    }

    /// Binds a list of values to `name`. `IN` conditions test membership;
    /// any other condition on the name requires exactly one value.
    pub fn bind_values<I, V>(&self, name: &str, values: I) -> TableResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let mut table = self.table.clone();
        let mut pending = Vec::with_capacity(self.pending.len());
        for item in &self.pending {
            if item.name != name {
                pending.push(item.clone());
                continue;
            }
            let condition = match (item.operator, values.as_slice()) {
                (Operator::In, _) => Condition::In(InSet::Values(ValueSet::new(
                    item.column.as_str(),
                    values.iter().cloned(),
                ))),
                (operator, [single]) => Condition::new(operator, single.clone())?,
                (operator, _) => {
                    return Err(TableError::InvalidOperand {
                        column: item.column.clone(),
                        reason: format!(
                            "{} takes one value, {} bound to '{}'",
                            operator.as_str(),
                            values.len(),
                            name
                        ),
                    })
                }
            };
            table = table.filter(Filter::new(item.column.as_str(), condition))?;
        }
        Ok(Self {
            table,
            pending,
            shape: self.shape.clone(),
        })
    }

    /// Names still waiting for a value, sorted
    pub fn unbound_params(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pending.iter().map(|p| p.name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    // ---- immediate operators ----

    pub fn eq(&self, column: &str, value: impl Into<Value>) -> TableResult<Self> {
        Ok(self.with_table(self.table.eq(column, value)?))
    }

    pub fn lt(&self, column: &str, value: impl Into<Value>) -> TableResult<Self> {
        Ok(self.with_table(self.table.lt(column, value)?))
    }

    pub fn lte(&self, column: &str, value: impl Into<Value>) -> TableResult<Self> {
        Ok(self.with_table(self.table.lte(column, value)?))
    }

    pub fn gt(&self, column: &str, value: impl Into<Value>) -> TableResult<Self> {
        Ok(self.with_table(self.table.gt(column, value)?))
    }

    pub fn gte(&self, column: &str, value: impl Into<Value>) -> TableResult<Self> {
        Ok(self.with_table(self.table.gte(column, value)?))
    }

    pub fn is_in<I, V>(&self, column: &str, values: I) -> TableResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Ok(self.with_table(self.table.is_in(column, values)?))
    }

    pub fn like(&self, column: &str, pattern: impl Into<Value>) -> TableResult<Self> {
        Ok(self.with_table(self.table.like(column, pattern)?))
    }

    pub fn order(&self, spec: &str) -> TableResult<Self> {
        let spec = OrderSpec::parse(spec)?;
        // Validates the columns now; the order itself is applied on resolve.
        self.table.order_by(&spec)?;
        let mut next = self.clone();
        next.shape.order = if spec.is_empty() { None } else { Some(spec) };
        Ok(next)
    }

    pub fn columns(&self, names: &[&str]) -> TableResult<Self> {
        self.table.columns(names)?;
        let mut next = self.clone();
        next.shape.columns = Some(names.iter().map(|n| n.to_string()).collect());
        Ok(next)
    }

    pub fn limit(&self, limit: usize) -> Self {
        let mut next = self.clone();
        next.shape.limit = Some(limit);
        next
    }

    pub fn offset(&self, offset: usize) -> Self {
        let mut next = self.clone();
        next.shape.offset = offset;
        next
    }

    // ---- results ----

    /// The fully bound view
    pub fn resolve(&self) -> TableResult<Table> {
        let unbound = self.unbound_params();
        if !unbound.is_empty() {
            return Err(TableError::UnboundParameters(unbound));
        }
        let mut table = self.table.clone();
        if let Some(order) = &self.shape.order {
            table = table.order_by(order)?;
        }
        if let Some(columns) = &self.shape.columns {
            let names: Vec<&str> = columns.iter().map(String::as_str).collect();
            table = table.columns(&names)?;
        }
        if let Some(limit) = self.shape.limit {
            table = table.limit(limit);
        }
        if self.shape.offset > 0 {
            table = table.offset(self.shape.offset);
        }
        Ok(table)
    }

    pub fn to_vec(&self) -> TableResult<Vec<(RowKey, Row)>> {
        self.resolve()?.to_vec()
    }

    pub fn rows(&self) -> TableResult<Vec<Row>> {
        self.resolve()?.rows()
    }

    pub fn count(&self) -> TableResult<usize> {
        self.resolve()?.count()
    }

    pub fn exists(&self) -> TableResult<bool> {
        self.resolve()?.exists()
    }

    pub fn has(&self, record: &Row) -> TableResult<bool> {
        self.resolve()?.has(record)
    }

    pub fn load(&self, key: &RowKey) -> TableResult<Option<Row>> {
        self.resolve()?.load(key)
    }

    pub fn explain(&self) -> TableResult<ExplainNode> {
        Ok(self.resolve()?.explain())
    }
}

impl From<Table> for BoundTable {
    fn from(table: Table) -> Self {
        BoundTable::new(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ArrayTable;
    use crate::schema::{ColumnDef, ColumnSet, ColumnType};
    use crate::table::MutableTable;

    fn people() -> Table {
        let columns = ColumnSet::new(vec![
            ColumnDef::new("id", ColumnType::Integer).primary(),
            ColumnDef::new("name", ColumnType::Text),
            ColumnDef::new("city", ColumnType::Text).indexed(),
        ])
        .unwrap();
        let mut rows = Vec::new();
        for (id, name, city) in [(1, "Ada", "Oslo"), (2, "Bo", "Bergen"), (3, "Cy", "Oslo")] {
            rows.push(Row::new().with("id", id).with("name", name).with("city", city));
        }
        ArrayTable::from_rows(columns, rows).unwrap().table()
    }

    fn params(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_unbound_reads_fail_with_all_names() {
        let bound = BoundTable::new(people())
            .eq_bind("city", "c")
            .unwrap()
            .gt_bind("id", "a")
            .unwrap();
        match bound.count() {
            Err(TableError::UnboundParameters(names)) => {
                assert_eq!(names, vec!["a".to_string(), "c".to_string()])
            }
            other => panic!("expected unbound parameters, got {:?}", other),
        }
        assert!(bound.exists().is_err());
        assert!(bound.load(&RowKey::Int(1)).is_err());
    }

    #[test]
    fn test_partial_binding_keeps_remaining_names() {
        let bound = BoundTable::new(people())
            .eq_bind("city", "c")
            .unwrap()
            .gt_bind("id", "a")
            .unwrap();
        let partial = bound.bind(&params(&[("c", Value::from("Oslo"))])).unwrap();
        assert_eq!(partial.unbound_params(), vec!["a".to_string()]);
        let full = partial.bind(&params(&[("a", Value::Int(1))])).unwrap();
        assert_eq!(full.count().unwrap(), 1);
    }

    #[test]
    fn test_one_name_feeds_every_reference() {
        let bound = BoundTable::new(people())
            .gte_bind("id", "x")
            .unwrap()
            .lte_bind("id", "x")
            .unwrap();
        let one = bound.bind(&params(&[("x", Value::Int(2))])).unwrap();
        assert_eq!(keys(&one), vec![RowKey::Int(2)]);
    }

    #[test]
    fn test_bind_is_reusable() {
        let bound = BoundTable::new(people()).eq_bind("city", "c").unwrap();
        let oslo = bound.bind(&params(&[("c", Value::from("Oslo"))])).unwrap();
        let bergen = bound.bind(&params(&[("c", Value::from("Bergen"))])).unwrap();
        assert_eq!(oslo.count().unwrap(), 2);
        assert_eq!(bergen.count().unwrap(), 1);
        assert_eq!(bound.unbound_params(), vec!["c".to_string()]);
    }

    #[test]
    fn test_pagination_applies_after_late_binding() {
        let bound = BoundTable::new(people())
            .eq_bind("city", "c")
            .unwrap()
            .order("id DESC")
            .unwrap()
            .limit(1);
        let page = bound.bind(&params(&[("c", Value::from("Oslo"))])).unwrap();
        assert_eq!(keys(&page), vec![RowKey::Int(3)]);
    }

    #[test]
    fn test_in_bind_with_list() {
        let bound = BoundTable::new(people()).in_bind("id", "ids").unwrap();
        let picked = bound.bind_values("ids", [1i64, 3]).unwrap();
        assert_eq!(keys(&picked), vec![RowKey::Int(1), RowKey::Int(3)]);
        let none = bound.bind_values("ids", Vec::<Value>::new()).unwrap();
        assert!(!none.exists().unwrap());
    }

    #[test]
    fn test_bind_values_rejects_list_for_comparison() {
        let bound = BoundTable::new(people()).eq_bind("id", "x").unwrap();
        assert!(bound.bind_values("x", [1i64, 2]).is_err());
    }

    #[test]
    fn test_like_bind_and_unknown_column() {
        let bound = BoundTable::new(people()).like_bind("name", "p").unwrap();
        let hit = bound.bind(&params(&[("p", Value::from("a%"))])).unwrap();
        assert_eq!(hit.count().unwrap(), 1);
        assert!(matches!(
            BoundTable::new(people()).eq_bind("nope", "p"),
            Err(TableError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_immediate_comparisons_mix_with_bindings() {
        let bound = BoundTable::new(people())
            .gte("id", 2)
            .unwrap()
            .lte("id", 3)
            .unwrap()
            .is_in("city", ["Oslo", "Bergen"])
            .unwrap()
            .eq_bind("city", "c")
            .unwrap();
        let oslo = bound.bind(&params(&[("c", Value::from("Oslo"))])).unwrap();
        assert_eq!(keys(&oslo), vec![RowKey::Int(3)]);
        let none = BoundTable::new(people()).is_in("city", Vec::<&str>::new()).unwrap();
        assert!(!none.exists().unwrap());
    }

    fn keys(bound: &BoundTable) -> Vec<RowKey> {
        bound.resolve().unwrap().keys().unwrap()
    }
}
