//! Array-backed mutable tables
//!
//! Rows are kept in memory and every indexed column is served by a
//! [`HybridIndex`](crate::index::HybridIndex). Filters accumulate as one
//! AND-chain per view; an order the indexes can satisfy is kept as native
//! order intent. At scan time the [`IndexPlanner`] picks at most one index
//! to drive the scan and the remaining filters are re-checked per row.
//!
//! Views share the store of the `ArrayTable` they come from, so mutations
//! are visible to every view immediately. The store version feeds the
//! result caches.

mod store;

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use self::store::ArrayStore;
use crate::backend::EmptyTable;
use crate::config::EngineConfig;
use crate::executor::{RowFilter, RowSorter};
use crate::observability::Logger;
use crate::planner::{
    merge_filter, AccessPlan, Condition, ExplainNode, Filter, InSet, IndexPlanner, OrderSpec,
    ScanType,
};
use crate::schema::ColumnSet;
use crate::table::{
    BackendId, MutableTable, RowIter, SourceRef, Table, TableResult, TableSource, ViewState,
};
use crate::value::{Row, RowKey};
use crate::wrappers::SortWrapper;

/// In-memory table accepting inserts, updates and deletes
#[derive(Debug, Clone)]
pub struct ArrayTable {
    store: Rc<RefCell<ArrayStore>>,
    id: BackendId,
    config: EngineConfig,
}

impl ArrayTable {
    pub fn new(columns: ColumnSet) -> Self {
        Self::with_config(columns, EngineConfig::default())
    }

    pub fn with_config(columns: ColumnSet, config: EngineConfig) -> Self {
        Self {
            store: Rc::new(RefCell::new(ArrayStore::new(columns))),
            id: BackendId::new(),
            config,
        }
    }

    /// Creates a table and inserts `rows` in order
    pub fn from_rows(columns: ColumnSet, rows: Vec<Row>) -> TableResult<Self> {
        let table = Self::new(columns);
        for row in rows {
            table.insert(row)?;
        }
        Ok(table)
    }

    /// Number of live rows
    pub fn len(&self) -> usize {
        self.store.borrow().live()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slots_of(&self, query: &Table) -> TableResult<Vec<usize>> {
        self.check_target(query)?;
        let keys = query.keys()?;
        let store = self.store.borrow();
        Ok(keys.iter().filter_map(|k| store.slot_of(k)).collect())
    }
}

impl MutableTable for ArrayTable {
    fn backend_id(&self) -> BackendId {
        self.id
    }

    fn table(&self) -> Table {
        let columns = self.store.borrow().columns.clone();
        let source = ArraySource {
            store: Rc::clone(&self.store),
            id: self.id,
            columns,
            filters: Vec::new(),
            order: None,
            view: ViewState::default(),
        };
        Table::with_config(Rc::new(source), self.config.clone())
    }

    fn insert(&self, fields: Row) -> TableResult<RowKey> {
        let key = self.store.borrow_mut().insert(fields)?;
        Logger::trace(
            "ROWS_INSERTED",
            &[("backend", &self.id.to_string()), ("key", &key.to_string())],
        );
        Ok(key)
    }

    fn update(&self, query: &Table, changes: &Row) -> TableResult<usize> {
        let slots = self.slots_of(query)?;
        let count = self.store.borrow_mut().update(&slots, changes)?;
        Logger::trace(
            "ROWS_UPDATED",
            &[("backend", &self.id.to_string()), ("count", &count.to_string())],
        );
        Ok(count)
    }

    fn delete(&self, query: &Table) -> TableResult<usize> {
        let slots = self.slots_of(query)?;
        let count = self.store.borrow_mut().delete(&slots);
        Logger::trace(
            "ROWS_DELETED",
            &[("backend", &self.id.to_string()), ("count", &count.to_string())],
        );
        Ok(count)
    }
}

/// One view over an array store
#[derive(Debug, Clone)]
struct ArraySource {
    store: Rc<RefCell<ArrayStore>>,
    id: BackendId,
    columns: ColumnSet,
    filters: Vec<Filter>,
    order: Option<OrderSpec>,
    view: ViewState,
}

impl ArraySource {
    fn plan(&self) -> AccessPlan {
        IndexPlanner::new(&self.columns).plan(&self.filters, self.order.as_ref())
    }

    fn derive(&self, filters: Vec<Filter>, order: Option<OrderSpec>) -> SourceRef {
        Rc::new(Self {
            filters,
            order,
            ..self.clone()
        })
    }
}

impl TableSource for ArraySource {
    fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    fn view(&self) -> &ViewState {
        &self.view
    }

    fn with_view(&self, view: ViewState) -> SourceRef {
        Rc::new(Self {
            view,
            ..self.clone()
        })
    }

    fn scan(&self) -> TableResult<RowIter<'_>> {
        let plan = self.plan();
        Logger::trace(
            "ARRAY_PLAN",
            &[
                ("scan", plan.scan.as_str()),
                ("column", plan.column.as_deref().unwrap_or("")),
                ("residual", &plan.residual.len().to_string()),
            ],
        );

        // a collator installed after the order was pushed disables index order
        let resort = match &self.order {
            Some(spec) if plan.scan != ScanType::IndexOrder => Some(spec.clone()),
            _ => None,
        };
        let cap = if plan.residual.is_empty() && resort.is_none() {
            self.view.scan_cap()
        } else {
            None
        };

        let ids = self.store.borrow_mut().plan_ids(&plan, cap);
        let residual = RowFilter::compile_all(&plan.residual)?;
        let store = Rc::clone(&self.store);
        let rows = ids.into_iter().filter_map(move |id| -> Option<TableResult<(RowKey, Row)>> {
            let store = store.borrow();
            let (key, row) = store.slot(id)?;
            RowFilter::matches_all(&residual, row).then(|| Ok((key.clone(), row.clone())))
        });

        match resort {
            Some(spec) => {
                let mut rows: Vec<(RowKey, Row)> = rows.collect::<TableResult<_>>()?;
                RowSorter::sort(&mut rows, &spec);
                Ok(self.view.paginate(Box::new(rows.into_iter().map(Ok))))
            }
            None => Ok(self.view.paginate(Box::new(rows))),
        }
    }

    fn count(&self) -> TableResult<usize> {
        if self.filters.is_empty() {
            let live = self.store.borrow().live();
            return Ok(self.view.paginated_count(live));
        }
        let mut count = 0;
        for item in self.scan()? {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn load(&self, key: &RowKey) -> TableResult<Option<Row>> {
        if self.view.is_paginated() {
            for item in self.scan()? {
                let (k, row) = item?;
                if &k == key {
                    return Ok(Some(row));
                }
            }
            return Ok(None);
        }
        let filters = RowFilter::compile_all(&self.filters)?;
        let store = self.store.borrow();
        Ok(store
            .slot_of(key)
            .and_then(|id| store.slot(id))
            .filter(|(_, row)| RowFilter::matches_all(&filters, row))
            .map(|(_, row)| row.clone()))
    }

    fn explain(&self) -> ExplainNode {
        let mut node = self.plan().describe(ExplainNode::new("ArrayScan"));
        if let Some(order) = &self.order {
            node = node.with("order", order);
        }
        self.view.describe(node)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data_version(&self) -> u64 {
        self.store.borrow().version()
    }

    fn backend_id(&self) -> Option<BackendId> {
        Some(self.id)
    }

    fn ordering(&self) -> Option<&OrderSpec> {
        self.order.as_ref()
    }

    fn push_filter(&self, filter: &Filter) -> TableResult<Option<SourceRef>> {
        // a view operand can change under us; keep it in a wrapper
        if matches!(filter.condition, Condition::In(InSet::Query(_))) {
            return Ok(None);
        }
        let mut filters = self.filters.clone();
        if !merge_filter(&mut filters, filter.clone()) {
            return Ok(Some(EmptyTable::of(self)));
        }
        Ok(Some(self.derive(filters, self.order.clone())))
    }

    fn push_order(&self, spec: &OrderSpec) -> TableResult<Option<SourceRef>> {
        if spec.is_empty() {
            return Ok(Some(self.derive(self.filters.clone(), None)));
        }
        if IndexPlanner::new(&self.columns).order_index(spec).is_some() {
            return Ok(Some(self.derive(self.filters.clone(), Some(spec.clone()))));
        }
        let unordered = self.derive(self.filters.clone(), None);
        Ok(Some(SortWrapper::wrap(unordered, spec.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use crate::schema::{ColumnDef, ColumnType};
    use crate::table::TableError;
    use crate::value::Value;

    fn people() -> ArrayTable {
        let columns = ColumnSet::new(vec![
            ColumnDef::new("id", ColumnType::Integer).primary(),
            ColumnDef::new("name", ColumnType::Text).indexed(),
            ColumnDef::new("age", ColumnType::Integer).indexed(),
            ColumnDef::new("note", ColumnType::Text),
        ])
        .unwrap();
        ArrayTable::from_rows(
            columns,
            vec![
                row! {"id" => 1, "name" => "Bob", "age" => 40},
                row! {"id" => 2, "name" => "Ann", "age" => 25},
                row! {"id" => 3, "name" => "Cid", "age" => 31},
            ],
        )
        .unwrap()
    }

    fn ids(table: &Table) -> Vec<i64> {
        table
            .rows()
            .unwrap()
            .iter()
            .filter_map(|r| r.value("id").as_int())
            .collect()
    }

    #[test]
    fn test_native_order_by_indexed_column() {
        let t = people().table().order("name ASC").unwrap();
        assert_eq!(ids(&t), vec![2, 1, 3]);
        let plan = t.explain();
        assert_eq!(plan.find("ArrayScan").unwrap().property("scan"), Some("INDEX_ORDER"));
    }

    #[test]
    fn test_unindexed_order_uses_sort_wrapper() {
        let t = people().table().order("note DESC, id").unwrap();
        assert!(t.explain().find("Sort").is_some());
        assert_eq!(ids(&t), vec![1, 2, 3]);
    }

    #[test]
    fn test_contradictory_filters_are_empty() {
        let t = people().table().eq("id", 2).unwrap().eq("id", 3).unwrap();
        assert_eq!(t.count().unwrap(), 0);
        assert!(t.explain().find("Empty").is_some());
    }

    #[test]
    fn test_range_plan_with_residual() {
        let t = people()
            .table()
            .gt("age", 26)
            .unwrap()
            .like("name", "b%")
            .unwrap();
        let plan = t.explain();
        let scan = plan.find("ArrayScan").unwrap();
        assert_eq!(scan.property("scan"), Some("INDEX_RANGE"));
        assert_eq!(ids(&t), vec![1]);
    }

    #[test]
    fn test_mutation_visible_to_views() {
        let backend = people();
        let adults = backend.table().gte("age", 30).unwrap();
        assert_eq!(adults.count().unwrap(), 2);
        backend.insert(row! {"id" => 4, "name" => "Dee", "age" => 50}).unwrap();
        assert_eq!(adults.count().unwrap(), 3);

        let target = backend.table().eq("name", "Bob").unwrap();
        assert_eq!(backend.update(&target, &row! {"age" => 20}).unwrap(), 1);
        assert_eq!(adults.count().unwrap(), 2);

        assert_eq!(backend.delete(&adults).unwrap(), 2);
        assert_eq!(backend.len(), 2);
    }

    #[test]
    fn test_foreign_query_rejected() {
        let a = people();
        let b = people();
        let err = a.delete(&b.table()).unwrap_err();
        assert!(matches!(err, TableError::ForeignQuery));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_load_respects_filters() {
        let t = people().table().gt("age", 30).unwrap();
        assert!(t.load(&RowKey::Int(1)).unwrap().is_some());
        assert!(t.load(&RowKey::Int(2)).unwrap().is_none());
    }

    #[test]
    fn test_limit_on_index_order() {
        let t = people().table().order("age DESC").unwrap().limit(2);
        assert_eq!(ids(&t), vec![1, 3]);
        let row = t.rows().unwrap().remove(0);
        assert_eq!(row.value("age"), &Value::Int(40));
    }
}
