//! SQL-backed tables and views
//!
//! A view keeps its query state (conditions, order, pagination) and
//! renders one SELECT per scan. Rows stream in batches of
//! `sql_fetch_batch`, each batch a separate statement continuing at the
//! next offset; the rowid tie-break keeps batch boundaries stable.

use std::any::Any;
use std::collections::VecDeque;
use std::rc::Rc;

use rusqlite::types::Value as SqlValue;

use super::engine::{constraint_error, SqlEngine};
use super::translate::{decode, encode, ident, translatable, Clause, Conjunction, Renderer};
use crate::backend::EmptyTable;
use crate::observability::Logger;
use crate::planner::{merge_filter, ExplainNode, Filter, OrderSpec};
use crate::schema::{ColumnSet, IndexKind};
use crate::table::{
    BackendId, MutableTable, RowIter, SourceRef, Table, TableError, TableResult, TableSource,
    ViewState,
};
use crate::value::{collation, Row, RowKey, Value};

/// Parameters per key-list statement
const KEY_CHUNK: usize = 500;

#[derive(Debug)]
struct TableMeta {
    name: String,
    columns: ColumnSet,
    id: BackendId,
}

/// Mutable handle to one SQL table
#[derive(Debug, Clone)]
pub struct SqlTable {
    engine: SqlEngine,
    meta: Rc<TableMeta>,
}

impl SqlTable {
    pub(crate) fn new(engine: SqlEngine, name: String, columns: ColumnSet) -> Self {
        Self {
            engine,
            meta: Rc::new(TableMeta {
                name,
                columns,
                id: BackendId::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    fn encode_key(&self, key: &RowKey) -> TableResult<SqlValue> {
        key_param(&self.meta.columns, key).ok_or_else(|| TableError::InvalidOperand {
            column: key_column(&self.meta.columns),
            reason: format!("{} is not a valid key", key),
        })
    }

    /// Runs `statement` once per chunk of the query's row keys, appending
    /// `WHERE <key> IN (...)`
    fn for_keys(&self, query: &Table, statement: &str, params: &[SqlValue]) -> TableResult<usize> {
        self.check_target(query)?;
        let keys = query.keys()?;
        let key_column = key_column(&self.meta.columns);
        self.engine.transaction(|| {
            let mut affected = 0;
            for chunk in keys.chunks(KEY_CHUNK) {
                let mut bound = params.to_vec();
                for key in chunk {
                    bound.push(self.encode_key(key)?);
                }
                let marks = vec!["?"; chunk.len()].join(", ");
                let sql = format!("{} WHERE {} IN ({})", statement, key_column, marks);
                affected += self.engine.execute(&sql, &bound)?;
            }
            Ok(affected)
        })
    }
}

impl MutableTable for SqlTable {
    fn backend_id(&self) -> BackendId {
        self.meta.id
    }

    fn table(&self) -> Table {
        let source = SqlSource {
            engine: self.engine.clone(),
            meta: Rc::clone(&self.meta),
            cond: Conjunction::default(),
            order: None,
            view: ViewState::default(),
        };
        Table::with_config(Rc::new(source), self.engine.config().clone())
    }

    fn insert(&self, fields: Row) -> TableResult<RowKey> {
        let row = crate::backend::rows::conform(&self.meta.columns, fields)?;
        let primary = self.meta.columns.primary();
        if let Some(def) = primary {
            if row.value(&def.name).is_null() {
                return Err(TableError::MissingColumn(def.name.clone()));
            }
        }

        let mut names = Vec::with_capacity(self.meta.columns.len());
        let mut params = Vec::with_capacity(self.meta.columns.len());
        for def in &self.meta.columns {
            let value = row.value(&def.name);
            names.push(ident(&def.name));
            params.push(encode(def.column_type, value).ok_or_else(|| TableError::InvalidOperand {
                column: def.name.clone(),
                reason: format!("{} is not a {}", value, def.column_type.type_name()),
            })?);
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            ident(&self.meta.name),
            names.join(", "),
            vec!["?"; names.len()].join(", ")
        );
        self.engine
            .execute(&sql, &params)
            .map_err(|e| constraint_error(e, |c| row.value(c).to_string()))?;
        self.engine.bump();

        let key = match primary {
            Some(def) => {
                let value = row.value(&def.name);
                RowKey::from_value(value).unwrap_or_else(|| RowKey::Text(value.to_text()))
            }
            None => RowKey::Int(self.engine.last_insert_rowid()),
        };
        Logger::trace(
            "ROWS_INSERTED",
            &[("table", &self.meta.name), ("key", &key.to_string())],
        );
        Ok(key)
    }

    fn update(&self, query: &Table, changes: &Row) -> TableResult<usize> {
        if changes.is_empty() {
            self.check_target(query)?;
            return Ok(0);
        }
        let mut sets = Vec::with_capacity(changes.len());
        let mut params = Vec::with_capacity(changes.len());
        for (column, value) in changes {
            let def = self
                .meta
                .columns
                .get(column)
                .ok_or_else(|| TableError::UnknownColumn(column.clone()))?;
            let value = def.column_type.coerce(column, value.clone())?;
            if def.index == IndexKind::Primary && value.is_null() {
                return Err(TableError::MissingColumn(column.clone()));
            }
            sets.push(format!("{} = ?", ident(column)));
            params.push(encode(def.column_type, &value).ok_or_else(|| {
                TableError::InvalidOperand {
                    column: column.clone(),
                    reason: format!("{} is not a {}", value, def.column_type.type_name()),
                }
            })?);
        }
        let statement = format!("UPDATE {} SET {}", ident(&self.meta.name), sets.join(", "));
        let count = self
            .for_keys(query, &statement, &params)
            .map_err(|e| constraint_error(e, |c| changes.value(c).to_string()))?;
        if count > 0 {
            self.engine.bump();
        }
        Logger::trace(
            "ROWS_UPDATED",
            &[("table", &self.meta.name), ("count", &count.to_string())],
        );
        Ok(count)
    }

    fn delete(&self, query: &Table) -> TableResult<usize> {
        let statement = format!("DELETE FROM {}", ident(&self.meta.name));
        let count = self.for_keys(query, &statement, &[])?;
        if count > 0 {
            self.engine.bump();
        }
        Logger::trace(
            "ROWS_DELETED",
            &[("table", &self.meta.name), ("count", &count.to_string())],
        );
        Ok(count)
    }
}

/// Column holding row keys: the primary column or rowid
fn key_column(columns: &ColumnSet) -> String {
    match columns.primary() {
        Some(def) => ident(&def.name),
        None => "rowid".to_string(),
    }
}

/// Statement parameter for a row key; `None` if no row can carry it
fn key_param(columns: &ColumnSet, key: &RowKey) -> Option<SqlValue> {
    match columns.primary() {
        Some(def) => {
            let value = match key {
                RowKey::Int(i) => Value::Int(*i),
                RowKey::Text(s) => Value::Text(s.clone()),
            };
            let value = def.column_type.coerce(&def.name, value).ok()?;
            encode(def.column_type, &value)
        }
        None => key.as_int().map(SqlValue::Integer),
    }
}

/// One view over an SQL table
#[derive(Debug, Clone)]
struct SqlSource {
    engine: SqlEngine,
    meta: Rc<TableMeta>,
    cond: Conjunction,
    order: Option<OrderSpec>,
    view: ViewState,
}

/// A rendered SELECT without its LIMIT clause
struct Select {
    sql: String,
    params: Vec<SqlValue>,
}

impl SqlSource {
    fn derive(&self, cond: Conjunction, order: Option<OrderSpec>) -> SourceRef {
        Rc::new(Self {
            cond,
            order,
            ..self.clone()
        })
    }

    fn select(&self, head: &str) -> TableResult<Select> {
        let mut renderer = Renderer::new(&self.meta.name, &self.meta.columns);
        let condition = renderer.conjunction(0, &self.cond)?;
        let sql = format!(
            "SELECT {} FROM {} AS {} WHERE {} ORDER BY {}",
            head,
            ident(&self.meta.name),
            Renderer::alias(0),
            condition,
            renderer.order(self.order.as_ref())
        );
        Ok(Select {
            sql,
            params: renderer.params,
        })
    }

    fn row_head(&self) -> String {
        let mut head = vec![format!("{}.rowid", Renderer::alias(0))];
        for def in &self.meta.columns {
            head.push(format!("{}.{}", Renderer::alias(0), ident(&def.name)));
        }
        head.join(", ")
    }

    fn row_select(&self) -> TableResult<Select> {
        self.select(&self.row_head())
    }

    fn decode_row(&self, cells: &rusqlite::Row<'_>) -> TableResult<(RowKey, Row)> {
        let rowid: i64 = cells.get(0)?;
        let mut row = Row::new();
        for (i, def) in self.meta.columns.iter().enumerate() {
            row.set(def.name.clone(), decode(def.column_type, cells.get_ref(i + 1)?)?);
        }
        let key = match self.meta.columns.primary() {
            Some(def) => {
                let value = row.value(&def.name);
                RowKey::from_value(value).unwrap_or_else(|| RowKey::Text(value.to_text()))
            }
            None => RowKey::Int(rowid),
        };
        Ok((key, row))
    }

    fn same_table<'a>(&self, other: &'a SourceRef) -> Option<&'a SqlSource> {
        let other = other.as_any().downcast_ref::<SqlSource>()?;
        (self.engine.same_engine(&other.engine) && self.meta.name == other.meta.name)
            .then_some(other)
    }

    fn orderable(&self, spec: &OrderSpec) -> bool {
        if !collation::is_installed() {
            return true;
        }
        spec.columns().all(|c| {
            self.meta
                .columns
                .get(c)
                .is_some_and(|d| d.column_type.is_numeric())
        })
    }
}

impl TableSource for SqlSource {
    fn columns(&self) -> &ColumnSet {
        &self.meta.columns
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
        let select = self.row_select()?;
        Ok(Box::new(Batches {
            source: self,
            select,
            batch: self.engine.config().sql_fetch_batch.max(1),
            fetched: 0,
            remaining: self.view.limit,
            buffer: VecDeque::new(),
            done: false,
        }))
    }

    fn count(&self) -> TableResult<usize> {
        let inner = self.select(&format!("{}.rowid", Renderer::alias(0)))?;
        let (sql, mut params) = (inner.sql, inner.params);
        let sql = if self.view.is_paginated() {
            params.push(SqlValue::Integer(self.view.limit.map_or(-1, |l| l as i64)));
            params.push(SqlValue::Integer(self.view.offset as i64));
            format!("SELECT COUNT(*) FROM ({} LIMIT ? OFFSET ?)", sql)
        } else {
            format!("SELECT COUNT(*) FROM ({})", sql)
        };
        let counts = self
            .engine
            .select(&sql, &params, |row| Ok(row.get::<_, i64>(0)?))?;
        Ok(counts.first().copied().unwrap_or(0).max(0) as usize)
    }

    /// Keyed lookup under the view's conditions. A paginated view scans
    /// its page instead.
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
        let Some(param) = key_param(&self.meta.columns, key) else {
            return Ok(None);
        };
        let mut renderer = Renderer::new(&self.meta.name, &self.meta.columns);
        let condition = renderer.conjunction(0, &self.cond)?;
        let mut params = renderer.params;
        params.push(param);
        let sql = format!(
            "SELECT {} FROM {} AS {} WHERE {} AND {}.{} = ? LIMIT 1",
            self.row_head(),
            ident(&self.meta.name),
            Renderer::alias(0),
            condition,
            Renderer::alias(0),
            key_column(&self.meta.columns)
        );
        let rows = self.engine.select(&sql, &params, |cells| self.decode_row(cells))?;
        Ok(rows.into_iter().next().map(|(_, row)| row))
    }

    fn explain(&self) -> ExplainNode {
        let mut node = ExplainNode::new("SqlScan").with("table", &self.meta.name);
        node = match self.row_select() {
            Ok(select) => node.with("sql", select.sql),
            Err(e) => node.with("error", e),
        };
        self.view.describe(node)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data_version(&self) -> u64 {
        self.engine.version()
    }

    fn backend_id(&self) -> Option<BackendId> {
        Some(self.meta.id)
    }

    fn ordering(&self) -> Option<&OrderSpec> {
        self.order.as_ref()
    }

    fn push_filter(&self, filter: &Filter) -> TableResult<Option<SourceRef>> {
        let Some(def) = self.meta.columns.get(&filter.column) else {
            return Ok(None);
        };
        if !translatable(def, filter) {
            return Ok(None);
        }
        let mut cond = self.cond.clone();
        if !merge_filter(&mut cond.filters, filter.clone()) {
            return Ok(Some(EmptyTable::of(self)));
        }
        Ok(Some(self.derive(cond, self.order.clone())))
    }

    fn push_order(&self, spec: &OrderSpec) -> TableResult<Option<SourceRef>> {
        if spec.is_empty() {
            return Ok(Some(self.derive(self.cond.clone(), None)));
        }
        if !self.orderable(spec) {
            return Ok(None);
        }
        Ok(Some(self.derive(self.cond.clone(), Some(spec.clone()))))
    }

    fn push_or(&self, groups: &[Vec<Filter>]) -> TableResult<Option<SourceRef>> {
        let all_translatable = groups.iter().flatten().all(|f| {
            self.meta
                .columns
                .get(&f.column)
                .is_some_and(|d| translatable(d, f))
        });
        if !all_translatable {
            return Ok(None);
        }
        let branches = groups
            .iter()
            .map(|g| Conjunction {
                filters: g.clone(),
                clauses: Vec::new(),
            })
            .collect();
        let mut cond = self.cond.clone();
        cond.clauses.push(Clause::Any(branches));
        Ok(Some(self.derive(cond, self.order.clone())))
    }

    fn push_union(&self, other: &SourceRef) -> TableResult<Option<SourceRef>> {
        let Some(other) = self.same_table(other) else {
            return Ok(None);
        };
        if self.order.is_some() || other.order.is_some() || other.view.is_paginated() {
            return Ok(None);
        }
        let cond = if self.cond.is_empty() || other.cond.is_empty() {
            Conjunction::default()
        } else {
            Conjunction {
                filters: Vec::new(),
                clauses: vec![Clause::Any(vec![self.cond.clone(), other.cond.clone()])],
            }
        };
        Ok(Some(self.derive(cond, None)))
    }

    fn push_except(&self, other: &SourceRef) -> TableResult<Option<SourceRef>> {
        let Some(other) = self.same_table(other) else {
            return Ok(None);
        };
        if other.view.is_paginated() {
            return Ok(None);
        }
        let pairs = other
            .view
            .visible_columns(&other.meta.columns)
            .into_iter()
            .map(|c| (c.clone(), c))
            .collect();
        let mut cond = self.cond.clone();
        cond.clauses.push(Clause::NotExists {
            excluded: other.cond.clone(),
            pairs,
        });
        Ok(Some(self.derive(cond, self.order.clone())))
    }

    fn push_distinct(&self) -> TableResult<Option<SourceRef>> {
        if self.order.is_some() {
            return Ok(None);
        }
        let cond = Conjunction {
            filters: Vec::new(),
            clauses: vec![Clause::FirstOf {
                within: self.cond.clone(),
                columns: self.view.visible_columns(&self.meta.columns),
            }],
        };
        Ok(Some(self.derive(cond, None)))
    }
}

/// Streams a SELECT in fixed-size batches
struct Batches<'a> {
    source: &'a SqlSource,
    select: Select,
    batch: usize,
    /// Rows fetched so far, counted from the view's offset
    fetched: usize,
    remaining: Option<usize>,
    buffer: VecDeque<(RowKey, Row)>,
    done: bool,
}

impl Batches<'_> {
    fn fetch(&mut self) -> TableResult<()> {
        let limit = match self.remaining {
            Some(remaining) => remaining.min(self.batch),
            None => self.batch,
        };
        if limit == 0 {
            self.done = true;
            return Ok(());
        }
        let mut params = self.select.params.clone();
        params.push(SqlValue::Integer(limit as i64));
        params.push(SqlValue::Integer((self.source.view.offset + self.fetched) as i64));
        let sql = format!("{} LIMIT ? OFFSET ?", self.select.sql);
        let source = self.source;
        let rows = source
            .engine
            .select(&sql, &params, |cells| source.decode_row(cells))?;
        if rows.len() < limit {
            self.done = true;
        }
        self.fetched += rows.len();
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= rows.len();
        }
        self.buffer.extend(rows);
        Ok(())
    }
}

impl Iterator for Batches<'_> {
    type Item = TableResult<(RowKey, Row)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.done {
            if let Err(e) = self.fetch() {
                self.done = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::row;
    use crate::schema::{ColumnDef, ColumnType};

    fn people(engine: &SqlEngine) -> SqlTable {
        let columns = ColumnSet::new(vec![
            ColumnDef::new("id", ColumnType::Integer).primary(),
            ColumnDef::new("name", ColumnType::Text).indexed(),
            ColumnDef::new("balance", ColumnType::Decimal { scale: 2 }),
        ])
        .unwrap();
        let table = engine.create_table("people", columns).unwrap();
        table.insert(row! {"id" => 3, "name" => "Cid", "balance" => "1.5"}).unwrap();
        table.insert(row! {"id" => 1, "name" => "Bob", "balance" => "10"}).unwrap();
        table.insert(row! {"id" => 2, "name" => "Ann"}).unwrap();
        table
    }

    #[test]
    fn test_filter_order_and_decimal_decode() {
        let engine = SqlEngine::open_in_memory().unwrap();
        let t = people(&engine).table();
        let rows = t.gt("balance", "1.00").unwrap().order("name").unwrap().rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value("name"), &Value::from("Bob"));
        assert_eq!(rows[0].value("balance"), &Value::from("10.00"));
        assert_eq!(rows[1].value("balance"), &Value::from("1.50"));
    }

    #[test]
    fn test_keys_are_primary_values() {
        let engine = SqlEngine::open_in_memory().unwrap();
        let keys = people(&engine).table().keys().unwrap();
        assert_eq!(keys, vec![RowKey::Int(3), RowKey::Int(1), RowKey::Int(2)]);
    }

    #[test]
    fn test_batches_cover_every_row() {
        let engine = SqlEngine::with_config(EngineConfig::default().with_sql_fetch_batch(2)).unwrap();
        let t = people(&engine).table();
        assert_eq!(t.rows().unwrap().len(), 3);
        assert_eq!(t.offset(1).limit(1).rows().unwrap().len(), 1);
        assert_eq!(t.offset(1).count().unwrap(), 2);
    }

    #[test]
    fn test_unique_violation_maps_column() {
        let engine = SqlEngine::open_in_memory().unwrap();
        let table = people(&engine);
        let err = table.insert(row! {"id" => 1, "name" => "Dup"}).unwrap_err();
        assert!(matches!(err, TableError::UniqueViolation { column, .. } if column == "id"));
        let err = table.insert(row! {"name" => "NoId"}).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(c) if c == "id"));
    }

    #[test]
    fn test_native_set_operations() {
        let engine = SqlEngine::open_in_memory().unwrap();
        let t = people(&engine).table();
        let a = t.lte("id", 2).unwrap();
        let b = t.gte("id", 2).unwrap();
        let union = a.union(&b).unwrap();
        assert_eq!(union.count().unwrap(), 3);
        assert!(union.explain().find("SqlScan").is_some());
        let except = a.except(&b).unwrap();
        assert_eq!(except.keys().unwrap(), vec![RowKey::Int(1)]);
        assert!(except.explain().find("Except").is_none());
    }

    #[test]
    fn test_update_and_delete() {
        let engine = SqlEngine::open_in_memory().unwrap();
        let table = people(&engine);
        let view = table.table().eq("name", "Ann").unwrap();
        assert_eq!(table.update(&view, &row! {"balance" => "2.25"}).unwrap(), 1);
        let ann = table.table().load(&RowKey::Int(2)).unwrap().unwrap();
        assert_eq!(ann.value("balance"), &Value::from("2.25"));
        assert_eq!(table.delete(&table.table().lt("id", 3).unwrap()).unwrap(), 2);
        assert_eq!(table.table().count().unwrap(), 1);
    }

    #[test]
    fn test_load_respects_view_conditions() {
        let engine = SqlEngine::open_in_memory().unwrap();
        let t = people(&engine).table();
        let bob = t.load(&RowKey::Int(1)).unwrap().unwrap();
        assert_eq!(bob.value("name"), &Value::from("Bob"));
        assert_eq!(t.load(&RowKey::Int(9)).unwrap(), None);
        assert_eq!(t.load(&RowKey::Text("x".into())).unwrap(), None);

        let named = t.like("name", "a%").unwrap();
        assert!(named.load(&RowKey::Int(2)).unwrap().is_some());
        assert_eq!(named.load(&RowKey::Int(1)).unwrap(), None);

        let page = t.order("id").unwrap().limit(1);
        assert!(page.load(&RowKey::Int(1)).unwrap().is_some());
        assert_eq!(page.load(&RowKey::Int(2)).unwrap(), None);

        let narrow = t.columns(&["name"]).unwrap();
        let row = narrow.load(&RowKey::Int(3)).unwrap().unwrap();
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn test_load_by_rowid_without_primary() {
        let engine = SqlEngine::open_in_memory().unwrap();
        let columns = ColumnSet::new(vec![ColumnDef::new("tag", ColumnType::Text)]).unwrap();
        let table = engine.create_table("tags", columns).unwrap();
        let key = table.insert(row! {"tag" => "red"}).unwrap();
        table.insert(row! {"tag" => "blue"}).unwrap();
        let row = table.table().load(&key).unwrap().unwrap();
        assert_eq!(row.value("tag"), &Value::from("red"));
    }
}
