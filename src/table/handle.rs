//! The user-facing table handle
//!
//! `Table` pairs an immutable source with a result cache. Every operator
//! returns a new `Table` with a fresh cache; clones of one `Table` share
//! their cache because they are the same view.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::cache::{CachedRows, ResultCache};
use super::errors::{TableError, TableResult};
use super::mutable::BackendId;
use super::ops;
use super::source::{RowIter, SourceRef};
use super::view::ViewState;
use crate::config::EngineConfig;
use crate::planner::{Condition, ExplainNode, Filter, InSet, Operator, OrderSpec, Predicate, ValueSet};
use crate::schema::ColumnSet;
use crate::value::{Row, RowKey, Value};

#[derive(Clone)]
pub struct Table {
    source: SourceRef,
    cache: Rc<RefCell<ResultCache>>,
    config: Rc<EngineConfig>,
}

impl Table {
    /// Wraps a source with the default configuration
    pub fn new(source: SourceRef) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    pub fn with_config(source: SourceRef, config: EngineConfig) -> Self {
        Self {
            source,
            cache: Rc::new(RefCell::new(ResultCache::new())),
            config: Rc::new(config),
        }
    }

    fn derive(&self, source: SourceRef) -> Table {
        Table {
            source,
            cache: Rc::new(RefCell::new(ResultCache::new())),
            config: Rc::clone(&self.config),
        }
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn view(&self) -> &ViewState {
        self.source.view()
    }

    // ---- filters ----

    /// Adds one condition to the filter chain
    pub fn filter(&self, filter: Filter) -> TableResult<Table> {
        Ok(self.derive(ops::filter(&self.source, filter)?))
    }

    pub fn eq(&self, column: &str, value: impl Into<Value>) -> TableResult<Table> {
        self.filter(Filter::new(column, Condition::Eq(value.into())))
    }

    pub fn lt(&self, column: &str, value: impl Into<Value>) -> TableResult<Table> {
        self.filter(Filter::new(column, Condition::Lt(value.into())))
    }

    pub fn lte(&self, column: &str, value: impl Into<Value>) -> TableResult<Table> {
        self.filter(Filter::new(column, Condition::Lte(value.into())))
    }

    pub fn gt(&self, column: &str, value: impl Into<Value>) -> TableResult<Table> {
        self.filter(Filter::new(column, Condition::Gt(value.into())))
    }

    pub fn gte(&self, column: &str, value: impl Into<Value>) -> TableResult<Table> {
        self.filter(Filter::new(column, Condition::Gte(value.into())))
    }

    /// Case-insensitive pattern match with `%` and `_` wildcards
    pub fn like(&self, column: &str, pattern: impl Into<Value>) -> TableResult<Table> {
        self.filter(Filter::new(column, Condition::new(Operator::Like, pattern.into())?))
    }

    /// `column IN (values)`. An empty list matches nothing.
    pub fn is_in<I, V>(&self, column: &str, values: I) -> TableResult<Table>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.is_in_set(column, ValueSet::new(column, values))
    }

    /// `column IN set`, where the set is a [`ValueSet`] or a one-column view
    pub fn is_in_set(&self, column: &str, set: impl Into<InSet>) -> TableResult<Table> {
        self.filter(Filter::new(column, Condition::In(set.into())))
    }

    /// Rows matching any of the predicates
    pub fn or(&self, predicates: &[Predicate]) -> TableResult<Table> {
        Ok(self.derive(ops::or(&self.source, predicates)?))
    }

    // ---- ordering, projection, pagination ----

    /// Orders by `"col [ASC|DESC], ..."`. Blank text clears the order.
    pub fn order(&self, spec: &str) -> TableResult<Table> {
        self.order_by(&OrderSpec::parse(spec)?)
    }

    pub fn order_by(&self, spec: &OrderSpec) -> TableResult<Table> {
        Ok(self.derive(ops::order(&self.source, spec)?))
    }

    /// Replaces the limit
    pub fn limit(&self, limit: usize) -> Table {
        self.derive(ops::paginate(&self.source, Some(limit), self.view().offset))
    }

    /// Replaces the offset
    pub fn offset(&self, offset: usize) -> Table {
        self.derive(ops::paginate(&self.source, self.view().limit, offset))
    }

    /// Narrows the visible columns
    pub fn columns(&self, names: &[&str]) -> TableResult<Table> {
        Ok(self.derive(ops::columns(&self.source, names)?))
    }

    // ---- set operations ----

    pub fn union(&self, other: &Table) -> TableResult<Table> {
        Ok(self.derive(ops::union(&self.source, &other.source)?))
    }

    pub fn except(&self, other: &Table) -> TableResult<Table> {
        Ok(self.derive(ops::except(&self.source, &other.source)?))
    }

    /// Removes rows repeating the visible columns of an earlier row
    pub fn distinct(&self) -> TableResult<Table> {
        Ok(self.derive(ops::distinct(&self.source)?))
    }

    // ---- naming ----

    /// Prefixes every column with `prefix.`
    pub fn alias(&self, prefix: &str) -> TableResult<Table> {
        Ok(self.derive(ops::alias(&self.source, prefix)?))
    }

    pub fn rename(&self, from: &str, to: &str) -> TableResult<Table> {
        Ok(self.derive(ops::rename(&self.source, from, to)?))
    }

    // ---- results ----

    fn sync(&self) -> u64 {
        let version = self.source.data_version();
        self.cache.borrow_mut().sync(version);
        version
    }

    /// Lazily iterates `(key, row)` pairs projected to the visible columns
    pub fn iter(&self) -> Rows<'_> {
        let version = self.sync();
        if let Some(rows) = self.cache.borrow().rows() {
            return Rows {
                state: RowsState::Cached { rows, pos: 0 },
            };
        }
        let inner = match self.source.scan() {
            Ok(inner) => inner,
            Err(e) => {
                return Rows {
                    state: RowsState::Failed(Some(e)),
                }
            }
        };
        let buffer = if self.cache.borrow().is_disabled() {
            None
        } else {
            Some(Vec::new())
        };
        Rows {
            state: RowsState::Live {
                inner,
                visible: self.visible_columns(),
                buffer,
                cache: &self.cache,
                version,
                threshold: self.config.buffer_threshold,
            },
        }
    }

    pub fn to_vec(&self) -> TableResult<Vec<(RowKey, Row)>> {
        self.iter().collect()
    }

    pub fn rows(&self) -> TableResult<Vec<Row>> {
        self.iter().map(|item| item.map(|(_, row)| row)).collect()
    }

    pub fn keys(&self) -> TableResult<Vec<RowKey>> {
        self.iter().map(|item| item.map(|(key, _)| key)).collect()
    }

    pub fn count(&self) -> TableResult<usize> {
        let version = self.sync();
        if let Some(count) = self.cache.borrow().count() {
            return Ok(count);
        }
        let count = self.source.count()?;
        self.cache.borrow_mut().store_count(version, count);
        Ok(count)
    }

    pub fn exists(&self) -> TableResult<bool> {
        self.sync();
        if let Some(count) = self.cache.borrow().count() {
            return Ok(count > 0);
        }
        if self.view().limit == Some(0) {
            return Ok(false);
        }
        Ok(self.limit(1).count()? > 0)
    }

    /// True if some row equals `record` on every column the record names.
    ///
    /// The record may only name visible columns.
    pub fn has(&self, record: &Row) -> TableResult<bool> {
        let visible = self.visible_columns();
        if let Some(unknown) = record.columns().find(|c| !visible.iter().any(|v| v == c)) {
            return Err(TableError::UnknownColumn(unknown.to_string()));
        }
        self.sync();
        let columns = self.source.columns();

        // A buffered hit by primary key is proof; a miss is not.
        if let Some(primary) = columns.primary() {
            if !record.value(&primary.name).is_null()
                && self.cache.borrow_mut().primary_hit(&primary.name, record)
            {
                return Ok(true);
            }
        }

        let unique = record
            .iter()
            .filter(|(c, v)| !v.is_null() && columns.get(c).is_some_and(|d| d.index.is_unique()))
            .filter_map(|(c, v)| columns.get(c).map(|d| (d.index, c, v)))
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(a.1)));
        if let Some((_, column, value)) = unique {
            let narrowed = self.eq(column, value.clone())?;
            for item in narrowed.iter() {
                if item?.1.matches_record(record) {
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        if let Some(found) = self.cache.borrow_mut().record_member(record) {
            return Ok(found);
        }

        for item in self.iter() {
            if item?.1.matches_record(record) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Row with the given key, projected to the visible columns
    pub fn load(&self, key: &RowKey) -> TableResult<Option<Row>> {
        self.sync();
        if let Some(rows) = self.cache.borrow().rows() {
            return Ok(rows.iter().find(|(k, _)| k == key).map(|(_, r)| r.clone()));
        }
        let visible = self.visible_columns();
        Ok(self.source.load(key)?.map(|row| row.project(&visible)))
    }

    pub fn visible_columns(&self) -> Vec<String> {
        self.view().visible_columns(self.source.columns())
    }

    /// Descriptors of the visible columns
    pub fn schema(&self) -> ColumnSet {
        self.source.columns().project(&self.visible_columns())
    }

    pub fn explain(&self) -> ExplainNode {
        self.source.explain()
    }

    pub fn data_version(&self) -> u64 {
        self.source.data_version()
    }

    pub fn backend_id(&self) -> Option<BackendId> {
        self.source.backend_id()
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("columns", &self.visible_columns())
            .field("limit", &self.view().limit)
            .field("offset", &self.view().offset)
            .finish()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = TableResult<(RowKey, Row)>;
    type IntoIter = Rows<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Row iterator returned by [`Table::iter`]
///
/// Dropping it early releases any backend cursor.
pub struct Rows<'a> {
    state: RowsState<'a>,
}

enum RowsState<'a> {
    Cached {
        rows: CachedRows,
        pos: usize,
    },
    Live {
        inner: RowIter<'a>,
        visible: Vec<String>,
        buffer: Option<Vec<(RowKey, Row)>>,
        cache: &'a RefCell<ResultCache>,
        version: u64,
        threshold: usize,
    },
    Failed(Option<TableError>),
}

impl Iterator for Rows<'_> {
    type Item = TableResult<(RowKey, Row)>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            RowsState::Cached { rows, pos } => {
                let item = rows.get(*pos)?.clone();
                *pos += 1;
                Some(Ok(item))
            }
            RowsState::Failed(err) => err.take().map(Err),
            RowsState::Live {
                inner,
                visible,
                buffer,
                cache,
                version,
                threshold,
            } => match inner.next() {
                Some(Ok((key, row))) => {
                    let row = row.project(visible);
                    let overflow = match buffer.as_mut() {
                        Some(buf) if buf.len() < *threshold => {
                            buf.push((key.clone(), row.clone()));
                            false
                        }
                        Some(_) => true,
                        None => false,
                    };
                    if overflow {
                        *buffer = None;
                        cache.borrow_mut().disable(*threshold);
                    }
                    Some(Ok((key, row)))
                }
                Some(Err(e)) => {
                    *buffer = None;
                    Some(Err(e))
                }
                None => {
                    if let Some(buf) = buffer.take() {
                        cache.borrow_mut().store_rows(*version, buf);
                    }
                    None
                }
            },
        }
    }
}
