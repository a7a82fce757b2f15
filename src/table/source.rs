//! The contract every backend and wrapper implements
//!
//! A source is an immutable view. Operators never mutate a source; the
//! `push_*` hooks return a new source when the operation can be folded into
//! this one, or `None` so the caller wraps it in a generic operator.
//!
//! Rows produced by [`TableSource::scan`] carry every column of the source,
//! already filtered, ordered and paginated. Projection to the visible
//! columns happens in the [`Table`](super::Table) handle.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use super::errors::TableResult;
use super::mutable::BackendId;
use super::view::ViewState;
use crate::planner::{ExplainNode, Filter, OrderSpec};
use crate::schema::ColumnSet;
use crate::value::{Row, RowKey};

/// Shared handle to a source
pub type SourceRef = Rc<dyn TableSource>;

/// Lazy stream of keyed rows
pub type RowIter<'a> = Box<dyn Iterator<Item = TableResult<(RowKey, Row)>> + 'a>;

pub trait TableSource: fmt::Debug {
    /// Every column of the source, visible or not
    fn columns(&self) -> &ColumnSet;

    fn view(&self) -> &ViewState;

    /// Same source with another projection or pagination
    fn with_view(&self, view: ViewState) -> SourceRef;

    fn scan(&self) -> TableResult<RowIter<'_>>;

    fn explain(&self) -> ExplainNode;

    fn as_any(&self) -> &dyn Any;

    /// Counter that changes whenever the underlying data changes
    fn data_version(&self) -> u64 {
        0
    }

    /// Identity of the mutable backend rows come from, if any
    fn backend_id(&self) -> Option<BackendId> {
        None
    }

    fn count(&self) -> TableResult<usize> {
        let mut count = 0;
        for item in self.scan()? {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn load(&self, key: &RowKey) -> TableResult<Option<Row>> {
        for item in self.scan()? {
            let (k, row) = item?;
            if &k == key {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    /// Canonical name of a column reference, if the source has it
    fn resolve_column(&self, name: &str) -> Option<String> {
        self.columns().contains(name).then(|| name.to_string())
    }

    /// Order the scan is guaranteed to follow
    fn ordering(&self) -> Option<&OrderSpec> {
        None
    }

    fn push_filter(&self, _filter: &Filter) -> TableResult<Option<SourceRef>> {
        Ok(None)
    }

    fn push_order(&self, _spec: &OrderSpec) -> TableResult<Option<SourceRef>> {
        Ok(None)
    }

    /// Folds OR-ed groups of AND-ed filters into the source
    fn push_or(&self, _groups: &[Vec<Filter>]) -> TableResult<Option<SourceRef>> {
        Ok(None)
    }

    fn push_union(&self, _other: &SourceRef) -> TableResult<Option<SourceRef>> {
        Ok(None)
    }

    fn push_except(&self, _other: &SourceRef) -> TableResult<Option<SourceRef>> {
        Ok(None)
    }

    fn push_distinct(&self) -> TableResult<Option<SourceRef>> {
        Ok(None)
    }
}
