//! Statically empty views

use std::any::Any;
use std::rc::Rc;

use crate::planner::{ExplainNode, Filter, OrderSpec};
use crate::schema::ColumnSet;
use crate::table::{BackendId, RowIter, SourceRef, TableResult, TableSource, ViewState};

/// A view that produces no rows but keeps its column metadata
#[derive(Debug, Clone)]
pub struct EmptyTable {
    columns: ColumnSet,
    view: ViewState,
    /// Backend of the view this one was derived from
    backend: Option<BackendId>,
}

impl EmptyTable {
    pub fn new(columns: ColumnSet) -> SourceRef {
        Rc::new(Self {
            columns,
            view: ViewState::default(),
            backend: None,
        })
    }

    /// Empty view with the columns and projection of `source`
    pub fn of(source: &dyn TableSource) -> SourceRef {
        Rc::new(Self {
            columns: source.columns().clone(),
            view: source.view().unpaginated(),
            backend: source.backend_id(),
        })
    }
}

impl TableSource for EmptyTable {
    fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    fn view(&self) -> &ViewState {
        &self.view
    }

    fn with_view(&self, view: ViewState) -> SourceRef {
        Rc::new(Self {
            columns: self.columns.clone(),
            view,
            backend: self.backend,
        })
    }

    fn scan(&self) -> TableResult<RowIter<'_>> {
        Ok(Box::new(std::iter::empty()))
    }

    fn count(&self) -> TableResult<usize> {
        Ok(0)
    }

    fn explain(&self) -> ExplainNode {
        self.view.describe(ExplainNode::new("Empty"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn backend_id(&self) -> Option<BackendId> {
        self.backend
    }

    fn push_filter(&self, _filter: &Filter) -> TableResult<Option<SourceRef>> {
        Ok(Some(self.with_view(self.view.clone())))
    }

    fn push_order(&self, _spec: &OrderSpec) -> TableResult<Option<SourceRef>> {
        Ok(Some(self.with_view(self.view.clone())))
    }

    fn push_or(&self, _groups: &[Vec<Filter>]) -> TableResult<Option<SourceRef>> {
        Ok(Some(self.with_view(self.view.clone())))
    }

    fn push_except(&self, _other: &SourceRef) -> TableResult<Option<SourceRef>> {
        Ok(Some(self.with_view(self.view.clone())))
    }

    fn push_distinct(&self) -> TableResult<Option<SourceRef>> {
        Ok(Some(self.with_view(self.view.clone())))
    }
}
