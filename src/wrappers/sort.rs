//! In-memory sort wrapper
//!
//! Materializes the upstream rows, sorts them and applies this layer's own
//! limit and offset afterwards. A paginated upstream keeps its page: the
//! sort only reorders the rows the upstream produced.

use std::any::Any;
use std::rc::Rc;

use crate::executor::RowSorter;
use crate::planner::{ExplainNode, Filter, OrderSpec};
use crate::schema::ColumnSet;
use crate::table::ops;
use crate::table::{BackendId, RowIter, SourceRef, TableResult, TableSource, ViewState};

#[derive(Debug, Clone)]
pub struct SortWrapper {
    upstream: SourceRef,
    spec: OrderSpec,
    view: ViewState,
}

impl SortWrapper {
    pub fn wrap(upstream: SourceRef, spec: OrderSpec) -> SourceRef {
        let view = upstream.view().unpaginated();
        Rc::new(Self {
            upstream,
            spec,
            view,
        })
    }

    fn rewrap(&self, upstream: SourceRef) -> SourceRef {
        Rc::new(Self {
            upstream,
            spec: self.spec.clone(),
            view: self.view.clone(),
        })
    }
}

impl TableSource for SortWrapper {
    fn columns(&self) -> &ColumnSet {
        self.upstream.columns()
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
        let mut rows = Vec::new();
        for item in self.upstream.scan()? {
            rows.push(item?);
        }
        RowSorter::sort(&mut rows, &self.spec);
        Ok(self.view.paginate(Box::new(rows.into_iter().map(Ok))))
    }

    fn count(&self) -> TableResult<usize> {
        Ok(self.view.paginated_count(self.upstream.count()?))
    }

    fn explain(&self) -> ExplainNode {
        self.view
            .describe(ExplainNode::new("Sort").with("order", &self.spec))
            .child(self.upstream.explain())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data_version(&self) -> u64 {
        self.upstream.data_version()
    }

    fn backend_id(&self) -> Option<BackendId> {
        self.upstream.backend_id()
    }

    fn resolve_column(&self, name: &str) -> Option<String> {
        self.upstream.resolve_column(name)
    }

    fn ordering(&self) -> Option<&OrderSpec> {
        Some(&self.spec)
    }

    fn push_filter(&self, filter: &Filter) -> TableResult<Option<SourceRef>> {
        let below = ops::filter(&self.upstream, filter.clone())?;
        Ok(Some(self.rewrap(below)))
    }

    fn push_order(&self, spec: &OrderSpec) -> TableResult<Option<SourceRef>> {
        if self.upstream.view().is_paginated() {
            // the page is fixed; only the order of its rows changes
            return Ok(Some(Rc::new(Self {
                spec: if spec.is_empty() { self.spec.clone() } else { spec.clone() },
                ..self.clone()
            })));
        }
        Ok(Some(ops::order(&self.upstream, spec)?))
    }
}
