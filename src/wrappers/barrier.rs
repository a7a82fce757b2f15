//! Pagination barrier
//!
//! Freezes an upstream's limit and offset. Nothing is pushed through a
//! barrier, so later operators cannot change which rows the page holds.

use std::any::Any;
use std::rc::Rc;

use crate::planner::{ExplainNode, OrderSpec};
use crate::schema::ColumnSet;
use crate::table::{BackendId, RowIter, SourceRef, TableResult, TableSource, ViewState};

#[derive(Debug, Clone)]
pub struct Barrier {
    upstream: SourceRef,
    view: ViewState,
}

impl Barrier {
    pub fn wrap(upstream: SourceRef) -> SourceRef {
        let view = upstream.view().unpaginated();
        Rc::new(Self { upstream, view })
    }
}

impl TableSource for Barrier {
    fn columns(&self) -> &ColumnSet {
        self.upstream.columns()
    }

    fn view(&self) -> &ViewState {
        &self.view
    }

    fn with_view(&self, view: ViewState) -> SourceRef {
        Rc::new(Self {
            upstream: self.upstream.clone(),
            view,
        })
    }

    fn scan(&self) -> TableResult<RowIter<'_>> {
        Ok(self.view.paginate(self.upstream.scan()?))
    }

    fn count(&self) -> TableResult<usize> {
        Ok(self.view.paginated_count(self.upstream.count()?))
    }

    fn explain(&self) -> ExplainNode {
        self.view
            .describe(ExplainNode::new("Barrier"))
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
        self.upstream.ordering()
    }
}
