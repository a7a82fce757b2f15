//! Row filter wrapper

use std::any::Any;
use std::rc::Rc;

use crate::backend::EmptyTable;
use crate::executor::RowFilter;
use crate::planner::{narrow, ExplainNode, Filter, Narrowing, OrderSpec};
use crate::schema::ColumnSet;
use crate::table::ops;
use crate::table::{BackendId, RowIter, SourceRef, TableResult, TableSource, ViewState};

/// Applies one condition to every upstream row
#[derive(Debug, Clone)]
pub struct FilterWrapper {
    upstream: SourceRef,
    filter: Filter,
    view: ViewState,
}

impl FilterWrapper {
    pub fn wrap(upstream: SourceRef, filter: Filter) -> SourceRef {
        let view = upstream.view().unpaginated();
        Rc::new(Self {
            upstream,
            filter,
            view,
        })
    }

    /// The condition this layer applies
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn upstream(&self) -> &SourceRef {
        &self.upstream
    }

    fn rewrap(&self, upstream: SourceRef) -> SourceRef {
        if upstream.as_any().is::<EmptyTable>() {
            return EmptyTable::of(self);
        }
        Rc::new(Self {
            upstream,
            filter: self.filter.clone(),
            view: self.view.clone(),
        })
    }
}

impl TableSource for FilterWrapper {
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
        let test = RowFilter::compile(&self.filter)?;
        let rows = self.upstream.scan()?.filter(move |item| match item {
            Ok((_, row)) => test.matches(row),
            Err(_) => true,
        });
        Ok(self.view.paginate(Box::new(rows)))
    }

    fn explain(&self) -> ExplainNode {
        self.view
            .describe(ExplainNode::new("Filter").with("condition", &self.filter))
            .child(self.upstream.explain())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data_version(&self) -> u64 {
        self.upstream.data_version() + self.filter.dependency_version()
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

    fn push_filter(&self, filter: &Filter) -> TableResult<Option<SourceRef>> {
        if filter.column == self.filter.column {
            match narrow(&self.filter.condition, &filter.condition) {
                Narrowing::Keep => return Ok(Some(self.with_view(self.view.clone()))),
                Narrowing::Empty => return Ok(Some(EmptyTable::of(self))),
                Narrowing::Replace => {
                    let replaced = ops::filter(&self.upstream, filter.clone())?;
                    let view = replaced.view().with_visible(self.view.visible.clone());
                    return Ok(Some(replaced.with_view(view)));
                }
                Narrowing::Both => {}
            }
        }
        let below = ops::filter(&self.upstream, filter.clone())?;
        Ok(Some(self.rewrap(below)))
    }

    fn push_order(&self, spec: &OrderSpec) -> TableResult<Option<SourceRef>> {
        let below = ops::order(&self.upstream, spec)?;
        Ok(Some(self.rewrap(below)))
    }
}
