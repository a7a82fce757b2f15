//! OR-predicate wrapper

use std::any::Any;
use std::rc::Rc;

use crate::executor::RowFilter;
use crate::planner::{ExplainNode, Filter, OrderSpec};
use crate::schema::ColumnSet;
use crate::table::ops;
use crate::table::{BackendId, RowIter, SourceRef, TableResult, TableSource, ViewState};

/// Keeps upstream rows matching any group of AND-ed filters
#[derive(Debug, Clone)]
pub struct OrWrapper {
    upstream: SourceRef,
    groups: Vec<Vec<Filter>>,
    view: ViewState,
}

impl OrWrapper {
    pub fn wrap(upstream: SourceRef, groups: Vec<Vec<Filter>>) -> SourceRef {
        let view = upstream.view().unpaginated();
        Rc::new(Self {
            upstream,
            groups,
            view,
        })
    }

    fn rewrap(&self, upstream: SourceRef) -> SourceRef {
        Rc::new(Self {
            upstream,
            groups: self.groups.clone(),
            view: self.view.clone(),
        })
    }

    fn describe_groups(&self) -> String {
        let groups: Vec<String> = self
            .groups
            .iter()
            .map(|group| {
                let terms: Vec<String> = group.iter().map(ToString::to_string).collect();
                format!("({})", terms.join(" AND "))
            })
            .collect();
        groups.join(" OR ")
    }
}

impl TableSource for OrWrapper {
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
        let groups = self
            .groups
            .iter()
            .map(|g| RowFilter::compile_all(g))
            .collect::<TableResult<Vec<_>>>()?;
        let rows = self.upstream.scan()?.filter(move |item| match item {
            // short-circuits on the first matching group
            Ok((_, row)) => groups.iter().any(|g| RowFilter::matches_all(g, row)),
            Err(_) => true,
        });
        Ok(self.view.paginate(Box::new(rows)))
    }

    fn explain(&self) -> ExplainNode {
        self.view
            .describe(ExplainNode::new("Or").with("predicates", self.describe_groups()))
            .child(self.upstream.explain())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data_version(&self) -> u64 {
        self.groups
            .iter()
            .flatten()
            .map(Filter::dependency_version)
            .sum::<u64>()
            + self.upstream.data_version()
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
        let below = ops::filter(&self.upstream, filter.clone())?;
        Ok(Some(self.rewrap(below)))
    }

    fn push_order(&self, spec: &OrderSpec) -> TableResult<Option<SourceRef>> {
        let below = ops::order(&self.upstream, spec)?;
        Ok(Some(self.rewrap(below)))
    }
}
