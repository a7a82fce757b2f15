//! Duplicate removal wrapper
//!
//! Keeps the first row for each combination of the columns visible when
//! the wrapper was created. Keys are composite index keys, whose type tags
//! keep NULL apart from every value.

use std::any::Any;
use std::rc::Rc;

use crate::index::{HybridIndex, IndexKey};
use crate::planner::{ExplainNode, OrderSpec};
use crate::schema::ColumnSet;
use crate::table::{BackendId, RowIter, SourceRef, TableResult, TableSource, ViewState};

#[derive(Debug, Clone)]
pub struct DistinctWrapper {
    upstream: SourceRef,
    key_columns: Vec<String>,
    view: ViewState,
}

impl DistinctWrapper {
    pub fn wrap(upstream: SourceRef) -> SourceRef {
        let view = upstream.view().unpaginated();
        let key_columns = view.visible_columns(upstream.columns());
        Rc::new(Self {
            upstream,
            key_columns,
            view,
        })
    }
}

impl TableSource for DistinctWrapper {
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
        let mut seen = HybridIndex::new();
        let mut position = 0u64;
        let columns = &self.key_columns;
        let rows = self.upstream.scan()?.filter(move |item| match item {
            Ok((_, row)) => {
                let key = IndexKey::composite(columns.iter().map(|c| row.value(c)));
                if seen.contains_key(key.as_bytes()) {
                    return false;
                }
                seen.insert(key.as_bytes(), position);
                position += 1;
                true
            }
            Err(_) => true,
        });
        Ok(self.view.paginate(Box::new(rows)))
    }

    fn explain(&self) -> ExplainNode {
        self.view
            .describe(ExplainNode::new("Distinct").with("key", self.key_columns.join(", ")))
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

    fn push_distinct(&self) -> TableResult<Option<SourceRef>> {
        let visible = self.view.visible_columns(self.columns());
        if visible == self.key_columns {
            return Ok(Some(self.with_view(self.view.clone())));
        }
        Ok(None)
    }
}
