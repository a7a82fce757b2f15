//! Set difference wrapper
//!
//! Drops source rows whose values on the excluded view's visible columns
//! appear in the excluded view. NULL matches NULL.

use std::any::Any;
use std::collections::HashSet;
use std::rc::Rc;

use crate::index::IndexKey;
use crate::planner::{ExplainNode, Filter, OrderSpec};
use crate::schema::ColumnSet;
use crate::table::ops;
use crate::table::{BackendId, RowIter, SourceRef, TableResult, TableSource, ViewState};

#[derive(Debug, Clone)]
pub struct ExceptWrapper {
    source: SourceRef,
    excluded: SourceRef,
    /// (source column, excluded column) pairs compared per row
    pairs: Vec<(String, String)>,
    view: ViewState,
}

impl ExceptWrapper {
    pub fn wrap(source: SourceRef, excluded: SourceRef, pairs: Vec<(String, String)>) -> SourceRef {
        let view = source.view().unpaginated();
        Rc::new(Self {
            source,
            excluded,
            pairs,
            view,
        })
    }

    fn rewrap(&self, source: SourceRef) -> SourceRef {
        Rc::new(Self {
            source,
            excluded: self.excluded.clone(),
            pairs: self.pairs.clone(),
            view: self.view.clone(),
        })
    }
}

impl TableSource for ExceptWrapper {
    fn columns(&self) -> &ColumnSet {
        self.source.columns()
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
        let mut excluded: HashSet<IndexKey> = HashSet::new();
        for item in self.excluded.scan()? {
            let (_, row) = item?;
            excluded.insert(IndexKey::composite(
                self.pairs.iter().map(|(_, theirs)| row.value(theirs)),
            ));
        }
        let pairs = &self.pairs;
        let rows = self.source.scan()?.filter(move |item| match item {
            Ok((_, row)) => {
                let key = IndexKey::composite(pairs.iter().map(|(ours, _)| row.value(ours)));
                !excluded.contains(&key)
            }
            Err(_) => true,
        });
        Ok(self.view.paginate(Box::new(rows)))
    }

    fn explain(&self) -> ExplainNode {
        let compared: Vec<&str> = self.pairs.iter().map(|(ours, _)| ours.as_str()).collect();
        self.view
            .describe(ExplainNode::new("Except").with("columns", compared.join(", ")))
            .child(self.source.explain())
            .child(self.excluded.explain())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data_version(&self) -> u64 {
        self.source.data_version() + self.excluded.data_version()
    }

    fn backend_id(&self) -> Option<BackendId> {
        self.source.backend_id()
    }

    fn resolve_column(&self, name: &str) -> Option<String> {
        self.source.resolve_column(name)
    }

    fn ordering(&self) -> Option<&OrderSpec> {
        self.source.ordering()
    }

    fn push_filter(&self, filter: &Filter) -> TableResult<Option<SourceRef>> {
        let below = ops::filter(&self.source, filter.clone())?;
        Ok(Some(self.rewrap(below)))
    }

    fn push_order(&self, spec: &OrderSpec) -> TableResult<Option<SourceRef>> {
        let below = ops::order(&self.source, spec)?;
        Ok(Some(self.rewrap(below)))
    }
}
