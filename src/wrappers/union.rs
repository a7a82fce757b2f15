//! Set union wrapper
//!
//! Streams side A fully, then side B skipping row keys A already produced.
//! Limit and offset apply to the merged stream.

use std::any::Any;
use std::collections::HashSet;
use std::rc::Rc;

use crate::planner::ExplainNode;
use crate::schema::ColumnSet;
use crate::table::{BackendId, RowIter, SourceRef, TableResult, TableSource, ViewState};
use crate::value::RowKey;

#[derive(Debug, Clone)]
pub struct UnionWrapper {
    a: SourceRef,
    b: SourceRef,
    columns: ColumnSet,
    view: ViewState,
}

impl UnionWrapper {
    /// Combines two sides exposing the same columns. `columns` is the merged
    /// descriptor set; paginated sides must already sit behind a barrier.
    pub fn wrap(a: SourceRef, b: SourceRef, columns: ColumnSet) -> SourceRef {
        Rc::new(Self {
            a,
            b,
            columns,
            view: ViewState::default(),
        })
    }
}

impl TableSource for UnionWrapper {
    fn columns(&self) -> &ColumnSet {
        &self.columns
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
        let mut seen: HashSet<RowKey> = HashSet::new();
        let mut b = Some(&self.b);
        let mut current = self.a.scan()?;
        let mut in_a = true;
        let rows = std::iter::from_fn(move || loop {
            match current.next() {
                Some(Ok((key, row))) => {
                    if in_a {
                        seen.insert(key.clone());
                    } else if seen.contains(&key) {
                        continue;
                    }
                    return Some(Ok((key, row)));
                }
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    let next = b.take()?;
                    match next.scan() {
                        Ok(scan) => {
                            current = scan;
                            in_a = false;
                        }
                        Err(e) => return Some(Err(e)),
                    }
                }
            }
        });
        Ok(self.view.paginate(Box::new(rows)))
    }

    fn explain(&self) -> ExplainNode {
        self.view
            .describe(ExplainNode::new("Union"))
            .child(self.a.explain())
            .child(self.b.explain())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data_version(&self) -> u64 {
        self.a.data_version() + self.b.data_version()
    }

    fn backend_id(&self) -> Option<BackendId> {
        let id = self.a.backend_id()?;
        (self.b.backend_id() == Some(id)).then_some(id)
    }
}
