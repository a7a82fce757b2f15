//! Column and table aliasing
//!
//! Exposes upstream columns under new names, optionally prefixed with a
//! table alias (`u.name`). Filters and orders given under either name are
//! translated back to upstream names before they are pushed down.

use std::any::Any;
use std::rc::Rc;

use crate::planner::{ExplainNode, Filter, OrderSpec};
use crate::schema::ColumnSet;
use crate::table::ops;
use crate::table::{BackendId, RowIter, SourceRef, TableResult, TableSource, ViewState};
use crate::value::{Row, RowKey};

#[derive(Debug, Clone)]
pub struct AliasWrapper {
    upstream: SourceRef,
    prefix: Option<String>,
    renames: Vec<(String, String)>,
    /// (upstream name, exposed name) for every upstream column
    names: Vec<(String, String)>,
    columns: ColumnSet,
    ordering: Option<OrderSpec>,
    view: ViewState,
}

impl AliasWrapper {
    pub fn wrap(
        upstream: SourceRef,
        prefix: Option<String>,
        renames: Vec<(String, String)>,
    ) -> SourceRef {
        let view = upstream.view().unpaginated();
        let mut alias = Self::build(upstream, prefix, renames, view);
        alias.view.visible = alias
            .upstream
            .view()
            .visible
            .as_ref()
            .map(|v| v.iter().map(|c| alias.exposed(c)).collect());
        Rc::new(alias)
    }

    fn build(
        upstream: SourceRef,
        prefix: Option<String>,
        renames: Vec<(String, String)>,
        view: ViewState,
    ) -> Self {
        let names: Vec<(String, String)> = upstream
            .columns()
            .names()
            .into_iter()
            .map(|original| {
                let base = renames
                    .iter()
                    .find(|(from, _)| *from == original)
                    .map(|(_, to)| to.clone())
                    .unwrap_or_else(|| original.clone());
                let exposed = match &prefix {
                    Some(p) => format!("{}.{}", p, base),
                    None => base,
                };
                (original, exposed)
            })
            .collect();
        let columns = upstream.columns().rename(&names);
        let mut alias = Self {
            upstream,
            prefix,
            renames,
            names,
            columns,
            ordering: None,
            view,
        };
        alias.ordering = alias
            .upstream
            .ordering()
            .map(|spec| spec.map_columns(|c| alias.exposed(c)));
        alias
    }

    fn rewrap(&self, upstream: SourceRef) -> SourceRef {
        Rc::new(Self::build(
            upstream,
            self.prefix.clone(),
            self.renames.clone(),
            self.view.clone(),
        ))
    }

    fn exposed(&self, original: &str) -> String {
        self.names
            .iter()
            .find(|(o, _)| o == original)
            .map(|(_, e)| e.clone())
            .unwrap_or_else(|| original.to_string())
    }

    fn original(&self, exposed: &str) -> String {
        self.names
            .iter()
            .find(|(_, e)| e == exposed)
            .map(|(o, _)| o.clone())
            .unwrap_or_else(|| exposed.to_string())
    }

    fn expose_row(&self, row: Row) -> Row {
        row.into_iter().map(|(c, v)| (self.exposed(&c), v)).collect()
    }
}

impl TableSource for AliasWrapper {
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
        let rows = self
            .upstream
            .scan()?
            .map(move |item| item.map(|(key, row)| (key, self.expose_row(row))));
        Ok(self.view.paginate(Box::new(rows)))
    }

    fn count(&self) -> TableResult<usize> {
        Ok(self.view.paginated_count(self.upstream.count()?))
    }

    fn load(&self, key: &RowKey) -> TableResult<Option<Row>> {
        if self.view.is_paginated() {
            for item in self.scan()? {
                let (k, row) = item?;
                if &k == key {
                    return Ok(Some(row));
                }
            }
            return Ok(None);
        }
        Ok(self.upstream.load(key)?.map(|row| self.expose_row(row)))
    }

    fn explain(&self) -> ExplainNode {
        let mut node = ExplainNode::new("Alias");
        if let Some(prefix) = &self.prefix {
            node = node.with("prefix", prefix);
        }
        for (from, to) in &self.renames {
            node = node.with("rename", format!("{} -> {}", from, to));
        }
        self.view.describe(node).child(self.upstream.explain())
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

    /// Accepts the exposed name, the exposed name without the table prefix,
    /// or any name the upstream accepts.
    fn resolve_column(&self, name: &str) -> Option<String> {
        if self.columns.contains(name) {
            return Some(name.to_string());
        }
        if let Some(prefix) = &self.prefix {
            let qualified = format!("{}.{}", prefix, name);
            if self.columns.contains(&qualified) {
                return Some(qualified);
            }
        }
        self.upstream
            .resolve_column(name)
            .map(|original| self.exposed(&original))
    }

    fn ordering(&self) -> Option<&OrderSpec> {
        self.ordering.as_ref()
    }

    fn push_filter(&self, filter: &Filter) -> TableResult<Option<SourceRef>> {
        let below = ops::filter(&self.upstream, filter.with_column(self.original(&filter.column)))?;
        Ok(Some(self.rewrap(below)))
    }

    fn push_order(&self, spec: &OrderSpec) -> TableResult<Option<SourceRef>> {
        let below = ops::order(&self.upstream, &spec.map_columns(|c| self.original(c)))?;
        Ok(Some(self.rewrap(below)))
    }
}
