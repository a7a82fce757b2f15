//! Static in-memory row sets
//!
//! Rows are loaded once and shared by every derived view. There is no
//! native filtering: every operator goes through a wrapper.

use std::any::Any;
use std::rc::Rc;

use crate::planner::ExplainNode;
use crate::schema::ColumnSet;
use crate::table::{RowIter, SourceRef, Table, TableError, TableResult, TableSource, ViewState};
use crate::value::{Row, RowKey, Value};

#[derive(Debug, Clone)]
pub struct RowsTable {
    rows: Rc<Vec<(RowKey, Row)>>,
    columns: ColumnSet,
    label: &'static str,
    view: ViewState,
}

impl RowsTable {
    /// Builds a source from keyed rows, coercing every value to its column
    /// type. Missing fields become NULL.
    pub fn new(
        columns: ColumnSet,
        rows: Vec<(RowKey, Row)>,
        label: &'static str,
    ) -> TableResult<SourceRef> {
        let rows = rows
            .into_iter()
            .map(|(key, row)| Ok((key, conform(&columns, row)?)))
            .collect::<TableResult<Vec<_>>>()?;
        Ok(Rc::new(Self {
            rows: Rc::new(rows),
            columns,
            label,
            view: ViewState::default(),
        }))
    }

    /// Table over rows keyed by their 0-based position
    pub fn from_rows(columns: ColumnSet, rows: Vec<Row>) -> TableResult<Table> {
        let keyed = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| (RowKey::from(i), row))
            .collect();
        Ok(Table::new(Self::new(columns, keyed, "RowsScan")?))
    }
}

/// Checks field names and coerces values to the declared column types
pub(crate) fn conform(columns: &ColumnSet, row: Row) -> TableResult<Row> {
    if let Some(unknown) = row.columns().find(|c| !columns.contains(c)) {
        return Err(TableError::UnknownColumn(unknown.to_string()));
    }
    let mut row = row;
    let mut out = Row::new();
    for def in columns {
        let value = row.remove(&def.name).unwrap_or(Value::Null);
        out.set(def.name.clone(), def.column_type.coerce(&def.name, value)?);
    }
    Ok(out)
}

impl TableSource for RowsTable {
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
        let rows = self.rows.iter().map(|entry| Ok(entry.clone()));
        Ok(self.view.paginate(Box::new(rows)))
    }

    fn count(&self) -> TableResult<usize> {
        Ok(self.view.paginated_count(self.rows.len()))
    }

    fn explain(&self) -> ExplainNode {
        self.view
            .describe(ExplainNode::new(self.label).with("rows", self.rows.len()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
