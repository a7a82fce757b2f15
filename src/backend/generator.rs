//! Tables over a re-runnable row generator
//!
//! The factory is called once per scan, so every iteration sees a fresh
//! stream. Keys are 0-based positions in that stream.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::planner::ExplainNode;
use crate::schema::ColumnSet;
use crate::table::{RowIter, SourceRef, Table, TableResult, TableSource, ViewState};
use crate::value::{Row, RowKey};

type Factory = Rc<dyn Fn() -> Box<dyn Iterator<Item = Row>>>;

#[derive(Clone)]
pub struct GeneratorTable {
    columns: ColumnSet,
    factory: Factory,
    view: ViewState,
}

impl GeneratorTable {
    pub fn new<F, I>(columns: ColumnSet, factory: F) -> Table
    where
        F: Fn() -> I + 'static,
        I: IntoIterator<Item = Row>,
        I::IntoIter: 'static,
    {
        let factory: Factory = Rc::new(move || Box::new(factory().into_iter()));
        Table::new(Rc::new(Self {
            columns,
            factory,
            view: ViewState::default(),
        }))
    }
}

impl fmt::Debug for GeneratorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorTable")
            .field("columns", &self.columns.names())
            .field("view", &self.view)
            .finish()
    }
}

impl TableSource for GeneratorTable {
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
        let rows = (self.factory)()
            .enumerate()
            .map(|(i, row)| Ok((RowKey::from(i), row)));
        Ok(self.view.paginate(Box::new(rows)))
    }

    fn explain(&self) -> ExplainNode {
        self.view.describe(ExplainNode::new("GeneratorScan"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ColumnType};
    use crate::value::Value;

    fn squares() -> Table {
        let columns = ColumnSet::new(vec![
            ColumnDef::new("n", ColumnType::Integer),
            ColumnDef::new("square", ColumnType::Integer),
        ])
        .unwrap();
        GeneratorTable::new(columns, || {
            (1..=5i64).map(|n| Row::new().with("n", n).with("square", n * n))
        })
    }

    #[test]
    fn test_rescans_produce_fresh_streams() {
        let table = squares();
        assert_eq!(table.count().unwrap(), 5);
        assert_eq!(table.rows().unwrap().len(), 5);
    }

    #[test]
    fn test_operators_over_generated_rows() {
        let table = squares()
            .gt("square", 4)
            .unwrap()
            .order("n DESC")
            .unwrap()
            .limit(2);
        let rows = table.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value("n"), &Value::Int(5));
        assert_eq!(rows[1].value("n"), &Value::Int(4));
    }
}
