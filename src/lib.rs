//! tabula - immutable relational views over heterogeneous row sources
//!
//! A [`Table`] is a lazy, immutable view. Filters, ordering, projection,
//! pagination and set operations return new views and are pushed into the
//! backend whenever it can evaluate them natively:
//!
//! - [`ArrayTable`]: in-memory rows with hybrid indexes and an access planner
//! - [`SqlTable`]: SQLite-backed rows with SQL translation of operators
//! - [`CsvTable`], [`JsonTable`], [`RowsTable`], [`GeneratorTable`]: static sources
//!
//! Everything a backend cannot do itself is handled by the generic
//! operators in [`wrappers`].

pub mod backend;
pub mod binding;
pub mod cli;
pub mod config;
pub mod executor;
pub mod index;
pub mod observability;
pub mod planner;
pub mod schema;
pub mod table;
pub mod value;
pub mod wrappers;

pub use backend::{
    ArrayTable, CsvTable, EmptyTable, GeneratorTable, JsonTable, RowsTable, SqlEngine, SqlTable,
};
pub use binding::BoundTable;
pub use config::EngineConfig;
pub use planner::{Condition, ExplainNode, Filter, InSet, Operator, OrderSpec, Predicate, ValueSet};
pub use schema::{ColumnDef, ColumnSet, ColumnType, IndexKind, SchemaError};
pub use table::{BackendId, MutableTable, Table, TableError, TableResult, TableSource};
pub use value::{Row, RowKey, Value};
