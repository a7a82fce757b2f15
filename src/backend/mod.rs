//! Table backends
//!
//! - [`ArrayTable`]: mutable, in-memory, index-planned
//! - [`SqlTable`]: mutable, SQLite-backed reference backend
//! - [`CsvTable`], [`JsonTable`], [`RowsTable`]: static rows loaded once
//! - [`GeneratorTable`]: rows pulled from a factory on every scan
//! - [`EmptyTable`]: statically empty views

mod array;
mod csv;
mod empty;
mod generator;
mod json;
mod rows;
mod sql;

pub use array::ArrayTable;
pub use self::csv::CsvTable;
pub use empty::EmptyTable;
pub use generator::GeneratorTable;
pub use json::JsonTable;
pub use rows::RowsTable;
pub use sql::{SqlEngine, SqlTable};
