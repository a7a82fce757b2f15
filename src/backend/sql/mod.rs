//! SQLite-backed tables
//!
//! The reference backend: filters, OR groups, ordering and pagination are
//! translated to SQL and run by an embedded SQLite engine. Views of one
//! table that share an engine combine natively for union, except and
//! distinct; anything without an exact SQL form falls back to the generic
//! wrappers.
//!
//! Decimal columns are stored as scaled integers and converted on write
//! and on read. Text comparisons use the BINARY collation.

mod engine;
mod table;
mod translate;

pub use engine::SqlEngine;
pub use table::SqlTable;
