//! Row-at-a-time evaluation helpers
//!
//! Used by backends without native filtering and by operator wrappers.

mod filters;
mod sorter;

pub use filters::{compare, RowFilter};
pub use sorter::RowSorter;
