//! Write-capable backends

use std::fmt;

use uuid::Uuid;

use super::errors::{TableError, TableResult};
use super::handle::Table;
use crate::value::{Row, RowKey};

/// Opaque identity minted once per mutable backend instance
///
/// Views derived from a backend carry its id; mutation targets are
/// authorized by comparing ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendId(Uuid);

impl BackendId {
    pub fn new() -> Self {
        BackendId(Uuid::new_v4())
    }
}

impl Default for BackendId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A backend accepting inserts, updates and deletes
pub trait MutableTable {
    fn backend_id(&self) -> BackendId;

    /// Unfiltered view over every row
    fn table(&self) -> Table;

    /// Inserts a row and returns its key
    fn insert(&self, fields: Row) -> TableResult<RowKey>;

    /// Applies `changes` to every row of `query`, returning the affected count
    fn update(&self, query: &Table, changes: &Row) -> TableResult<usize>;

    /// Deletes every row of `query`, returning the affected count
    fn delete(&self, query: &Table) -> TableResult<usize>;

    /// Fails unless `query` was derived from this backend
    fn check_target(&self, query: &Table) -> TableResult<()> {
        if query.backend_id() == Some(self.backend_id()) {
            Ok(())
        } else {
            Err(TableError::ForeignQuery)
        }
    }
}
