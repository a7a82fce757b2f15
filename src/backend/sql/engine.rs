//! Embedded SQLite engine shared by SQL-backed tables

use std::cell::Cell;
use std::rc::Rc;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, ErrorCode};

use super::table::SqlTable;
use super::translate::{ident, storage_type};
use crate::config::EngineConfig;
use crate::observability::Logger;
use crate::schema::{ColumnSet, IndexKind};
use crate::table::{TableError, TableResult};

#[derive(Debug)]
pub(crate) struct EngineInner {
    conn: Connection,
    version: Cell<u64>,
    pub(crate) config: EngineConfig,
}

/// Handle to one SQLite connection. Clones share the connection.
#[derive(Debug, Clone)]
pub struct SqlEngine {
    pub(crate) inner: Rc<EngineInner>,
}

impl SqlEngine {
    pub fn open_in_memory() -> TableResult<Self> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> TableResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            inner: Rc::new(EngineInner {
                conn,
                version: Cell::new(0),
                config,
            }),
        })
    }

    /// Creates a table and returns its mutable handle.
    ///
    /// Primary columns are declared `NOT NULL UNIQUE` rather than `PRIMARY
    /// KEY` so rowid keeps insertion order. Unique constraints cover the
    /// leading column of a composite index; every index is created over
    /// all of its columns.
    pub fn create_table(&self, name: &str, columns: ColumnSet) -> TableResult<SqlTable> {
        let mut defs = Vec::with_capacity(columns.len());
        let mut indexes = Vec::new();
        for def in &columns {
            let constraint = match def.index {
                IndexKind::Primary => " NOT NULL UNIQUE",
                IndexKind::Unique => " UNIQUE",
                IndexKind::Index | IndexKind::None => "",
            };
            defs.push(format!(
                "{} {}{}",
                ident(&def.name),
                storage_type(def.column_type),
                constraint
            ));
            if def.index.is_indexed() && (def.index == IndexKind::Index || !def.trailing.is_empty())
            {
                let cols: Vec<String> = def.index_columns().iter().map(|c| ident(c)).collect();
                indexes.push(format!(
                    "CREATE INDEX {} ON {} ({})",
                    ident(&format!("{}__{}", name, def.name)),
                    ident(name),
                    cols.join(", ")
                ));
            }
        }
        self.execute(
            &format!("CREATE TABLE {} ({})", ident(name), defs.join(", ")),
            &[],
        )?;
        for statement in indexes {
            self.execute(&statement, &[])?;
        }
        Ok(SqlTable::new(self.clone(), name.to_string(), columns))
    }

    /// Counter bumped by every write through this engine
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    pub fn same_engine(&self, other: &SqlEngine) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub(crate) fn bump(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
    }

    /// Runs a statement and returns the number of changed rows
    pub(crate) fn execute(&self, sql: &str, params: &[SqlValue]) -> TableResult<usize> {
        Logger::trace("SQL_EXEC", &[("sql", sql), ("params", &params.len().to_string())]);
        Ok(self
            .inner
            .conn
            .execute(sql, params_from_iter(params.iter()))?)
    }

    /// Runs a query and decodes every result row
    pub(crate) fn select<T>(
        &self,
        sql: &str,
        params: &[SqlValue],
        mut decode: impl FnMut(&rusqlite::Row<'_>) -> TableResult<T>,
    ) -> TableResult<Vec<T>> {
        Logger::trace("SQL_EXEC", &[("sql", sql), ("params", &params.len().to_string())]);
        let mut statement = self.inner.conn.prepare_cached(sql)?;
        let mut rows = statement.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(decode(row)?);
        }
        Ok(out)
    }

    pub(crate) fn last_insert_rowid(&self) -> i64 {
        self.inner.conn.last_insert_rowid()
    }

    /// Runs `body` in a transaction, rolling back on error
    pub(crate) fn transaction<T>(&self, body: impl FnOnce() -> TableResult<T>) -> TableResult<T> {
        let tx = self.inner.conn.unchecked_transaction()?;
        let out = body()?;
        tx.commit()?;
        Ok(out)
    }
}

/// Maps constraint failures to table errors. `value_of` supplies the
/// offending value for a column name.
pub(crate) fn constraint_error(
    error: TableError,
    value_of: impl Fn(&str) -> String,
) -> TableError {
    let TableError::Sql(rusqlite::Error::SqliteFailure(failure, Some(message))) = &error else {
        return error;
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return error;
    }
    let column = message
        .rsplit_once('.')
        .map(|(_, c)| c.trim().to_string())
        .unwrap_or_default();
    if message.starts_with("UNIQUE") {
        let value = value_of(&column);
        TableError::UniqueViolation { column, value }
    } else if message.starts_with("NOT NULL") {
        TableError::MissingColumn(column)
    } else {
        error
    }
}
