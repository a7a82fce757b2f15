//! CLI-specific error types
//!
//! Every failure ends the process; `code()` is printed in front of the
//! message so scripts can match on it.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::table::TableError;

#[derive(Debug, Error)]
pub enum CliError {
    /// The `--config` file could not be read or parsed
    #[error("invalid configuration {}: {source}", path.display())]
    Config { path: PathBuf, source: TableError },

    /// A malformed `COLUMN=VALUE` argument
    #[error("expected COLUMN=VALUE, got '{0}'")]
    Usage(String),

    /// Writing to stdout failed
    #[error("output failed: {0}")]
    Io(#[from] io::Error),

    /// Loading or querying the table failed
    #[error("{0}")]
    Query(#[from] TableError),
}

impl CliError {
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config { .. } => "TABULA_CLI_CONFIG_ERROR",
            CliError::Usage(_) => "TABULA_CLI_USAGE_ERROR",
            CliError::Io(_) => "TABULA_CLI_IO_ERROR",
            CliError::Query(e) => e.code(),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_errors_keep_table_codes() {
        let err = CliError::from(TableError::UnknownColumn("age".into()));
        assert_eq!(err.code(), "TABLE_UNKNOWN_COLUMN");
        assert_eq!(CliError::Usage("x".into()).code(), "TABULA_CLI_USAGE_ERROR");
    }
}
