//! # Table Errors

use thiserror::Error;

use crate::schema::SchemaError;

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;

/// Table errors
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Union operands differ at column: {0}")]
    SchemaMismatch(String),

    #[error("Unbound parameters: {}", .0.join(", "))]
    UnboundParameters(Vec<String>),

    #[error("Query view is not derived from this table")]
    ForeignQuery,

    #[error("Duplicate value {value} for unique column '{column}'")]
    UniqueViolation { column: String, value: String },

    #[error("Invalid order specification: '{0}'")]
    InvalidOrder(String),

    #[error("Invalid operand for column '{column}': {reason}")]
    InvalidOperand { column: String, reason: String },

    #[error("Missing value for column: {0}")]
    MissingColumn(String),

    #[error("Predicate has unbound parameters: {}", .0.join(", "))]
    UnboundPredicate(Vec<String>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid LIKE pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TableError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TableError::UnknownColumn(_) => "TABLE_UNKNOWN_COLUMN",
            TableError::SchemaMismatch(_) => "TABLE_SCHEMA_MISMATCH",
            TableError::UnboundParameters(_) => "TABLE_UNBOUND_PARAMETERS",
            TableError::ForeignQuery => "TABLE_FOREIGN_QUERY",
            TableError::UniqueViolation { .. } => "TABLE_UNIQUE_VIOLATION",
            TableError::InvalidOrder(_) => "TABLE_INVALID_ORDER",
            TableError::InvalidOperand { .. } => "TABLE_INVALID_OPERAND",
            TableError::MissingColumn(_) => "TABLE_MISSING_COLUMN",
            TableError::UnboundPredicate(_) => "TABLE_UNBOUND_PREDICATE",
            TableError::InvalidConfig(_) => "TABLE_INVALID_CONFIG",
            TableError::InvalidPattern(_) => "TABLE_INVALID_PATTERN",
            TableError::Schema(e) => e.code(),
            TableError::Sql(_) => "TABLE_SQL",
            TableError::Csv(_) => "TABLE_CSV",
            TableError::Json(_) => "TABLE_JSON",
            TableError::Io(_) => "TABLE_IO",
        }
    }

    /// True for errors caused by how the API was called rather than by data
    /// or the environment
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            TableError::UnknownColumn(_)
                | TableError::SchemaMismatch(_)
                | TableError::UnboundParameters(_)
                | TableError::ForeignQuery
                | TableError::InvalidOrder(_)
                | TableError::InvalidOperand { .. }
                | TableError::UnboundPredicate(_)
                | TableError::InvalidPattern(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TableError::UnknownColumn("x".into()).code(), "TABLE_UNKNOWN_COLUMN");
        assert_eq!(TableError::ForeignQuery.code(), "TABLE_FOREIGN_QUERY");
        let schema = SchemaError::DuplicateColumn("id".into());
        assert_eq!(TableError::from(schema).code(), "SCHEMA_DUPLICATE_COLUMN");
    }

    #[test]
    fn test_unbound_names_listed() {
        let err = TableError::UnboundParameters(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Unbound parameters: a, b");
        assert!(err.is_usage_error());
    }

    #[test]
    fn test_data_errors_are_not_usage_errors() {
        let err = TableError::UniqueViolation {
            column: "email".into(),
            value: "'a@b'".into(),
        };
        assert!(!err.is_usage_error());
        assert!(err.to_string().contains("email"));
    }
}
