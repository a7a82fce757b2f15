//! Schema error types

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Column metadata errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Two descriptors for different columns were combined
    #[error("cannot combine column '{left}' with column '{right}'")]
    NameMismatch { left: String, right: String },

    /// Two descriptors with incompatible value types were combined
    #[error("column '{column}' has incompatible types {left} and {right}")]
    TypeMismatch {
        column: String,
        left: &'static str,
        right: &'static str,
    },

    /// A column name appears twice
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    /// A composite index names a column that does not exist
    #[error("column '{column}' lists unknown trailing index column '{trailing}'")]
    UnknownTrailingColumn { column: String, trailing: String },

    /// A value does not fit the column type
    #[error("invalid {expected} value for column '{column}': {found}")]
    InvalidValue {
        column: String,
        expected: &'static str,
        found: String,
    },
}

impl SchemaError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::NameMismatch { .. } => "SCHEMA_NAME_MISMATCH",
            SchemaError::TypeMismatch { .. } => "SCHEMA_TYPE_MISMATCH",
            SchemaError::DuplicateColumn(_) => "SCHEMA_DUPLICATE_COLUMN",
            SchemaError::UnknownTrailingColumn { .. } => "SCHEMA_UNKNOWN_TRAILING_COLUMN",
            SchemaError::InvalidValue { .. } => "SCHEMA_INVALID_VALUE",
        }
    }
}
