//! Column metadata
//!
//! Static descriptors for table columns: name, value type, index kind and
//! composite-index membership, plus the rules for merging descriptors when
//! two tables are combined.

pub mod decimal;
mod column;
mod errors;
mod types;

pub use column::{ColumnDef, ColumnSet};
pub use errors::{SchemaError, SchemaResult};
pub use types::{ColumnType, IndexKind};
