//! In-memory indexes
//!
//! Indexes are derived state owned by in-memory backends.
//!
//! # Invariants
//!
//! - Key byte order equals value order (`Value::cmp_raw`)
//! - Row ids under one key are kept ascending
//! - The hash map decides liveness; ordered structures may hold stale keys

mod hybrid;
mod key;
mod treap;

pub use hybrid::{HybridIndex, IndexMode, IndexRange, RowId};
pub use key::{component_prefix_len, prefix_successor, IndexKey, NULL_TAG};
