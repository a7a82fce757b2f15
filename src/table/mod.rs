//! Immutable table views
//!
//! A [`Table`] is a lazy, immutable view over a [`TableSource`]. Every
//! operator returns a new view; the receiver never changes.
//!
//! ```ignore
//! let adults = people.gte("age", 18)?.order("name ASC")?.limit(10);
//! for item in adults.iter() {
//!     let (key, row) = item?;
//! }
//! ```
//!
//! # Pushdown
//!
//! Operators first offer themselves to the source (`push_*`). Sources that
//! can evaluate the operation natively return a new source; otherwise the
//! source is wrapped in a generic operator from [`crate::wrappers`].

mod cache;
mod errors;
mod handle;
mod mutable;
pub(crate) mod ops;
mod source;
mod view;

pub use errors::{TableError, TableResult};
pub use handle::{Rows, Table};
pub use mutable::{BackendId, MutableTable};
pub use source::{RowIter, SourceRef, TableSource};
pub use view::ViewState;
