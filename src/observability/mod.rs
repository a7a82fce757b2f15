//! Observability for tabula
//!
//! Structured logging only. Logging is read-only: no event influences
//! planning or execution.
//!
//! ```ignore
//! use tabula::observability::{Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Trace);
//! Logger::trace("ARRAY_PLAN", &[("scan", "INDEX_RANGE"), ("column", "age")]);
//! ```

mod logger;

pub use logger::{Logger, Severity};
