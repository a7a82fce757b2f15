//! Query vocabulary and access planning
//!
//! - [`ast`]: filters, conditions, value sets and order specifications
//! - [`Predicate`]: data-only AND-chains used as OR branches
//! - [`IndexPlanner`]: chooses an index scan for in-memory tables
//! - [`ExplainNode`]: deterministic operator tree output
//!
//! # Index Selection Priority (strict order)
//!
//! 1. Native order column
//! 2. Indexed equality filter
//! 3. Indexed range filter
//!
//! Ties broken lexicographically by column name.

mod ast;
mod bounds;
mod explain;
mod planner;
mod predicate;

pub use ast::{Condition, Filter, InSet, Operator, OrderSpec, SortDirection, SortKey, ValueSet};
pub use bounds::{column_bounds, merge_filter, narrow, ColumnBounds, KeyRange, Narrowing};
pub use explain::ExplainNode;
pub use planner::{AccessPlan, IndexPlanner, ScanType};
pub use predicate::{Operand, Predicate, Term};
