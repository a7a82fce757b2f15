//! Generic operator wrappers
//!
//! Each wrapper holds one upstream source (two for union and except) and
//! changes one concern. Sources without native support for an operation
//! are wrapped by [`crate::table`] operators.

mod alias;
mod barrier;
mod distinct;
mod except;
mod filter;
mod or;
mod sort;
mod union;

pub use alias::AliasWrapper;
pub use barrier::Barrier;
pub use distinct::DistinctWrapper;
pub use except::ExceptWrapper;
pub use filter::FilterWrapper;
pub use or::OrWrapper;
pub use sort::SortWrapper;
pub use union::UnionWrapper;
