//! Query builder module

pub mod brackets;
pub mod common;

// Re-export types from submodules
pub use brackets::Brackets;
pub use common::{NullsOrder, QueryBuilder, SortDirection, WhereBuilder};
