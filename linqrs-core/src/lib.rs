//! Linqrs Core - deferred, fluent query construction over relational builders
//!
//! A [`Query`] accumulates filters, joins, ordering and paging as a list of
//! deferred builder calls, using property paths instead of hand-written SQL.
//! Nothing touches the database until the query is awaited, counted or
//! embedded as a subquery.
//!
//! ```no_run
//! use std::sync::Arc;
//! use linqrs_core::{path, CompareOptions, ConnectionPool, EntitySchema, Repository, Schema};
//! # use serde::Deserialize;
//! # #[derive(Deserialize)] struct User { id: i64 }
//!
//! # async fn run<P: ConnectionPool + 'static>(pool: P) -> linqrs_core::Result<()> {
//! let schema = Arc::new(
//!     Schema::new()
//!         .entity(EntitySchema::new("User", "users").many_to_one("account", "Account", "account_id"))
//!         .entity(EntitySchema::new("Account", "accounts")),
//! );
//! let users: Repository<P, User> = Repository::new(pool, schema, "User")?;
//!
//! let active = users
//!     .get_all()
//!     .where_(path!(account.status))?
//!     .equal_opts("active", CompareOptions::match_case())?
//!     .order_by("name")
//!     .take(20)
//!     .await?;
//! # let _ = active;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod executor;
pub mod operator;
pub mod path;
pub mod query;
pub mod repository;
pub mod sql;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use builder::{Brackets, NullsOrder, QueryBuilder, SortDirection, WhereBuilder};
pub use config::RepositoryOptions;
pub use error::{Error, Result};
pub use executor::ConnectionPool;
pub use operator::{Combinator, Operator};
pub use path::{JoinTarget, PropertyPath};
pub use query::{
    CompareOptions, Conditions, Fetch, Many, One, OrderOptions, Query, QueryAction, QueryMode,
    QueryParam, QueryPart, WhereType,
};
pub use repository::Repository;
pub use sql::{EntitySchema, RelationKind, Schema, SqlBuilder};
pub use value::Value;
