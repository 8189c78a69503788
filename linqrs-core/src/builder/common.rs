//! Capabilities a relational query builder must expose to be driven by a [`Query`].
//!
//! [`Query`]: crate::Query

use std::fmt;
use std::future::Future;

use crate::Result;

/// Accepts raw condition fragments
pub trait WhereBuilder {
    /// Start the WHERE clause, replacing any earlier conditions
    fn where_(&mut self, condition: &str);

    /// Append a condition joined with AND
    fn and_where(&mut self, condition: &str);

    /// Append a condition joined with OR
    fn or_where(&mut self, condition: &str);
}

/// The relational query builder a query is replayed onto
///
/// Joins take a relation reference (`alias.relation`, or a bare entity name),
/// the alias to bind it to, and an optional raw ON condition fragment.
pub trait QueryBuilder: WhereBuilder + Clone + Send {
    /// Row type produced by the terminal operations
    type Entity: Send;

    /// Alias bound to the base entity
    fn alias(&self) -> &str;

    fn inner_join(&mut self, relation: &str, alias: &str, condition: Option<&str>);

    fn left_join(&mut self, relation: &str, alias: &str, condition: Option<&str>);

    /// LEFT JOIN whose columns are also selected
    fn left_join_and_select(&mut self, relation: &str, alias: &str, condition: Option<&str>);

    /// Replace the projection
    fn select(&mut self, selection: &str);

    /// Replace the ordering
    fn order_by(&mut self, sort: &str, direction: SortDirection, nulls: Option<NullsOrder>);

    /// Append to the ordering
    fn add_order_by(&mut self, sort: &str, direction: SortDirection, nulls: Option<NullsOrder>);

    fn skip(&mut self, count: u64);

    fn take(&mut self, count: u64);

    /// Render the query text
    fn get_query(&self) -> Result<String>;

    fn get_one(self) -> impl Future<Output = Result<Option<Self::Entity>>> + Send;

    fn get_many(self) -> impl Future<Output = Result<Vec<Self::Entity>>> + Send;

    fn get_count(self) -> impl Future<Output = Result<u64>> + Send;
}

/// Sort direction for ORDER BY clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Placement of NULLs in an ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

impl NullsOrder {
    /// `Some(true)` puts nulls first, `Some(false)` last
    pub fn from_nulls_first(nulls_first: Option<bool>) -> Option<Self> {
        nulls_first.map(|first| if first { NullsOrder::First } else { NullsOrder::Last })
    }
}

impl fmt::Display for NullsOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NullsOrder::First => write!(f, "NULLS FIRST"),
            NullsOrder::Last => write!(f, "NULLS LAST"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_direction_display() {
        assert_eq!(SortDirection::Asc.to_string(), "ASC");
        assert_eq!(SortDirection::Desc.to_string(), "DESC");
    }

    #[test]
    fn test_nulls_order() {
        assert_eq!(NullsOrder::from_nulls_first(None), None);
        assert_eq!(NullsOrder::from_nulls_first(Some(true)), Some(NullsOrder::First));
        assert_eq!(NullsOrder::from_nulls_first(Some(false)).unwrap().to_string(), "NULLS LAST");
    }
}
