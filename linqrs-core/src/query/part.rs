//! Deferred builder invocations

use crate::builder::{NullsOrder, SortDirection};
use crate::{Error, Result};

/// The builder capability a [`QueryPart`] replays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryAction {
    Where,
    AndWhere,
    OrWhere,
    InnerJoin,
    LeftJoin,
    LeftJoinAndSelect,
    Select,
    OrderBy,
    AddOrderBy,
    Skip,
    Take,
}

impl QueryAction {
    /// Where, and-where or or-where
    pub fn is_condition(&self) -> bool {
        matches!(self, QueryAction::Where | QueryAction::AndWhere | QueryAction::OrWhere)
    }

    pub fn is_join(&self) -> bool {
        matches!(
            self,
            QueryAction::InnerJoin | QueryAction::LeftJoin | QueryAction::LeftJoinAndSelect
        )
    }
}

/// One argument of a deferred invocation
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Text(String),
    Count(u64),
    Direction(SortDirection),
    Nulls(NullsOrder),
}

impl From<String> for QueryParam {
    fn from(text: String) -> Self {
        QueryParam::Text(text)
    }
}

impl From<&str> for QueryParam {
    fn from(text: &str) -> Self {
        QueryParam::Text(text.to_string())
    }
}

/// A builder capability plus its arguments, replayed at compile time.
///
/// The action is fixed at construction; only the arguments change, and only
/// by growing the trailing condition string.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPart {
    action: QueryAction,
    params: Vec<QueryParam>,
}

impl QueryPart {
    pub fn new(action: QueryAction, params: Vec<QueryParam>) -> Self {
        Self { action, params }
    }

    pub fn action(&self) -> QueryAction {
        self.action
    }

    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    /// Alias bound by this part, when it has one
    pub fn joined_alias(&self) -> Option<&str> {
        match self.params.get(1) {
            Some(QueryParam::Text(alias)) => Some(alias),
            _ => None,
        }
    }

    /// A join already carrying an ON condition in progress
    pub fn has_join_condition(&self) -> bool {
        self.action.is_join()
            && self.params.len() == 3
            && matches!(self.params[2], QueryParam::Text(_))
    }

    pub fn text(&self, index: usize) -> Result<&str> {
        match self.params.get(index) {
            Some(QueryParam::Text(text)) => Ok(text),
            _ => Err(self.shape_error(index, "text")),
        }
    }

    pub fn optional_text(&self, index: usize) -> Result<Option<&str>> {
        match self.params.get(index) {
            None => Ok(None),
            Some(QueryParam::Text(text)) => Ok(Some(text)),
            Some(_) => Err(self.shape_error(index, "text")),
        }
    }

    pub fn count(&self, index: usize) -> Result<u64> {
        match self.params.get(index) {
            Some(QueryParam::Count(count)) => Ok(*count),
            _ => Err(self.shape_error(index, "count")),
        }
    }

    pub fn direction(&self, index: usize) -> Result<SortDirection> {
        match self.params.get(index) {
            Some(QueryParam::Direction(direction)) => Ok(*direction),
            _ => Err(self.shape_error(index, "sort direction")),
        }
    }

    pub fn nulls(&self, index: usize) -> Result<Option<NullsOrder>> {
        match self.params.get(index) {
            None => Ok(None),
            Some(QueryParam::Nulls(nulls)) => Ok(Some(*nulls)),
            Some(_) => Err(self.shape_error(index, "nulls order")),
        }
    }

    /// Remove the trailing condition string
    pub(crate) fn pop_text(&mut self) -> Result<String> {
        match self.params.pop() {
            Some(QueryParam::Text(text)) => Ok(text),
            Some(other) => {
                self.params.push(other);
                Err(self.shape_error(self.params.len() - 1, "text"))
            }
            None => Err(self.shape_error(0, "text")),
        }
    }

    pub(crate) fn push_text(&mut self, text: String) {
        self.params.push(QueryParam::Text(text));
    }

    pub(crate) fn trailing_text_mut(&mut self) -> Option<&mut String> {
        match self.params.last_mut() {
            Some(QueryParam::Text(text)) => Some(text),
            _ => None,
        }
    }

    fn shape_error(&self, index: usize, expected: &str) -> Error {
        Error::invalid_query(format!(
            "{:?} part expects {} at argument {}, found {:?}",
            self.action,
            expected,
            index,
            self.params.get(index)
        ))
    }
}
