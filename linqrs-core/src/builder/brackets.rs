//! Bracketed condition groups

use super::common::WhereBuilder;
use crate::operator::Combinator;

/// Collects conditions and renders them as one parenthesised fragment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Brackets {
    conditions: Vec<(Combinator, String)>,
}

impl Brackets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render as `(a AND b OR c)`, joined left to right
    pub fn to_sql(&self) -> String {
        let mut sql = String::from("(");
        for (i, (combinator, condition)) in self.conditions.iter().enumerate() {
            if i > 0 {
                sql.push(' ');
                sql.push_str(combinator.as_str());
                sql.push(' ');
            }
            sql.push_str(condition);
        }
        sql.push(')');
        sql
    }
}

impl WhereBuilder for Brackets {
    fn where_(&mut self, condition: &str) {
        self.conditions.clear();
        self.conditions.push((Combinator::And, condition.to_string()));
    }

    fn and_where(&mut self, condition: &str) {
        self.conditions.push((Combinator::And, condition.to_string()));
    }

    fn or_where(&mut self, condition: &str) {
        self.conditions.push((Combinator::Or, condition.to_string()));
    }
}
