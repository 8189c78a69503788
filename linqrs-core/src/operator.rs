//! SQL operator types and keywords used when composing conditions

use std::fmt::{self, Display};

/// Comparison operator written between a property reference and its operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator(&'static str);

impl Operator {
    pub const EQ: Self = Operator("=");
    pub const NEQ: Self = Operator("!=");
    pub const GT: Self = Operator(">");
    pub const GTE: Self = Operator(">=");
    pub const LT: Self = Operator("<");
    pub const LTE: Self = Operator("<=");
    pub const LIKE: Self = Operator("LIKE");
    pub const IN: Self = Operator("IN");
    pub const NOT_IN: Self = Operator("NOT IN");
    pub const IS: Self = Operator("IS");

    /// Create a custom operator for database-specific comparisons
    ///
    /// # Examples
    /// ```
    /// use linqrs_core::Operator;
    ///
    /// let ilike = Operator::custom("ILIKE");
    /// assert_eq!(ilike.as_str(), "ILIKE");
    /// ```
    pub const fn custom(op: &'static str) -> Self {
        Operator(op)
    }

    /// Get the string representation of the operator
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Keyword joining two conditions inside a where or join clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

impl Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL keywords used as unquoted operands
pub mod keyword {
    pub const NULL: &str = "NULL";
    pub const NOT_NULL: &str = "NOT NULL";
    pub const TRUE: &str = "true";
    pub const LOWER: &str = "LOWER";
}
