//! Transient state of a fluent chain

/// What kind of fluent call the chain expects next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// Filtering or selecting against the base entity
    #[default]
    Get,
    /// A relation was just joined or included
    Join,
    /// A property was chosen and awaits a comparison
    Compare,
}

/// Where the condition being composed will land
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhereType {
    /// The top-level WHERE clause
    #[default]
    Normal,
    /// The ON clause of the join that introduced the active alias
    Joined,
}
