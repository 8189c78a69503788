//! Repository configuration

use serde::Deserialize;

use crate::path::is_identifier;
use crate::{Error, Result};

/// Options for a [`Repository`](crate::Repository)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepositoryOptions {
    /// Alias bound to the base entity in every query
    pub alias: String,
    /// Primary key column used by `get_by_id`
    pub primary_key: String,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            alias: "entity".to_string(),
            primary_key: "id".to_string(),
        }
    }
}

impl RepositoryOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let options: RepositoryOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }

    pub fn with_primary_key(mut self, column: &str) -> Self {
        self.primary_key = column.to_string();
        self
    }

    /// Aliases and keys are written verbatim into SQL, so they must be
    /// plain identifiers.
    pub fn validate(&self) -> Result<()> {
        check_identifier("alias", &self.alias)?;
        check_identifier("primary_key", &self.primary_key)
    }
}

fn check_identifier(field: &str, value: &str) -> Result<()> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(Error::config(format!("{} must be a plain identifier, got '{}'", field, value)))
    }
}
