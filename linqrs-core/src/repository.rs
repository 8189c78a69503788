//! Entry point handing out queries for one entity

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::RepositoryOptions;
use crate::executor::ConnectionPool;
use crate::query::{Many, One, Query};
use crate::sql::{Schema, SqlBuilder};
use crate::value::Value;
use crate::Result;

/// Query factory for entity `T`, rows of which are read from `P`
pub struct Repository<P, T> {
    pool: P,
    schema: Arc<Schema>,
    entity: String,
    options: RepositoryOptions,
    entity_type: PhantomData<fn() -> T>,
}

impl<P: Clone, T> Clone for Repository<P, T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            schema: Arc::clone(&self.schema),
            entity: self.entity.clone(),
            options: self.options.clone(),
            entity_type: PhantomData,
        }
    }
}

impl<P, T> Repository<P, T>
where
    P: ConnectionPool,
    T: DeserializeOwned + Send + Unpin,
{
    pub fn new(pool: P, schema: Arc<Schema>, entity: &str) -> Result<Self> {
        Self::with_options(pool, schema, entity, RepositoryOptions::default())
    }

    pub fn with_options(
        pool: P,
        schema: Arc<Schema>,
        entity: &str,
        options: RepositoryOptions,
    ) -> Result<Self> {
        options.validate()?;
        schema.require(entity)?;
        Ok(Self {
            pool,
            schema,
            entity: entity.to_string(),
            options,
            entity_type: PhantomData,
        })
    }

    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    /// A bare builder over the entity, bound to `alias`
    pub fn create_query_builder(&self, alias: &str) -> SqlBuilder<P, T> {
        SqlBuilder::new(self.pool.clone(), Arc::clone(&self.schema), &self.entity, alias)
    }

    /// Every entity matching the conditions added to the returned query
    pub fn get_all(&self) -> Query<SqlBuilder<P, T>, Many> {
        Query::new(self.create_query_builder(&self.options.alias))
    }

    /// The first entity matching the conditions added to the returned query
    pub fn get_one(&self) -> Query<SqlBuilder<P, T>, One> {
        self.get_all().one()
    }

    /// The entity with primary key `id`.
    ///
    /// The key filter is kept apart from the query's own conditions, so the
    /// returned query can still be narrowed with `where_`.
    pub fn get_by_id(&self, id: impl Into<Value>) -> Query<SqlBuilder<P, T>, One> {
        let filter = format!(
            "{}.{} = {}",
            self.options.alias,
            self.options.primary_key,
            id.into().render_list_member()
        );
        let builder = self
            .create_query_builder(&self.options.alias)
            .with_base_filter(filter);
        Query::new(builder).one()
    }
}
