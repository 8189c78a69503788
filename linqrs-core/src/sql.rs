//! A SQL-text query builder driven by relation metadata.
//!
//! [`SqlBuilder`] is the concrete [`QueryBuilder`] a [`Query`] replays onto.
//! Joins arrive as `alias.relation` references; the ON clause is derived
//! from the [`Schema`] and any join condition composed by the query is
//! ANDed onto it.
//!
//! [`Query`]: crate::Query

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::{Brackets, NullsOrder, QueryBuilder, SortDirection, WhereBuilder};
use crate::executor::ConnectionPool;
use crate::operator::keyword;
use crate::{Error, Result};

/// How two entities are related
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Foreign key on the owning entity points at the target
    ManyToOne,
    /// Foreign key on the target points back at the owning entity
    OneToMany,
    /// Foreign key on the owning entity, at most one target row
    OneToOne,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    /// Target entity name
    pub target: String,
    pub foreign_key: String,
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// Table mapping for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    #[serde(default)]
    name: String,
    table: String,
    #[serde(default = "default_primary_key")]
    primary_key: String,
    #[serde(default)]
    relations: HashMap<String, Relation>,
}

impl EntitySchema {
    /// An entity stored in `table` with an `id` primary key
    pub fn new(name: &str, table: &str) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            primary_key: default_primary_key(),
            relations: HashMap::new(),
        }
    }

    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = column.to_string();
        self
    }

    /// `foreign_key` is a column of this entity
    pub fn many_to_one(self, relation: &str, target: &str, foreign_key: &str) -> Self {
        self.relation(relation, RelationKind::ManyToOne, target, foreign_key)
    }

    /// `foreign_key` is a column of the target entity
    pub fn one_to_many(self, relation: &str, target: &str, foreign_key: &str) -> Self {
        self.relation(relation, RelationKind::OneToMany, target, foreign_key)
    }

    /// `foreign_key` is a column of this entity
    pub fn one_to_one(self, relation: &str, target: &str, foreign_key: &str) -> Self {
        self.relation(relation, RelationKind::OneToOne, target, foreign_key)
    }

    fn relation(mut self, relation: &str, kind: RelationKind, target: &str, foreign_key: &str) -> Self {
        self.relations.insert(
            relation.to_string(),
            Relation {
                kind,
                target: target.to_string(),
                foreign_key: foreign_key.to_string(),
            },
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key_column(&self) -> &str {
        &self.primary_key
    }

    pub fn get_relation(&self, relation: &str) -> Option<&Relation> {
        self.relations.get(relation)
    }
}

/// Registered entities, keyed by entity name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    entities: HashMap<String, EntitySchema>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, entity: EntitySchema) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Load a schema from a JSON object of entity name to mapping
    pub fn from_json(json: &str) -> Result<Self> {
        let mut schema: Schema = serde_json::from_str(json)?;
        for (name, entity) in schema.entities.iter_mut() {
            if entity.name.is_empty() {
                entity.name = name.clone();
            }
        }
        Ok(schema)
    }

    pub fn get(&self, entity: &str) -> Option<&EntitySchema> {
        self.entities.get(entity)
    }

    pub fn require(&self, entity: &str) -> Result<&EntitySchema> {
        self.get(entity)
            .ok_or_else(|| Error::invalid_query(format!("Unknown entity '{}'", entity)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinKind {
    Inner,
    Left,
    LeftSelect,
}

#[derive(Debug, Clone)]
struct JoinClause {
    kind: JoinKind,
    relation: String,
    alias: String,
    condition: Option<String>,
}

#[derive(Clone, Copy)]
enum Projection {
    Rows,
    Count,
}

/// Renders SQL text for one base entity and executes it on a pool
pub struct SqlBuilder<P, T> {
    pool: P,
    schema: Arc<Schema>,
    entity: String,
    alias: String,
    joins: Vec<JoinClause>,
    selection: Option<String>,
    conditions: Brackets,
    base_filter: Option<String>,
    orders: Vec<String>,
    offset: Option<u64>,
    limit: Option<u64>,
    entity_type: PhantomData<fn() -> T>,
}

impl<P: Clone, T> Clone for SqlBuilder<P, T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            schema: Arc::clone(&self.schema),
            entity: self.entity.clone(),
            alias: self.alias.clone(),
            joins: self.joins.clone(),
            selection: self.selection.clone(),
            conditions: self.conditions.clone(),
            base_filter: self.base_filter.clone(),
            orders: self.orders.clone(),
            offset: self.offset,
            limit: self.limit,
            entity_type: PhantomData,
        }
    }
}

impl<P, T> SqlBuilder<P, T> {
    pub fn new(pool: P, schema: Arc<Schema>, entity: &str, alias: &str) -> Self {
        Self {
            pool,
            schema,
            entity: entity.to_string(),
            alias: alias.to_string(),
            joins: Vec::new(),
            selection: None,
            conditions: Brackets::new(),
            base_filter: None,
            orders: Vec::new(),
            offset: None,
            limit: None,
            entity_type: PhantomData,
        }
    }

    /// A condition that survives `where_` and is ANDed with the others
    pub fn with_base_filter(mut self, condition: impl Into<String>) -> Self {
        self.base_filter = Some(condition.into());
        self
    }

    fn join(&mut self, kind: JoinKind, relation: &str, alias: &str, condition: Option<&str>) {
        self.joins.push(JoinClause {
            kind,
            relation: relation.to_string(),
            alias: alias.to_string(),
            condition: condition.map(str::to_string),
        });
    }

    fn push_order(&mut self, sort: &str, direction: SortDirection, nulls: Option<NullsOrder>) {
        let order = match nulls {
            Some(nulls) => format!("{} {} {}", sort, direction, nulls),
            None => format!("{} {}", sort, direction),
        };
        self.orders.push(order);
    }

    fn render(&self, projection: Projection) -> Result<String> {
        let base = self.schema.require(&self.entity)?;

        let columns = match projection {
            Projection::Rows => self
                .selection
                .clone()
                .unwrap_or_else(|| format!("{}.*", self.alias)),
            Projection::Count => {
                format!("COUNT(DISTINCT {}.{})", self.alias, base.primary_key)
            }
        };

        let mut sql = format!("SELECT {} FROM {} {}", columns, base.table, self.alias);

        let mut aliases: HashMap<&str, &EntitySchema> = HashMap::new();
        aliases.insert(&self.alias, base);
        for join in &self.joins {
            let (target, on) = self.resolve_join(join, &aliases)?;
            let keyword = match join.kind {
                JoinKind::Inner => "INNER JOIN",
                JoinKind::Left | JoinKind::LeftSelect => "LEFT JOIN",
            };
            sql.push_str(&format!(" {} {} {} ON {}", keyword, target.table, join.alias, on));
            aliases.insert(&join.alias, target);
        }

        let mut filters = Vec::new();
        if let Some(base_filter) = &self.base_filter {
            filters.push(base_filter.clone());
        }
        if !self.conditions.is_empty() {
            filters.push(self.conditions.to_sql());
        }
        if !filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&filters.join(" AND "));
        }

        if let Projection::Rows = projection {
            if !self.orders.is_empty() {
                sql.push_str(" ORDER BY ");
                sql.push_str(&self.orders.join(", "));
            }
            if let Some(limit) = self.limit {
                sql.push_str(&format!(" LIMIT {}", limit));
            }
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        Ok(sql)
    }

    fn resolve_join<'s>(
        &'s self,
        join: &JoinClause,
        aliases: &HashMap<&str, &'s EntitySchema>,
    ) -> Result<(&'s EntitySchema, String)> {
        let (target, on) = match join.relation.rsplit_once('.') {
            Some((parent_alias, relation_name)) => {
                let parent = aliases.get(parent_alias).ok_or_else(|| {
                    Error::invalid_query(format!(
                        "Join '{}' references unknown alias '{}'",
                        join.relation, parent_alias
                    ))
                })?;
                let relation = parent.get_relation(relation_name).ok_or_else(|| {
                    Error::invalid_query(format!(
                        "Entity '{}' has no relation '{}'",
                        parent.name, relation_name
                    ))
                })?;
                let target = self.schema.require(&relation.target)?;
                let on = match relation.kind {
                    RelationKind::ManyToOne | RelationKind::OneToOne => format!(
                        "{}.{} = {}.{}",
                        join.alias, target.primary_key, parent_alias, relation.foreign_key
                    ),
                    RelationKind::OneToMany => format!(
                        "{}.{} = {}.{}",
                        join.alias, relation.foreign_key, parent_alias, parent.primary_key
                    ),
                };
                match &join.condition {
                    Some(condition) => (target, format!("{} AND ({})", on, condition)),
                    None => (target, on),
                }
            }
            // A bare entity name carries its whole ON clause
            None => {
                let target = self.schema.require(&join.relation)?;
                let on = join
                    .condition
                    .clone()
                    .unwrap_or_else(|| keyword::TRUE.to_string());
                (target, on)
            }
        };
        Ok((target, on))
    }
}

impl<P, T> WhereBuilder for SqlBuilder<P, T> {
    fn where_(&mut self, condition: &str) {
        self.conditions.where_(condition);
    }

    fn and_where(&mut self, condition: &str) {
        self.conditions.and_where(condition);
    }

    fn or_where(&mut self, condition: &str) {
        self.conditions.or_where(condition);
    }
}

impl<P, T> QueryBuilder for SqlBuilder<P, T>
where
    P: ConnectionPool,
    T: DeserializeOwned + Send + Unpin,
{
    type Entity = T;

    fn alias(&self) -> &str {
        &self.alias
    }

    fn inner_join(&mut self, relation: &str, alias: &str, condition: Option<&str>) {
        self.join(JoinKind::Inner, relation, alias, condition);
    }

    fn left_join(&mut self, relation: &str, alias: &str, condition: Option<&str>) {
        self.join(JoinKind::Left, relation, alias, condition);
    }

    fn left_join_and_select(&mut self, relation: &str, alias: &str, condition: Option<&str>) {
        self.join(JoinKind::LeftSelect, relation, alias, condition);
    }

    fn select(&mut self, selection: &str) {
        self.selection = Some(selection.to_string());
    }

    fn order_by(&mut self, sort: &str, direction: SortDirection, nulls: Option<NullsOrder>) {
        self.orders.clear();
        self.push_order(sort, direction, nulls);
    }

    fn add_order_by(&mut self, sort: &str, direction: SortDirection, nulls: Option<NullsOrder>) {
        self.push_order(sort, direction, nulls);
    }

    fn skip(&mut self, count: u64) {
        self.offset = Some(count);
    }

    fn take(&mut self, count: u64) {
        self.limit = Some(count);
    }

    fn get_query(&self) -> Result<String> {
        self.render(Projection::Rows)
    }

    async fn get_one(mut self) -> Result<Option<T>> {
        if self.limit.is_none() {
            self.limit = Some(1);
        }
        let sql = self.get_query()?;
        debug!(sql = %sql, "get_one");
        self.pool.fetch_optional(&sql).await
    }

    async fn get_many(self) -> Result<Vec<T>> {
        let sql = self.get_query()?;
        debug!(sql = %sql, "get_many");
        self.pool.fetch_all(&sql).await
    }

    async fn get_count(self) -> Result<u64> {
        let sql = self.render(Projection::Count)?;
        debug!(sql = %sql, "get_count");
        self.pool.fetch_count(&sql).await
    }
}
