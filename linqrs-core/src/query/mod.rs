//! The deferred, fluent query.
//!
//! A [`Query`] records every builder operation as a [`QueryPart`] and only
//! replays them onto its [`QueryBuilder`] when a terminal operation runs.
//! Compound property paths are resolved into chained joins with aliases of
//! the form `parent_relation`, and each comparison is attached to the part
//! that is still waiting for one.

mod alias;
pub mod compile;
mod condition;
pub mod mode;
pub mod part;

use std::collections::HashSet;
use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::mem;

use futures::future::BoxFuture;
use tracing::debug;

use crate::builder::{Brackets, NullsOrder, QueryBuilder, SortDirection};
use crate::operator::{Combinator, Operator};
use crate::path::PropertyPath;
use crate::value::Value;
use crate::{Error, Result};

pub use compile::{compile, compile_conditions};
pub use condition::CompareOptions;
pub use mode::{QueryMode, WhereType};
pub use part::{QueryAction, QueryParam, QueryPart};

use condition::Formatting;

/// Terminal marker: resolve to at most one entity
#[derive(Debug, Clone, Copy, Default)]
pub struct One;

/// Terminal marker: resolve to every matching entity
#[derive(Debug, Clone, Copy, Default)]
pub struct Many;

/// How a query's builder is executed once compiled
pub trait Fetch<B: QueryBuilder> {
    type Output: Send;

    fn run(builder: B) -> impl Future<Output = Result<Self::Output>> + Send;
}

impl<B: QueryBuilder> Fetch<B> for One {
    type Output = Option<B::Entity>;

    fn run(builder: B) -> impl Future<Output = Result<Self::Output>> + Send {
        builder.get_one()
    }
}

impl<B: QueryBuilder> Fetch<B> for Many {
    type Output = Vec<B::Entity>;

    fn run(builder: B) -> impl Future<Output = Result<Self::Output>> + Send {
        builder.get_many()
    }
}

/// Ordering modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderOptions {
    /// `Some(true)` sorts nulls first, `Some(false)` last, `None` leaves the
    /// database default
    pub nulls_first: Option<bool>,
}

impl OrderOptions {
    pub fn nulls_first() -> Self {
        Self {
            nulls_first: Some(true),
        }
    }

    pub fn nulls_last() -> Self {
        Self {
            nulls_first: Some(false),
        }
    }
}

/// The scope handed to isolated condition callbacks
pub type Conditions = Query<(), Many>;

/// A deferred query over builder `B`, resolving through marker `F`
pub struct Query<B, F = Many> {
    builder: B,
    initial_alias: String,
    last_alias: String,
    mode: QueryMode,
    where_type: WhereType,
    parts: Vec<QueryPart>,
    include_alias_history: HashSet<String>,
    selected: Option<String>,
    fetch: PhantomData<fn() -> F>,
}

impl<B: Clone, F> Clone for Query<B, F> {
    fn clone(&self) -> Self {
        Self {
            builder: self.builder.clone(),
            initial_alias: self.initial_alias.clone(),
            last_alias: self.last_alias.clone(),
            mode: self.mode,
            where_type: self.where_type,
            parts: self.parts.clone(),
            include_alias_history: self.include_alias_history.clone(),
            selected: self.selected.clone(),
            fetch: PhantomData,
        }
    }
}

impl<B: QueryBuilder> Query<B, Many> {
    /// Wrap a freshly created builder; its alias becomes the base alias
    pub fn new(builder: B) -> Self {
        let alias = builder.alias().to_string();
        Self::with_history(builder, alias, HashSet::new())
    }
}

impl Conditions {
    fn scoped(initial_alias: String, history: HashSet<String>) -> Self {
        Self::with_history((), initial_alias, history)
    }
}

impl<B, F> Query<B, F> {
    fn with_history(builder: B, initial_alias: String, history: HashSet<String>) -> Self {
        Self {
            builder,
            last_alias: initial_alias.clone(),
            initial_alias,
            mode: QueryMode::Get,
            where_type: WhereType::Normal,
            parts: Vec::new(),
            include_alias_history: history,
            selected: None,
            fetch: PhantomData,
        }
    }

    pub fn parts(&self) -> &[QueryPart] {
        &self.parts
    }

    /// Alias-qualified property recorded by [`Query::select`]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn initial_alias(&self) -> &str {
        &self.initial_alias
    }

    pub fn last_alias(&self) -> &str {
        &self.last_alias
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    pub fn where_type(&self) -> WhereType {
        self.where_type
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// Resolve to a single entity
    pub fn one(self) -> Query<B, One> {
        self.with_fetch()
    }

    /// Resolve to every matching entity
    pub fn many(self) -> Query<B, Many> {
        self.with_fetch()
    }

    fn with_fetch<G>(self) -> Query<B, G> {
        Query {
            builder: self.builder,
            initial_alias: self.initial_alias,
            last_alias: self.last_alias,
            mode: self.mode,
            where_type: self.where_type,
            parts: self.parts,
            include_alias_history: self.include_alias_history,
            selected: self.selected,
            fetch: PhantomData,
        }
    }

    /// Start a condition on `path`.
    ///
    /// Outside a join chain the condition is a top-level filter on the base
    /// entity. Directly after a join it becomes part of that join's ON
    /// clause instead; call [`Query::reset`] first to filter the base entity.
    pub fn where_(mut self, path: impl Into<PropertyPath>) -> Result<Self> {
        let path = path.into();

        if self.mode == QueryMode::Get {
            self.where_type = WhereType::Normal;
            self.last_alias = self.initial_alias.clone();
            self.mode = QueryMode::Compare;

            let leaf = self.join_relations(&path, QueryAction::InnerJoin);
            let condition = format!("{}.{}", self.last_alias, leaf);
            self.parts
                .push(QueryPart::new(QueryAction::Where, vec![condition.into()]));
            self.last_alias = self.initial_alias.clone();
        } else {
            let restore = self.last_alias.clone();
            self.mode = QueryMode::Compare;

            let leaf = self.join_relations(&path, QueryAction::InnerJoin);
            self.where_type = WhereType::Joined;
            self.create_join_condition(&leaf)?;
            self.last_alias = restore;
        }

        Ok(self)
    }

    /// Continue the current condition with AND; relations are inner-joined
    pub fn and(self, path: impl Into<PropertyPath>) -> Self {
        self.chain_condition(path.into(), Combinator::And)
    }

    /// Continue the current condition with OR; relations are left-joined
    pub fn or(self, path: impl Into<PropertyPath>) -> Self {
        self.chain_condition(path.into(), Combinator::Or)
    }

    fn chain_condition(mut self, path: PropertyPath, combinator: Combinator) -> Self {
        let (join_action, condition_action) = match combinator {
            Combinator::And => (QueryAction::InnerJoin, QueryAction::AndWhere),
            Combinator::Or => (QueryAction::LeftJoin, QueryAction::OrWhere),
        };

        let restore = self.last_alias.clone();
        self.mode = QueryMode::Compare;
        let leaf = self.join_relations(&path, join_action);

        let open_join = match self.where_type {
            WhereType::Joined => match self.join_index(&self.last_alias) {
                Some(index) => Some(index).filter(|&index| self.parts[index].has_join_condition()),
                // After using_base_type the active alias has no join of its own.
                None => self.parts.iter().rposition(QueryPart::has_join_condition),
            },
            WhereType::Normal => None,
        };

        match open_join {
            Some(index) => self.add_join_condition(index, &leaf, combinator),
            None => {
                self.where_type = WhereType::Normal;
                let condition = format!("{}.{}", self.last_alias, leaf);
                self.parts
                    .push(QueryPart::new(condition_action, vec![condition.into()]));
            }
        }

        self.last_alias = restore;
        self
    }

    /// Record the projected property used when this query is embedded as a
    /// subquery. Outside a join chain it refers to the base entity.
    pub fn select(mut self, path: impl Into<PropertyPath>) -> Self {
        let path = path.into();
        let from_initial = self.mode == QueryMode::Get;
        self.selected = Some(self.qualify(&path, from_initial));
        self
    }

    pub fn order_by(self, path: impl Into<PropertyPath>) -> Self {
        self.order_by_opts(path, OrderOptions::default())
    }

    pub fn order_by_opts(self, path: impl Into<PropertyPath>, options: OrderOptions) -> Self {
        self.complete_order_by(QueryAction::OrderBy, path.into(), SortDirection::Asc, options)
    }

    pub fn order_by_descending(self, path: impl Into<PropertyPath>) -> Self {
        self.order_by_descending_opts(path, OrderOptions::default())
    }

    pub fn order_by_descending_opts(self, path: impl Into<PropertyPath>, options: OrderOptions) -> Self {
        self.complete_order_by(QueryAction::OrderBy, path.into(), SortDirection::Desc, options)
    }

    pub fn then_by(self, path: impl Into<PropertyPath>) -> Self {
        self.then_by_opts(path, OrderOptions::default())
    }

    pub fn then_by_opts(self, path: impl Into<PropertyPath>, options: OrderOptions) -> Self {
        self.complete_order_by(QueryAction::AddOrderBy, path.into(), SortDirection::Asc, options)
    }

    pub fn then_by_descending(self, path: impl Into<PropertyPath>) -> Self {
        self.then_by_descending_opts(path, OrderOptions::default())
    }

    pub fn then_by_descending_opts(self, path: impl Into<PropertyPath>, options: OrderOptions) -> Self {
        self.complete_order_by(QueryAction::AddOrderBy, path.into(), SortDirection::Desc, options)
    }

    fn complete_order_by(
        mut self,
        action: QueryAction,
        path: PropertyPath,
        direction: SortDirection,
        options: OrderOptions,
    ) -> Self {
        let sort = self.qualify(&path, false);
        let mut params = vec![QueryParam::Text(sort), QueryParam::Direction(direction)];
        if let Some(nulls) = NullsOrder::from_nulls_first(options.nulls_first) {
            params.push(QueryParam::Nulls(nulls));
        }
        self.parts.push(QueryPart::new(action, params));
        self
    }

    /// Alias-qualify `path`, joining its relations without disturbing the
    /// active alias or mode.
    fn qualify(&mut self, path: &PropertyPath, from_initial: bool) -> String {
        let restore = self.last_alias.clone();
        let mode = self.mode;
        if from_initial {
            self.last_alias = self.initial_alias.clone();
        }

        let leaf = self.join_relations(path, QueryAction::InnerJoin);
        let qualified = format!("{}.{}", self.last_alias, leaf);

        self.last_alias = restore;
        self.mode = mode;
        qualified
    }

    /// Skip `count` rows; zero is ignored
    pub fn skip(mut self, count: u64) -> Self {
        if count > 0 {
            self.parts
                .push(QueryPart::new(QueryAction::Skip, vec![QueryParam::Count(count)]));
        }
        self
    }

    /// Limit to `count` rows; zero is ignored
    pub fn take(mut self, count: u64) -> Self {
        if count > 0 {
            self.parts
                .push(QueryPart::new(QueryAction::Take, vec![QueryParam::Count(count)]));
        }
        self
    }

    /// Leave the join chain so further conditions target the base entity
    pub fn reset(mut self) -> Self {
        self.last_alias = self.initial_alias.clone();
        self.where_type = WhereType::Normal;
        self.mode = QueryMode::Get;
        self
    }

    /// Make the base entity the active alias without closing an open join
    /// condition
    pub fn using_base_type(mut self) -> Self {
        self.last_alias = self.initial_alias.clone();
        self
    }

    /// Replace the conditions with a bracketed group
    pub fn isolated_where<C>(self, conditions: C) -> Result<Self>
    where
        C: FnOnce(Conditions) -> Result<Conditions>,
    {
        self.isolated(conditions, QueryAction::Where)
    }

    /// AND a bracketed group onto the conditions
    pub fn isolated_and<C>(self, conditions: C) -> Result<Self>
    where
        C: FnOnce(Conditions) -> Result<Conditions>,
    {
        self.isolated(conditions, QueryAction::AndWhere)
    }

    /// OR a bracketed group onto the conditions
    pub fn isolated_or<C>(self, conditions: C) -> Result<Self>
    where
        C: FnOnce(Conditions) -> Result<Conditions>,
    {
        self.isolated(conditions, QueryAction::OrWhere)
    }

    fn isolated<C>(mut self, conditions: C, action: QueryAction) -> Result<Self>
    where
        C: FnOnce(Conditions) -> Result<Conditions>,
    {
        let history = mem::take(&mut self.include_alias_history);
        let scope = conditions(Conditions::scoped(self.initial_alias.clone(), history))?;
        self.include_alias_history = scope.include_alias_history;

        // Joins cannot live inside brackets; they go straight to the outer query.
        let (condition_parts, other_parts): (Vec<_>, Vec<_>) = scope
            .parts
            .into_iter()
            .partition(|part| part.action().is_condition());

        debug!(
            conditions = condition_parts.len(),
            merged = other_parts.len(),
            action = ?action,
            "merging isolated condition group"
        );

        self.parts.extend(other_parts);

        if !condition_parts.is_empty() {
            let mut group = Brackets::new();
            compile_conditions(&condition_parts, &mut group)?;
            self.parts
                .push(QueryPart::new(action, vec![group.to_sql().into()]));
        }

        self.mode = QueryMode::Get;
        Ok(self)
    }

    /// `IN (<inner query>)` against the pending condition
    pub fn in_selected<I, G>(self, inner: Query<I, G>) -> Result<Self>
    where
        I: QueryBuilder,
    {
        self.complete_subquery(Operator::IN, inner)
    }

    /// `NOT IN (<inner query>)` against the pending condition
    pub fn not_in_selected<I, G>(self, inner: Query<I, G>) -> Result<Self>
    where
        I: QueryBuilder,
    {
        self.complete_subquery(Operator::NOT_IN, inner)
    }

    fn complete_subquery<I, G>(self, operator: Operator, inner: Query<I, G>) -> Result<Self>
    where
        I: QueryBuilder,
    {
        let text = inner.into_subquery()?;
        self.complete_where(
            operator,
            Value::String(format!("({})", text)),
            Formatting::unquoted(),
            CompareOptions::default(),
        )
    }
}

impl<B: QueryBuilder, F> Query<B, F> {
    /// Compile onto the builder and render its query text with the selected
    /// property as the projection
    pub fn into_subquery(mut self) -> Result<String> {
        let selection = self.selected.take().ok_or_else(|| {
            Error::invalid_query("a subquery needs a selected property; call select() first")
        })?;

        let mut parts = Vec::with_capacity(self.parts.len() + 1);
        parts.push(QueryPart::new(QueryAction::Select, vec![selection.into()]));
        parts.append(&mut self.parts);

        compile(&parts, &mut self.builder)?;
        self.builder.get_query()
    }

    /// Render the query text without consuming the query
    pub fn to_sql(&self) -> Result<String> {
        let mut builder = self.builder.clone();
        compile(&self.parts, &mut builder)?;
        builder.get_query()
    }

    /// Count matching rows on a compiled copy of the builder.
    ///
    /// The query itself is left untouched and can still be fetched.
    pub fn count(&self) -> impl Future<Output = Result<u64>> + Send {
        let mut builder = self.builder.clone();
        let compiled = compile(&self.parts, &mut builder);
        async move {
            compiled?;
            builder.get_count().await
        }
    }
}

impl<B: QueryBuilder, F: Fetch<B>> Query<B, F> {
    /// Compile every part onto the builder and execute it
    pub async fn fetch(self) -> Result<F::Output> {
        let Query {
            mut builder, parts, ..
        } = self;
        compile(&parts, &mut builder)?;
        F::run(builder).await
    }

    /// Fetch, then hand the outcome to `resolved` or `rejected`
    pub async fn then<R, OnOk, OnErr>(self, resolved: OnOk, rejected: OnErr) -> R
    where
        OnOk: FnOnce(F::Output) -> R,
        OnErr: FnOnce(Error) -> R,
    {
        match self.fetch().await {
            Ok(output) => resolved(output),
            Err(err) => rejected(err),
        }
    }
}

impl<B, F> IntoFuture for Query<B, F>
where
    B: QueryBuilder + 'static,
    F: Fetch<B> + 'static,
{
    type Output = Result<F::Output>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.fetch())
    }
}
