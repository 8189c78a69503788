//! Test doubles shared by unit tests

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;

use crate::builder::{NullsOrder, QueryBuilder, SortDirection, WhereBuilder};
use crate::executor::ConnectionPool;
use crate::{Error, Result};

/// Records every capability call as a line of text
#[derive(Debug, Clone, Default)]
pub struct RecordingBuilder {
    alias: String,
    pub calls: Vec<String>,
    rows: Vec<serde_json::Value>,
    should_fail: bool,
}

impl RecordingBuilder {
    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            ..Self::default()
        }
    }

    pub fn with_rows(mut self, rows: Vec<serde_json::Value>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    fn join(&mut self, kind: &str, relation: &str, alias: &str, condition: Option<&str>) {
        match condition {
            Some(condition) => self
                .calls
                .push(format!("{}({}, {}, {})", kind, relation, alias, condition)),
            None => self.calls.push(format!("{}({}, {})", kind, relation, alias)),
        }
    }

    fn order(&mut self, kind: &str, sort: &str, direction: SortDirection, nulls: Option<NullsOrder>) {
        match nulls {
            Some(nulls) => self
                .calls
                .push(format!("{}({} {} {})", kind, sort, direction, nulls)),
            None => self.calls.push(format!("{}({} {})", kind, sort, direction)),
        }
    }

    fn check(&self) -> Result<()> {
        if self.should_fail {
            Err(Error::invalid_query("Mock execution failure"))
        } else {
            Ok(())
        }
    }
}

impl WhereBuilder for RecordingBuilder {
    fn where_(&mut self, condition: &str) {
        self.calls.push(format!("where({})", condition));
    }

    fn and_where(&mut self, condition: &str) {
        self.calls.push(format!("and_where({})", condition));
    }

    fn or_where(&mut self, condition: &str) {
        self.calls.push(format!("or_where({})", condition));
    }
}

impl QueryBuilder for RecordingBuilder {
    type Entity = serde_json::Value;

    fn alias(&self) -> &str {
        &self.alias
    }

    fn inner_join(&mut self, relation: &str, alias: &str, condition: Option<&str>) {
        self.join("inner_join", relation, alias, condition);
    }

    fn left_join(&mut self, relation: &str, alias: &str, condition: Option<&str>) {
        self.join("left_join", relation, alias, condition);
    }

    fn left_join_and_select(&mut self, relation: &str, alias: &str, condition: Option<&str>) {
        self.join("left_join_and_select", relation, alias, condition);
    }

    fn select(&mut self, selection: &str) {
        self.calls.push(format!("select({})", selection));
    }

    fn order_by(&mut self, sort: &str, direction: SortDirection, nulls: Option<NullsOrder>) {
        self.order("order_by", sort, direction, nulls);
    }

    fn add_order_by(&mut self, sort: &str, direction: SortDirection, nulls: Option<NullsOrder>) {
        self.order("add_order_by", sort, direction, nulls);
    }

    fn skip(&mut self, count: u64) {
        self.calls.push(format!("skip({})", count));
    }

    fn take(&mut self, count: u64) {
        self.calls.push(format!("take({})", count));
    }

    fn get_query(&self) -> Result<String> {
        Ok(self.calls.join(" | "))
    }

    async fn get_one(self) -> Result<Option<Self::Entity>> {
        self.check()?;
        Ok(self.rows.into_iter().next())
    }

    async fn get_many(self) -> Result<Vec<Self::Entity>> {
        self.check()?;
        Ok(self.rows)
    }

    async fn get_count(self) -> Result<u64> {
        self.check()?;
        Ok(self.calls.len() as u64)
    }
}

/// Connection pool double serving canned JSON rows and recording SQL
#[derive(Debug, Clone, Default)]
pub struct MockPool {
    rows: Vec<serde_json::Value>,
    count: u64,
    should_fail: bool,
    executed: Arc<Mutex<Vec<String>>>,
}

impl MockPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn with_rows(mut self, rows: Vec<serde_json::Value>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// SQL text received so far, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().map(|sql| sql.clone()).unwrap_or_default()
    }

    fn record(&self, sql: &str) -> Result<()> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        if self.should_fail {
            Err(Error::invalid_query("Mock connection failure"))
        } else {
            Ok(())
        }
    }
}

impl ConnectionPool for MockPool {
    async fn fetch_all<T>(&self, sql: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + Unpin,
    {
        self.record(sql)?;
        Ok(serde_json::from_value(serde_json::Value::Array(self.rows.clone()))?)
    }

    async fn fetch_optional<T>(&self, sql: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Unpin,
    {
        self.record(sql)?;
        match self.rows.first() {
            Some(row) => Ok(Some(serde_json::from_value(row.clone())?)),
            None => Ok(None),
        }
    }

    async fn fetch_count(&self, sql: &str) -> Result<u64> {
        self.record(sql)?;
        Ok(self.count)
    }
}
