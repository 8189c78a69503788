//! Query execution and connection pool interface

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::future::Future;

/// Trait for database connection pools.
///
/// Queries arrive fully rendered: operands are already inlined as literals,
/// so no parameters are bound.
pub trait ConnectionPool: Send + Sync + Clone {
    /// Execute a query that returns multiple rows
    fn fetch_all<T>(&self, sql: &str) -> impl Future<Output = Result<Vec<T>>> + Send
    where
        T: DeserializeOwned + Send + Unpin;

    /// Execute a query that returns an optional row
    fn fetch_optional<T>(&self, sql: &str) -> impl Future<Output = Result<Option<T>>> + Send
    where
        T: DeserializeOwned + Send + Unpin;

    /// Execute a query whose first column of the first row is a count
    fn fetch_count(&self, sql: &str) -> impl Future<Output = Result<u64>> + Send;
}

#[cfg(any(feature = "postgres", feature = "sqlite"))]
mod rows {
    use crate::{Error, Result};
    use serde::Serialize;
    use sqlx::{Column, Row, TypeInfo, ValueRef};

    /// Convert a row into a JSON object keyed by column name
    pub(super) fn row_to_json<R, F>(row: &R, decode_column: F) -> Result<serde_json::Value>
    where
        R: Row,
        usize: sqlx::ColumnIndex<R>,
        F: Fn(&R, usize, &str) -> Result<serde_json::Value>,
    {
        let mut object = serde_json::Map::with_capacity(row.columns().len());
        for column in row.columns() {
            let index = column.ordinal();
            let raw = row.try_get_raw(index)?;
            let value = if raw.is_null() {
                serde_json::Value::Null
            } else {
                let type_name = raw.type_info().name().to_string();
                decode_column(row, index, &type_name).map_err(|err| match err {
                    Error::Decode { type_name, .. } => Error::decode(column.name(), type_name),
                    other => other,
                })?
            };
            object.insert(column.name().to_string(), value);
        }
        Ok(serde_json::Value::Object(object))
    }

    /// Decode one column as `T` and serialise it to JSON
    pub(super) fn column_json<'r, R, T>(row: &'r R, index: usize) -> Result<serde_json::Value>
    where
        R: Row,
        usize: sqlx::ColumnIndex<R>,
        T: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database> + Serialize,
    {
        let value: T = row.try_get(index)?;
        Ok(serde_json::to_value(value)?)
    }
}

#[cfg_attr(not(any(feature = "postgres", feature = "sqlite")), allow(dead_code))]
fn count_from_i64(count: i64) -> Result<u64> {
    u64::try_from(count).map_err(|_| Error::invalid_query(format!("Negative row count {}", count)))
}

/// SQLx connection pool wrapper
#[cfg(feature = "postgres")]
pub mod postgres {
    use super::rows::{column_json, row_to_json};
    use super::*;
    use sqlx::postgres::PgRow;
    use sqlx::PgPool;
    use tracing::debug;

    /// PostgreSQL connection pool wrapper
    #[derive(Clone)]
    pub struct PostgresPool {
        inner: PgPool,
    }

    impl PostgresPool {
        /// Create a new PostgreSQL pool from a connection string
        pub async fn new(database_url: &str) -> Result<Self> {
            let pool = PgPool::connect(database_url).await?;
            Ok(Self { inner: pool })
        }

        /// Create from an existing PgPool
        pub fn from_pool(pool: PgPool) -> Self {
            Self { inner: pool }
        }
    }

    impl ConnectionPool for PostgresPool {
        async fn fetch_all<T>(&self, sql: &str) -> Result<Vec<T>>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            debug!(sql, "fetch_all");
            let rows = sqlx::query(sql).fetch_all(&self.inner).await?;

            let mut results = Vec::with_capacity(rows.len());
            for row in rows {
                let json_value = row_to_json(&row, decode_column)?;
                let item: T = serde_json::from_value(json_value)?;
                results.push(item);
            }
            Ok(results)
        }

        async fn fetch_optional<T>(&self, sql: &str) -> Result<Option<T>>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            debug!(sql, "fetch_optional");
            if let Some(row) = sqlx::query(sql).fetch_optional(&self.inner).await? {
                let json_value = row_to_json(&row, decode_column)?;
                let item: T = serde_json::from_value(json_value)?;
                Ok(Some(item))
            } else {
                Ok(None)
            }
        }

        async fn fetch_count(&self, sql: &str) -> Result<u64> {
            debug!(sql, "fetch_count");
            let count: i64 = sqlx::query_scalar(sql).fetch_one(&self.inner).await?;
            count_from_i64(count)
        }
    }

    fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<serde_json::Value> {
        match type_name {
            "BOOL" => column_json::<_, bool>(row, index),
            "INT2" => column_json::<_, i16>(row, index),
            "INT4" => column_json::<_, i32>(row, index),
            "INT8" => column_json::<_, i64>(row, index),
            "FLOAT4" => column_json::<_, f32>(row, index),
            "FLOAT8" => column_json::<_, f64>(row, index),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => column_json::<_, String>(row, index),
            "TIMESTAMPTZ" => column_json::<_, chrono::DateTime<chrono::Utc>>(row, index),
            "TIMESTAMP" => column_json::<_, chrono::NaiveDateTime>(row, index),
            "DATE" => column_json::<_, chrono::NaiveDate>(row, index),
            "JSON" | "JSONB" => column_json::<_, serde_json::Value>(row, index),
            #[cfg(feature = "uuid-support")]
            "UUID" => column_json::<_, uuid::Uuid>(row, index),
            #[cfg(feature = "decimal-support")]
            "NUMERIC" => column_json::<_, rust_decimal::Decimal>(row, index),
            other => Err(Error::decode(index.to_string(), other)),
        }
    }
}

/// SQLite connection pool wrapper
#[cfg(feature = "sqlite")]
pub mod sqlite {
    use super::rows::{column_json, row_to_json};
    use super::*;
    use sqlx::sqlite::SqliteRow;
    use sqlx::SqlitePool;
    use tracing::debug;

    /// SQLite connection pool wrapper
    #[derive(Clone)]
    pub struct SqlitePoolWrapper {
        inner: SqlitePool,
    }

    impl SqlitePoolWrapper {
        pub async fn new(database_url: &str) -> Result<Self> {
            let pool = SqlitePool::connect(database_url).await?;
            Ok(Self { inner: pool })
        }

        pub fn from_pool(pool: SqlitePool) -> Self {
            Self { inner: pool }
        }
    }

    impl ConnectionPool for SqlitePoolWrapper {
        async fn fetch_all<T>(&self, sql: &str) -> Result<Vec<T>>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            debug!(sql, "fetch_all");
            let rows = sqlx::query(sql).fetch_all(&self.inner).await?;
            rows.iter()
                .map(|row| Ok(serde_json::from_value(row_to_json(row, decode_column)?)?))
                .collect()
        }

        async fn fetch_optional<T>(&self, sql: &str) -> Result<Option<T>>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            debug!(sql, "fetch_optional");
            match sqlx::query(sql).fetch_optional(&self.inner).await? {
                Some(row) => Ok(Some(serde_json::from_value(row_to_json(&row, decode_column)?)?)),
                None => Ok(None),
            }
        }

        async fn fetch_count(&self, sql: &str) -> Result<u64> {
            debug!(sql, "fetch_count");
            let count: i64 = sqlx::query_scalar(sql).fetch_one(&self.inner).await?;
            count_from_i64(count)
        }
    }

    // SQLite reports the storage class of each value rather than the
    // declared column type.
    fn decode_column(row: &SqliteRow, index: usize, type_name: &str) -> Result<serde_json::Value> {
        match type_name {
            "BOOLEAN" => column_json::<_, bool>(row, index),
            "INTEGER" => column_json::<_, i64>(row, index),
            "REAL" => column_json::<_, f64>(row, index),
            "TEXT" => column_json::<_, String>(row, index),
            "DATETIME" => column_json::<_, chrono::DateTime<chrono::Utc>>(row, index),
            "DATE" => column_json::<_, chrono::NaiveDate>(row, index),
            other => Err(Error::decode(index.to_string(), other)),
        }
    }

}
