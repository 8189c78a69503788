use std::sync::Arc;

use linqrs_core::{
    path, CompareOptions, ConnectionPool, EntitySchema, OrderOptions, Query, Repository, Result,
    Schema,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// A pool that prints each statement instead of running it
#[derive(Clone)]
struct PrintingPool;

impl ConnectionPool for PrintingPool {
    async fn fetch_all<T>(&self, sql: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + Unpin,
    {
        println!("fetch_all:      {}", sql);
        Ok(Vec::new())
    }

    async fn fetch_optional<T>(&self, sql: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Unpin,
    {
        println!("fetch_optional: {}", sql);
        Ok(None)
    }

    async fn fetch_count(&self, sql: &str) -> Result<u64> {
        println!("fetch_count:    {}", sql);
        Ok(0)
    }
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Customer {
    id: i64,
    name: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let schema = Arc::new(
        Schema::new()
            .entity(
                EntitySchema::new("Customer", "customers")
                    .many_to_one("region", "Region", "region_id")
                    .one_to_many("orders", "Order", "customer_id"),
            )
            .entity(EntitySchema::new("Region", "regions"))
            .entity(EntitySchema::new("Order", "orders").one_to_many("lines", "OrderLine", "order_id"))
            .entity(EntitySchema::new("OrderLine", "order_lines")),
    );
    let customers: Repository<PrintingPool, Customer> =
        Repository::new(PrintingPool, Arc::clone(&schema), "Customer")?;

    // Compound paths become inner joins; text comparisons ignore case by default
    let by_region = customers
        .get_all()
        .where_(path!(region.name))?
        .equal("Nordics")?
        .and("name")
        .begins_with("A")?
        .order_by_opts("name", OrderOptions::nulls_last())
        .take(10);
    println!("{}", by_region.to_sql()?);
    println!("count = {}", by_region.count().await?);
    let _found = by_region.await?;

    // Conditions right after an include land in the join's ON clause
    let with_big_orders = customers
        .get_all()
        .include("orders")
        .where_("total")?
        .greater_than(1000)?
        .then_include("lines")
        .reset()
        .where_("active")?
        .is_true()?;
    println!("{}", with_big_orders.to_sql()?);

    // Bracketed groups and subqueries
    let named_companies = Query::new(customers.create_query_builder("recent"))
        .select("id")
        .isolated_where(|q| {
            q.where_("name")?
                .contains_opts("inc", CompareOptions::match_case())?
                .or("name")
                .ends_with("ltd")
        })?;
    let vip = customers
        .get_all()
        .where_("id")?
        .in_selected(named_companies)?
        .isolated_and(|q| q.where_(path!(region.code))?.in_(["NO", "SE", "DK"]))?;
    println!("{}", vip.to_sql()?);

    let one = customers.get_by_id(42).await?;
    println!("by id: {:?}", one);

    Ok(())
}
