//! Replaying deferred parts onto a builder

use tracing::debug;

use super::part::{QueryAction, QueryPart};
use crate::builder::{QueryBuilder, WhereBuilder};
use crate::{Error, Result};

/// Replay every part onto `builder`, strictly in list order
pub fn compile<B: QueryBuilder>(parts: &[QueryPart], builder: &mut B) -> Result<()> {
    debug!(parts = parts.len(), alias = builder.alias(), "compiling query parts");

    for part in parts {
        if apply_condition(part, builder)? {
            continue;
        }

        match part.action() {
            QueryAction::InnerJoin => {
                builder.inner_join(part.text(0)?, part.text(1)?, part.optional_text(2)?)
            }
            QueryAction::LeftJoin => {
                builder.left_join(part.text(0)?, part.text(1)?, part.optional_text(2)?)
            }
            QueryAction::LeftJoinAndSelect => {
                builder.left_join_and_select(part.text(0)?, part.text(1)?, part.optional_text(2)?)
            }
            QueryAction::Select => builder.select(part.text(0)?),
            QueryAction::OrderBy => {
                builder.order_by(part.text(0)?, part.direction(1)?, part.nulls(2)?)
            }
            QueryAction::AddOrderBy => {
                builder.add_order_by(part.text(0)?, part.direction(1)?, part.nulls(2)?)
            }
            QueryAction::Skip => builder.skip(part.count(0)?),
            QueryAction::Take => builder.take(part.count(0)?),
            QueryAction::Where | QueryAction::AndWhere | QueryAction::OrWhere => {}
        }
    }

    Ok(())
}

/// Replay condition parts only, e.g. into a bracketed group
pub fn compile_conditions<W: WhereBuilder>(parts: &[QueryPart], builder: &mut W) -> Result<()> {
    for part in parts {
        if !apply_condition(part, builder)? {
            return Err(Error::invalid_query(format!(
                "{:?} cannot be replayed inside a condition group",
                part.action()
            )));
        }
    }
    Ok(())
}

fn apply_condition<W: WhereBuilder>(part: &QueryPart, builder: &mut W) -> Result<bool> {
    match part.action() {
        QueryAction::Where => builder.where_(part.text(0)?),
        QueryAction::AndWhere => builder.and_where(part.text(0)?),
        QueryAction::OrWhere => builder.or_where(part.text(0)?),
        _ => return Ok(false),
    }
    Ok(true)
}
