//! Completing pending conditions with comparison operators

use super::mode::{QueryMode, WhereType};
use super::part::QueryPart;
use super::Query;
use crate::operator::{keyword, Combinator, Operator};
use crate::path::PropertyPath;
use crate::value::{quote, Value};
use crate::{Error, Result};

/// Caller-facing comparison options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// `Some(true)` compares text case-sensitively. Literal text defaults
    /// to case-insensitive; joined properties are only folded when this is
    /// `Some(false)`.
    pub match_case: Option<bool>,
}

impl CompareOptions {
    pub fn match_case() -> Self {
        Self {
            match_case: Some(true),
        }
    }

    pub fn ignore_case() -> Self {
        Self {
            match_case: Some(false),
        }
    }
}

/// How an operand is written before it is appended
#[derive(Debug, Clone, Copy)]
pub(crate) struct Formatting {
    pub begins_with: bool,
    pub ends_with: bool,
    pub quote: bool,
    pub joining: bool,
}

impl Default for Formatting {
    fn default() -> Self {
        Self {
            begins_with: false,
            ends_with: false,
            quote: true,
            joining: false,
        }
    }
}

impl Formatting {
    pub fn unquoted() -> Self {
        Self {
            quote: false,
            ..Self::default()
        }
    }
}

impl<B, F> Query<B, F> {
    pub fn equal(self, value: impl Into<Value>) -> Result<Self> {
        self.equal_opts(value, CompareOptions::default())
    }

    pub fn equal_opts(self, value: impl Into<Value>, options: CompareOptions) -> Result<Self> {
        self.complete_where(Operator::EQ, value.into(), Formatting::default(), options)
    }

    pub fn not_equal(self, value: impl Into<Value>) -> Result<Self> {
        self.not_equal_opts(value, CompareOptions::default())
    }

    pub fn not_equal_opts(self, value: impl Into<Value>, options: CompareOptions) -> Result<Self> {
        self.complete_where(Operator::NEQ, value.into(), Formatting::default(), options)
    }

    pub fn greater_than(self, value: impl Into<Value>) -> Result<Self> {
        self.complete_where(Operator::GT, value.into(), Formatting::default(), CompareOptions::default())
    }

    pub fn greater_than_or_equal(self, value: impl Into<Value>) -> Result<Self> {
        self.complete_where(Operator::GTE, value.into(), Formatting::default(), CompareOptions::default())
    }

    pub fn less_than(self, value: impl Into<Value>) -> Result<Self> {
        self.complete_where(Operator::LT, value.into(), Formatting::default(), CompareOptions::default())
    }

    pub fn less_than_or_equal(self, value: impl Into<Value>) -> Result<Self> {
        self.complete_where(Operator::LTE, value.into(), Formatting::default(), CompareOptions::default())
    }

    /// Compare with an arbitrary operator, e.g. `Operator::custom("ILIKE")`.
    ///
    /// Text operands are quoted and case-folded like [`Query::equal`].
    pub fn compare(self, operator: Operator, value: impl Into<Value>) -> Result<Self> {
        self.compare_opts(operator, value, CompareOptions::default())
    }

    pub fn compare_opts(
        self,
        operator: Operator,
        value: impl Into<Value>,
        options: CompareOptions,
    ) -> Result<Self> {
        self.complete_where(operator, value.into(), Formatting::default(), options)
    }

    pub fn is_null(self) -> Result<Self> {
        self.complete_where(
            Operator::IS,
            Value::from(keyword::NULL),
            Formatting::unquoted(),
            CompareOptions::default(),
        )
    }

    pub fn is_not_null(self) -> Result<Self> {
        self.complete_where(
            Operator::IS,
            Value::from(keyword::NOT_NULL),
            Formatting::unquoted(),
            CompareOptions::default(),
        )
    }

    pub fn is_true(self) -> Result<Self> {
        self.equal(true)
    }

    pub fn is_false(self) -> Result<Self> {
        self.equal(false)
    }

    /// `LIKE 'value%'`
    pub fn begins_with(self, value: impl Into<Value>) -> Result<Self> {
        self.begins_with_opts(value, CompareOptions::default())
    }

    pub fn begins_with_opts(self, value: impl Into<Value>, options: CompareOptions) -> Result<Self> {
        let formatting = Formatting {
            begins_with: true,
            ..Formatting::default()
        };
        self.complete_where(Operator::LIKE, value.into(), formatting, options)
    }

    /// `LIKE '%value%'`
    pub fn contains(self, value: impl Into<Value>) -> Result<Self> {
        self.contains_opts(value, CompareOptions::default())
    }

    pub fn contains_opts(self, value: impl Into<Value>, options: CompareOptions) -> Result<Self> {
        let formatting = Formatting {
            begins_with: true,
            ends_with: true,
            ..Formatting::default()
        };
        self.complete_where(Operator::LIKE, value.into(), formatting, options)
    }

    /// `LIKE '%value'`
    pub fn ends_with(self, value: impl Into<Value>) -> Result<Self> {
        self.ends_with_opts(value, CompareOptions::default())
    }

    pub fn ends_with_opts(self, value: impl Into<Value>, options: CompareOptions) -> Result<Self> {
        let formatting = Formatting {
            ends_with: true,
            ..Formatting::default()
        };
        self.complete_where(Operator::LIKE, value.into(), formatting, options)
    }

    /// `IN (a, b, c)`; list members are compared case-sensitively
    pub fn in_<I, V>(self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = render_list(values);
        self.complete_where(Operator::IN, list, Formatting::unquoted(), CompareOptions::default())
    }

    /// `NOT IN (a, b, c)`
    pub fn not_in<I, V>(self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = render_list(values);
        self.complete_where(Operator::NOT_IN, list, Formatting::unquoted(), CompareOptions::default())
    }

    pub fn equal_joined(self, path: impl Into<PropertyPath>) -> Result<Self> {
        self.complete_joined_where(Operator::EQ, path.into(), CompareOptions::default())
    }

    pub fn equal_joined_opts(self, path: impl Into<PropertyPath>, options: CompareOptions) -> Result<Self> {
        self.complete_joined_where(Operator::EQ, path.into(), options)
    }

    pub fn not_equal_joined(self, path: impl Into<PropertyPath>) -> Result<Self> {
        self.complete_joined_where(Operator::NEQ, path.into(), CompareOptions::default())
    }

    pub fn not_equal_joined_opts(self, path: impl Into<PropertyPath>, options: CompareOptions) -> Result<Self> {
        self.complete_joined_where(Operator::NEQ, path.into(), options)
    }

    pub fn greater_than_joined(self, path: impl Into<PropertyPath>) -> Result<Self> {
        self.complete_joined_where(Operator::GT, path.into(), CompareOptions::default())
    }

    pub fn greater_than_or_equal_joined(self, path: impl Into<PropertyPath>) -> Result<Self> {
        self.complete_joined_where(Operator::GTE, path.into(), CompareOptions::default())
    }

    pub fn less_than_joined(self, path: impl Into<PropertyPath>) -> Result<Self> {
        self.complete_joined_where(Operator::LT, path.into(), CompareOptions::default())
    }

    pub fn less_than_or_equal_joined(self, path: impl Into<PropertyPath>) -> Result<Self> {
        self.complete_joined_where(Operator::LTE, path.into(), CompareOptions::default())
    }

    /// Compare against another property of the active alias.
    ///
    /// The operand is never quoted; it is case-folded only when the caller
    /// asks for a case-insensitive match explicitly.
    fn complete_joined_where(
        self,
        operator: Operator,
        path: PropertyPath,
        options: CompareOptions,
    ) -> Result<Self> {
        let operand = format!("{}.{}", self.last_alias, path);
        let formatting = Formatting {
            quote: false,
            joining: options.match_case.is_some(),
            ..Formatting::default()
        };
        self.complete_where(operator, Value::String(operand), formatting, options)
    }

    /// Attach `<operator> <operand>` to the pending condition.
    pub(crate) fn complete_where(
        mut self,
        operator: Operator,
        value: Value,
        formatting: Formatting,
        options: CompareOptions,
    ) -> Result<Self> {
        if self.mode != QueryMode::Compare {
            return Err(Error::invalid_conditional(
                "no property is awaiting a comparison; start one with where_, and or or",
            ));
        }

        let match_case = options.match_case.unwrap_or(false);

        let mut value = value;
        if formatting.begins_with {
            value = Value::String(format!("{}%", value.render()));
        }
        if formatting.ends_with {
            value = Value::String(format!("%{}", value.render()));
        }

        let is_text = value.is_text();
        let mut operand = if is_text && formatting.quote {
            quote(&value.render())
        } else {
            value.render()
        };

        let index = self.pending_condition_index().ok_or_else(|| {
            Error::invalid_conditional(match self.where_type {
                WhereType::Normal => "no pending where, and or or to compare against",
                WhereType::Joined => "no join with an open condition to compare against",
            })
        })?;

        let part = &mut self.parts[index];
        let trailing = part.pop_text()?;

        // Only the newest property reference is folded; earlier fragments of
        // a join condition are already complete comparisons.
        let (head, reference) = match trailing.rfind(' ') {
            Some(split) => trailing.split_at(split + 1),
            None => ("", trailing.as_str()),
        };
        let mut condition = head.to_string();

        if is_text && (formatting.quote || formatting.joining) && !match_case {
            operand = if formatting.joining {
                format!("{}({})", keyword::LOWER, operand)
            } else {
                operand.to_lowercase()
            };
            condition.push_str(&format!("{}({})", keyword::LOWER, reference));
        } else {
            condition.push_str(reference);
        }

        condition.push_str(&format!(" {} {}", operator, operand));
        part.push_text(condition);

        self.mode = QueryMode::Get;
        Ok(self)
    }

    /// Newest part a comparison attaches to under the current where type
    fn pending_condition_index(&self) -> Option<usize> {
        let where_type = self.where_type;
        self.parts.iter().rposition(|part| match where_type {
            WhereType::Normal => part.action().is_condition(),
            WhereType::Joined => part.has_join_condition(),
        })
    }

    /// Open an ON condition on the join that introduced the active alias
    pub(crate) fn create_join_condition(&mut self, property: &str) -> Result<()> {
        let index = self
            .join_index(&self.last_alias)
            .ok_or_else(|| Error::invalid_conditional_join(self.last_alias.as_str()))?;

        if self.parts[index].has_join_condition() {
            self.add_join_condition(index, property, Combinator::And);
        } else {
            let condition = format!("{}.{}", self.last_alias, property);
            self.parts[index].push_text(condition);
        }
        Ok(())
    }

    /// Extend the open ON condition of `parts[index]`
    pub(crate) fn add_join_condition(&mut self, index: usize, property: &str, combinator: Combinator) {
        let suffix = format!(" {} {}.{}", combinator, self.last_alias, property);
        let part: &mut QueryPart = &mut self.parts[index];
        if let Some(condition) = part.trailing_text_mut() {
            condition.push_str(&suffix);
        }
    }

    /// Join part that introduced `alias`
    pub(crate) fn join_index(&self, alias: &str) -> Option<usize> {
        self.parts
            .iter()
            .rposition(|part| part.action().is_join() && part.joined_alias() == Some(alias))
    }
}

fn render_list<I, V>(values: I) -> Value
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let members: Vec<String> = values
        .into_iter()
        .map(|v| v.into().render_list_member())
        .collect();
    Value::String(format!("({})", members.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use crate::query::part::QueryAction;
    use crate::testing::RecordingBuilder;
    use chrono::{TimeZone, Utc};

    fn query() -> Query<RecordingBuilder> {
        Query::new(RecordingBuilder::new("entity"))
    }

    fn last_condition(q: &Query<RecordingBuilder>) -> String {
        let part = q.parts().last().unwrap();
        let last = part.params().len() - 1;
        part.text(last).unwrap().to_string()
    }

    #[test]
    fn test_single_segment_where_has_no_joins() {
        let q = query().where_("age").unwrap().equal(30).unwrap();
        assert_eq!(q.parts().len(), 1);
        assert_eq!(q.parts()[0].action(), QueryAction::Where);
        assert_eq!(last_condition(&q), "entity.age = 30");
        assert_eq!(q.mode(), QueryMode::Get);
    }

    #[test]
    fn test_text_comparison_folds_case_by_default() {
        let q = query().where_("name").unwrap().equal("ABC").unwrap();
        assert_eq!(last_condition(&q), "LOWER(entity.name) = 'abc'");
    }

    #[test]
    fn test_match_case_disables_folding() {
        let q = query()
            .where_("name")
            .unwrap()
            .equal_opts("ABC", CompareOptions::match_case())
            .unwrap();
        assert_eq!(last_condition(&q), "entity.name = 'ABC'");
    }

    #[test]
    fn test_single_quotes_are_doubled() {
        let q = query()
            .where_("name")
            .unwrap()
            .equal_opts("O'Brien", CompareOptions::match_case())
            .unwrap();
        assert_eq!(last_condition(&q), "entity.name = 'O''Brien'");
    }

    #[test]
    fn test_wildcards() {
        let q = query().where_("name").unwrap().begins_with("x").unwrap();
        assert_eq!(last_condition(&q), "LOWER(entity.name) LIKE 'x%'");

        let q = query().where_("name").unwrap().ends_with("x").unwrap();
        assert_eq!(last_condition(&q), "LOWER(entity.name) LIKE '%x'");

        let q = query().where_("name").unwrap().contains("x").unwrap();
        assert_eq!(last_condition(&q), "LOWER(entity.name) LIKE '%x%'");
    }

    #[test]
    fn test_null_and_boolean_operands_are_unquoted() {
        let q = query().where_("deletedAt").unwrap().is_null().unwrap();
        assert_eq!(last_condition(&q), "entity.deletedAt IS NULL");

        let q = query().where_("deletedAt").unwrap().is_not_null().unwrap();
        assert_eq!(last_condition(&q), "entity.deletedAt IS NOT NULL");

        let q = query().where_("active").unwrap().is_true().unwrap();
        assert_eq!(last_condition(&q), "entity.active = true");

        let q = query().where_("active").unwrap().is_false().unwrap();
        assert_eq!(last_condition(&q), "entity.active = false");
    }

    #[test]
    fn test_datetime_operand_is_iso_literal() {
        let since = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();
        let q = query().where_("createdAt").unwrap().greater_than_or_equal(since).unwrap();
        assert_eq!(
            last_condition(&q),
            "entity.createdAt >= '2021-06-01T12:00:00.000Z'"
        );
    }

    #[test]
    fn test_in_lists_quote_text_without_folding() {
        let q = query().where_("code").unwrap().in_(["A", "b'c"]).unwrap();
        assert_eq!(last_condition(&q), "entity.code IN ('A', 'b''c')");

        let q = query().where_("id").unwrap().not_in([1, 2, 3]).unwrap();
        assert_eq!(last_condition(&q), "entity.id NOT IN (1, 2, 3)");
    }

    #[test]
    fn test_comparison_without_where_fails() {
        let err = query().equal(1).err().unwrap();
        assert!(matches!(err, Error::InvalidConditional { .. }));

        let err = query().join("orders").is_null().err().unwrap();
        assert!(matches!(err, Error::InvalidConditional { .. }));
    }

    #[test]
    fn test_comparison_skips_interleaved_parts() {
        let q = query()
            .where_("name")
            .unwrap()
            .order_by("name")
            .take(5)
            .equal("x")
            .unwrap();
        assert_eq!(q.parts()[0].text(0).unwrap(), "LOWER(entity.name) = 'x'");
        assert_eq!(q.parts()[1].action(), QueryAction::OrderBy);
        assert_eq!(q.parts()[2].action(), QueryAction::Take);
    }

    #[test]
    fn test_compound_where_binds_to_last_alias() {
        let q = query()
            .where_(path!(customer.address.city))
            .unwrap()
            .equal_opts("Oslo", CompareOptions::match_case())
            .unwrap();

        let actions: Vec<_> = q.parts().iter().map(|p| p.action()).collect();
        assert_eq!(
            actions,
            vec![QueryAction::InnerJoin, QueryAction::InnerJoin, QueryAction::Where]
        );
        assert_eq!(q.parts()[0].text(1).unwrap(), "entity_customer");
        assert_eq!(q.parts()[1].text(1).unwrap(), "entity_customer_address");
        assert_eq!(last_condition(&q), "entity_customer_address.city = 'Oslo'");
        assert_eq!(q.last_alias(), "entity");
    }

    #[test]
    fn test_joined_where_lands_on_join_condition() {
        let q = query()
            .join("orders")
            .where_("total")
            .unwrap()
            .greater_than(100)
            .unwrap();
        assert_eq!(q.parts().len(), 1);
        assert_eq!(q.where_type(), WhereType::Joined);
        assert_eq!(last_condition(&q), "entity_orders.total > 100");
    }

    #[test]
    fn test_joined_and_or_extend_join_condition() {
        let q = query()
            .include("orders")
            .where_("total")
            .unwrap()
            .greater_than(100)
            .unwrap()
            .and("status")
            .equal("open")
            .unwrap()
            .or("priority")
            .equal(1)
            .unwrap();
        assert_eq!(q.parts().len(), 1);
        assert_eq!(
            last_condition(&q),
            "entity_orders.total > 100 AND LOWER(entity_orders.status) = 'open' OR entity_orders.priority = 1"
        );
    }

    #[test]
    fn test_joined_comparison_against_property() {
        let q = query()
            .join("orders")
            .where_("shippedAt")
            .unwrap()
            .greater_than_joined("orderedAt")
            .unwrap();
        assert_eq!(
            last_condition(&q),
            "entity_orders.shippedAt > entity_orders.orderedAt"
        );
    }

    #[test]
    fn test_joined_comparison_folds_only_on_request() {
        let q = query()
            .where_("email")
            .unwrap()
            .equal_joined_opts("backupEmail", CompareOptions::ignore_case())
            .unwrap();
        assert_eq!(
            last_condition(&q),
            "LOWER(entity.email) = LOWER(entity.backupEmail)"
        );

        let q = query()
            .where_("email")
            .unwrap()
            .not_equal_joined("backupEmail")
            .unwrap();
        assert_eq!(last_condition(&q), "entity.email != entity.backupEmail");
    }

    #[test]
    fn test_from_where_extends_true_condition() {
        let q = query()
            .from("Invoice")
            .where_("number")
            .unwrap()
            .equal(7)
            .unwrap();
        assert_eq!(last_condition(&q), "true AND Invoice.number = 7");
    }

    #[test]
    fn test_joined_where_on_base_alias_without_join_fails() {
        let err = query()
            .join("orders")
            .using_base_type()
            .where_("total")
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidConditionalJoin { ref alias } if alias == "entity"));
    }

    #[test]
    fn test_second_comparison_on_completed_condition_fails() {
        let err = query()
            .where_("a")
            .unwrap()
            .equal(1)
            .unwrap()
            .equal(2)
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidConditional { .. }));

        let err = query()
            .join("orders")
            .where_("total")
            .unwrap()
            .greater_than(1)
            .unwrap()
            .less_than(5)
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidConditional { .. }));
    }

    #[test]
    fn test_custom_operator_comparison() {
        let q = query()
            .where_("name")
            .unwrap()
            .compare_opts(Operator::custom("ILIKE"), "an%", CompareOptions::match_case())
            .unwrap();
        assert_eq!(last_condition(&q), "entity.name ILIKE 'an%'");

        let q = query()
            .where_("tags")
            .unwrap()
            .compare(Operator::custom("@>"), 3)
            .unwrap();
        assert_eq!(last_condition(&q), "entity.tags @> 3");
    }

    #[test]
    fn test_comparison_operators() {
        type Compare = fn(Query<RecordingBuilder>) -> Result<Query<RecordingBuilder>>;
        let cases: [(Compare, &str); 10] = [
            (|q| q.greater_than(5), "entity.n > 5"),
            (|q| q.greater_than_or_equal(5), "entity.n >= 5"),
            (|q| q.less_than(5), "entity.n < 5"),
            (|q| q.less_than_or_equal(5), "entity.n <= 5"),
            (|q| q.not_equal(5), "entity.n != 5"),
            (|q| q.equal_joined("m"), "entity.n = entity.m"),
            (|q| q.greater_than_joined("m"), "entity.n > entity.m"),
            (|q| q.greater_than_or_equal_joined("m"), "entity.n >= entity.m"),
            (|q| q.less_than_joined("m"), "entity.n < entity.m"),
            (|q| q.less_than_or_equal_joined("m"), "entity.n <= entity.m"),
        ];

        for (compare, expected) in cases {
            let q = compare(query().where_("n").unwrap()).unwrap();
            assert_eq!(last_condition(&q), expected);
        }
    }

    #[test]
    fn test_joined_comparison_against_base_alias_in_on_clause() {
        let q = query()
            .include("orders")
            .where_("currency")
            .unwrap()
            .using_base_type()
            .equal_joined("currency")
            .unwrap();
        assert_eq!(q.parts().len(), 1);
        assert_eq!(last_condition(&q), "entity_orders.currency = entity.currency");
    }
}
