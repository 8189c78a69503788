//! Relation navigation: turning relation paths into chained, deduplicated joins

use tracing::trace;

use super::mode::QueryMode;
use super::part::{QueryAction, QueryPart};
use super::Query;
use crate::operator::keyword;
use crate::path::{JoinTarget, PropertyPath};

impl<B, F> Query<B, F> {
    /// INNER JOIN a relation of the base entity
    pub fn join(self, target: impl Into<JoinTarget>) -> Self {
        let parent = self.initial_alias.clone();
        self.join_target(target.into(), parent, QueryAction::InnerJoin)
    }

    /// LEFT JOIN a relation of the base entity
    pub fn join_also(self, target: impl Into<JoinTarget>) -> Self {
        let parent = self.initial_alias.clone();
        self.join_target(target.into(), parent, QueryAction::LeftJoin)
    }

    /// INNER JOIN a relation of the most recently joined entity
    pub fn then_join(self, target: impl Into<JoinTarget>) -> Self {
        let parent = self.last_alias.clone();
        self.join_target(target.into(), parent, QueryAction::InnerJoin)
    }

    /// LEFT JOIN a relation of the most recently joined entity
    pub fn then_join_also(self, target: impl Into<JoinTarget>) -> Self {
        let parent = self.last_alias.clone();
        self.join_target(target.into(), parent, QueryAction::LeftJoin)
    }

    /// Eagerly load a relation of the base entity
    pub fn include(self, target: impl Into<JoinTarget>) -> Self {
        let parent = self.initial_alias.clone();
        self.join_target(target.into(), parent, QueryAction::LeftJoinAndSelect)
    }

    /// Eagerly load a relation of the most recently joined entity
    pub fn then_include(self, target: impl Into<JoinTarget>) -> Self {
        let parent = self.last_alias.clone();
        self.join_target(target.into(), parent, QueryAction::LeftJoinAndSelect)
    }

    /// Join an entity by name, aliased by that name.
    ///
    /// Calling it again for the same entity re-enters the existing join so
    /// further conditions land on its ON clause.
    pub fn from(mut self, entity: &str) -> Self {
        let alias = entity.to_string();
        self.last_alias = alias.clone();

        if self.include_alias_history.insert(alias.clone()) {
            self.parts.push(QueryPart::new(
                QueryAction::InnerJoin,
                vec![entity.into(), alias.into(), keyword::TRUE.into()],
            ));
        } else {
            trace!(alias = %self.last_alias, "entity already joined");
        }

        self.set_join_if_not_compare();
        self
    }

    fn join_target(mut self, target: JoinTarget, parent: String, action: QueryAction) -> Self {
        let mut parent = parent;
        for segment in target.segments() {
            self.join_segment(&parent, segment, action);
            parent = self.last_alias.clone();
        }
        self
    }

    /// Join every relation segment of `path` starting from the active alias,
    /// returning the leaf property name.
    pub(crate) fn join_relations(&mut self, path: &PropertyPath, action: QueryAction) -> String {
        for relation in path.relations() {
            let parent = self.last_alias.clone();
            self.join_segment(&parent, relation, action);
        }
        path.leaf().to_string()
    }

    fn join_segment(&mut self, parent: &str, segment: &str, action: QueryAction) {
        self.set_join_if_not_compare();

        let alias = format!("{}_{}", parent, segment);
        if self.include_alias_history.insert(alias.clone()) {
            self.parts.push(QueryPart::new(
                action,
                vec![format!("{}.{}", parent, segment).into(), alias.clone().into()],
            ));
        } else {
            trace!(alias = %alias, "relation already joined");
        }

        self.last_alias = alias;
    }

    // A join made to reach a compared property must not leave Compare.
    fn set_join_if_not_compare(&mut self) {
        if self.mode != QueryMode::Compare {
            self.mode = QueryMode::Join;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::path;
    use crate::query::part::QueryAction;
    use crate::query::{Query, QueryMode};
    use crate::testing::RecordingBuilder;

    fn query() -> Query<RecordingBuilder> {
        Query::new(RecordingBuilder::new("entity"))
    }

    fn joins(query: &Query<RecordingBuilder>) -> Vec<(QueryAction, String, String)> {
        query
            .parts()
            .iter()
            .filter(|p| p.action().is_join())
            .map(|p| {
                (
                    p.action(),
                    p.text(0).unwrap().to_string(),
                    p.text(1).unwrap().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_join_uses_child_alias() {
        let q = query().join("orders");
        assert_eq!(
            joins(&q),
            vec![(
                QueryAction::InnerJoin,
                "entity.orders".to_string(),
                "entity_orders".to_string()
            )]
        );
        assert_eq!(q.last_alias(), "entity_orders");
        assert_eq!(q.mode(), QueryMode::Join);
    }

    #[test]
    fn test_then_include_chains_from_last_alias() {
        let q = query().include("orders").then_include("items").then_join_also("product");
        assert_eq!(
            joins(&q),
            vec![
                (
                    QueryAction::LeftJoinAndSelect,
                    "entity.orders".to_string(),
                    "entity_orders".to_string()
                ),
                (
                    QueryAction::LeftJoinAndSelect,
                    "entity_orders.items".to_string(),
                    "entity_orders_items".to_string()
                ),
                (
                    QueryAction::LeftJoin,
                    "entity_orders_items.product".to_string(),
                    "entity_orders_items_product".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_then_join_inner_joins_from_last_alias() {
        let q = query().join_also("customer").then_join("address");
        assert_eq!(
            joins(&q)[1],
            (
                QueryAction::InnerJoin,
                "entity_customer.address".to_string(),
                "entity_customer_address".to_string()
            )
        );
        assert_eq!(q.last_alias(), "entity_customer_address");
        assert_eq!(q.mode(), QueryMode::Join);
    }

    #[test]
    fn test_path_target_joins_each_segment() {
        let q = query().join_also(path!(customer.address));
        assert_eq!(
            joins(&q),
            vec![
                (
                    QueryAction::LeftJoin,
                    "entity.customer".to_string(),
                    "entity_customer".to_string()
                ),
                (
                    QueryAction::LeftJoin,
                    "entity_customer.address".to_string(),
                    "entity_customer_address".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_rejoining_is_idempotent_but_moves_alias() {
        let q = query()
            .include("orders")
            .then_include("items")
            .include("orders");
        assert_eq!(q.parts().len(), 2);
        assert_eq!(q.last_alias(), "entity_orders");
    }

    #[test]
    fn test_from_joins_entity_once_with_open_condition() {
        let q = query().from("Invoice").reset().from("Invoice");
        assert_eq!(q.parts().len(), 1);
        let part = &q.parts()[0];
        assert_eq!(part.action(), QueryAction::InnerJoin);
        assert_eq!(part.text(0).unwrap(), "Invoice");
        assert_eq!(part.text(1).unwrap(), "Invoice");
        assert_eq!(part.text(2).unwrap(), "true");
        assert_eq!(q.last_alias(), "Invoice");
    }

    #[test]
    fn test_join_relations_returns_leaf() {
        let mut q = query();
        let leaf = q.join_relations(&path!(name), QueryAction::InnerJoin);
        assert_eq!(leaf, "name");
        assert!(q.parts().is_empty());

        let leaf = q.join_relations(&path!(customer.address.city), QueryAction::InnerJoin);
        assert_eq!(leaf, "city");
        assert_eq!(q.parts().len(), 2);
        assert_eq!(q.last_alias(), "entity_customer_address");
    }
}
