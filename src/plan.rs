//! Structured query plans: the bounded JSON intermediate representation
//! between natural language and actual execution.
//!
//! Operations are kept as plain strings on purpose: an unknown tag emitted
//! by the model must travel to the executor and fail there as "unsupported
//! operation", not be misreported as a parse failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Engine-tagged plan. The engine is decided once, when the plan is
/// generated by that engine's agent, and never re-derived later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryPlan {
    Mongo(MongoQueryPlan),
    Postgres(PostgresQueryPlan),
}

impl QueryPlan {
    /// Pure shape check. Never touches I/O, never fails.
    pub fn validate(&self) -> bool {
        match self {
            QueryPlan::Mongo(plan) => plan.validate(),
            QueryPlan::Postgres(plan) => plan.validate(),
        }
    }
}

/// Document-store plan. Field names match the JSON contract the prompt
/// builder spells out for the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MongoQueryPlan {
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<Map<String, Value>>,
    #[serde(
        default,
        rename = "aggregatePipeline",
        skip_serializing_if = "Option::is_none"
    )]
    pub aggregate_pipeline: Option<Vec<Map<String, Value>>>,
    #[serde(default, rename = "insertDoc", skip_serializing_if = "Option::is_none")]
    pub insert_doc: Option<Vec<Map<String, Value>>>,
    #[serde(default, rename = "updateDoc", skip_serializing_if = "Option::is_none")]
    pub update_doc: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

impl MongoQueryPlan {
    /// A plan without an operation tag or a target collection must never
    /// reach execution.
    pub fn validate(&self) -> bool {
        !self.operation.is_empty() && !self.collection.is_empty()
    }
}

/// Relational plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostgresQueryPlan {
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Map<String, Value>>,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
}

impl PostgresQueryPlan {
    pub fn validate(&self) -> bool {
        !self.operation.is_empty() && !self.table.is_empty()
    }
}

/// Uniform execution result: ordered rows/documents, or the database-wide
/// overview produced by `show_database`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResultValue {
    Rows(Vec<Map<String, Value>>),
    Overview(DatabaseOverview),
}

/// Result of the `show_database` operation. Serialized key names are part of
/// the caller-facing contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseOverview {
    pub database_name: String,
    pub collections: Vec<CollectionOverview>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionOverview {
    pub collection: String,
    pub document_count: u64,
    pub important_fields: Vec<String>,
    pub sample_data: Vec<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_without_operation_is_rejected() {
        let plan: MongoQueryPlan =
            serde_json::from_value(json!({ "collection": "users", "filter": {} })).unwrap();
        assert!(!plan.validate());
    }

    #[test]
    fn plan_without_target_entity_is_rejected() {
        let mongo: MongoQueryPlan =
            serde_json::from_value(json!({ "operation": "find" })).unwrap();
        assert!(!mongo.validate());

        let pg: PostgresQueryPlan =
            serde_json::from_value(json!({ "operation": "select" })).unwrap();
        assert!(!pg.validate());
    }

    #[test]
    fn minimal_complete_plan_is_accepted() {
        let plan: MongoQueryPlan =
            serde_json::from_value(json!({ "operation": "find", "collection": "users" })).unwrap();
        assert!(plan.validate());
    }

    #[test]
    fn unknown_operation_tag_still_passes_shape_check() {
        // Deeper semantic checks belong to the executor.
        let plan: PostgresQueryPlan =
            serde_json::from_value(json!({ "operation": "truncate", "table": "users" })).unwrap();
        assert!(plan.validate());
    }

    #[test]
    fn where_key_round_trips() {
        let plan: PostgresQueryPlan = serde_json::from_value(json!({
            "operation": "select",
            "table": "users",
            "fields": ["id", "name"],
            "where": "id = 1"
        }))
        .unwrap();
        assert_eq!(plan.where_clause.as_deref(), Some("id = 1"));
        let back = serde_json::to_value(&plan).unwrap();
        assert_eq!(back["where"], "id = 1");
    }

    #[test]
    fn overview_serializes_with_camel_case_keys() {
        let overview = DatabaseOverview {
            database_name: "shop".to_string(),
            collections: vec![CollectionOverview {
                collection: "users".to_string(),
                document_count: 3,
                important_fields: vec!["name".to_string()],
                sample_data: vec![],
            }],
        };
        let value = serde_json::to_value(&overview).unwrap();
        assert_eq!(value["databaseName"], "shop");
        assert_eq!(value["collections"][0]["documentCount"], 3);
        assert_eq!(value["collections"][0]["importantFields"][0], "name");
    }
}
