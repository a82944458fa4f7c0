//! Document-store agent (MongoDB).
//!
//! Owns one lazily-opened client per connection string. Introspection merges
//! a bounded sample of documents per collection into the normalized schema;
//! execution dispatches on the plan's operation tag and applies the
//! importance-tiered field selection when the plan under-specifies its
//! projection.

use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::FindOptions;
use mongodb::{Client, Collection, Database};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::database_name;
use crate::error::{AgentError, AgentResult};
use crate::fields::important_fields;
use crate::plan::{CollectionOverview, DatabaseOverview, MongoQueryPlan, ResultValue};
use crate::schema::{infer::merge_document, EntitySchema, NormalizedSchema};

/// Documents sampled per collection during introspection.
const INTROSPECTION_SAMPLE: i64 = 10;

/// Rows returned per collection in a database overview.
const OVERVIEW_SAMPLE: i64 = 5;

#[derive(Debug)]
pub struct MongoAgent {
    url: String,
    db_name: String,
    client: Mutex<Option<Client>>,
}

impl MongoAgent {
    pub fn new(url: &str) -> AgentResult<Self> {
        Ok(Self {
            url: url.to_string(),
            db_name: database_name(url)?,
            client: Mutex::new(None),
        })
    }

    /// Handle to the agent's database, opening the client on first use. The
    /// client is shared by every call on this agent; no call opens a second
    /// independent connection.
    async fn database(&self) -> AgentResult<Database> {
        let mut guard = self.client.lock().await;
        let client = match guard.as_ref() {
            Some(client) => client.clone(),
            None => {
                let client = Client::with_uri_str(&self.url)
                    .await
                    .map_err(AgentError::from_mongo)?;
                *guard = Some(client.clone());
                client
            }
        };
        Ok(client.database(&self.db_name))
    }

    /// Sample every collection and merge the samples into a normalized
    /// schema. Fails whole if the database is unreachable.
    pub async fn introspect(&self) -> AgentResult<NormalizedSchema> {
        let db = self.database().await?;
        let names = db
            .list_collection_names()
            .await
            .map_err(AgentError::from_mongo)?;

        let mut schema = NormalizedSchema::new();
        for name in names {
            let cursor = db
                .collection::<Document>(&name)
                .find(doc! {})
                .limit(INTROSPECTION_SAMPLE)
                .await
                .map_err(AgentError::from_mongo)?;
            let docs: Vec<Document> = cursor.try_collect().await.map_err(AgentError::from_mongo)?;

            let mut entity = EntitySchema::default();
            for document in &docs {
                merge_document(&mut entity, document);
            }
            schema.insert(name, entity);
        }
        info!(
            database = %self.db_name,
            collections = schema.len(),
            "introspected document store"
        );
        Ok(schema)
    }

    pub async fn execute(&self, plan: &MongoQueryPlan) -> AgentResult<ResultValue> {
        debug!(operation = %plan.operation, collection = %plan.collection, "executing plan");
        match plan.operation.as_str() {
            "find" => self.execute_find(plan).await,
            "aggregate" => self.execute_aggregate(plan).await,
            "insert" => self.execute_insert(plan).await,
            "update" => self.execute_update(plan).await,
            "delete" => self.execute_delete(plan).await,
            "show_database" => self.execute_show_database().await,
            other => Err(AgentError::UnsupportedOperation(other.to_string())),
        }
    }

    async fn execute_find(&self, plan: &MongoQueryPlan) -> AgentResult<ResultValue> {
        let db = self.database().await?;
        let collection = db.collection::<Document>(&plan.collection);

        let filter = match &plan.filter {
            Some(filter) => fuzzy_filter(filter)?,
            None => Document::new(),
        };
        let projection = match &plan.projection {
            Some(projection) if !projection.is_empty() => map_to_document(projection)?,
            _ => derived_projection(&collection).await?,
        };

        let mut options = FindOptions::default();
        options.projection = Some(projection);
        apply_find_options(&mut options, plan.options.as_ref())?;

        let cursor = collection
            .find(filter)
            .with_options(options)
            .await
            .map_err(AgentError::from_mongo)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(AgentError::from_mongo)?;
        Ok(ResultValue::Rows(docs.into_iter().map(doc_to_json).collect()))
    }

    async fn execute_aggregate(&self, plan: &MongoQueryPlan) -> AgentResult<ResultValue> {
        let db = self.database().await?;
        let collection = db.collection::<Document>(&plan.collection);

        // The pipeline runs verbatim; it is assumed to shape its own output.
        let pipeline: Vec<Document> = plan
            .aggregate_pipeline
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(map_to_document)
            .collect::<AgentResult<_>>()?;

        let cursor = collection
            .aggregate(pipeline)
            .await
            .map_err(AgentError::from_mongo)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(AgentError::from_mongo)?;
        Ok(ResultValue::Rows(docs.into_iter().map(doc_to_json).collect()))
    }

    async fn execute_insert(&self, plan: &MongoQueryPlan) -> AgentResult<ResultValue> {
        let db = self.database().await?;
        let collection = db.collection::<Document>(&plan.collection);

        let docs: Vec<Document> = plan
            .insert_doc
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(map_to_document)
            .collect::<AgentResult<_>>()?;

        let result = collection
            .insert_many(docs)
            .await
            .map_err(AgentError::from_mongo)?;

        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);

        let mut summary = Map::new();
        summary.insert("insertedCount".to_string(), Value::from(ids.len() as u64));
        summary.insert(
            "insertedIds".to_string(),
            Value::Array(
                ids.into_iter()
                    .map(|(_, id)| id.into_relaxed_extjson())
                    .collect(),
            ),
        );
        Ok(ResultValue::Rows(vec![summary]))
    }

    async fn execute_update(&self, plan: &MongoQueryPlan) -> AgentResult<ResultValue> {
        let db = self.database().await?;
        let collection = db.collection::<Document>(&plan.collection);

        let filter = match &plan.filter {
            Some(filter) => map_to_document(filter)?,
            None => Document::new(),
        };
        let update = match &plan.update_doc {
            Some(update) => map_to_document(update)?,
            None => Document::new(),
        };

        let result = collection
            .update_many(filter, update)
            .await
            .map_err(AgentError::from_mongo)?;

        let mut summary = Map::new();
        summary.insert("matchedCount".to_string(), Value::from(result.matched_count));
        summary.insert(
            "modifiedCount".to_string(),
            Value::from(result.modified_count),
        );
        Ok(ResultValue::Rows(vec![summary]))
    }

    async fn execute_delete(&self, plan: &MongoQueryPlan) -> AgentResult<ResultValue> {
        let db = self.database().await?;
        let collection = db.collection::<Document>(&plan.collection);

        let filter = match &plan.filter {
            Some(filter) => map_to_document(filter)?,
            None => Document::new(),
        };

        let result = collection
            .delete_many(filter)
            .await
            .map_err(AgentError::from_mongo)?;

        let mut summary = Map::new();
        summary.insert("deletedCount".to_string(), Value::from(result.deleted_count));
        Ok(ResultValue::Rows(vec![summary]))
    }

    /// Database-wide overview: per collection, the document count, up to 4
    /// important fields, and a small sample restricted to those fields.
    async fn execute_show_database(&self) -> AgentResult<ResultValue> {
        let db = self.database().await?;
        let names = db
            .list_collection_names()
            .await
            .map_err(AgentError::from_mongo)?;

        let mut collections = Vec::with_capacity(names.len());
        for name in names {
            let collection = db.collection::<Document>(&name);
            let document_count = collection
                .count_documents(doc! {})
                .await
                .map_err(AgentError::from_mongo)?;

            let sample = collection
                .find_one(doc! {})
                .await
                .map_err(AgentError::from_mongo)?;
            let important = match &sample {
                Some(document) => important_fields(document.keys().map(String::as_str)),
                None => Vec::new(),
            };

            let mut projection = Document::new();
            for field in &important {
                projection.insert(field.clone(), 1);
            }
            projection.insert("_id", 0);

            let cursor = collection
                .find(doc! {})
                .projection(projection)
                .limit(OVERVIEW_SAMPLE)
                .await
                .map_err(AgentError::from_mongo)?;
            let docs: Vec<Document> = cursor.try_collect().await.map_err(AgentError::from_mongo)?;

            collections.push(CollectionOverview {
                collection: name,
                document_count,
                important_fields: important,
                sample_data: docs.into_iter().map(doc_to_json).collect(),
            });
        }

        Ok(ResultValue::Overview(DatabaseOverview {
            database_name: self.db_name.clone(),
            collections,
        }))
    }

    /// Release the client, if one was ever opened.
    pub async fn close(&self) {
        if let Some(client) = self.client.lock().await.take() {
            client.shutdown().await;
        }
    }
}

/// Rewrite string-valued filter fields into case-insensitive substring
/// matches; non-string values pass through unchanged. Fuzzy matching over
/// precision is deliberate for `find`.
pub(crate) fn fuzzy_filter(filter: &Map<String, Value>) -> AgentResult<Document> {
    let mut out = Document::new();
    for (key, value) in filter {
        match value {
            Value::String(s) => {
                out.insert(key.clone(), doc! { "$regex": s.clone(), "$options": "i" });
            }
            other => {
                out.insert(key.clone(), json_to_bson(other)?);
            }
        }
    }
    Ok(out)
}

/// Importance-tiered projection for plans with no projection of their own,
/// computed from one sampled document.
async fn derived_projection(collection: &Collection<Document>) -> AgentResult<Document> {
    let sample = collection
        .find_one(doc! {})
        .await
        .map_err(AgentError::from_mongo)?;
    let mut projection = Document::new();
    if let Some(document) = sample {
        for field in important_fields(document.keys().map(String::as_str)) {
            projection.insert(field, 1);
        }
        projection.insert("_id", 0);
    }
    Ok(projection)
}

/// Carry over the execution options a plan may legitimately set.
fn apply_find_options(
    options: &mut FindOptions,
    extra: Option<&Map<String, Value>>,
) -> AgentResult<()> {
    let Some(extra) = extra else {
        return Ok(());
    };
    if let Some(limit) = extra.get("limit").and_then(Value::as_i64) {
        options.limit = Some(limit);
    }
    if let Some(skip) = extra.get("skip").and_then(Value::as_u64) {
        options.skip = Some(skip);
    }
    if let Some(Value::Object(sort)) = extra.get("sort") {
        options.sort = Some(map_to_document(sort)?);
    }
    Ok(())
}

pub(crate) fn json_to_bson(value: &Value) -> AgentResult<Bson> {
    mongodb::bson::to_bson(value)
        .map_err(|e| AgentError::Execution(format!("cannot convert plan value to BSON: {e}")))
}

pub(crate) fn map_to_document(map: &Map<String, Value>) -> AgentResult<Document> {
    mongodb::bson::to_document(map)
        .map_err(|e| AgentError::Execution(format!("cannot convert plan value to BSON: {e}")))
}

/// Relaxed extended-JSON rendering of a result document.
fn doc_to_json(doc: Document) -> Map<String, Value> {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn string_filters_become_case_insensitive_substring_matches() {
        let filter = as_map(json!({ "name": "bob" }));
        let rewritten = fuzzy_filter(&filter).unwrap();
        let condition = rewritten.get_document("name").unwrap();
        assert_eq!(condition.get_str("$regex").unwrap(), "bob");
        assert_eq!(condition.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn non_string_filters_pass_through_unchanged() {
        let filter = as_map(json!({ "age": { "$gt": 30 }, "active": true }));
        let rewritten = fuzzy_filter(&filter).unwrap();
        assert_eq!(
            rewritten.get_document("age").unwrap().get_i64("$gt").ok(),
            Some(30)
        );
        assert!(rewritten.get_bool("active").unwrap());
    }

    #[test]
    fn plan_documents_convert_to_bson() {
        let update = as_map(json!({ "$set": { "status": "done" } }));
        let doc = map_to_document(&update).unwrap();
        assert_eq!(
            doc.get_document("$set").unwrap().get_str("status").unwrap(),
            "done"
        );
    }

    #[test]
    fn find_options_carry_limit_skip_and_sort() {
        let mut options = FindOptions::default();
        let extra = as_map(json!({ "limit": 20, "skip": 5, "sort": { "name": 1 } }));
        apply_find_options(&mut options, Some(&extra)).unwrap();
        assert_eq!(options.limit, Some(20));
        assert_eq!(options.skip, Some(5));
        assert_eq!(
            options.sort.as_ref().unwrap().get_i64("name").ok(),
            Some(1)
        );
    }

    #[tokio::test]
    async fn unsupported_operation_fails_before_touching_the_database() {
        let agent = MongoAgent::new("mongodb://localhost:27017/shop").unwrap();
        let plan = MongoQueryPlan {
            operation: "count".to_string(),
            collection: "users".to_string(),
            ..Default::default()
        };
        let err = agent.execute(&plan).await.unwrap_err();
        assert!(matches!(err, AgentError::UnsupportedOperation(op) if op == "count"));
    }
}
