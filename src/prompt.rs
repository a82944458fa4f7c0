//! Instruction prompt builders.
//!
//! Pure functions from (user prompt, normalized schema) to one instruction
//! string: the entity/field listing, the literal plan-shape contract the
//! model must mimic, and the field-selection policy. No I/O, no randomness;
//! identical inputs always produce identical output.

use std::fmt::Write;

use crate::schema::NormalizedSchema;

/// Render the collection listing for a document-store schema, annotating
/// reference-shaped fields with their guessed target collection.
fn render_mongo_entities(schema: &NormalizedSchema) -> String {
    let mut out = String::new();
    for (collection, entity) in schema {
        let fields = entity
            .fields
            .iter()
            .map(|(name, info)| match (&info.field_type[..], &info.reference) {
                ("ObjectId", Some(target)) => format!("{name} (refers to {target})"),
                _ => name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "- {collection}: {fields}");
    }
    out
}

/// Render the table listing for a relational schema with native types.
fn render_postgres_entities(schema: &NormalizedSchema) -> String {
    let mut out = String::new();
    for (table, entity) in schema {
        let fields = entity
            .fields
            .iter()
            .map(|(name, info)| format!("{name} ({})", info.field_type))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "- {table}: {fields}");
    }
    out
}

/// Build the full instruction for the document-store plan generator.
pub fn build_mongo_prompt(prompt: &str, schema: &NormalizedSchema) -> String {
    format!(
        r#"You are an AI assistant that converts natural language into MongoDB structured query plans.

Available collections and their fields (with references):
{entities}
Important notes:
- Fields with type "ObjectId" and a "ref" property indicate references to other collections.
- To join referenced collections, use MongoDB aggregation stage "$lookup".
- Use "$lookup" only when the user query implies a relationship (e.g., "users who posted gigs").
- If no join is needed, use "find" operations.
- Always validate field and collection names exist in the schema.
- Do not hallucinate collections or fields.
- Output only valid JSON representing a query plan.

The query plan format:
{{
  "operation": "find" | "aggregate" | "insert" | "update" | "delete" | "show_database",
  "collection": "string",
  "filter": {{ ... }},
  "projection": {{ "field1": 1, "field2": 1 }},
  "options": {{ ... }},
  "aggregatePipeline": [ ... ],
  "insertDoc": [ ... ],
  "updateDoc": {{ ... }}
}}

User prompt: {prompt}

When the user asks to show all the data of a particular collection, select only meaningful fields: for "get all users" show only name, email and at most 3-4 fields in total, by priority.

When the user asks to "show whole database" or "show all collections":
- Set operation to "show_database"
- Set collection to any collection name (it will be ignored)
- Do not set any other fields

When the user asks to "show all" or "show whole table" for a specific collection:
- Set operation to "find"
- Set filter to {{}} (empty object to get all documents)
- Set projection to {{}} (empty object to let the system handle field selection)
- Do not specify any fields in projection

For other queries:
- Use inclusion projection ("field": 1) to explicitly specify which fields to include
- Do not mix inclusion and exclusion in the same projection
- Do not include _id in the projection unless specifically requested
- Do not show fields with large text like description or bio
- Do not show images

Respond ONLY with the query plan JSON, no explanations."#,
        entities = render_mongo_entities(schema),
    )
}

/// Build the full instruction for the relational plan generator.
pub fn build_postgres_prompt(prompt: &str, schema: &NormalizedSchema) -> String {
    format!(
        r#"You are an AI assistant that converts natural language into PostgreSQL structured query plans.

Available tables and their fields:
{entities}
Important notes:
- Always validate table and field names exist in the schema.
- Do not hallucinate tables or fields.
- Output only valid JSON representing a query plan.
- Use SQL WHERE syntax for filters (e.g., "id = 1 AND name = 'John'").
- For SELECT queries:
  - Be precise and selective with field selection
  - When user asks to "show all users" or similar general queries:
    - Select only 2-3 most important identifying fields (e.g., id and name/username)
    - DO NOT use SELECT * or include all fields
    - Exclude sensitive fields, large text fields, and binary data
  - Only include additional fields if specifically requested by the user
  - If user asks for specific fields, include only those fields
- For INSERT/UPDATE, specify "values" as an object of field-value pairs.
- For DELETE/UPDATE, specify "where" as a SQL condition string.

The query plan format:
{{
  "operation": "select" | "insert" | "update" | "delete",
  "table": "string",
  "fields": [ ... ],
  "values": {{ ... }},
  "where": "..."
}}

User prompt: {prompt}

Respond ONLY with the query plan JSON, no explanations."#,
        entities = render_postgres_entities(schema),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntitySchema, FieldInfo};

    fn sample_schema() -> NormalizedSchema {
        let mut users = EntitySchema::default();
        users
            .fields
            .insert("name".to_string(), FieldInfo::of_type("string"));
        users
            .fields
            .insert("email".to_string(), FieldInfo::of_type("string"));
        let mut author_id = FieldInfo::of_type("ObjectId");
        author_id.reference = Some("authors".to_string());
        users.fields.insert("authorId".to_string(), author_id);

        let mut schema = NormalizedSchema::new();
        schema.insert("users".to_string(), users);
        schema
    }

    #[test]
    fn identical_inputs_produce_identical_output() {
        let schema = sample_schema();
        let a = build_mongo_prompt("show me all users", &schema);
        let b = build_mongo_prompt("show me all users", &schema);
        assert_eq!(a, b);

        let c = build_postgres_prompt("show me all users", &schema);
        let d = build_postgres_prompt("show me all users", &schema);
        assert_eq!(c, d);
    }

    #[test]
    fn reference_fields_are_annotated() {
        let prompt = build_mongo_prompt("anything", &sample_schema());
        assert!(prompt.contains("authorId (refers to authors)"));
    }

    #[test]
    fn postgres_listing_carries_native_types() {
        let prompt = build_postgres_prompt("anything", &sample_schema());
        assert!(prompt.contains("name (string)"));
    }

    #[test]
    fn mongo_prompt_spells_out_show_database_contract() {
        let prompt = build_mongo_prompt("show whole database", &sample_schema());
        assert!(prompt.contains("show_database"));
        assert!(prompt.contains("Do not mix inclusion and exclusion"));
    }

    #[test]
    fn user_prompt_is_embedded() {
        let prompt = build_postgres_prompt("count the gigs", &sample_schema());
        assert!(prompt.contains("User prompt: count the gigs"));
    }
}
