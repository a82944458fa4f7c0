//! Plan generation: prompt in, validated structured query plan out.
//!
//! One pipeline per engine: enrich the user prompt with prior context, build
//! the instruction, call the injected [`LlmClient`], strip formatting
//! artifacts, parse as JSON, shape-check. Every failure is terminal for the
//! request; retries, if any, belong to the caller.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::context::ChatContext;
use crate::error::{AgentError, AgentResult};
use crate::llm::{clean_model_output, LlmClient};
use crate::plan::{MongoQueryPlan, PostgresQueryPlan};
use crate::prompt::{build_mongo_prompt, build_postgres_prompt};
use crate::schema::NormalizedSchema;

const MONGO_SYSTEM_PROMPT: &str =
    "You translate natural language into MongoDB structured query plans.";
const POSTGRES_SYSTEM_PROMPT: &str =
    "You translate natural language into PostgreSQL structured query plans.";

/// Prepend a rendered summary of prior turns to the user prompt.
fn enrich_with_context(prompt: &str, context: Option<&ChatContext>) -> String {
    match context {
        Some(ctx) if !ctx.is_empty() => format!(
            "Previous conversation context:\n{}\n\nCurrent question: {}",
            ctx.summary(),
            prompt
        ),
        _ => prompt.to_string(),
    }
}

/// Parse cleaned model output into a plan, preserving the raw text when the
/// reply is not valid JSON for the expected shape.
fn parse_plan<P: DeserializeOwned>(raw: &str) -> AgentResult<P> {
    let cleaned = clean_model_output(raw);
    serde_json::from_str(cleaned).map_err(|e| AgentError::Generation {
        message: e.to_string(),
        raw: raw.to_string(),
    })
}

/// Generate a validated document-store plan.
pub async fn generate_mongo_plan(
    llm: &dyn LlmClient,
    prompt: &str,
    schema: &NormalizedSchema,
    context: Option<&ChatContext>,
) -> AgentResult<MongoQueryPlan> {
    let enriched = enrich_with_context(prompt, context);
    let instruction = build_mongo_prompt(&enriched, schema);
    debug!(
        provider = llm.provider_name(),
        model = llm.model_name(),
        "generating mongo plan"
    );

    let raw = llm
        .chat_json(MONGO_SYSTEM_PROMPT, &instruction)
        .await
        .map_err(|e| AgentError::Llm(e.to_string()))?;

    let plan: MongoQueryPlan = parse_plan(&raw)?;
    if !plan.validate() {
        return Err(AgentError::InvalidPlan(
            "missing operation or collection".to_string(),
        ));
    }
    Ok(plan)
}

/// Generate a validated relational plan.
pub async fn generate_postgres_plan(
    llm: &dyn LlmClient,
    prompt: &str,
    schema: &NormalizedSchema,
    context: Option<&ChatContext>,
) -> AgentResult<PostgresQueryPlan> {
    let enriched = enrich_with_context(prompt, context);
    let instruction = build_postgres_prompt(&enriched, schema);
    debug!(
        provider = llm.provider_name(),
        model = llm.model_name(),
        "generating postgres plan"
    );

    let raw = llm
        .chat_json(POSTGRES_SYSTEM_PROMPT, &instruction)
        .await
        .map_err(|e| AgentError::Llm(e.to_string()))?;

    let plan: PostgresQueryPlan = parse_plan(&raw)?;
    if !plan.validate() {
        return Err(AgentError::InvalidPlan(
            "missing operation or table".to_string(),
        ));
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ChatRole;
    use crate::schema::{EntitySchema, FieldInfo};
    use anyhow::Result;
    use async_trait::async_trait;

    /// Canned-response client: returns the same text for every call and
    /// records the prompt it was handed.
    #[derive(Debug)]
    struct CannedLlm {
        reply: std::result::Result<String, String>,
        seen: std::sync::Mutex<Vec<String>>,
    }

    impl CannedLlm {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                seen: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn chat(&self, _system: &str, user: &str) -> Result<String> {
            self.seen.lock().unwrap().push(user.to_string());
            self.reply.clone().map_err(|m| anyhow::anyhow!(m))
        }

        async fn chat_json(&self, system: &str, user: &str) -> Result<String> {
            self.chat(system, user).await
        }

        fn model_name(&self) -> &str {
            "canned"
        }

        fn provider_name(&self) -> &str {
            "test"
        }
    }

    fn schema() -> NormalizedSchema {
        let mut users = EntitySchema::default();
        users
            .fields
            .insert("name".to_string(), FieldInfo::of_type("text"));
        let mut s = NormalizedSchema::new();
        s.insert("users".to_string(), users);
        s
    }

    #[tokio::test]
    async fn fenced_json_reply_is_accepted() {
        let llm = CannedLlm::replying(
            "```json\n{\"operation\": \"find\", \"collection\": \"users\", \"filter\": {}}\n```",
        );
        let plan = generate_mongo_plan(&llm, "show users", &schema(), None)
            .await
            .unwrap();
        assert_eq!(plan.operation, "find");
        assert_eq!(plan.collection, "users");
    }

    #[tokio::test]
    async fn unparseable_reply_preserves_raw_text() {
        let llm = CannedLlm::replying("I am sorry, I cannot do that.");
        let err = generate_mongo_plan(&llm, "show users", &schema(), None)
            .await
            .unwrap_err();
        match err {
            AgentError::Generation { raw, .. } => {
                assert!(raw.contains("I am sorry"));
            }
            other => panic!("expected generation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn under_specified_plan_is_rejected_before_execution() {
        let llm = CannedLlm::replying("{\"operation\": \"select\"}");
        let err = generate_postgres_plan(&llm, "show users", &schema(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidPlan(_)));
    }

    #[tokio::test]
    async fn llm_failure_is_terminal_with_no_fallback_plan() {
        let llm = CannedLlm::failing("rate limited");
        let err = generate_postgres_plan(&llm, "show users", &schema(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
    }

    #[tokio::test]
    async fn prior_context_is_prepended_to_the_prompt() {
        let llm =
            CannedLlm::replying("{\"operation\": \"select\", \"table\": \"users\"}");
        let mut ctx = ChatContext::new();
        ctx.push(ChatRole::User, "show me all users");
        ctx.push(ChatRole::Assistant, "returned 3 users");

        generate_postgres_plan(&llm, "only the admins", &schema(), Some(&ctx))
            .await
            .unwrap();

        let seen = llm.seen.lock().unwrap();
        assert!(seen[0].contains("Previous conversation context:"));
        assert!(seen[0].contains("assistant: returned 3 users"));
        assert!(seen[0].contains("Current question: only the admins"));
    }
}
