//! Natural-language explanation of query results.
//!
//! A stateless, separate LLM call layered on top of the core. Unlike plan
//! generation, this collaborator is allowed a fallback: when its own LLM
//! call fails, it substitutes a static apologetic message rather than
//! failing the whole request.

use serde_json::Value;
use tracing::warn;

use crate::llm::LlmClient;
use crate::schema::NormalizedSchema;

const EXPLAIN_SYSTEM_PROMPT: &str = "You're an AI assistant who explains database query results in a natural, human-friendly, and conversational tone. Your job is to make complex query outcomes easy for anyone to understand, even if they're not a developer.";

/// Static reply used when the explanation call fails.
pub const EXPLANATION_FALLBACK: &str =
    "Sorry, I couldn't generate an explanation for these results right now. The query itself ran and its output is shown above.";

fn build_explanation_prompt(query: &str, schema: &NormalizedSchema, data: &Value) -> String {
    let schema_text = serde_json::to_string_pretty(schema).unwrap_or_default();
    let data_text = serde_json::to_string_pretty(data).unwrap_or_default();
    format!(
        r#"Before explaining, analyze the query result and schema to summarize what happened. State the overall outcome in the first line only, and make that line bold.

Please do the following:
1. Break down what the result is doing (e.g., reading data, updating, deleting, etc.)
2. Clearly explain what happened during the query execution — what changed, what was found, what wasn't.
3. Highlight key numbers (like how many rows were matched, modified, inserted, etc.) in a friendly, readable way.
4. Avoid jargon — speak as if you're helping a teammate understand what just happened.
5. Format your answer with **Markdown**: use bold text, bullet points, and short paragraphs to keep things clean and readable.
6. Make the summary **engaging and to the point**, like a smart assistant briefing someone.

Here is the input data:

**Query:** {query}

**Schema:**
{schema_text}

**Result Data:**
{data_text}

Now give a natural, helpful explanation in plain English. No JSON, no code - just the explanation."#
    )
}

/// Explain an execution result in plain English. Never fails; falls back to
/// [`EXPLANATION_FALLBACK`] when the model is unreachable.
pub async fn explain_result(
    llm: &dyn LlmClient,
    query: &str,
    schema: &NormalizedSchema,
    data: &Value,
) -> String {
    let prompt = build_explanation_prompt(query, schema, data);
    match llm.chat(EXPLAIN_SYSTEM_PROMPT, &prompt).await {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "explanation call failed, using fallback");
            EXPLANATION_FALLBACK.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn chat(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            Err(anyhow!("provider down"))
        }

        async fn chat_json(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            Err(anyhow!("provider down"))
        }

        fn model_name(&self) -> &str {
            "none"
        }

        fn provider_name(&self) -> &str {
            "test"
        }
    }

    #[tokio::test]
    async fn failed_explanation_falls_back_to_static_message() {
        let schema = NormalizedSchema::new();
        let text = explain_result(
            &FailingLlm,
            "SELECT id, name FROM users WHERE TRUE",
            &schema,
            &serde_json::json!([]),
        )
        .await;
        assert_eq!(text, EXPLANATION_FALLBACK);
    }

    #[test]
    fn prompt_embeds_query_schema_and_data() {
        let schema = NormalizedSchema::new();
        let prompt = build_explanation_prompt(
            "SELECT 1",
            &schema,
            &serde_json::json!([{ "one": 1 }]),
        );
        assert!(prompt.contains("**Query:** SELECT 1"));
        assert!(prompt.contains("\"one\": 1"));
    }
}
