//! LLM provider selection and the text-generation port.
//!
//! The generation call is an injected capability: everything downstream of
//! [`LlmClient`] (prompt building, parsing, validation) is testable without
//! a network. Exactly two providers are recognized; an unknown provider is a
//! terminal configuration error, never silently defaulted.

pub mod gemini;
pub mod openai;

use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::AgentError;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// Unified LLM client interface.
#[async_trait]
pub trait LlmClient: Send + Sync + std::fmt::Debug {
    /// Call the LLM with system + user prompts, return raw text response.
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Call the LLM expecting JSON response.
    /// - OpenAI: uses response_format json_object mode
    /// - Gemini: adds a JSON-only instruction to the prompt
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Model name for logging.
    fn model_name(&self) -> &str;

    /// Provider name for logging.
    fn provider_name(&self) -> &str;
}

/// The two supported LLM vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Gemini,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        }
    }

    /// Recognized model identifiers for this provider. The first entry is
    /// the default an unrecognized model falls back to.
    fn known_models(&self) -> &'static [&'static str] {
        match self {
            Provider::OpenAi => &["gpt-3.5-turbo-instruct", "gpt-4"],
            Provider::Gemini => &["gemini-1.5-flash", "gemini-2.0-flash"],
        }
    }

    /// Map a requested model onto a recognized one, falling back to the
    /// provider default exactly like the reference behavior.
    pub fn resolve_model(&self, requested: &str) -> &'static str {
        let known = self.known_models();
        known
            .iter()
            .find(|m| **m == requested)
            .copied()
            .unwrap_or(known[0])
    }
}

impl FromStr for Provider {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            other => Err(AgentError::Configuration(format!(
                "unsupported provider: {other}"
            ))),
        }
    }
}

/// Construct a client for the given provider/model/key triple. A missing API
/// key is a client error caught here, before any network call.
pub fn build_client(
    provider: Provider,
    model: &str,
    api_key: &str,
) -> Result<Box<dyn LlmClient>, AgentError> {
    if api_key.is_empty() {
        return Err(AgentError::Configuration(
            "API key is required".to_string(),
        ));
    }
    let model = provider.resolve_model(model);
    Ok(match provider {
        Provider::OpenAi => Box::new(OpenAiClient::with_model(api_key.to_string(), model)),
        Provider::Gemini => Box::new(GeminiClient::with_model(api_key.to_string(), model)),
    })
}

/// Strip well-known wrapping artifacts (markdown code fences) from raw model
/// output. Deliberately does no deeper repair of malformed JSON.
pub fn clean_model_output(text: &str) -> &str {
    let mut cleaned = text.trim();
    for fence in ["```json", "```JSON", "```"] {
        if let Some(rest) = cleaned.strip_prefix(fence) {
            cleaned = rest.trim_start();
            break;
        }
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest.trim_end();
    }
    cleaned
}
