//! Natural-language database agent core.
//!
//! Point it at a live MongoDB or PostgreSQL database, describe an
//! information need in natural language, and get back a validated
//! structured query plan plus its execution result. Three moving parts:
//!
//! - **Introspection** turns the live database into a normalized,
//!   field-typed schema (catalog-driven for Postgres, bounded document
//!   sampling with type merging for MongoDB).
//! - **Planning** renders the schema and a strict plan-shape contract into
//!   an instruction for a configured LLM, then parses and shape-checks the
//!   reply. The LLM call is an injected [`llm::LlmClient`], so everything
//!   around it tests without a network.
//! - **Execution** dispatches on the plan's operation tag against the live
//!   engine, applying importance-tiered field selection when a plan
//!   under-specifies its projection, and returns a uniform JSON result.
//!
//! Agents are cached in an [`registry::AgentRegistry`], one per connection
//! string, each owning at most one live connection.
//!
//! Plans are trusted after shape validation only. This is not an injection
//! sandbox: adversarial prompts can produce adversarial plans, and callers
//! own that risk.

pub mod agents;
pub mod context;
pub mod error;
pub mod explain;
pub mod fields;
pub mod llm;
pub mod plan;
pub mod planner;
pub mod prompt;
pub mod registry;
pub mod schema;
pub mod service;

pub use agents::{Agent, EngineKind, MongoAgent, PostgresAgent};
pub use context::{ChatContext, ChatMessage, ChatRole};
pub use error::{AgentError, AgentResult};
pub use explain::explain_result;
pub use llm::{build_client, LlmClient, Provider};
pub use plan::{
    DatabaseOverview, MongoQueryPlan, PostgresQueryPlan, QueryPlan, ResultValue,
};
pub use registry::AgentRegistry;
pub use schema::{EntitySchema, FieldInfo, NormalizedSchema};
pub use service::{run_query, QueryRequest, QueryResponse};
