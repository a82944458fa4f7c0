//! Engine-specific agents and engine classification.
//!
//! An agent bundles introspection, plan generation, validation and execution
//! for exactly one connection string, and owns at most one live connection.
//! The engine is a closed tagged union decided once from the URL scheme;
//! nothing downstream ever re-derives it by inspecting runtime shape.

pub mod mongo;
pub mod postgres;

use crate::context::ChatContext;
use crate::error::{AgentError, AgentResult};
use crate::llm::LlmClient;
use crate::plan::{QueryPlan, ResultValue};
use crate::schema::NormalizedSchema;

pub use mongo::MongoAgent;
pub use postgres::PostgresAgent;

/// The two supported engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    DocumentStore,
    Relational,
}

/// Classify a connection string by URL scheme. Unknown schemes are a
/// terminal registry error ("no suitable agent found").
pub fn classify_url(url: &str) -> AgentResult<EngineKind> {
    if url.starts_with("mongodb://") || url.starts_with("mongodb+srv://") {
        return Ok(EngineKind::DocumentStore);
    }
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        return Ok(EngineKind::Relational);
    }
    let scheme = url.split_once("://").map(|(s, _)| s).unwrap_or(url);
    Err(AgentError::UnknownScheme(scheme.to_string()))
}

/// Extract the database name from a connection string path.
pub(crate) fn database_name(url: &str) -> AgentResult<String> {
    let parsed = url::Url::parse(url)
        .map_err(|e| AgentError::Configuration(format!("invalid connection string: {e}")))?;
    let name = parsed.path().trim_start_matches('/').to_string();
    if name.is_empty() {
        return Err(AgentError::Configuration(
            "connection string must name a database".to_string(),
        ));
    }
    Ok(name)
}

/// One engine-specific agent. Construction is connection-lazy: no engine is
/// contacted until introspection or execution actually needs it.
#[derive(Debug)]
pub enum Agent {
    Mongo(MongoAgent),
    Postgres(PostgresAgent),
}

impl Agent {
    /// Build the agent matching the connection string's engine.
    pub fn for_url(url: &str) -> AgentResult<Self> {
        match classify_url(url)? {
            EngineKind::DocumentStore => Ok(Agent::Mongo(MongoAgent::new(url)?)),
            EngineKind::Relational => Ok(Agent::Postgres(PostgresAgent::new(url)?)),
        }
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Agent::Mongo(_) => EngineKind::DocumentStore,
            Agent::Postgres(_) => EngineKind::Relational,
        }
    }

    /// Produce a normalized schema for the live database. All-or-nothing:
    /// an unreachable database yields a connection error, never a partial
    /// schema.
    pub async fn introspect(&self) -> AgentResult<NormalizedSchema> {
        match self {
            Agent::Mongo(agent) => agent.introspect().await,
            Agent::Postgres(agent) => agent.introspect().await,
        }
    }

    /// Turn a natural-language prompt plus a previously introspected schema
    /// into a validated, engine-tagged plan.
    pub async fn generate_plan(
        &self,
        llm: &dyn LlmClient,
        prompt: &str,
        schema: &NormalizedSchema,
        context: Option<&ChatContext>,
    ) -> AgentResult<QueryPlan> {
        match self {
            Agent::Mongo(_) => Ok(QueryPlan::Mongo(
                crate::planner::generate_mongo_plan(llm, prompt, schema, context).await?,
            )),
            Agent::Postgres(_) => Ok(QueryPlan::Postgres(
                crate::planner::generate_postgres_plan(llm, prompt, schema, context).await?,
            )),
        }
    }

    /// Pure shape check; a plan generated for a different engine fails it.
    pub fn validate(&self, plan: &QueryPlan) -> bool {
        match (self, plan) {
            (Agent::Mongo(_), QueryPlan::Mongo(p)) => p.validate(),
            (Agent::Postgres(_), QueryPlan::Postgres(p)) => p.validate(),
            _ => false,
        }
    }

    /// Execute exactly the one operation the plan names.
    pub async fn execute(&self, plan: &QueryPlan) -> AgentResult<ResultValue> {
        match (self, plan) {
            (Agent::Mongo(agent), QueryPlan::Mongo(p)) => agent.execute(p).await,
            (Agent::Postgres(agent), QueryPlan::Postgres(p)) => agent.execute(p).await,
            _ => Err(AgentError::InvalidPlan(
                "plan targets a different engine".to_string(),
            )),
        }
    }

    /// Release the agent's connection.
    pub async fn close(&self) {
        match self {
            Agent::Mongo(agent) => agent.close().await,
            Agent::Postgres(agent) => agent.close().await,
        }
    }
}
