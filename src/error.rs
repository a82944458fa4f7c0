//! Error types for the natural-language database agent core.
//!
//! One enum covers the whole taxonomy: connectivity, configuration,
//! generation, validation, execution and registry failures. The core never
//! recovers silently from any of these; every failure surfaces to the caller
//! with a human-readable message.

use thiserror::Error;

/// Result alias used throughout the core.
pub type AgentResult<T> = Result<T, AgentError>;

/// Main error type for introspection, plan generation, execution and the
/// agent registry.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The database was unreachable (introspection or execution).
    #[error("cannot connect to database: {0}")]
    Connection(String),

    /// Unsupported provider/model, missing API key, bad connection string.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The LLM call itself failed (network, auth, provider-side error).
    #[error("LLM request failed: {0}")]
    Llm(String),

    /// The model replied, but the reply was not parseable as a plan. The raw
    /// text is preserved for diagnosis, never discarded.
    #[error("could not parse model output as JSON: {message}\nraw model output:\n{raw}")]
    Generation { message: String, raw: String },

    /// The plan is missing its required shape (operation + target entity).
    /// Execution must never run on a plan that failed this check.
    #[error("invalid plan structure: {0}")]
    InvalidPlan(String),

    /// The plan named an operation this engine does not implement.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Pass-through driver error during execution.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The connection string scheme matched no known engine.
    #[error("no suitable agent found for connection string scheme '{0}'")]
    UnknownScheme(String),

    /// `close` was called for a connection string with no cached agent.
    #[error("no agent found in cache for this connection string")]
    AgentNotFound,
}

impl AgentError {
    /// Classify a mongodb driver error: reachability problems map to
    /// `Connection`, everything else is an execution error.
    pub(crate) fn from_mongo(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;
        match err.kind.as_ref() {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::Authentication { .. } => AgentError::Connection(err.to_string()),
            _ => AgentError::Execution(err.to_string()),
        }
    }

    /// Classify a sqlx error the same way.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => AgentError::Connection(err.to_string()),
            _ => AgentError::Execution(err.to_string()),
        }
    }
}
