//! Error types for the pipeline
//!
//! Taxonomy:
//! - Fatal data-contract errors propagate to the caller of the graph
//! - Graph wiring errors surface when the graph is built, never mid-run
//! - Generator failures are recovered inside the LLM leaf and never escape
//! - Configuration errors surface when loading settings

use crate::graph::NodeKind;
use k9_data::DataError;

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Dataset loading or contract failure
    #[error("data error: {0}")]
    Data(#[from] DataError),

    /// Graph construction or traversal failure
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Configuration failure
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State could not be converted to or from a plain map
    #[error("state error: {0}")]
    State(#[from] serde_json::Error),
}

impl PipelineError {
    /// Whether the error indicates a broken pipeline invariant rather than a
    /// user-facing situation
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Data(_) | Self::Graph(_) => true,
            Self::Config(_) | Self::State(_) => false,
        }
    }

    /// Whether the error is a violated dataset column contract
    #[inline]
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Data(e) if e.is_contract_violation())
    }
}

/// Graph wiring errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Edge from a node to itself
    #[error("self loop on {0}")]
    SelfLoop(NodeKind),

    /// Wiring contains a cycle
    #[error("cycle detected")]
    CycleDetected,

    /// Node cannot be reached from the entry node
    #[error("node {0} unreachable from entry")]
    Unreachable(NodeKind),

    /// Node has no outgoing edge and is not terminal
    #[error("node {0} has no successor")]
    DeadEnd(NodeKind),

    /// Node is wired twice
    #[error("node {0} already has an outgoing transition")]
    DuplicateTransition(NodeKind),

    /// Edge points at a node that was never registered
    #[error("node {0} is not registered")]
    UnknownNode(NodeKind),

    /// A conditional edge picked a target it did not declare
    #[error("route from {from} to {to} was not declared")]
    UndeclaredRoute {
        /// Source node
        from: NodeKind,
        /// Selected target
        to: NodeKind,
    },

    /// A step limit was hit while running
    #[error("run exceeded {0} steps")]
    StepLimit(usize),
}

/// External text generator errors
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// No API key in the configured environment variable
    #[error("missing API key in ${0}")]
    MissingApiKey(String),

    /// Generator disabled by configuration
    #[error("generator disabled")]
    Disabled,

    /// HTTP transport failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request exceeded the configured timeout
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Non-success HTTP status
    #[error("unexpected status {status}: {body}")]
    Status {
        /// Status code
        status: u16,
        /// Response body excerpt
        body: String,
    },

    /// Response carried no text
    #[error("empty response")]
    EmptyResponse,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path attempted
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}
