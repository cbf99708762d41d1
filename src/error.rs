//! Unified error taxonomy used across all subsystems.
//!
//! Node-level validation failures are NOT errors in this sense: they are
//! collected into the [`ValidationSummary`](crate::validate::ValidationSummary)
//! so a compiler pass always runs to completion. The types here cover the
//! fatal or caller-visible conditions only.

use thiserror::Error;

use crate::graph::NodeId;

/// Malformed or non-compliant backend schema. Fatal to initialization: the
/// previous registration stays in place until the backend reconnects.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("definition '{key}' is malformed: {reason}")]
    MalformedDefinition { key: String, reason: String },

    #[error("the operator definition document is not valid json schema: {0}")]
    NotSchemaCompliant(String),

    #[error("failed to fetch the operator schema: {0}")]
    Fetch(#[from] TransportError),
}

impl SchemaError {
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::MalformedDefinition {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Network failure, non-2xx status, or a response body that does not match
/// its declared shape. Never crashes a compiler pass: the validator dispatch
/// boundary downgrades these to per-node summary messages.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// A well-formed error body returned by the backend (`{error, message}`),
    /// possibly with a 2xx status.
    #[error("{error}: {message}")]
    Backend { error: String, message: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request url: {0}")]
    Url(String),
}

/// A rejected mutation of the live editor graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("unknown block type '{0}'")]
    UnknownBlockType(String),

    #[error("node {node} has no input named '{input}'")]
    NoSuchInput { node: NodeId, input: String },

    #[error("an output of type '{output}' cannot feed input '{input}' of type '{input_type}'")]
    IncompatiblePins {
        output: String,
        input: String,
        input_type: String,
    },
}

/// Exception while reconstructing a graph from a persisted workflow document.
/// Caught at the top of the import routine and reported through the host
/// alert channel; the session guard is released and a compiler pass still
/// runs afterwards.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("workflow references unregistered operator '{0}'")]
    UnknownOperator(String),

    #[error("malformed workflow document: {0}")]
    MalformedDocument(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Failure inside a single validation rule. Converted to a generic summary
/// message at the dispatch boundary; never propagates past the rule set.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Invalid(String),
}

impl RuleError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RuleError::Invalid(message.into())
    }
}
