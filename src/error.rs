use crate::graph::GraphIssue;
use crate::workflow::SchemaIssues;
use itertools::Itertools;
use thiserror::Error;

/// Errors raised while assembling a `Graph`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node '{0}' already exists in the graph")]
    DuplicateNode(String),

    #[error("Node '{node_id}' not found, which is required by {context}")]
    NodeNotFound { node_id: String, context: String },

    #[error("Node '{node_id}' of type '{node_type}' has no {direction} field named '{field}'")]
    UnknownField {
        node_id: String,
        node_type: String,
        field: String,
        direction: &'static str,
    },

    #[error("Edge {0} already exists in the graph")]
    DuplicateEdge(String),

    #[error("Node '{node_id}' is a '{found}', not a '{expected}'")]
    NodeTypeMismatch {
        node_id: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Graph is invalid:\n{}", format_issues(.0))]
    Invalid(Vec<GraphIssue>),
}

/// Errors raised by the graph builders.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("No main model is selected")]
    MissingModel,

    #[error("Unknown infill method '{0}'")]
    UnknownInfillMethod(String),

    #[error("Base model '{0}' is not supported by this builder")]
    UnsupportedBaseModel(String),
}

/// Terminal errors raised while loading a workflow or graph document.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Failed to parse workflow JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported workflow version: {0}")]
    Version(String),

    #[error("Failed to migrate workflow from {from} to {to}: {reason}")]
    Migration {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Workflow failed schema validation:\n{0}")]
    SchemaValidation(SchemaIssues),

    #[error("Node '{node_id}' has unknown type '{node_type}'")]
    UnknownNodeType { node_id: String, node_type: String },

    #[error("Failed to serialize workflow: {0}")]
    Serialize(String),
}

/// A failure reported by a resource checker. Never terminal: it surfaces as a warning.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct CheckError(pub String);

impl CheckError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

fn format_issues(issues: &[GraphIssue]) -> String {
    issues.iter().map(|issue| format!("  - {issue}")).join("\n")
}
