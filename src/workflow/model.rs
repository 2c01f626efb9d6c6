//! The current (`3.0.0`) workflow document model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Absent for workflows that have never been saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    /// User-facing version of the workflow itself, not the schema version.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub exposed_fields: Vec<ExposedField>,
    pub meta: WorkflowMeta,
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
}

impl Workflow {
    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    pub fn invocation_nodes(&self) -> impl Iterator<Item = &InvocationNode> {
        self.nodes.iter().filter_map(|node| match node {
            WorkflowNode::Invocation(node) => Some(node),
            WorkflowNode::Notes(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposedField {
    pub node_id: String,
    pub field_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowMeta {
    pub version: String,
    #[serde(default)]
    pub category: WorkflowCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowCategory {
    #[default]
    User,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowNode {
    #[serde(rename = "invocation")]
    Invocation(InvocationNode),
    #[serde(rename = "notes")]
    Notes(NotesNode),
}

impl WorkflowNode {
    pub fn id(&self) -> &str {
        match self {
            WorkflowNode::Invocation(node) => &node.id,
            WorkflowNode::Notes(node) => &node.id,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            WorkflowNode::Invocation(node) => node.position,
            WorkflowNode::Notes(node) => node.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationNode {
    pub id: String,
    pub position: Position,
    pub data: InvocationNodeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationNodeData {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub version: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_true")]
    pub is_open: bool,
    #[serde(default = "default_true")]
    pub is_intermediate: bool,
    #[serde(default = "default_true")]
    pub use_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_pack: Option<String>,
    #[serde(default)]
    pub inputs: IndexMap<String, FieldInput>,
}

fn default_true() -> bool {
    true
}

/// The stored value of one node input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInput {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesNode {
    pub id: String,
    pub position: Position,
    pub data: NotesNodeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesNodeData {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_true")]
    pub is_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEdge {
    /// Connects a specific output handle to a specific input handle.
    #[serde(rename = "default")]
    Default(DefaultEdge),
    /// Visual grouping of all connections between two collapsed nodes.
    #[serde(rename = "collapsed")]
    Collapsed(CollapsedEdge),
}

impl WorkflowEdge {
    pub fn id(&self) -> &str {
        match self {
            WorkflowEdge::Default(edge) => &edge.id,
            WorkflowEdge::Collapsed(edge) => &edge.id,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            WorkflowEdge::Default(edge) => &edge.source,
            WorkflowEdge::Collapsed(edge) => &edge.source,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            WorkflowEdge::Default(edge) => &edge.target,
            WorkflowEdge::Collapsed(edge) => &edge.target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: String,
    pub target_handle: String,
}

impl DefaultEdge {
    /// Builds an edge with the canonical `reactflow__edge-…` ID.
    pub fn new(
        source: impl Into<String>,
        source_handle: impl Into<String>,
        target: impl Into<String>,
        target_handle: impl Into<String>,
    ) -> Self {
        let (source, source_handle) = (source.into(), source_handle.into());
        let (target, target_handle) = (target.into(), target_handle.into());
        Self {
            id: format!(
                "reactflow__edge-{}{}-{}{}",
                source, source_handle, target, target_handle
            ),
            source,
            target,
            source_handle,
            target_handle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapsedEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}
