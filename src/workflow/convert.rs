//! Synthesizes a workflow document from a bare execution graph.

use super::migrations::CURRENT_VERSION;
use super::model::{
    DefaultEdge, FieldInput, InvocationNode, InvocationNodeData, Position, Workflow,
    WorkflowCategory, WorkflowEdge, WorkflowMeta, WorkflowNode,
};
use crate::error::WorkflowError;
use crate::graph::{Edge, GraphSnapshot, topology};
use crate::templates::{InvocationTemplate, Templates};
use ahash::AHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default node width on the canvas.
pub const NODE_WIDTH: f64 = 320.0;

/// Default node height on the canvas.
pub const NODE_HEIGHT: f64 = 400.0;

/// Gap between neighbouring nodes.
pub const NODE_SPACING: f64 = 50.0;

// Node keys that are graph bookkeeping rather than inputs.
const RESERVED_KEYS: &[&str] = &["id", "type", "is_intermediate", "use_cache"];

/// A raw execution graph as returned by the backend: nodes are loosely typed
/// objects carrying at least `id` and `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub nodes: IndexMap<String, Value>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl TryFrom<&GraphSnapshot> for GraphDocument {
    type Error = WorkflowError;

    fn try_from(snapshot: &GraphSnapshot) -> Result<Self, Self::Error> {
        let nodes = snapshot
            .nodes
            .iter()
            .map(|(id, node)| {
                serde_json::to_value(node)
                    .map(|value| (id.clone(), value))
                    .map_err(|e| WorkflowError::Serialize(e.to_string()))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            id: Some(snapshot.id.clone()),
            nodes,
            edges: snapshot.edges.clone(),
        })
    }
}

/// Wraps every graph node in a positioned workflow node and every edge in a
/// default workflow edge.
///
/// The result has no `id`, so saving it creates a new workflow. A node whose
/// type has no template fails the whole conversion.
pub fn graph_to_workflow(
    graph: &GraphDocument,
    templates: &Templates,
) -> Result<Workflow, WorkflowError> {
    let positions = layered_layout(graph);

    let mut nodes = Vec::with_capacity(graph.nodes.len());
    for (id, node) in &graph.nodes {
        let node_type = node.get("type").and_then(Value::as_str).unwrap_or_default();
        let template = templates
            .get(node_type)
            .ok_or_else(|| WorkflowError::UnknownNodeType {
                node_id: id.clone(),
                node_type: node_type.to_string(),
            })?;
        let fields = node.as_object().cloned().unwrap_or_default();

        nodes.push(WorkflowNode::Invocation(InvocationNode {
            id: id.clone(),
            position: positions.get(id.as_str()).copied().unwrap_or_default(),
            data: InvocationNodeData {
                id: id.clone(),
                node_type: node_type.to_string(),
                version: template.version.clone(),
                label: String::new(),
                notes: String::new(),
                is_open: true,
                is_intermediate: flag(&fields, "is_intermediate"),
                use_cache: flag(&fields, "use_cache"),
                node_pack: Some(template.node_pack.clone()),
                inputs: build_inputs(template, &fields),
            },
        }));
    }

    let edges = graph
        .edges
        .iter()
        .map(|edge| {
            WorkflowEdge::Default(DefaultEdge::new(
                edge.source.node_id.as_str(),
                edge.source.field.as_str(),
                edge.destination.node_id.as_str(),
                edge.destination.field.as_str(),
            ))
        })
        .collect();

    tracing::debug!(nodes = nodes.len(), "Converted graph to workflow");
    Ok(Workflow {
        id: None,
        name: String::new(),
        author: String::new(),
        description: String::new(),
        version: String::new(),
        contact: String::new(),
        tags: String::new(),
        notes: String::new(),
        exposed_fields: Vec::new(),
        meta: WorkflowMeta {
            version: CURRENT_VERSION.to_string(),
            category: WorkflowCategory::User,
        },
        nodes,
        edges,
    })
}

fn flag(fields: &Map<String, Value>, key: &str) -> bool {
    fields.get(key).and_then(Value::as_bool).unwrap_or(true)
}

// Template inputs take the node's value, falling back to the template default.
// Open templates also keep every other key the node carries.
fn build_inputs(
    template: &InvocationTemplate,
    fields: &Map<String, Value>,
) -> IndexMap<String, FieldInput> {
    let mut inputs: IndexMap<String, FieldInput> = template
        .inputs
        .iter()
        .map(|(name, input)| {
            let value = fields
                .get(name)
                .cloned()
                .unwrap_or_else(|| input.default.clone());
            let field = FieldInput {
                name: name.clone(),
                label: String::new(),
                value,
            };
            (name.clone(), field)
        })
        .collect();

    if template.open_inputs {
        for (name, value) in fields {
            if RESERVED_KEYS.contains(&name.as_str()) || inputs.contains_key(name) {
                continue;
            }
            let field = FieldInput {
                name: name.clone(),
                label: String::new(),
                value: value.clone(),
            };
            inputs.insert(name.clone(), field);
        }
    }
    inputs
}

/// Column = longest-path depth from a source node, row = order within the column.
/// Nodes on a cycle keep the depth reached before the cycle.
fn layered_layout(graph: &GraphDocument) -> AHashMap<&str, Position> {
    let edges = graph
        .edges
        .iter()
        .map(|edge| (edge.source.node_id.as_str(), edge.destination.node_id.as_str()));
    let layering = topology::layers(graph.nodes.keys().map(String::as_str), edges);

    let mut rows: AHashMap<usize, usize> = AHashMap::new();
    graph
        .nodes
        .keys()
        .map(|id| {
            let column = layering.depth(id);
            let row = rows.entry(column).or_insert(0);
            let position = Position {
                x: column as f64 * (NODE_WIDTH + NODE_SPACING),
                y: *row as f64 * (NODE_HEIGHT + NODE_SPACING),
            };
            *row += 1;
            (id.as_str(), position)
        })
        .collect()
}
