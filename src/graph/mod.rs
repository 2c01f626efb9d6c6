//! The `Graph` accumulator: typed invocation nodes, edges between their fields,
//! and the generation metadata collected while builders run.

use crate::error::GraphError;
use ahash::AHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

pub mod catalog;
mod edge;
pub mod fields;
mod invocation;
pub mod topology;

pub use edge::{Edge, EdgeEndpoint};
pub use fields::*;
pub use invocation::*;

/// ID of the node that collects generation metadata.
pub const METADATA_NODE_ID: &str = "core_metadata";

/// Builds a unique ID of the form `prefix:<uuid>`.
pub fn prefixed_id(prefix: &str) -> String {
    format!("{}:{}", prefix, Uuid::new_v4().simple())
}

/// Lightweight reference to a node inserted into a `Graph`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    id: String,
    kind: InvocationKind,
}

impl NodeHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> InvocationKind {
        self.kind
    }
}

/// Immutable view of a graph, ready to be submitted for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub id: String,
    pub nodes: IndexMap<String, Invocation>,
    pub edges: Vec<Edge>,
}

/// A single structural problem found by `Graph::validate`.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphIssue {
    DanglingEdge { edge: Edge, missing_node: String },
    UndeclaredField { edge: Edge, node_id: String, field: String },
    MultipleInputs { node_id: String, field: String, count: usize },
    IncompatibleTypes { edge: Edge, source_type: String, destination_type: String },
    Cycle { node_ids: Vec<String> },
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphIssue::DanglingEdge { edge, missing_node } => {
                write!(f, "edge {} references missing node '{}'", edge, missing_node)
            }
            GraphIssue::UndeclaredField {
                edge,
                node_id,
                field,
            } => write!(
                f,
                "edge {} uses field '{}' which node '{}' does not declare",
                edge, field, node_id
            ),
            GraphIssue::MultipleInputs {
                node_id,
                field,
                count,
            } => write!(
                f,
                "input '{}.{}' receives {} edges but accepts one",
                node_id, field, count
            ),
            GraphIssue::IncompatibleTypes {
                edge,
                source_type,
                destination_type,
            } => write!(
                f,
                "edge {} connects {} to incompatible {}",
                edge, source_type, destination_type
            ),
            GraphIssue::Cycle { node_ids } => {
                write!(f, "cycle through nodes [{}]", node_ids.join(", "))
            }
        }
    }
}

/// Accumulates the nodes, edges and metadata of one generation request.
#[derive(Debug, Clone)]
pub struct Graph {
    id: String,
    nodes: IndexMap<String, Invocation>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nodes: IndexMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    // --- Nodes ---

    /// Inserts a node by its ID. Fails if the ID is already taken.
    pub fn add_node(&mut self, node: impl Into<Invocation>) -> Result<NodeHandle, GraphError> {
        let node = node.into();
        let id = node.id().to_string();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        tracing::trace!(node_id = %id, node_type = node.type_name(), "Adding node");
        let handle = NodeHandle {
            id: id.clone(),
            kind: node.kind(),
        };
        self.nodes.insert(id, node);
        Ok(handle)
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get_node(&self, id: &str) -> Result<&Invocation, GraphError> {
        self.nodes.get(id).ok_or_else(|| GraphError::NodeNotFound {
            node_id: id.to_string(),
            context: "a node lookup".to_string(),
        })
    }

    pub fn get_node_mut(&mut self, id: &str) -> Result<&mut Invocation, GraphError> {
        self.nodes.get_mut(id).ok_or_else(|| GraphError::NodeNotFound {
            node_id: id.to_string(),
            context: "a node lookup".to_string(),
        })
    }

    /// Returns a handle to an existing node.
    pub fn handle(&self, id: &str) -> Result<NodeHandle, GraphError> {
        let node = self.get_node(id)?;
        Ok(NodeHandle {
            id: id.to_string(),
            kind: node.kind(),
        })
    }

    /// Typed read access to a node's fields.
    pub fn node<T: InvocationVariant>(&self, id: &str) -> Result<&T, GraphError> {
        let node = self.get_node(id)?;
        let found = node.type_name();
        T::from_ref(node).ok_or_else(|| GraphError::NodeTypeMismatch {
            node_id: id.to_string(),
            expected: T::KIND.type_name(),
            found,
        })
    }

    /// Typed write access to a node's fields.
    pub fn node_mut<T: InvocationVariant>(&mut self, id: &str) -> Result<&mut T, GraphError> {
        let node = self.get_node_mut(id)?;
        let found = node.type_name();
        T::from_mut(node).ok_or_else(|| GraphError::NodeTypeMismatch {
            node_id: id.to_string(),
            expected: T::KIND.type_name(),
            found,
        })
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Invocation> {
        self.nodes.values()
    }

    /// Removes a node together with every edge touching it.
    pub fn delete_node(&mut self, id: &str) -> Result<Invocation, GraphError> {
        let node = self
            .nodes
            .shift_remove(id)
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: id.to_string(),
                context: "node deletion".to_string(),
            })?;
        self.edges.retain(|edge| !edge.touches(id));
        Ok(node)
    }

    // --- Edges ---

    /// Appends an edge after checking both endpoints against the node catalog.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        let source = self.nodes.get(&edge.source.node_id).ok_or_else(|| {
            GraphError::NodeNotFound {
                node_id: edge.source.node_id.clone(),
                context: format!("edge {}", edge),
            }
        })?;
        let destination = self.nodes.get(&edge.destination.node_id).ok_or_else(|| {
            GraphError::NodeNotFound {
                node_id: edge.destination.node_id.clone(),
                context: format!("edge {}", edge),
            }
        })?;

        if source.spec().output(&edge.source.field).is_none() {
            return Err(GraphError::UnknownField {
                node_id: edge.source.node_id.clone(),
                node_type: source.type_name().to_string(),
                field: edge.source.field.clone(),
                direction: "output",
            });
        }
        if !destination.spec().accepts_input(&edge.destination.field) {
            return Err(GraphError::UnknownField {
                node_id: edge.destination.node_id.clone(),
                node_type: destination.type_name().to_string(),
                field: edge.destination.field.clone(),
                direction: "input",
            });
        }
        if self.edges.contains(&edge) {
            return Err(GraphError::DuplicateEdge(edge.to_string()));
        }

        self.edges.push(edge);
        Ok(())
    }

    /// Connects `source.source_field` to `destination.destination_field`.
    pub fn connect(
        &mut self,
        source: &NodeHandle,
        source_field: &str,
        destination: &NodeHandle,
        destination_field: &str,
    ) -> Result<(), GraphError> {
        self.add_edge(Edge::new(
            source.id(),
            source_field,
            destination.id(),
            destination_field,
        ))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Incoming edges of a node, optionally restricted to some destination fields.
    pub fn edges_to(&self, node_id: &str, fields: Option<&[&str]>) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.destination.node_id == node_id)
            .filter(|e| fields.is_none_or(|f| f.contains(&e.destination.field.as_str())))
            .collect()
    }

    /// Outgoing edges of a node, optionally restricted to some source fields.
    pub fn edges_from(&self, node_id: &str, fields: Option<&[&str]>) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.source.node_id == node_id)
            .filter(|e| fields.is_none_or(|f| f.contains(&e.source.field.as_str())))
            .collect()
    }

    /// Removes incoming edges of a node and returns how many were removed.
    pub fn delete_edges_to(&mut self, node_id: &str, fields: Option<&[&str]>) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| {
            !(e.destination.node_id == node_id
                && fields.is_none_or(|f| f.contains(&e.destination.field.as_str())))
        });
        before - self.edges.len()
    }

    /// Removes outgoing edges of a node and returns how many were removed.
    pub fn delete_edges_from(&mut self, node_id: &str, fields: Option<&[&str]>) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| {
            !(e.source.node_id == node_id
                && fields.is_none_or(|f| f.contains(&e.source.field.as_str())))
        });
        before - self.edges.len()
    }

    // --- Metadata ---

    /// Merges `partial` into the metadata node, creating it on first use.
    /// Later values overwrite earlier ones for the same key.
    pub fn upsert_metadata(
        &mut self,
        partial: Map<String, Value>,
    ) -> Result<NodeHandle, GraphError> {
        let handle = self.ensure_metadata_node()?;
        let metadata = self.node_mut::<CoreMetadata>(METADATA_NODE_ID)?;
        for (key, value) in partial {
            metadata.fields.insert(key, value);
        }
        Ok(handle)
    }

    /// The accumulated metadata, if any has been recorded.
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.node::<CoreMetadata>(METADATA_NODE_ID)
            .ok()
            .map(|node| &node.fields)
    }

    /// Routes a node output into the metadata node under `key`.
    pub fn add_edge_to_metadata(
        &mut self,
        source: &NodeHandle,
        source_field: &str,
        key: &str,
    ) -> Result<(), GraphError> {
        let metadata = self.ensure_metadata_node()?;
        self.connect(source, source_field, &metadata, key)
    }

    /// Makes `node` the single consumer of the metadata node's output.
    pub fn set_metadata_receiving_node(&mut self, node: &NodeHandle) -> Result<(), GraphError> {
        let metadata = self.ensure_metadata_node()?;
        self.delete_edges_from(METADATA_NODE_ID, Some(&["metadata"]));
        self.connect(&metadata, "metadata", node, "metadata")
    }

    fn ensure_metadata_node(&mut self) -> Result<NodeHandle, GraphError> {
        if self.has_node(METADATA_NODE_ID) {
            let handle = self.handle(METADATA_NODE_ID)?;
            // Fails loudly if something else took the reserved ID.
            self.node::<CoreMetadata>(METADATA_NODE_ID)?;
            return Ok(handle);
        }
        self.add_node(CoreMetadata {
            id: METADATA_NODE_ID.to_string(),
            ..Default::default()
        })
    }

    // --- Validation & output ---

    /// Collects every structural problem in the graph.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut issues = Vec::new();
        let mut incoming: AHashMap<(&str, &str), usize> = AHashMap::new();

        for edge in &self.edges {
            let (Some(source), Some(destination)) = (
                self.nodes.get(&edge.source.node_id),
                self.nodes.get(&edge.destination.node_id),
            ) else {
                let missing_node = if self.nodes.contains_key(&edge.source.node_id) {
                    edge.destination.node_id.clone()
                } else {
                    edge.source.node_id.clone()
                };
                issues.push(GraphIssue::DanglingEdge {
                    edge: edge.clone(),
                    missing_node,
                });
                continue;
            };

            let Some(output) = source.spec().output(&edge.source.field) else {
                issues.push(GraphIssue::UndeclaredField {
                    edge: edge.clone(),
                    node_id: edge.source.node_id.clone(),
                    field: edge.source.field.clone(),
                });
                continue;
            };

            if destination.spec().open_inputs {
                continue;
            }
            let Some(input) = destination.spec().input(&edge.destination.field) else {
                issues.push(GraphIssue::UndeclaredField {
                    edge: edge.clone(),
                    node_id: edge.destination.node_id.clone(),
                    field: edge.destination.field.clone(),
                });
                continue;
            };

            if !catalog::types_compatible(
                (output.field_type, output.cardinality),
                (input.field_type, input.cardinality),
            ) {
                issues.push(GraphIssue::IncompatibleTypes {
                    edge: edge.clone(),
                    source_type: output.field_type.to_string(),
                    destination_type: input.field_type.to_string(),
                });
            }
            if !input.accepts_many_edges() {
                *incoming
                    .entry((edge.destination.node_id.as_str(), input.name))
                    .or_default() += 1;
            }
        }

        let mut overloaded: Vec<_> = incoming.into_iter().filter(|(_, n)| *n > 1).collect();
        overloaded.sort();
        for ((node_id, field), count) in overloaded {
            issues.push(GraphIssue::MultipleInputs {
                node_id: node_id.to_string(),
                field: field.to_string(),
                count,
            });
        }

        let cyclic = self.nodes_in_cycles();
        if !cyclic.is_empty() {
            issues.push(GraphIssue::Cycle { node_ids: cyclic });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(GraphError::Invalid(issues))
        }
    }

    /// Nodes that cannot be ordered because they sit on a cycle.
    fn nodes_in_cycles(&self) -> Vec<String> {
        let edges = self
            .edges
            .iter()
            .map(|edge| (edge.source.node_id.as_str(), edge.destination.node_id.as_str()));
        topology::layers(self.nodes.keys().map(String::as_str), edges)
            .cyclic()
            .iter()
            .map(|id| id.to_string())
            .collect()
    }

    /// Returns an immutable snapshot `{ id, nodes, edges }`.
    pub fn get_graph(&self) -> GraphSnapshot {
        GraphSnapshot {
            id: self.id.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }
}

impl From<GraphSnapshot> for Graph {
    fn from(snapshot: GraphSnapshot) -> Self {
        Self {
            id: snapshot.id,
            nodes: snapshot.nodes,
            edges: snapshot.edges,
        }
    }
}
