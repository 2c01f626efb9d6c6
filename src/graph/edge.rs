use serde::{Deserialize, Serialize};
use std::fmt;

/// One end of an edge: a node and one of its fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeEndpoint {
    pub node_id: String,
    pub field: String,
}

impl EdgeEndpoint {
    pub fn new(node_id: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for EdgeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node_id, self.field)
    }
}

/// A directed data connection from a node output to a node input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: EdgeEndpoint,
    pub destination: EdgeEndpoint,
}

impl Edge {
    pub fn new(
        source_node: impl Into<String>,
        source_field: impl Into<String>,
        destination_node: impl Into<String>,
        destination_field: impl Into<String>,
    ) -> Self {
        Self {
            source: EdgeEndpoint::new(source_node, source_field),
            destination: EdgeEndpoint::new(destination_node, destination_field),
        }
    }

    /// Same source and destination field, redirected to another destination node.
    pub fn redirected_to(&self, destination_node: impl Into<String>) -> Self {
        Self {
            source: self.source.clone(),
            destination: EdgeEndpoint::new(destination_node, self.destination.field.clone()),
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source.node_id == node_id || self.destination.node_id == node_id
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}
