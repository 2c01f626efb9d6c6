//! Invocation templates: the per-node-type field schema used to validate and
//! synthesize workflow documents.

use crate::error::WorkflowError;
use crate::graph::InvocationKind;
use crate::graph::catalog::{InputKind, InvocationSpec};
use ahash::AHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod field_type;

pub use field_type::FieldType;

/// Node pack recorded for templates generated from the built-in node catalog.
pub const BUILTIN_NODE_PACK: &str = "invokeai";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFieldTemplate {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub input: InputKind,
    #[serde(default)]
    pub default: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFieldTemplate {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// The field schema of one node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationTemplate {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub title: String,
    pub version: String,
    #[serde(default = "default_node_pack")]
    pub node_pack: String,
    #[serde(default)]
    pub inputs: IndexMap<String, InputFieldTemplate>,
    #[serde(default)]
    pub outputs: IndexMap<String, OutputFieldTemplate>,
    /// Accepts edges into inputs it does not declare.
    #[serde(default)]
    pub open_inputs: bool,
}

fn default_node_pack() -> String {
    BUILTIN_NODE_PACK.to_string()
}

impl InvocationTemplate {
    pub fn input(&self, name: &str) -> Option<&InputFieldTemplate> {
        self.inputs.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputFieldTemplate> {
        self.outputs.get(name)
    }
}

impl From<&InvocationSpec> for InvocationTemplate {
    fn from(spec: &InvocationSpec) -> Self {
        let inputs = spec
            .inputs
            .iter()
            .map(|field| {
                let template = InputFieldTemplate {
                    name: field.name.to_string(),
                    title: field.title.to_string(),
                    field_type: FieldType::from_catalog(field.field_type, field.cardinality),
                    input: field.input,
                    default: field.default.to_json(),
                };
                (field.name.to_string(), template)
            })
            .collect();
        let outputs = spec
            .outputs
            .iter()
            .map(|field| {
                let template = OutputFieldTemplate {
                    name: field.name.to_string(),
                    field_type: FieldType::from_catalog(field.field_type, field.cardinality),
                };
                (field.name.to_string(), template)
            })
            .collect();

        Self {
            node_type: spec.node_type.to_string(),
            title: spec.title.to_string(),
            version: spec.version.to_string(),
            node_pack: BUILTIN_NODE_PACK.to_string(),
            inputs,
            outputs,
            open_inputs: spec.open_inputs,
        }
    }
}

/// Read-only mapping from node type to template.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    templates: AHashMap<String, InvocationTemplate>,
}

impl Templates {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Templates for every node type in the built-in catalog.
    pub fn builtin() -> Self {
        InvocationKind::ALL
            .iter()
            .map(|kind| InvocationTemplate::from(kind.spec()))
            .fold(Self::empty(), Self::with_template)
    }

    /// Parses a JSON object of `{ node_type: template }`.
    pub fn from_json(json: &str) -> Result<Self, WorkflowError> {
        let templates: AHashMap<String, InvocationTemplate> = serde_json::from_str(json)?;
        Ok(Self { templates })
    }

    /// Adds or replaces the template for its node type.
    pub fn with_template(mut self, template: InvocationTemplate) -> Self {
        self.templates.insert(template.node_type.clone(), template);
        self
    }

    pub fn get(&self, node_type: &str) -> Option<&InvocationTemplate> {
        self.templates.get(node_type)
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.templates.contains_key(node_type)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
