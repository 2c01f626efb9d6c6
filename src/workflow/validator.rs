//! Loads workflow and graph documents: parse, version gate, migrate, validate
//! structure, check against templates, then resolve external references.

use super::convert::{GraphDocument, graph_to_workflow};
use super::migrations::migrate;
use super::model::{Workflow, WorkflowEdge, WorkflowNode};
use super::schema::validate_structure;
use crate::error::{CheckError, WorkflowError};
use crate::graph::{catalog, topology};
use crate::templates::{FieldType, Templates};
use ahash::AHashMap;
use async_trait::async_trait;
use futures::future::join_all;
use semver::Version;
use serde_json::Value;
use std::fmt;

/// Access checks for resources a workflow references.
///
/// `Ok(false)` means the resource is missing or not permitted; `Err` means the
/// check itself could not be completed.
#[async_trait]
pub trait ResourceChecker: Send + Sync {
    async fn check_image_access(&self, image_name: &str) -> Result<bool, CheckError>;
    async fn check_board_access(&self, board_id: &str) -> Result<bool, CheckError>;
    async fn check_model_access(&self, model_key: &str) -> Result<bool, CheckError>;
}

/// Treats every resource as accessible.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl ResourceChecker for AllowAll {
    async fn check_image_access(&self, _image_name: &str) -> Result<bool, CheckError> {
        Ok(true)
    }

    async fn check_board_access(&self, _board_id: &str) -> Result<bool, CheckError> {
        Ok(true)
    }

    async fn check_model_access(&self, _model_key: &str) -> Result<bool, CheckError> {
        Ok(true)
    }
}

static ALLOW_ALL: AllowAll = AllowAll;

/// An external resource referenced by a node field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Image(String),
    Board(String),
    Model(String),
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Image(name) => write!(f, "image '{}'", name),
            ResourceRef::Board(id) => write!(f, "board '{}'", id),
            ResourceRef::Model(key) => write!(f, "model '{}'", key),
        }
    }
}

/// A non-terminal problem found while loading. The workflow is still usable.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowWarning {
    UnknownNodeType {
        node_id: String,
        node_type: String,
    },
    NodeVersionMismatch {
        node_id: String,
        node_type: String,
        node_version: String,
        template_version: String,
    },
    /// The edge was removed from the workflow.
    InvalidEdge {
        edge_id: String,
        reason: String,
    },
    Cycle {
        node_ids: Vec<String>,
    },
    /// The field value was cleared.
    InaccessibleResource {
        node_id: String,
        field: String,
        resource: ResourceRef,
    },
    /// The field value was kept.
    ResourceCheckFailed {
        node_id: String,
        field: String,
        resource: ResourceRef,
        error: CheckError,
    },
}

impl fmt::Display for WorkflowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowWarning::UnknownNodeType { node_id, node_type } => {
                write!(f, "Node '{}' has unknown type '{}'", node_id, node_type)
            }
            WorkflowWarning::NodeVersionMismatch {
                node_id,
                node_type,
                node_version,
                template_version,
            } => write!(
                f,
                "Node '{}' ({}) has version {} but the installed template is version {}",
                node_id, node_type, node_version, template_version
            ),
            WorkflowWarning::InvalidEdge { edge_id, reason } => {
                write!(f, "Edge '{}' was removed: {}", edge_id, reason)
            }
            WorkflowWarning::Cycle { node_ids } => {
                write!(f, "Workflow contains a cycle through [{}]", node_ids.join(", "))
            }
            WorkflowWarning::InaccessibleResource {
                node_id,
                field,
                resource,
            } => write!(
                f,
                "Node '{}' field '{}' references {} which is not accessible",
                node_id, field, resource
            ),
            WorkflowWarning::ResourceCheckFailed {
                node_id,
                field,
                resource,
                error,
            } => write!(
                f,
                "Could not check {} used by node '{}' field '{}': {}",
                resource, node_id, field, error
            ),
        }
    }
}

/// A loaded workflow and everything that was wrong with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedWorkflow {
    pub workflow: Workflow,
    pub warnings: Vec<WorkflowWarning>,
    /// Schema version the document was migrated from, if it was not current.
    pub migrated_from: Option<Version>,
}

/// Builder for `WorkflowValidator`.
pub struct WorkflowValidatorBuilder<'a> {
    templates: &'a Templates,
    checker: Option<&'a dyn ResourceChecker>,
}

impl<'a> WorkflowValidatorBuilder<'a> {
    /// Resource checker used for reference resolution. Defaults to `AllowAll`.
    pub fn with_checker(mut self, checker: &'a dyn ResourceChecker) -> Self {
        self.checker = Some(checker);
        self
    }

    pub fn build(self) -> WorkflowValidator<'a> {
        WorkflowValidator {
            templates: self.templates,
            checker: self.checker.unwrap_or(&ALLOW_ALL),
        }
    }
}

/// Loads documents against a read-only template set.
///
/// Each call works on its own parsed document; nothing is shared between calls,
/// and the result only exists once every check has finished.
pub struct WorkflowValidator<'a> {
    templates: &'a Templates,
    checker: &'a dyn ResourceChecker,
}

impl<'a> WorkflowValidator<'a> {
    pub fn builder(templates: &'a Templates) -> WorkflowValidatorBuilder<'a> {
        WorkflowValidatorBuilder {
            templates,
            checker: None,
        }
    }

    /// Loads a workflow document, migrating it if it is older than current.
    pub async fn validate_workflow(&self, text: &str) -> Result<ValidatedWorkflow, WorkflowError> {
        let document: Value = serde_json::from_str(text)?;
        self.validate_document(document).await
    }

    /// Loads a bare execution graph by first converting it into a workflow.
    pub async fn validate_graph(&self, text: &str) -> Result<ValidatedWorkflow, WorkflowError> {
        let graph: GraphDocument = serde_json::from_str(text)?;
        self.validate_graph_document(&graph).await
    }

    pub async fn validate_graph_document(
        &self,
        graph: &GraphDocument,
    ) -> Result<ValidatedWorkflow, WorkflowError> {
        let workflow = graph_to_workflow(graph, self.templates)?;
        let document =
            serde_json::to_value(&workflow).map_err(|e| WorkflowError::Serialize(e.to_string()))?;
        self.finish(document, None).await
    }

    /// Loads either kind of document. Graphs are recognised by a `nodes` object
    /// and no `meta` section.
    pub async fn load(&self, text: &str) -> Result<ValidatedWorkflow, WorkflowError> {
        let document: Value = serde_json::from_str(text)?;
        let is_graph = document.get("meta").is_none()
            && document.get("nodes").is_some_and(Value::is_object);
        if is_graph {
            let graph: GraphDocument = serde_json::from_value(document)?;
            self.validate_graph_document(&graph).await
        } else {
            self.validate_document(document).await
        }
    }

    pub async fn validate_document(
        &self,
        document: Value,
    ) -> Result<ValidatedWorkflow, WorkflowError> {
        let (document, migrated_from) = migrate(document, self.templates)?;
        self.finish(document, migrated_from).await
    }

    async fn finish(
        &self,
        document: Value,
        migrated_from: Option<Version>,
    ) -> Result<ValidatedWorkflow, WorkflowError> {
        let mut workflow = validate_structure(&document)?;
        let mut warnings = check_templates(&mut workflow, self.templates);
        warnings.extend(self.resolve_references(&mut workflow).await);

        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        tracing::info!(
            nodes = workflow.nodes.len(),
            edges = workflow.edges.len(),
            warnings = warnings.len(),
            migrated = migrated_from.is_some(),
            "Loaded workflow"
        );
        Ok(ValidatedWorkflow {
            workflow,
            warnings,
            migrated_from,
        })
    }

    async fn resolve_references(&self, workflow: &mut Workflow) -> Vec<WorkflowWarning> {
        let references = collect_references(workflow, self.templates);
        let checks = references.iter().map(|reference| async move {
            match &reference.resource {
                ResourceRef::Image(name) => self.checker.check_image_access(name).await,
                ResourceRef::Board(id) => self.checker.check_board_access(id).await,
                ResourceRef::Model(key) => self.checker.check_model_access(key).await,
            }
        });
        let results = join_all(checks).await;

        let mut warnings = Vec::new();
        let mut cleared: Vec<&Reference> = Vec::new();
        for (reference, result) in references.iter().zip(results) {
            let node_id = workflow.nodes[reference.node_index].id().to_string();
            match result {
                Ok(true) => {}
                Ok(false) => {
                    warnings.push(WorkflowWarning::InaccessibleResource {
                        node_id,
                        field: reference.field.clone(),
                        resource: reference.resource.clone(),
                    });
                    cleared.push(reference);
                }
                Err(error) => warnings.push(WorkflowWarning::ResourceCheckFailed {
                    node_id,
                    field: reference.field.clone(),
                    resource: reference.resource.clone(),
                    error,
                }),
            }
        }

        // Later elements first so earlier indexes stay valid.
        cleared.sort_by(|a, b| b.element.cmp(&a.element));
        for reference in cleared {
            clear_reference(workflow, reference);
        }
        warnings
    }
}

struct Reference {
    node_index: usize,
    field: String,
    /// Index within a collection value.
    element: Option<usize>,
    resource: ResourceRef,
}

fn collect_references(workflow: &Workflow, templates: &Templates) -> Vec<Reference> {
    let mut references = Vec::new();
    for (node_index, node) in workflow.nodes.iter().enumerate() {
        let WorkflowNode::Invocation(node) = node else {
            continue;
        };
        let template = templates.get(&node.data.node_type);
        for (name, input) in &node.data.inputs {
            let field_type = template
                .and_then(|template| template.input(name))
                .map(|input| &input.field_type);
            let mut push = |element, resource| {
                references.push(Reference {
                    node_index,
                    field: name.clone(),
                    element,
                    resource,
                })
            };
            match &input.value {
                Value::Array(items) => {
                    for (index, item) in items.iter().enumerate() {
                        if let Some(resource) = resource_of(field_type, item) {
                            push(Some(index), resource);
                        }
                    }
                }
                value => {
                    if let Some(resource) = resource_of(field_type, value) {
                        push(None, resource);
                    }
                }
            }
        }
    }
    references
}

// Known field types decide by type name; unknown ones by the value's shape.
fn resource_of(field_type: Option<&FieldType>, value: &Value) -> Option<ResourceRef> {
    let string = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
    match field_type.map(|t| t.name.as_str()) {
        Some(catalog::IMAGE) => string("image_name").map(ResourceRef::Image),
        Some(catalog::BOARD) => string("board_id").map(ResourceRef::Board),
        Some(name) if name.ends_with("ModelField") => string("key").map(ResourceRef::Model),
        Some(_) => None,
        None => {
            if let Some(name) = string("image_name") {
                Some(ResourceRef::Image(name))
            } else if let Some(id) = string("board_id") {
                Some(ResourceRef::Board(id))
            } else if value.get("base").is_some() {
                string("key").map(ResourceRef::Model)
            } else {
                None
            }
        }
    }
}

fn clear_reference(workflow: &mut Workflow, reference: &Reference) {
    let Some(WorkflowNode::Invocation(node)) = workflow.nodes.get_mut(reference.node_index) else {
        return;
    };
    let Some(input) = node.data.inputs.get_mut(&reference.field) else {
        return;
    };
    match (reference.element, &mut input.value) {
        (Some(index), Value::Array(items)) if index < items.len() => {
            items.remove(index);
        }
        (Some(_), _) => {}
        (None, value) => *value = Value::Null,
    }
}

/// Checks nodes and edges against the templates. Invalid edges are removed.
fn check_templates(workflow: &mut Workflow, templates: &Templates) -> Vec<WorkflowWarning> {
    let mut warnings = Vec::new();

    for node in workflow.invocation_nodes() {
        let data = &node.data;
        let Some(template) = templates.get(&data.node_type) else {
            warnings.push(WorkflowWarning::UnknownNodeType {
                node_id: node.id.clone(),
                node_type: data.node_type.clone(),
            });
            continue;
        };
        let major = |v: &str| Version::parse(v).ok().map(|v| v.major);
        if major(&data.version) != major(&template.version) {
            warnings.push(WorkflowWarning::NodeVersionMismatch {
                node_id: node.id.clone(),
                node_type: data.node_type.clone(),
                node_version: data.version.clone(),
                template_version: template.version.clone(),
            });
        }
    }

    let node_types: AHashMap<&str, Option<&str>> = workflow
        .nodes
        .iter()
        .map(|node| match node {
            WorkflowNode::Invocation(node) => {
                (node.id.as_str(), Some(node.data.node_type.as_str()))
            }
            WorkflowNode::Notes(node) => (node.id.as_str(), None),
        })
        .collect();

    let mut kept = Vec::with_capacity(workflow.edges.len());
    for edge in &workflow.edges {
        match edge_problem(edge, &node_types, templates) {
            None => kept.push(edge.clone()),
            Some(reason) => warnings.push(WorkflowWarning::InvalidEdge {
                edge_id: edge.id().to_string(),
                reason,
            }),
        }
    }
    workflow.edges = kept;

    let cyclic = nodes_in_cycles(workflow);
    if !cyclic.is_empty() {
        warnings.push(WorkflowWarning::Cycle { node_ids: cyclic });
    }
    warnings
}

fn edge_problem(
    edge: &WorkflowEdge,
    node_types: &AHashMap<&str, Option<&str>>,
    templates: &Templates,
) -> Option<String> {
    let (Some(source), Some(target)) = (
        node_types.get(edge.source()),
        node_types.get(edge.target()),
    ) else {
        let missing = if node_types.contains_key(edge.source()) {
            edge.target()
        } else {
            edge.source()
        };
        return Some(format!("node '{}' does not exist", missing));
    };

    let WorkflowEdge::Default(edge) = edge else {
        return None;
    };
    let (Some(source_type), Some(target_type)) = (source, target) else {
        return Some("notes nodes have no fields".to_string());
    };

    let source_template = templates.get(source_type);
    let target_template = templates.get(target_type);

    let output = match source_template {
        Some(template) => match template.output(&edge.source_handle) {
            Some(output) => Some(&output.field_type),
            None => {
                return Some(format!(
                    "'{}' has no output '{}'",
                    source_type, edge.source_handle
                ));
            }
        },
        None => None,
    };
    let input = match target_template {
        Some(template) => match template.input(&edge.target_handle) {
            Some(input) => Some(&input.field_type),
            None if template.open_inputs => None,
            None => {
                return Some(format!(
                    "'{}' has no input '{}'",
                    target_type, edge.target_handle
                ));
            }
        },
        None => None,
    };

    match (output, input) {
        (Some(output), Some(input)) if !output.is_compatible_with(input) => Some(format!(
            "{}.{} ({}) cannot connect to {}.{} ({})",
            edge.source, edge.source_handle, output, edge.target, edge.target_handle, input
        )),
        _ => None,
    }
}

fn nodes_in_cycles(workflow: &Workflow) -> Vec<String> {
    let edges = workflow.edges.iter().map(|edge| (edge.source(), edge.target()));
    topology::layers(workflow.nodes.iter().map(WorkflowNode::id), edges)
        .cyclic()
        .iter()
        .map(|id| id.to_string())
        .collect()
}
