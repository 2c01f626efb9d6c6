//! Structural validation of a (migrated) workflow document.
//!
//! Every violation is collected before anything is reported, so a user fixing a
//! hand-edited document sees the whole list at once.

use super::model::Workflow;
use crate::error::WorkflowError;
use ahash::AHashSet;
use semver::Version;
use serde_json::{Map, Value};
use std::fmt;

/// One structural violation at a JSON path such as `nodes[2].data.version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaIssues(pub Vec<SchemaIssue>);

impl SchemaIssues {
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(SchemaIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaIssue> {
        self.0.iter()
    }
}

impl fmt::Display for SchemaIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, issue) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {}", issue)?;
        }
        Ok(())
    }
}

/// Checks `document` against the current workflow schema and deserializes it.
pub fn validate_structure(document: &Value) -> Result<Workflow, WorkflowError> {
    let mut issues = SchemaIssues::default();
    let Some(root) = document.as_object() else {
        issues.push("$", "expected an object");
        return Err(WorkflowError::SchemaValidation(issues));
    };

    require(root, "$", "name", Kind::String, &mut issues);
    for key in ["author", "description", "version", "contact", "tags", "notes"] {
        optional(root, "$", key, Kind::String, &mut issues);
    }
    // `null` means "no id".
    if !matches!(root.get("id"), None | Some(Value::Null)) {
        optional(root, "$", "id", Kind::String, &mut issues);
    }

    if let Some(meta) = require(root, "$", "meta", Kind::Object, &mut issues) {
        check_meta(meta, &mut issues);
    }

    let mut node_ids = AHashSet::new();
    if let Some(nodes) = require(root, "$", "nodes", Kind::Array, &mut issues) {
        for (index, node) in nodes.as_array().into_iter().flatten().enumerate() {
            check_node(&format!("nodes[{}]", index), node, &mut node_ids, &mut issues);
        }
    }

    if let Some(edges) = require(root, "$", "edges", Kind::Array, &mut issues) {
        let mut edge_ids = AHashSet::new();
        for (index, edge) in edges.as_array().into_iter().flatten().enumerate() {
            check_edge(&format!("edges[{}]", index), edge, &mut edge_ids, &mut issues);
        }
    }

    if let Some(exposed) = optional(root, "$", "exposedFields", Kind::Array, &mut issues) {
        for (index, field) in exposed.as_array().into_iter().flatten().enumerate() {
            let path = format!("exposedFields[{}]", index);
            let Some(field) = object_at(&path, field, &mut issues) else {
                continue;
            };
            require(field, &path, "fieldName", Kind::String, &mut issues);
            if let Some(node_id) = require(field, &path, "nodeId", Kind::String, &mut issues)
                .and_then(Value::as_str)
                && !node_ids.contains(node_id)
            {
                issues.push(
                    format!("{}.nodeId", path),
                    format!("references missing node '{}'", node_id),
                );
            }
        }
    }

    if !issues.is_empty() {
        tracing::debug!(count = issues.len(), "Workflow failed structural validation");
        return Err(WorkflowError::SchemaValidation(issues));
    }

    serde_json::from_value(document.clone()).map_err(|error| {
        let mut issues = SchemaIssues::default();
        issues.push("$", error.to_string());
        WorkflowError::SchemaValidation(issues)
    })
}

fn check_meta(meta: &Value, issues: &mut SchemaIssues) {
    let Some(meta) = meta.as_object() else {
        return;
    };
    require(meta, "meta", "version", Kind::String, issues);
    if let Some(category) = optional(meta, "meta", "category", Kind::String, issues)
        .and_then(Value::as_str)
        && !matches!(category, "user" | "default")
    {
        issues.push(
            "meta.category",
            format!("expected 'user' or 'default', found '{}'", category),
        );
    }
}

fn check_node<'a>(
    path: &str,
    node: &'a Value,
    node_ids: &mut AHashSet<&'a str>,
    issues: &mut SchemaIssues,
) {
    let Some(node) = object_at(path, node, issues) else {
        return;
    };

    let id = require(node, path, "id", Kind::String, issues).and_then(Value::as_str);
    if let Some(id) = id
        && !node_ids.insert(id)
    {
        issues.push(format!("{}.id", path), format!("duplicate node id '{}'", id));
    }

    if let Some(position) = require(node, path, "position", Kind::Object, issues) {
        let position_path = format!("{}.position", path);
        if let Some(position) = position.as_object() {
            require(position, &position_path, "x", Kind::Number, issues);
            require(position, &position_path, "y", Kind::Number, issues);
        }
    }

    let node_type = require(node, path, "type", Kind::String, issues).and_then(Value::as_str);
    let Some(data) = require(node, path, "data", Kind::Object, issues).and_then(Value::as_object)
    else {
        return;
    };
    let data_path = format!("{}.data", path);

    let data_id = require(data, &data_path, "id", Kind::String, issues).and_then(Value::as_str);
    if let (Some(id), Some(data_id)) = (id, data_id)
        && id != data_id
    {
        issues.push(
            format!("{}.id", data_path),
            format!("'{}' does not match node id '{}'", data_id, id),
        );
    }

    match node_type {
        Some("invocation") => check_invocation_data(&data_path, data, issues),
        Some("notes") => {
            optional(data, &data_path, "notes", Kind::String, issues);
        }
        Some(other) => issues.push(
            format!("{}.type", path),
            format!("expected 'invocation' or 'notes', found '{}'", other),
        ),
        None => {}
    }
}

fn check_invocation_data(path: &str, data: &Map<String, Value>, issues: &mut SchemaIssues) {
    require(data, path, "type", Kind::String, issues);
    if let Some(version) = require(data, path, "version", Kind::String, issues)
        .and_then(Value::as_str)
        && Version::parse(version).is_err()
    {
        issues.push(
            format!("{}.version", path),
            format!("'{}' is not a semantic version", version),
        );
    }
    for key in ["label", "notes"] {
        optional(data, path, key, Kind::String, issues);
    }
    for key in ["isOpen", "isIntermediate", "useCache"] {
        optional(data, path, key, Kind::Bool, issues);
    }

    let Some(inputs) =
        optional(data, path, "inputs", Kind::Object, issues).and_then(Value::as_object)
    else {
        return;
    };
    for (name, input) in inputs {
        let input_path = format!("{}.inputs.{}", path, name);
        let Some(input) = object_at(&input_path, input, issues) else {
            continue;
        };
        if let Some(declared) = require(input, &input_path, "name", Kind::String, issues)
            .and_then(Value::as_str)
            && declared != name
        {
            issues.push(
                format!("{}.name", input_path),
                format!("'{}' does not match its key", declared),
            );
        }
        optional(input, &input_path, "label", Kind::String, issues);
    }
}

fn check_edge<'a>(
    path: &str,
    edge: &'a Value,
    edge_ids: &mut AHashSet<&'a str>,
    issues: &mut SchemaIssues,
) {
    let Some(edge) = object_at(path, edge, issues) else {
        return;
    };
    if let Some(id) = require(edge, path, "id", Kind::String, issues).and_then(Value::as_str)
        && !edge_ids.insert(id)
    {
        issues.push(format!("{}.id", path), format!("duplicate edge id '{}'", id));
    }
    require(edge, path, "source", Kind::String, issues);
    require(edge, path, "target", Kind::String, issues);

    match require(edge, path, "type", Kind::String, issues).and_then(Value::as_str) {
        Some("default") => {
            require(edge, path, "sourceHandle", Kind::String, issues);
            require(edge, path, "targetHandle", Kind::String, issues);
        }
        Some("collapsed") | None => {}
        Some(other) => issues.push(
            format!("{}.type", path),
            format!("expected 'default' or 'collapsed', found '{}'", other),
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    Number,
    Bool,
    Object,
    Array,
}

impl Kind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::Number => value.is_number(),
            Kind::Bool => value.is_boolean(),
            Kind::Object => value.is_object(),
            Kind::Array => value.is_array(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Kind::String => "a string",
            Kind::Number => "a number",
            Kind::Bool => "a boolean",
            Kind::Object => "an object",
            Kind::Array => "an array",
        }
    }
}

fn object_at<'a>(
    path: &str,
    value: &'a Value,
    issues: &mut SchemaIssues,
) -> Option<&'a Map<String, Value>> {
    let object = value.as_object();
    if object.is_none() {
        issues.push(path, "expected an object");
    }
    object
}

fn require<'a>(
    object: &'a Map<String, Value>,
    path: &str,
    key: &str,
    kind: Kind,
    issues: &mut SchemaIssues,
) -> Option<&'a Value> {
    match object.get(key) {
        None => {
            issues.push(join(path, key), "is required");
            None
        }
        Some(value) => typed(value, path, key, kind, issues),
    }
}

fn optional<'a>(
    object: &'a Map<String, Value>,
    path: &str,
    key: &str,
    kind: Kind,
    issues: &mut SchemaIssues,
) -> Option<&'a Value> {
    object
        .get(key)
        .and_then(|value| typed(value, path, key, kind, issues))
}

fn typed<'a>(
    value: &'a Value,
    path: &str,
    key: &str,
    kind: Kind,
    issues: &mut SchemaIssues,
) -> Option<&'a Value> {
    if kind.matches(value) {
        Some(value)
    } else {
        issues.push(join(path, key), format!("expected {}", kind.name()));
        None
    }
}

fn join(path: &str, key: &str) -> String {
    if path == "$" {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}
