//! The schema migration chain: `1.0.0 -> 2.0.0 -> 3.0.0`.
//!
//! Migrations operate on the raw JSON document so that older shapes never need
//! a typed model of their own.

use crate::error::WorkflowError;
use crate::graph::catalog;
use crate::templates::{FieldType, Templates};
use semver::Version;
use serde_json::{Map, Value, json};

pub const CURRENT_VERSION: &str = "3.0.0";
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0.0", "2.0.0", CURRENT_VERSION];

/// Node pack recorded for v1 nodes whose type has no template.
pub const UNKNOWN_NODE_PACK: &str = "unknown";

type MigrationFn = fn(&mut Map<String, Value>, &Templates) -> Result<(), String>;

// Each step upgrades a document from `from` to `to`. Ordered.
const MIGRATIONS: &[(&str, &str, MigrationFn)] = &[
    ("1.0.0", "2.0.0", migrate_v1_to_v2),
    ("2.0.0", "3.0.0", migrate_v2_to_v3),
];

/// Reads and checks `meta.version`. Anything outside `SUPPORTED_VERSIONS` is a
/// terminal `WorkflowError::Version`.
pub fn detect_version(document: &Value) -> Result<Version, WorkflowError> {
    let raw = document
        .get("meta")
        .and_then(|meta| meta.get("version"))
        .ok_or_else(|| WorkflowError::Version("missing meta.version".to_string()))?;
    let raw = raw
        .as_str()
        .ok_or_else(|| WorkflowError::Version(format!("meta.version {} is not a string", raw)))?;

    let version = Version::parse(raw).map_err(|_| WorkflowError::Version(raw.to_string()))?;
    if !SUPPORTED_VERSIONS.contains(&version.to_string().as_str()) {
        return Err(WorkflowError::Version(raw.to_string()));
    }
    Ok(version)
}

/// Upgrades `document` to the current version.
///
/// Returns the version the document was migrated from, or `None` when it was
/// already current (in which case it is returned untouched).
pub fn migrate(
    document: Value,
    templates: &Templates,
) -> Result<(Value, Option<Version>), WorkflowError> {
    let original = detect_version(&document)?;
    if original.to_string() == CURRENT_VERSION {
        return Ok((document, None));
    }

    let mut document = document;
    let mut version = original.to_string();
    for (from, to, step) in MIGRATIONS {
        if version != *from {
            continue;
        }
        let failure = |reason: String| WorkflowError::Migration {
            from: from.to_string(),
            to: to.to_string(),
            reason,
        };
        let root = document
            .as_object_mut()
            .ok_or_else(|| failure("document is not an object".to_string()))?;
        step(root, templates).map_err(failure)?;
        set_meta_version(root, to).map_err(failure)?;

        tracing::debug!(from = *from, to = *to, "Migrated workflow");
        version = to.to_string();
    }

    Ok((document, Some(original)))
}

fn set_meta_version(root: &mut Map<String, Value>, version: &str) -> Result<(), String> {
    let meta = root
        .get_mut("meta")
        .and_then(Value::as_object_mut)
        .ok_or("meta is not an object")?;
    meta.insert("version".to_string(), json!(version));
    Ok(())
}

// Invocation node `data` objects, or an error naming the offending node.
fn invocation_data<'a>(
    root: &'a mut Map<String, Value>,
) -> Result<Vec<&'a mut Map<String, Value>>, String> {
    let nodes = root
        .get_mut("nodes")
        .and_then(Value::as_array_mut)
        .ok_or("nodes is not an array")?;

    let mut data = Vec::with_capacity(nodes.len());
    for (index, node) in nodes.iter_mut().enumerate() {
        let node = node
            .as_object_mut()
            .ok_or_else(|| format!("nodes[{}] is not an object", index))?;
        if node.get("type").and_then(Value::as_str) != Some("invocation") {
            continue;
        }
        let node_data = node
            .get_mut("data")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| format!("nodes[{}].data is not an object", index))?;
        data.push(node_data);
    }
    Ok(data)
}

fn fields_mut<'a>(
    data: &'a mut Map<String, Value>,
    key: &str,
) -> Result<Option<&'a mut Map<String, Value>>, String> {
    match data.get_mut(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(fields)) => Ok(Some(fields)),
        Some(_) => Err(format!("node {} is not an object", key)),
    }
}

/// Maps a v1 string field type onto its v2 structured form.
pub fn v1_field_type(name: &str) -> Option<FieldType> {
    use catalog::*;

    let single = |name: &str| FieldType::single(name);
    let collection = |name: &str| FieldType::collection(name);
    let polymorphic = |name: &str| FieldType::collection_or_scalar(name);

    Some(match name {
        "integer" => single(INTEGER),
        "float" => single(FLOAT),
        "string" => single(STRING),
        "boolean" => single(BOOLEAN),
        "enum" => single(ENUM),
        "Scheduler" => single(SCHEDULER),
        "ImageField" => single(IMAGE),
        "BoardField" => single(BOARD),
        "ColorField" => single(COLOR),
        "LatentsField" => single(LATENTS),
        "ConditioningField" => single(CONDITIONING),
        "UNetField" => single(UNET),
        "ClipField" => single(CLIP),
        "VaeField" => single(VAE),
        "ControlField" => single(CONTROL),
        "IPAdapterField" => single(IP_ADAPTER),
        "T2IAdapterField" => single(T2I_ADAPTER),
        "DenoiseMaskField" => single(DENOISE_MASK),
        "MetadataField" => single(METADATA),
        "MainModelField" => single(MAIN_MODEL),
        "SDXLMainModelField" => single(SDXL_MAIN_MODEL),
        "VaeModelField" => single(VAE_MODEL),
        "LoRAModelField" => single(LORA_MODEL),
        "ControlNetModelField" => single(CONTROLNET_MODEL),
        "IPAdapterModelField" => single(IP_ADAPTER_MODEL),
        "T2IAdapterModelField" => single(T2I_ADAPTER_MODEL),
        "SDXLRefinerModelField" => single(SDXL_REFINER_MODEL),
        "ONNXModelField" => single(ONNX_MODEL),
        "MetadataItemField" => single(METADATA_ITEM),
        "MetadataItemCollection" => collection(METADATA_ITEM),
        "MetadataItemPolymorphic" => polymorphic(METADATA_ITEM),
        "MetadataDict" => single(METADATA),
        "MetadataCollection" => collection(METADATA),
        "Collection" => collection(COLLECTION),
        "CollectionItem" => single(COLLECTION_ITEM),
        "IntegerCollection" => collection(INTEGER),
        "FloatCollection" => collection(FLOAT),
        "StringCollection" => collection(STRING),
        "BooleanCollection" => collection(BOOLEAN),
        "ImageCollection" => collection(IMAGE),
        "LatentsCollection" => collection(LATENTS),
        "ConditioningCollection" => collection(CONDITIONING),
        "ColorCollection" => collection(COLOR),
        "ControlCollection" => collection(CONTROL),
        "IPAdapterCollection" => collection(IP_ADAPTER),
        "T2IAdapterCollection" => collection(T2I_ADAPTER),
        "IntegerPolymorphic" => polymorphic(INTEGER),
        "FloatPolymorphic" => polymorphic(FLOAT),
        "StringPolymorphic" => polymorphic(STRING),
        "BooleanPolymorphic" => polymorphic(BOOLEAN),
        "ImagePolymorphic" => polymorphic(IMAGE),
        "LatentsPolymorphic" => polymorphic(LATENTS),
        "ConditioningPolymorphic" => polymorphic(CONDITIONING),
        "ColorPolymorphic" => polymorphic(COLOR),
        "ControlPolymorphic" => polymorphic(CONTROL),
        "IPAdapterPolymorphic" => polymorphic(IP_ADAPTER),
        "T2IAdapterPolymorphic" => polymorphic(T2I_ADAPTER),
        _ => return None,
    })
}

fn migrate_v1_to_v2(root: &mut Map<String, Value>, templates: &Templates) -> Result<(), String> {
    for data in invocation_data(root)? {
        let node_id = data
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        for key in ["inputs", "outputs"] {
            let Some(fields) = fields_mut(data, key)? else {
                continue;
            };
            for (name, field) in fields.iter_mut() {
                let field = field
                    .as_object_mut()
                    .ok_or_else(|| format!("field '{}.{}' is not an object", node_id, name))?;
                let Some(raw) = field.get("type") else {
                    continue;
                };
                let raw = raw.as_str().ok_or_else(|| {
                    format!("field '{}.{}' has a non-string type", node_id, name)
                })?;
                let field_type = v1_field_type(raw).ok_or_else(|| {
                    format!("field '{}.{}' has unknown type '{}'", node_id, name, raw)
                })?;
                field.insert("type".to_string(), json!(field_type));
            }
        }

        let node_pack = data
            .get("type")
            .and_then(Value::as_str)
            .and_then(|node_type| templates.get(node_type))
            .map_or(UNKNOWN_NODE_PACK, |template| template.node_pack.as_str())
            .to_string();
        data.insert("nodePack".to_string(), json!(node_pack));
        if !data.get("version").is_some_and(Value::is_string) {
            data.insert("version".to_string(), json!("1.0.0"));
        }
    }

    let meta = root
        .get_mut("meta")
        .and_then(Value::as_object_mut)
        .ok_or("meta is not an object")?;
    meta.insert("category".to_string(), json!("user"));
    Ok(())
}

fn migrate_v2_to_v3(root: &mut Map<String, Value>, _templates: &Templates) -> Result<(), String> {
    for data in invocation_data(root)? {
        data.remove("outputs");
        let Some(inputs) = fields_mut(data, "inputs")? else {
            continue;
        };
        for (name, input) in inputs.iter_mut() {
            let input = input
                .as_object_mut()
                .ok_or_else(|| format!("input '{}' is not an object", name))?;
            input.retain(|key, _| matches!(key.as_str(), "name" | "label" | "value"));
        }
    }
    Ok(())
}
