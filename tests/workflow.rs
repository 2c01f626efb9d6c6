//! Tests for loading workflow and graph documents: version gate, migration,
//! structural validation, reference checks and graph conversion.
mod common;
use assert_matches::assert_matches;
use common::{
    DenyImages, PartialOutage, Unreachable, current_workflow, sd_model, state_with_model,
    v1_workflow,
};
use genflow::workflow::{
    CURRENT_VERSION, NODE_SPACING, NODE_WIDTH, ResourceRef, WorkflowCategory, WorkflowEdge,
    WorkflowNode, detect_version, migrate, validate_structure,
};
use genflow::graph::catalog;
use genflow::prelude::*;
use genflow::templates::FieldType;
use genflow::workflow::migrations::v1_field_type;
use serde_json::{Value, json};
use tokio_test::block_on;

fn load(
    document: &Value,
    templates: &Templates,
) -> std::result::Result<ValidatedWorkflow, WorkflowError> {
    let validator = WorkflowValidator::builder(templates).build();
    block_on(validator.validate_workflow(&document.to_string()))
}

fn input_value<'a>(workflow: &'a Workflow, node_id: &str, field: &str) -> &'a Value {
    let Some(WorkflowNode::Invocation(node)) = workflow.node(node_id) else {
        panic!("missing invocation node {}", node_id);
    };
    &node.data.inputs[field].value
}

// --- Version gate ---

#[test]
fn test_unknown_version_is_terminal() {
    let templates = Templates::builtin();
    let mut document = current_workflow("cat.png");
    document["meta"]["version"] = json!("unknown-future-version");

    assert_matches!(
        load(&document, &templates),
        Err(WorkflowError::Version(v)) if v == "unknown-future-version"
    );
}

#[test]
fn test_unsupported_semver_is_terminal() {
    let mut document = current_workflow("cat.png");
    document["meta"]["version"] = json!("4.0.0");
    assert_matches!(detect_version(&document), Err(WorkflowError::Version(_)));

    document["meta"]["version"] = json!(3);
    assert_matches!(detect_version(&document), Err(WorkflowError::Version(_)));

    document.as_object_mut().unwrap().remove("meta");
    assert_matches!(detect_version(&document), Err(WorkflowError::Version(_)));
}

#[test]
fn test_malformed_json_is_a_parse_error() {
    let templates = Templates::builtin();
    let validator = WorkflowValidator::builder(&templates).build();
    assert_matches!(
        block_on(validator.validate_workflow("{ not json")),
        Err(WorkflowError::Parse(_))
    );
}

// --- Migration ---

#[test]
fn test_current_document_migration_is_a_no_op() {
    let templates = Templates::builtin();
    let document = current_workflow("cat.png");

    let (migrated, from) = migrate(document.clone(), &templates).unwrap();
    assert_eq!(migrated, document);
    assert_eq!(from, None);

    let (again, _) = migrate(migrated.clone(), &templates).unwrap();
    assert_eq!(again, migrated);
}

#[test]
fn test_v1_document_migrates_to_current() {
    let templates = Templates::builtin();
    let (migrated, from) = migrate(v1_workflow(), &templates).unwrap();

    assert_eq!(from.map(|v| v.to_string()).as_deref(), Some("1.0.0"));
    assert_eq!(migrated["meta"]["version"], CURRENT_VERSION);
    assert_eq!(migrated["meta"]["category"], "user");

    let data = &migrated["nodes"][0]["data"];
    assert_eq!(data["nodePack"], "invokeai");
    assert_eq!(data["version"], "1.0.0");
    assert!(data.get("outputs").is_none());
    assert_eq!(
        data["inputs"]["image"],
        json!({ "name": "image", "label": "", "value": { "image_name": "cat.png" } })
    );

    // Migrating the result again changes nothing.
    let (again, from) = migrate(migrated.clone(), &templates).unwrap();
    assert_eq!(again, migrated);
    assert_eq!(from, None);
}

#[test]
fn test_v1_nodes_without_templates_get_unknown_pack() {
    let mut document = v1_workflow();
    document["nodes"][1]["data"]["type"] = json!("community_node");

    let (migrated, _) = migrate(document, &Templates::builtin()).unwrap();
    assert_eq!(migrated["nodes"][1]["data"]["nodePack"], "unknown");
}

#[test]
fn test_v1_unknown_field_type_fails_migration() {
    let mut document = v1_workflow();
    document["nodes"][0]["data"]["inputs"]["image"]["type"] = json!("HologramField");

    assert_matches!(
        migrate(document, &Templates::builtin()),
        Err(WorkflowError::Migration { from, to, reason })
            if from == "1.0.0" && to == "2.0.0" && reason.contains("HologramField")
    );
}

#[test]
fn test_v1_field_types_cover_every_family() {
    let cases = [
        ("SDXLRefinerModelField", FieldType::single(catalog::SDXL_REFINER_MODEL)),
        ("ONNXModelField", FieldType::single(catalog::ONNX_MODEL)),
        ("T2IAdapterModelField", FieldType::single(catalog::T2I_ADAPTER_MODEL)),
        ("MetadataItemField", FieldType::single(catalog::METADATA_ITEM)),
        ("MetadataItemCollection", FieldType::collection(catalog::METADATA_ITEM)),
        (
            "MetadataItemPolymorphic",
            FieldType::collection_or_scalar(catalog::METADATA_ITEM),
        ),
        ("MetadataDict", FieldType::single(catalog::METADATA)),
        ("MetadataCollection", FieldType::collection(catalog::METADATA)),
        ("IPAdapterCollection", FieldType::collection(catalog::IP_ADAPTER)),
        ("T2IAdapterCollection", FieldType::collection(catalog::T2I_ADAPTER)),
    ];
    for (v1_type, expected) in cases {
        assert_eq!(v1_field_type(v1_type), Some(expected), "{}", v1_type);
    }
}

#[test]
fn test_v1_documents_with_less_common_field_types_migrate() {
    for v1_type in [
        "SDXLRefinerModelField",
        "ONNXModelField",
        "MetadataItemField",
        "MetadataItemCollection",
        "MetadataItemPolymorphic",
        "MetadataDict",
        "MetadataCollection",
        "IPAdapterCollection",
        "T2IAdapterCollection",
        "T2IAdapterModelField",
    ] {
        let mut document = v1_workflow();
        document["nodes"][0]["data"]["inputs"]["extra"] = json!({
            "id": "extra-id",
            "name": "extra",
            "type": v1_type,
            "label": "",
            "value": null
        });

        let (migrated, from) = migrate(document, &Templates::builtin())
            .unwrap_or_else(|e| panic!("{} failed to migrate: {}", v1_type, e));
        assert_eq!(from.map(|v| v.to_string()).as_deref(), Some("1.0.0"));
        assert_eq!(
            migrated["nodes"][0]["data"]["inputs"]["extra"],
            json!({ "name": "extra", "label": "", "value": null })
        );
    }
}

#[test]
fn test_v1_workflow_loads_end_to_end() {
    let templates = Templates::builtin();
    let loaded = load(&v1_workflow(), &templates).unwrap();

    assert_eq!(loaded.migrated_from.map(|v| v.to_string()).as_deref(), Some("1.0.0"));
    assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);

    let workflow = &loaded.workflow;
    assert_eq!(workflow.meta.version, CURRENT_VERSION);
    assert_eq!(workflow.meta.category, WorkflowCategory::User);
    assert_eq!(workflow.nodes.len(), 3);
    assert_matches!(workflow.node("note"), Some(WorkflowNode::Notes(_)));
    assert_eq!(input_value(workflow, "resize", "width"), &json!(768));
    assert_eq!(workflow.edges.len(), 1);
}

// --- Structural validation ---

#[test]
fn test_schema_issues_are_aggregated() {
    let mut document = current_workflow("cat.png");
    let root = document.as_object_mut().unwrap();
    root.remove("name");
    root["nodes"][1].as_object_mut().unwrap().remove("position");
    root["nodes"][1]["data"]["version"] = json!("not-a-version");
    root["edges"][0]["type"] = json!("dotted");

    let Err(WorkflowError::SchemaValidation(issues)) = validate_structure(&document) else {
        panic!("expected schema issues");
    };
    let paths: Vec<&str> = issues.iter().map(|issue| issue.path.as_str()).collect();
    assert_eq!(issues.len(), 4, "{}", issues);
    assert!(paths.contains(&"name"));
    assert!(paths.contains(&"nodes[1].position"));
    assert!(paths.contains(&"nodes[1].data.version"));
    assert!(paths.contains(&"edges[0].type"));
}

#[test]
fn test_duplicate_node_ids_fail_validation() {
    let mut document = current_workflow("cat.png");
    document["nodes"][1]["id"] = json!("img");
    document["nodes"][1]["data"]["id"] = json!("img");

    let templates = Templates::builtin();
    assert_matches!(
        load(&document, &templates),
        Err(WorkflowError::SchemaValidation(issues))
            if issues.iter().any(|issue| issue.message.contains("duplicate node id"))
    );
}

#[test]
fn test_exposed_field_must_reference_a_node() {
    let mut document = current_workflow("cat.png");
    document["exposedFields"] = json!([{ "nodeId": "ghost", "fieldName": "width" }]);

    let Err(WorkflowError::SchemaValidation(issues)) = validate_structure(&document) else {
        panic!("expected schema issues");
    };
    assert_eq!(issues.len(), 1);
    assert!(issues.to_string().contains("ghost"));
}

// --- Template checks ---

#[test]
fn test_unknown_node_type_is_a_warning() {
    let mut document = current_workflow("cat.png");
    document["nodes"][1]["data"]["type"] = json!("community_upscaler");

    let templates = Templates::builtin();
    let loaded = load(&document, &templates).unwrap();
    assert!(loaded.warnings.contains(&WorkflowWarning::UnknownNodeType {
        node_id: "resize".to_string(),
        node_type: "community_upscaler".to_string(),
    }));
    assert_eq!(loaded.workflow.edges.len(), 1, "edges to unknown types are kept");
}

#[test]
fn test_major_version_mismatch_is_a_warning() {
    let mut document = current_workflow("cat.png");
    document["nodes"][1]["data"]["version"] = json!("2.0.0");

    let loaded = load(&document, &Templates::builtin()).unwrap();
    assert_matches!(
        loaded.warnings.as_slice(),
        [WorkflowWarning::NodeVersionMismatch { node_id, template_version, .. }]
            if node_id == "resize" && template_version == "1.2.2"
    );
}

#[test]
fn test_invalid_edges_are_dropped_with_a_warning() {
    let mut document = current_workflow("cat.png");
    document["edges"][0]["targetHandle"] = json!("no_such_input");

    let loaded = load(&document, &Templates::builtin()).unwrap();
    assert!(loaded.workflow.edges.is_empty());
    assert_matches!(
        loaded.warnings.as_slice(),
        [WorkflowWarning::InvalidEdge { edge_id, reason }]
            if edge_id == "reactflow__edge-imgimage-resizeimage" && reason.contains("no_such_input")
    );
}

#[test]
fn test_cycles_are_a_warning() {
    let mut document = current_workflow("cat.png");
    document["edges"].as_array_mut().unwrap().push(json!({
        "id": "reactflow__edge-resizeimage-imgimage",
        "type": "default",
        "source": "resize",
        "target": "img",
        "sourceHandle": "image",
        "targetHandle": "image"
    }));

    let loaded = load(&document, &Templates::builtin()).unwrap();
    assert_eq!(
        loaded.warnings,
        vec![WorkflowWarning::Cycle {
            node_ids: vec!["img".to_string(), "resize".to_string()],
        }]
    );
    assert_eq!(loaded.workflow.edges.len(), 2);
}

// --- Reference checks ---

#[test]
fn test_inaccessible_image_yields_exactly_one_warning() {
    let templates = Templates::builtin();
    let checker = DenyImages(vec!["missing.png"]);
    let validator = WorkflowValidator::builder(&templates)
        .with_checker(&checker)
        .build();

    let document = current_workflow("missing.png").to_string();
    let loaded = block_on(validator.validate_workflow(&document)).unwrap();

    assert_eq!(loaded.warnings.len(), 1);
    assert_matches!(
        &loaded.warnings[0],
        WorkflowWarning::InaccessibleResource { node_id, field, resource: ResourceRef::Image(name) }
            if node_id == "img" && field == "image" && name == "missing.png"
    );
    assert!(loaded.warnings[0].to_string().contains("missing.png"));

    // The workflow is still usable; only the dead reference is cleared.
    assert_eq!(input_value(&loaded.workflow, "img", "image"), &Value::Null);
    assert_eq!(loaded.workflow.nodes.len(), 2);
    assert_eq!(loaded.workflow.edges.len(), 1);
}

#[test]
fn test_accessible_references_produce_no_warnings() {
    let templates = Templates::builtin();
    let checker = DenyImages(vec!["someone-else.png"]);
    let validator = WorkflowValidator::builder(&templates)
        .with_checker(&checker)
        .build();

    let document = current_workflow("cat.png").to_string();
    let loaded = block_on(validator.validate_workflow(&document)).unwrap();
    assert!(loaded.warnings.is_empty());
    assert_eq!(
        input_value(&loaded.workflow, "img", "image"),
        &json!({ "image_name": "cat.png" })
    );
}

#[test]
fn test_failed_checks_keep_the_value() {
    let templates = Templates::builtin();
    let validator = WorkflowValidator::builder(&templates)
        .with_checker(&Unreachable)
        .build();

    let document = current_workflow("cat.png").to_string();
    let loaded = block_on(validator.validate_workflow(&document)).unwrap();

    assert_matches!(
        loaded.warnings.as_slice(),
        [WorkflowWarning::ResourceCheckFailed { node_id, error, .. }]
            if node_id == "img" && error.0 == "connection refused"
    );
    assert_eq!(
        input_value(&loaded.workflow, "img", "image"),
        &json!({ "image_name": "cat.png" })
    );
}

#[test]
fn test_checks_are_isolated_across_resource_kinds() {
    let templates = Templates::builtin();
    let validator = WorkflowValidator::builder(&templates)
        .with_checker(&PartialOutage)
        .build();

    let mut document = current_workflow("cat.png");
    document["nodes"][1]["data"]["inputs"]["board"] =
        json!({ "name": "board", "label": "", "value": { "board_id": "b1" } });
    document["nodes"].as_array_mut().unwrap().push(json!({
        "id": "loader",
        "type": "invocation",
        "position": { "x": 0.0, "y": 300.0 },
        "data": {
            "id": "loader",
            "type": "main_model_loader",
            "version": "1.0.2",
            "label": "",
            "notes": "",
            "isOpen": true,
            "isIntermediate": true,
            "useCache": true,
            "nodePack": "invokeai",
            "inputs": {
                "model": {
                    "name": "model",
                    "label": "",
                    "value": serde_json::to_value(sd_model()).unwrap()
                }
            }
        }
    }));

    let loaded = block_on(validator.validate_workflow(&document.to_string())).unwrap();
    assert_eq!(loaded.warnings.len(), 3, "{:?}", loaded.warnings);
    assert!(loaded.warnings.iter().any(|warning| matches!(
        warning,
        WorkflowWarning::ResourceCheckFailed { node_id, resource: ResourceRef::Image(name), .. }
            if node_id == "img" && name == "cat.png"
    )));
    assert!(loaded.warnings.contains(&WorkflowWarning::InaccessibleResource {
        node_id: "resize".to_string(),
        field: "board".to_string(),
        resource: ResourceRef::Board("b1".to_string()),
    }));
    assert!(loaded.warnings.contains(&WorkflowWarning::InaccessibleResource {
        node_id: "loader".to_string(),
        field: "model".to_string(),
        resource: ResourceRef::Model("sd15-key".to_string()),
    }));

    let workflow = &loaded.workflow;
    assert_eq!(input_value(workflow, "img", "image"), &json!({ "image_name": "cat.png" }));
    assert_eq!(input_value(workflow, "resize", "board"), &Value::Null);
    assert_eq!(input_value(workflow, "loader", "model"), &Value::Null);
}

#[test]
fn test_inaccessible_collection_items_are_removed() {
    let templates = Templates::builtin();
    let checker = DenyImages(vec!["b.png", "d.png"]);
    let validator = WorkflowValidator::builder(&templates)
        .with_checker(&checker)
        .build();

    let mut document = current_workflow("a.png");
    document["nodes"][0]["data"]["inputs"]["image"]["value"] = json!([
        { "image_name": "a.png" },
        { "image_name": "b.png" },
        { "image_name": "c.png" },
        { "image_name": "d.png" }
    ]);

    let loaded = block_on(validator.validate_workflow(&document.to_string())).unwrap();
    assert_eq!(loaded.warnings.len(), 2);
    assert_eq!(
        input_value(&loaded.workflow, "img", "image"),
        &json!([{ "image_name": "a.png" }, { "image_name": "c.png" }])
    );
}

// --- Graph conversion ---

#[test]
fn test_graph_to_workflow_layout_and_edges() {
    let built = build_text_to_image_graph(&state_with_model(sd_model())).unwrap();
    let document = GraphDocument::try_from(&built.graph.get_graph()).unwrap();
    let workflow = graph_to_workflow(&document, &Templates::builtin()).unwrap();

    assert_eq!(workflow.id, None);
    assert_eq!(workflow.meta.version, CURRENT_VERSION);
    assert_eq!(workflow.nodes.len(), document.nodes.len());
    assert_eq!(workflow.edges.len(), document.edges.len());

    let column = NODE_WIDTH + NODE_SPACING;
    let x = |id: &str| workflow.node(id).unwrap().position().x;
    assert_eq!(x("main_model_loader"), 0.0);
    assert_eq!(x("noise"), 0.0);
    assert_eq!(x("positive_conditioning"), column);
    assert_eq!(x("denoise_latents"), 2.0 * column);
    assert_eq!(x("latents_to_image"), 3.0 * column);

    assert!(workflow.edges.iter().any(|edge| edge.id()
        == "reactflow__edge-noisenoise-denoise_latentsnoise"));
    assert!(workflow
        .edges
        .iter()
        .all(|edge| matches!(edge, WorkflowEdge::Default(_))));

    let Some(WorkflowNode::Invocation(output)) = workflow.node("latents_to_image") else {
        panic!("missing output node");
    };
    assert!(!output.data.is_intermediate);
    assert_eq!(output.data.version, "1.2.2");
    assert_eq!(output.data.node_pack.as_deref(), Some("invokeai"));
    assert_eq!(output.data.inputs["fp32"].value, json!(false));

    // Metadata keys become inputs of the open metadata node.
    assert_eq!(
        input_value(&workflow, "core_metadata", "generation_mode"),
        &json!("txt2img")
    );
}

#[test]
fn test_graph_with_unknown_node_type_fails_conversion() {
    let document: GraphDocument = serde_json::from_value(json!({
        "id": "g",
        "nodes": { "x": { "id": "x", "type": "mystery_node" } },
        "edges": []
    }))
    .unwrap();

    assert_matches!(
        graph_to_workflow(&document, &Templates::builtin()),
        Err(WorkflowError::UnknownNodeType { node_id, node_type })
            if node_id == "x" && node_type == "mystery_node"
    );
}

#[test]
fn test_load_detects_graph_documents() {
    let built = build_text_to_image_graph(&state_with_model(sd_model())).unwrap();
    let text = serde_json::to_string(&built.graph.get_graph()).unwrap();

    let templates = Templates::builtin();
    let validator = WorkflowValidator::builder(&templates).build();
    let loaded = block_on(validator.load(&text)).unwrap();

    assert_eq!(loaded.migrated_from, None);
    assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);
    assert_eq!(loaded.workflow.nodes.len(), built.graph.nodes().count());

    // Workflow documents still go through the version gate.
    let workflow = current_workflow("cat.png").to_string();
    let loaded = block_on(validator.load(&workflow)).unwrap();
    assert_eq!(loaded.workflow.name, "Resize an image");
}

#[test]
fn test_custom_templates_extend_the_builtin_set() {
    let custom = Templates::from_json(
        &json!({
            "community_upscaler": {
                "type": "community_upscaler",
                "version": "1.0.0",
                "nodePack": "community",
                "inputs": {
                    "image": { "name": "image", "type": { "name": "ImageField", "isCollection": false, "isCollectionOrScalar": false } }
                },
                "outputs": {}
            }
        })
        .to_string(),
    )
    .unwrap();
    let template = custom.get("community_upscaler").unwrap().clone();
    let templates = Templates::builtin().with_template(template);
    assert!(templates.contains("community_upscaler"));
    assert!(templates.contains("esrgan"));

    let mut document = current_workflow("cat.png");
    document["nodes"][1]["data"]["type"] = json!("community_upscaler");
    document["nodes"][1]["data"]["version"] = json!("1.0.0");
    let loaded = load(&document, &templates).unwrap();
    assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);
}
