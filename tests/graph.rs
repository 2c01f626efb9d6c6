//! Tests for the `Graph` accumulator: node and edge invariants, metadata and validation.
mod common;
use assert_matches::assert_matches;
use genflow::graph::{
    Collect, CoreMetadata, DenoiseLatents, GraphIssue, ImagePrimitive, LatentsToImage,
    METADATA_NODE_ID, Noise, prefixed_id,
};
use genflow::graph::topology;
use genflow::prelude::*;
use serde_json::{Map, json};

fn noise(id: &str) -> Noise {
    Noise {
        id: id.to_string(),
        width: 512,
        height: 512,
        ..Default::default()
    }
}

fn denoise(id: &str) -> DenoiseLatents {
    DenoiseLatents {
        id: id.to_string(),
        steps: 30,
        ..Default::default()
    }
}

fn decode(id: &str) -> LatentsToImage {
    LatentsToImage {
        id: id.to_string(),
        ..Default::default()
    }
}

fn metadata(entries: &[(&str, serde_json::Value)]) -> Map<String, serde_json::Value> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[test]
fn test_duplicate_node_id_is_rejected() {
    let mut graph = Graph::new("test");
    graph.add_node(noise("noise")).unwrap();

    let result = graph.add_node(noise("noise"));
    assert_matches!(result, Err(GraphError::DuplicateNode(id)) if id == "noise");
    assert_eq!(graph.nodes().count(), 1);
}

#[test]
fn test_duplicate_id_across_node_types_is_rejected() {
    let mut graph = Graph::new("test");
    graph.add_node(noise("shared")).unwrap();
    assert_matches!(
        graph.add_node(decode("shared")),
        Err(GraphError::DuplicateNode(_))
    );
}

#[test]
fn test_typed_node_access() {
    let mut graph = Graph::new("test");
    graph.add_node(denoise("denoise")).unwrap();

    assert_eq!(graph.node::<DenoiseLatents>("denoise").unwrap().steps, 30);
    graph.node_mut::<DenoiseLatents>("denoise").unwrap().steps = 12;
    assert_eq!(graph.node::<DenoiseLatents>("denoise").unwrap().steps, 12);

    assert_matches!(
        graph.node::<Noise>("denoise"),
        Err(GraphError::NodeTypeMismatch { expected: "noise", found: "denoise_latents", .. })
    );
    assert_matches!(
        graph.node::<Noise>("missing"),
        Err(GraphError::NodeNotFound { node_id, .. }) if node_id == "missing"
    );
}

#[test]
fn test_connect_checks_fields_against_catalog() {
    let mut graph = Graph::new("test");
    let n = graph.add_node(noise("noise")).unwrap();
    let d = graph.add_node(denoise("denoise")).unwrap();

    graph.connect(&n, "noise", &d, "noise").unwrap();
    assert_eq!(graph.edges().len(), 1);

    assert_matches!(
        graph.connect(&n, "latents", &d, "noise"),
        Err(GraphError::UnknownField { direction: "output", field, .. }) if field == "latents"
    );
    assert_matches!(
        graph.connect(&n, "noise", &d, "not_a_field"),
        Err(GraphError::UnknownField { direction: "input", field, .. }) if field == "not_a_field"
    );
    assert_matches!(
        graph.connect(&n, "noise", &d, "noise"),
        Err(GraphError::DuplicateEdge(_))
    );
    assert_eq!(graph.edges().len(), 1);
}

#[test]
fn test_edge_to_missing_node_is_rejected() {
    let mut graph = Graph::new("test");
    graph.add_node(noise("noise")).unwrap();

    let result = graph.add_edge(Edge::new("noise", "noise", "ghost", "noise"));
    assert_matches!(result, Err(GraphError::NodeNotFound { node_id, .. }) if node_id == "ghost");
}

#[test]
fn test_edge_queries_and_deletion() {
    let mut graph = Graph::new("test");
    let n = graph.add_node(noise("noise")).unwrap();
    let d = graph.add_node(denoise("denoise")).unwrap();
    let l = graph.add_node(decode("l2i")).unwrap();
    graph.connect(&n, "noise", &d, "noise").unwrap();
    graph.connect(&d, "latents", &l, "latents").unwrap();

    assert_eq!(graph.edges_to("denoise", None).len(), 1);
    assert_eq!(graph.edges_to("denoise", Some(&["unet"])).len(), 0);
    assert_eq!(graph.edges_from("denoise", Some(&["latents"])).len(), 1);

    assert_eq!(graph.delete_edges_from("noise", None), 1);
    assert!(graph.edges_to("denoise", None).is_empty());

    graph.delete_node("denoise").unwrap();
    assert!(!graph.has_node("denoise"));
    assert!(graph.edges().is_empty(), "incident edges go with the node");
}

#[test]
fn test_metadata_upsert_merges_with_last_write_wins() {
    let mut graph = Graph::new("test");
    assert!(graph.metadata().is_none());

    graph
        .upsert_metadata(metadata(&[("seed", json!(1)), ("steps", json!(20))]))
        .unwrap();
    graph
        .upsert_metadata(metadata(&[("seed", json!(2)), ("width", json!(768))]))
        .unwrap();

    let recorded = graph.metadata().unwrap();
    assert_eq!(recorded.get("seed"), Some(&json!(2)));
    assert_eq!(recorded.get("steps"), Some(&json!(20)));
    assert_eq!(recorded.get("width"), Some(&json!(768)));
    assert_eq!(
        graph.nodes().filter(|n| n.kind() == InvocationKind::CoreMetadata).count(),
        1
    );
}

#[test]
fn test_metadata_receiving_node_is_unique() {
    let mut graph = Graph::new("test");
    let first = graph.add_node(decode("first")).unwrap();
    let second = graph.add_node(decode("second")).unwrap();

    graph.set_metadata_receiving_node(&first).unwrap();
    graph.set_metadata_receiving_node(&second).unwrap();

    let outgoing = graph.edges_from(METADATA_NODE_ID, Some(&["metadata"]));
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].destination.node_id, "second");
}

#[test]
fn test_metadata_accepts_arbitrary_keys_from_edges() {
    let mut graph = Graph::new("test");
    let n = graph.add_node(noise("noise")).unwrap();
    graph.add_edge_to_metadata(&n, "width", "width").unwrap();

    let incoming = graph.edges_to(METADATA_NODE_ID, Some(&["width"]));
    assert_eq!(incoming.len(), 1);
    assert!(graph.validate().is_ok());
}

#[test]
fn test_metadata_id_taken_by_another_node_type() {
    let mut graph = Graph::new("test");
    graph.add_node(noise(METADATA_NODE_ID)).unwrap();
    assert_matches!(
        graph.upsert_metadata(Map::new()),
        Err(GraphError::NodeTypeMismatch { .. })
    );
}

#[test]
fn test_validate_reports_multiple_inputs_and_cycles() {
    let mut graph = Graph::new("test");
    let a = graph.add_node(denoise("a")).unwrap();
    let b = graph.add_node(denoise("b")).unwrap();
    let n1 = graph.add_node(noise("n1")).unwrap();
    let n2 = graph.add_node(noise("n2")).unwrap();

    graph.connect(&a, "latents", &b, "latents").unwrap();
    graph.connect(&b, "latents", &a, "latents").unwrap();
    graph.connect(&n1, "noise", &a, "noise").unwrap();
    graph.connect(&n2, "noise", &a, "noise").unwrap();

    let Err(GraphError::Invalid(issues)) = graph.validate() else {
        panic!("expected an invalid graph");
    };
    assert!(issues.contains(&GraphIssue::MultipleInputs {
        node_id: "a".to_string(),
        field: "noise".to_string(),
        count: 2,
    }));
    assert_matches!(
        issues.iter().find(|issue| matches!(issue, GraphIssue::Cycle { .. })),
        Some(GraphIssue::Cycle { node_ids }) if node_ids == &["a".to_string(), "b".to_string()]
    );
}

#[test]
fn test_validate_reports_incompatible_types() {
    let mut graph = Graph::new("test");
    let n = graph.add_node(noise("noise")).unwrap();
    let l = graph.add_node(decode("l2i")).unwrap();
    // width is an integer; fp32 is a boolean.
    graph.connect(&n, "width", &l, "fp32").unwrap();

    let Err(GraphError::Invalid(issues)) = graph.validate() else {
        panic!("expected an invalid graph");
    };
    assert_matches!(issues.as_slice(), [GraphIssue::IncompatibleTypes { .. }]);
}

#[test]
fn test_collect_accepts_many_items() {
    let mut graph = Graph::new("test");
    let collect = graph
        .add_node(Collect {
            id: "collect".to_string(),
            ..Default::default()
        })
        .unwrap();
    for id in ["one", "two", "three"] {
        let image = graph
            .add_node(ImagePrimitive {
                id: id.to_string(),
                image: Some(ImageField::new(id)),
                ..Default::default()
            })
            .unwrap();
        graph.connect(&image, "image", &collect, "item").unwrap();
    }
    assert!(graph.validate().is_ok());
}

#[test]
fn test_snapshot_serializes_nodes_by_type_tag() {
    let mut graph = Graph::new(prefixed_id("test-graph"));
    graph.add_node(noise("noise")).unwrap();
    graph
        .upsert_metadata(metadata(&[("generation_mode", json!("txt2img"))]))
        .unwrap();

    let snapshot = graph.get_graph();
    assert!(snapshot.id.starts_with("test-graph:"));

    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["nodes"]["noise"]["type"], "noise");
    assert_eq!(value["nodes"]["noise"]["width"], 512);
    assert_eq!(value["nodes"][METADATA_NODE_ID]["type"], "core_metadata");
    assert_eq!(value["nodes"][METADATA_NODE_ID]["generation_mode"], "txt2img");

    let restored: GraphSnapshot = serde_json::from_value(value).unwrap();
    assert_eq!(restored, snapshot);
    let graph = Graph::from(restored);
    assert!(graph.node::<CoreMetadata>(METADATA_NODE_ID).is_ok());
}

#[test]
fn test_layers_report_depth_and_cycles() {
    let nodes = ["loader", "noise", "denoise", "decode", "x", "y", "after"];
    let edges = [
        ("loader", "denoise"),
        ("noise", "denoise"),
        ("loader", "decode"),
        ("denoise", "decode"),
        ("denoise", "decode"),
        ("x", "y"),
        ("y", "x"),
        ("y", "after"),
        ("ghost", "after"),
    ];
    let layering = topology::layers(nodes, edges);

    assert_eq!(layering.depth("loader"), 0);
    assert_eq!(layering.depth("noise"), 0);
    assert_eq!(layering.depth("denoise"), 1);
    assert_eq!(layering.depth("decode"), 2, "longest path wins");
    assert_eq!(layering.cyclic(), &["x", "y", "after"]);
    assert!(!layering.is_acyclic());

    let acyclic = topology::layers(["a", "b"], [("a", "b")]);
    assert!(acyclic.is_acyclic());
}
