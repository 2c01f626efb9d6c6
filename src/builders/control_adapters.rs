use super::state::GenerationState;
use super::{CONTROL_NET_COLLECT, DENOISE_LATENTS, IP_ADAPTER_COLLECT};
use crate::error::BuildError;
use crate::graph::{Collect, ControlNet, Graph, IpAdapter, NodeHandle};
use serde_json::{Map, Value, json};

/// Adds the enabled ControlNets and IP-Adapters and wires them into the denoise
/// node. Adapters without a model or an image are skipped.
pub fn add_control_adapters(
    state: &GenerationState,
    graph: &mut Graph,
) -> Result<(), BuildError> {
    let denoise = graph.handle(DENOISE_LATENTS)?;
    let mut metadata = Map::new();

    let mut control_nets = Vec::new();
    let mut recorded = Vec::new();
    for (index, settings) in state.control_nets.iter().enumerate() {
        let (Some(model), Some(image), true) =
            (&settings.model, &settings.image, settings.is_enabled)
        else {
            continue;
        };
        let node = ControlNet {
            id: format!("control_net_{}", index),
            is_intermediate: Some(true),
            image: Some(image.clone()),
            control_model: Some(model.clone()),
            control_weight: settings.weight,
            begin_step_percent: settings.begin_step_pct,
            end_step_percent: settings.end_step_pct,
            control_mode: settings.control_mode,
            resize_mode: settings.resize_mode,
        };
        recorded.push(json!(node));
        control_nets.push(graph.add_node(node)?);
    }
    if !control_nets.is_empty() {
        fan_in(graph, &control_nets, "control", CONTROL_NET_COLLECT, &denoise)?;
        metadata.insert("controlnets".to_string(), Value::Array(recorded));
    }

    let mut ip_adapters = Vec::new();
    let mut recorded = Vec::new();
    for (index, settings) in state.ip_adapters.iter().enumerate() {
        let (Some(model), Some(image), true) =
            (&settings.model, &settings.image, settings.is_enabled)
        else {
            continue;
        };
        let node = IpAdapter {
            id: format!("ip_adapter_{}", index),
            is_intermediate: Some(true),
            image: Some(image.clone()),
            ip_adapter_model: Some(model.clone()),
            weight: settings.weight,
            begin_step_percent: settings.begin_step_pct,
            end_step_percent: settings.end_step_pct,
        };
        recorded.push(json!(node));
        ip_adapters.push(graph.add_node(node)?);
    }
    if !ip_adapters.is_empty() {
        fan_in(graph, &ip_adapters, "ip_adapter", IP_ADAPTER_COLLECT, &denoise)?;
        metadata.insert("ipAdapters".to_string(), Value::Array(recorded));
    }

    if !metadata.is_empty() {
        graph.upsert_metadata(metadata)?;
    }
    tracing::debug!(
        control_nets = control_nets.len(),
        ip_adapters = ip_adapters.len(),
        "Added control adapters"
    );
    Ok(())
}

// One adapter connects straight to the denoise input; several go through a collect node.
fn fan_in(
    graph: &mut Graph,
    adapters: &[NodeHandle],
    field: &str,
    collect_id: &str,
    denoise: &NodeHandle,
) -> Result<(), BuildError> {
    if let [single] = adapters {
        graph.connect(single, field, denoise, field)?;
        return Ok(());
    }

    let collect = graph.add_node(Collect {
        id: collect_id.to_string(),
        is_intermediate: Some(true),
    })?;
    for adapter in adapters {
        graph.connect(adapter, field, &collect, "item")?;
    }
    graph.connect(&collect, "collection", denoise, field)?;
    Ok(())
}
