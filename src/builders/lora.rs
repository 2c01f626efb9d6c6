use super::state::GenerationState;
use super::{LORA_LOADER, model_loader};
use crate::error::BuildError;
use crate::graph::{Edge, Graph, Invocation, InvocationKind, LoraLoader, SdxlLoraLoader};
use serde_json::{Map, Value, json};

/// Chains the enabled LoRAs between the model loader and its UNet/CLIP consumers.
///
/// `loader -> lora_loader_0 -> lora_loader_1 -> ... -> consumers`
pub fn add_loras(state: &GenerationState, graph: &mut Graph) -> Result<usize, BuildError> {
    let loras: Vec<_> = state.enabled_loras().collect();
    if loras.is_empty() {
        return Ok(0);
    }

    let loader = model_loader(graph)?;
    let sdxl = loader.kind() == InvocationKind::SdxlModelLoader;
    let fields: &[&str] = if sdxl {
        &["unet", "clip", "clip2"]
    } else {
        &["unet", "clip"]
    };

    let consumers: Vec<Edge> = graph
        .edges_from(loader.id(), Some(fields))
        .into_iter()
        .cloned()
        .collect();
    graph.delete_edges_from(loader.id(), Some(fields));

    let mut upstream = loader;
    let mut recorded = Vec::with_capacity(loras.len());
    for (index, (settings, model)) in loras.iter().enumerate() {
        let id = format!("{}_{}", LORA_LOADER, index);
        let node: Invocation = if sdxl {
            SdxlLoraLoader {
                id,
                is_intermediate: Some(true),
                lora: Some((*model).clone()),
                weight: settings.weight,
            }
            .into()
        } else {
            LoraLoader {
                id,
                is_intermediate: Some(true),
                lora: Some((*model).clone()),
                weight: settings.weight,
            }
            .into()
        };
        let lora = graph.add_node(node)?;
        for field in fields {
            graph.connect(&upstream, field, &lora, field)?;
        }
        recorded.push(json!({ "model": model, "weight": settings.weight }));
        upstream = lora;
    }

    for edge in consumers {
        graph.add_edge(Edge::new(
            upstream.id(),
            edge.source.field,
            edge.destination.node_id,
            edge.destination.field,
        ))?;
    }

    let mut metadata = Map::new();
    metadata.insert("loras".to_string(), Value::Array(recorded));
    graph.upsert_metadata(metadata)?;

    tracing::debug!(count = loras.len(), "Added LoRAs");
    Ok(loras.len())
}
