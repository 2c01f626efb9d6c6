use super::state::GenerationState;
use super::{
    IMAGE_TO_LATENTS_HRF, LATENTS_TO_IMAGE, LATENTS_TO_IMAGE_HRF_HR, LATENTS_TO_IMAGE_HRF_LR,
    VAE_LOADER, model_loader,
};
use crate::error::BuildError;
use crate::graph::{Graph, NodeHandle, VaeLoader};
use serde_json::{Map, json};

// Nodes that decode or encode latents and therefore need a VAE.
const VAE_CONSUMERS: &[&str] = &[
    LATENTS_TO_IMAGE,
    LATENTS_TO_IMAGE_HRF_LR,
    IMAGE_TO_LATENTS_HRF,
    LATENTS_TO_IMAGE_HRF_HR,
];

/// The node that provides the `vae` output.
///
/// Without an explicit VAE this is the main model loader. Otherwise a dedicated
/// `vae_loader` node is created on first use and reused afterwards.
pub fn vae_source(state: &GenerationState, graph: &mut Graph) -> Result<NodeHandle, BuildError> {
    let Some(vae) = &state.vae else {
        return Ok(model_loader(graph)?);
    };
    if graph.has_node(VAE_LOADER) {
        return Ok(graph.handle(VAE_LOADER)?);
    }
    Ok(graph.add_node(VaeLoader {
        id: VAE_LOADER.to_string(),
        is_intermediate: Some(true),
        vae_model: Some(vae.clone()),
    })?)
}

/// Wires every VAE consumer in the graph that lacks a VAE to the VAE source and
/// records the `vae` metadata when an explicit VAE is selected.
pub fn add_vae(state: &GenerationState, graph: &mut Graph) -> Result<NodeHandle, BuildError> {
    let source = vae_source(state, graph)?;

    for consumer in VAE_CONSUMERS {
        if graph.has_node(consumer) && graph.edges_to(consumer, Some(&["vae"])).is_empty() {
            let consumer = graph.handle(consumer)?;
            graph.connect(&source, "vae", &consumer, "vae")?;
        }
    }

    if let Some(vae) = &state.vae {
        let mut metadata = Map::new();
        metadata.insert("vae".to_string(), json!(vae));
        graph.upsert_metadata(metadata)?;
    }

    tracing::debug!(source = source.id(), "Added VAE");
    Ok(source)
}
