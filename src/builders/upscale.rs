use super::ESRGAN;
use super::state::GenerationState;
use crate::error::BuildError;
use crate::graph::{Esrgan, Graph, ImageField, prefixed_id};
use serde_json::{Map, json};

/// Builds a standalone graph that upscales an existing image with the
/// configured ESRGAN model.
///
/// The graph holds a single `esrgan` node whose output is kept, plus the
/// metadata node recording the model under `esrgan_model`.
pub fn build_adhoc_upscale_graph(
    state: &GenerationState,
    image: &ImageField,
) -> Result<Graph, BuildError> {
    let mut graph = Graph::new(prefixed_id("adhoc-esrgan-graph"));
    let model_name = &state.upscale.esrgan_model_name;

    let upscale = graph.add_node(Esrgan {
        id: ESRGAN.to_string(),
        is_intermediate: Some(false),
        image: Some(image.clone()),
        model_name: model_name.clone(),
        tile_size: state.upscale.tile_size,
        board: state.board(),
    })?;

    let mut metadata = Map::new();
    metadata.insert("esrgan_model".to_string(), json!(model_name));
    graph.upsert_metadata(metadata)?;
    graph.set_metadata_receiving_node(&upscale)?;

    tracing::debug!(image = %image.image_name, model = %model_name, "Built ad-hoc upscale graph");
    Ok(graph)
}
