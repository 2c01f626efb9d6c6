use super::control_adapters::add_control_adapters;
use super::hrf::add_hrf;
use super::lora::add_loras;
use super::prompts::resolve_style_prompts;
use super::state::GenerationState;
use super::vae::add_vae;
use super::{
    DENOISE_LATENTS, LATENTS_TO_IMAGE, MAIN_MODEL_LOADER, NEGATIVE_CONDITIONING, NOISE,
    POSITIVE_CONDITIONING, SDXL_MODEL_LOADER,
};
use crate::error::BuildError;
use crate::graph::{
    BaseModel, Compel, DenoiseLatents, Graph, LatentsToImage, MainModelLoader, ModelIdentifier,
    NodeHandle, Noise, SdxlCompelPrompt, SdxlModelLoader,
};
use serde_json::{Map, Value, json};

/// A finished graph together with the node that produces the final image.
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    pub graph: Graph,
    pub output: NodeHandle,
}

/// Builds a complete text-to-image graph for the selected main model.
///
/// SD1 and SD2 models get a single text encoder; SDXL models get dual encoders
/// with style prompts. LoRAs, the VAE, control adapters and the high-res fix are
/// layered on top of the base graph in that order.
pub fn build_text_to_image_graph(state: &GenerationState) -> Result<BuiltGraph, BuildError> {
    let model = state.model.as_ref().ok_or(BuildError::MissingModel)?;
    tracing::debug!(base = %model.base, model = %model.name, "Building text-to-image graph");

    let mut graph = match model.base {
        BaseModel::StableDiffusion1 | BaseModel::StableDiffusion2 => {
            let mut graph = Graph::new("sd_text_to_image_graph");
            add_sd_base(state, model, &mut graph)?;
            graph
        }
        BaseModel::StableDiffusionXl => {
            let mut graph = Graph::new("sdxl_text_to_image_graph");
            add_sdxl_base(state, model, &mut graph)?;
            graph
        }
        BaseModel::StableDiffusionXlRefiner => {
            return Err(BuildError::UnsupportedBaseModel(model.base.to_string()));
        }
    };

    graph.upsert_metadata(generation_metadata(state, model))?;

    add_loras(state, &mut graph)?;
    add_vae(state, &mut graph)?;
    add_control_adapters(state, &mut graph)?;

    let decode = graph.handle(LATENTS_TO_IMAGE)?;
    graph.set_metadata_receiving_node(&decode)?;

    let output = match add_hrf(state, &mut graph)? {
        Some(output) => output,
        None => decode,
    };

    tracing::debug!(
        nodes = graph.nodes().count(),
        edges = graph.edges().len(),
        "Built text-to-image graph"
    );
    Ok(BuiltGraph { graph, output })
}

fn add_sd_base(
    state: &GenerationState,
    model: &ModelIdentifier,
    graph: &mut Graph,
) -> Result<(), BuildError> {
    let loader = graph.add_node(MainModelLoader {
        id: MAIN_MODEL_LOADER.to_string(),
        is_intermediate: Some(true),
        model: Some(model.clone()),
    })?;
    let positive = graph.add_node(Compel {
        id: POSITIVE_CONDITIONING.to_string(),
        is_intermediate: Some(true),
        prompt: Some(state.positive_prompt.clone()),
    })?;
    let negative = graph.add_node(Compel {
        id: NEGATIVE_CONDITIONING.to_string(),
        is_intermediate: Some(true),
        prompt: Some(state.negative_prompt.clone()),
    })?;

    graph.connect(&loader, "clip", &positive, "clip")?;
    graph.connect(&loader, "clip", &negative, "clip")?;
    add_sampling_chain(state, graph, &loader, &positive, &negative)
}

fn add_sdxl_base(
    state: &GenerationState,
    model: &ModelIdentifier,
    graph: &mut Graph,
) -> Result<(), BuildError> {
    let style = resolve_style_prompts(state);
    let loader = graph.add_node(SdxlModelLoader {
        id: SDXL_MODEL_LOADER.to_string(),
        is_intermediate: Some(true),
        model: Some(model.clone()),
    })?;

    let prompt_node = |id: &str, prompt: &str, style: &str| SdxlCompelPrompt {
        id: id.to_string(),
        is_intermediate: Some(true),
        prompt: Some(prompt.to_string()),
        style: Some(style.to_string()),
        original_width: state.width,
        original_height: state.height,
        crop_top: 0,
        crop_left: 0,
        target_width: state.width,
        target_height: state.height,
    };
    let positive = graph.add_node(prompt_node(
        POSITIVE_CONDITIONING,
        &state.positive_prompt,
        &style.positive,
    ))?;
    let negative = graph.add_node(prompt_node(
        NEGATIVE_CONDITIONING,
        &state.negative_prompt,
        &style.negative,
    ))?;

    for prompt in [&positive, &negative] {
        graph.connect(&loader, "clip", prompt, "clip")?;
        graph.connect(&loader, "clip2", prompt, "clip2")?;
    }
    add_sampling_chain(state, graph, &loader, &positive, &negative)?;

    let mut metadata = Map::new();
    metadata.insert("positive_style_prompt".to_string(), json!(style.positive));
    metadata.insert("negative_style_prompt".to_string(), json!(style.negative));
    graph.upsert_metadata(metadata)?;
    Ok(())
}

// noise -> denoise -> l2i, shared by both model families.
fn add_sampling_chain(
    state: &GenerationState,
    graph: &mut Graph,
    loader: &NodeHandle,
    positive: &NodeHandle,
    negative: &NodeHandle,
) -> Result<(), BuildError> {
    let noise = graph.add_node(Noise {
        id: NOISE.to_string(),
        is_intermediate: Some(true),
        seed: state.seed,
        width: state.width,
        height: state.height,
        use_cpu: state.use_cpu_noise,
    })?;
    let denoise = graph.add_node(DenoiseLatents {
        id: DENOISE_LATENTS.to_string(),
        is_intermediate: Some(true),
        steps: state.steps,
        cfg_scale: state.cfg_scale,
        cfg_rescale_multiplier: state.cfg_rescale_multiplier,
        scheduler: state.scheduler,
        denoising_start: 0.0,
        denoising_end: 1.0,
    })?;
    let decode = graph.add_node(LatentsToImage {
        id: LATENTS_TO_IMAGE.to_string(),
        is_intermediate: Some(false),
        fp32: state.vae_fp32,
        board: state.board(),
    })?;

    graph.connect(loader, "unet", &denoise, "unet")?;
    graph.connect(positive, "conditioning", &denoise, "positive_conditioning")?;
    graph.connect(negative, "conditioning", &denoise, "negative_conditioning")?;
    graph.connect(&noise, "noise", &denoise, "noise")?;
    graph.connect(&denoise, "latents", &decode, "latents")?;
    Ok(())
}

fn generation_metadata(state: &GenerationState, model: &ModelIdentifier) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("generation_mode".to_string(), json!("txt2img"));
    metadata.insert("positive_prompt".to_string(), json!(state.positive_prompt));
    metadata.insert("negative_prompt".to_string(), json!(state.negative_prompt));
    metadata.insert("width".to_string(), json!(state.width));
    metadata.insert("height".to_string(), json!(state.height));
    metadata.insert("seed".to_string(), json!(state.seed));
    metadata.insert("steps".to_string(), json!(state.steps));
    metadata.insert("cfg_scale".to_string(), json!(state.cfg_scale));
    metadata.insert(
        "cfg_rescale_multiplier".to_string(),
        json!(state.cfg_rescale_multiplier),
    );
    metadata.insert("scheduler".to_string(), json!(state.scheduler));
    metadata.insert("model".to_string(), json!(model));
    metadata
}
