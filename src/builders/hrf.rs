//! High-resolution fix: a second denoise pass at a larger size.
//!
//! The first pass is decoded at the requested size, enlarged (ESRGAN or latent
//! resize), and re-denoised starting part-way through the schedule. Incoming
//! edges of the first-pass nodes are replicated onto their second-pass
//! counterparts according to `HRF_EDGE_COPIES`.

use super::state::{GenerationState, HrfMethod};
use super::vae::vae_source;
use super::{
    DENOISE_LATENTS, DENOISE_LATENTS_HRF, ESRGAN_HRF, IMAGE_TO_LATENTS_HRF, LATENTS_TO_IMAGE,
    LATENTS_TO_IMAGE_HRF_HR, LATENTS_TO_IMAGE_HRF_LR, NOISE, NOISE_HRF, RESIZE_HRF,
    RESIZE_HRF_IMAGE,
};
use crate::error::BuildError;
use crate::graph::{
    DenoiseLatents, Edge, Esrgan, Graph, ImageResize, ImageToLatents, LatentsResizeMode,
    LatentsToImage, NodeHandle, Noise, ResampleMode, ResizeLatents,
};
use serde_json::{Map, json};

const ESRGAN_HRF_MODEL: &str = "RealESRGAN_x2plus.pth";

/// Replicates the incoming edges of `from_node` on the listed destination fields
/// onto `to_node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeCopyRule {
    pub from_node: &'static str,
    pub to_node: &'static str,
    pub fields: &'static [&'static str],
}

pub const HRF_EDGE_COPIES: &[EdgeCopyRule] = &[
    EdgeCopyRule {
        from_node: DENOISE_LATENTS,
        to_node: DENOISE_LATENTS_HRF,
        fields: &[
            "vae",
            "control",
            "ip_adapter",
            "metadata",
            "unet",
            "positive_conditioning",
            "negative_conditioning",
        ],
    },
    EdgeCopyRule {
        from_node: LATENTS_TO_IMAGE,
        to_node: LATENTS_TO_IMAGE_HRF_HR,
        fields: &["vae", "metadata"],
    },
];

/// The edges `rules` would add to `edges`. Source node and both field names are
/// kept; only the destination node changes.
pub fn plan_edge_copies(edges: &[Edge], rules: &[EdgeCopyRule]) -> Vec<Edge> {
    rules
        .iter()
        .flat_map(|rule| {
            edges
                .iter()
                .filter(move |edge| {
                    edge.destination.node_id == rule.from_node
                        && rule.fields.contains(&edge.destination.field.as_str())
                })
                .map(move |edge| edge.redirected_to(rule.to_node))
        })
        .collect()
}

/// `dimension * scale`, rounded to the nearest multiple of 8.
pub fn scale_dimension(dimension: u32, scale: f64) -> u32 {
    let scaled = (f64::from(dimension) * scale / 8.0).round() * 8.0;
    (scaled as u32).max(8)
}

/// Appends the second pass. Returns the new output node, or `None` when the
/// high-resolution fix is disabled.
///
/// The first-pass `latents_to_image` node is replaced by
/// `latents_to_image_hrf_hr`.
pub fn add_hrf(
    state: &GenerationState,
    graph: &mut Graph,
) -> Result<Option<NodeHandle>, BuildError> {
    let settings = &state.hrf;
    if !settings.enabled {
        return Ok(None);
    }

    let denoise = graph.handle(DENOISE_LATENTS)?;
    let noise = graph.node::<Noise>(NOISE)?.clone();
    let first_pass = graph.node::<DenoiseLatents>(DENOISE_LATENTS)?.clone();
    let output = graph.node::<LatentsToImage>(LATENTS_TO_IMAGE)?.clone();

    let width = scale_dimension(noise.width, settings.scale);
    let height = scale_dimension(noise.height, settings.scale);
    tracing::debug!(width, height, method = settings.method.as_str(), "Adding high-res fix");

    let noise_hrf = graph.add_node(Noise {
        id: NOISE_HRF.to_string(),
        is_intermediate: Some(true),
        seed: noise.seed,
        width,
        height,
        use_cpu: noise.use_cpu,
    })?;

    let latents_source = match settings.method {
        HrfMethod::Latent => {
            let resize = graph.add_node(ResizeLatents {
                id: RESIZE_HRF.to_string(),
                is_intermediate: Some(true),
                width,
                height,
                mode: LatentsResizeMode::Bilinear,
                antialias: false,
            })?;
            graph.connect(&denoise, "latents", &resize, "latents")?;
            resize
        }
        HrfMethod::Esrgan => {
            let vae = vae_source(state, graph)?;
            let decode = graph.add_node(LatentsToImage {
                id: LATENTS_TO_IMAGE_HRF_LR.to_string(),
                is_intermediate: Some(true),
                fp32: output.fp32,
                board: None,
            })?;
            let upscale = graph.add_node(Esrgan {
                id: ESRGAN_HRF.to_string(),
                is_intermediate: Some(true),
                image: None,
                model_name: ESRGAN_HRF_MODEL.to_string(),
                tile_size: 400,
                board: None,
            })?;
            let resize = graph.add_node(ImageResize {
                id: RESIZE_HRF_IMAGE.to_string(),
                is_intermediate: Some(true),
                image: None,
                width,
                height,
                resample_mode: ResampleMode::Lanczos,
                board: None,
            })?;
            let encode = graph.add_node(ImageToLatents {
                id: IMAGE_TO_LATENTS_HRF.to_string(),
                is_intermediate: Some(true),
                image: None,
                fp32: output.fp32,
            })?;

            graph.connect(&denoise, "latents", &decode, "latents")?;
            graph.connect(&vae, "vae", &decode, "vae")?;
            graph.connect(&decode, "image", &upscale, "image")?;
            graph.connect(&upscale, "image", &resize, "image")?;
            graph.connect(&resize, "image", &encode, "image")?;
            graph.connect(&vae, "vae", &encode, "vae")?;
            encode
        }
    };

    let denoise_hrf = graph.add_node(DenoiseLatents {
        id: DENOISE_LATENTS_HRF.to_string(),
        is_intermediate: Some(true),
        denoising_start: 1.0 - settings.strength,
        denoising_end: 1.0,
        ..first_pass
    })?;
    graph.connect(&noise_hrf, "noise", &denoise_hrf, "noise")?;
    graph.connect(&latents_source, "latents", &denoise_hrf, "latents")?;

    let output_hrf = graph.add_node(LatentsToImage {
        id: LATENTS_TO_IMAGE_HRF_HR.to_string(),
        is_intermediate: output.is_intermediate,
        fp32: output.fp32,
        board: output.board.clone(),
    })?;
    graph.connect(&denoise_hrf, "latents", &output_hrf, "latents")?;

    for edge in plan_edge_copies(graph.edges(), HRF_EDGE_COPIES) {
        graph.add_edge(edge)?;
    }
    graph.delete_node(LATENTS_TO_IMAGE)?;

    let mut metadata = Map::new();
    metadata.insert("hrf_enabled".to_string(), json!(true));
    metadata.insert("hrf_method".to_string(), json!(settings.method.as_str()));
    metadata.insert("hrf_strength".to_string(), json!(settings.strength));
    graph.upsert_metadata(metadata)?;

    Ok(Some(output_hrf))
}
