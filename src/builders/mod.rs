//! Per-feature graph builders.
//!
//! Each builder reads a `GenerationState` snapshot and appends nodes and edges to
//! a shared `Graph`. Builders locate each other's nodes through the fixed IDs
//! declared here.

use crate::error::GraphError;
use crate::graph::{Graph, NodeHandle};

mod control_adapters;
mod hrf;
mod infill;
mod lora;
mod prompts;
mod state;
mod text_to_image;
mod upscale;
mod vae;

pub use control_adapters::add_control_adapters;
pub use hrf::{EdgeCopyRule, HRF_EDGE_COPIES, add_hrf, plan_edge_copies, scale_dimension};
pub use infill::{InfillMethod, add_infill};
pub use lora::add_loras;
pub use prompts::{StylePrompts, resolve_style_prompts};
pub use state::{
    ControlNetSettings, GenerationState, HrfMethod, HrfSettings, InfillSettings,
    IpAdapterSettings, LoraSettings, UpscaleSettings,
};
pub use text_to_image::{BuiltGraph, build_text_to_image_graph};
pub use upscale::build_adhoc_upscale_graph;
pub use vae::{add_vae, vae_source};

// Node IDs shared between builders.
pub const MAIN_MODEL_LOADER: &str = "main_model_loader";
pub const SDXL_MODEL_LOADER: &str = "sdxl_model_loader";
pub const VAE_LOADER: &str = "vae_loader";
pub const LORA_LOADER: &str = "lora_loader";
pub const POSITIVE_CONDITIONING: &str = "positive_conditioning";
pub const NEGATIVE_CONDITIONING: &str = "negative_conditioning";
pub const NOISE: &str = "noise";
pub const DENOISE_LATENTS: &str = "denoise_latents";
pub const LATENTS_TO_IMAGE: &str = "latents_to_image";
pub const CONTROL_NET_COLLECT: &str = "control_net_collect";
pub const IP_ADAPTER_COLLECT: &str = "ip_adapter_collect";
pub const ESRGAN: &str = "esrgan";
pub const INFILL: &str = "infill";

pub const NOISE_HRF: &str = "noise_hrf";
pub const RESIZE_HRF: &str = "resize_hrf";
pub const LATENTS_TO_IMAGE_HRF_LR: &str = "latents_to_image_hrf_lr";
pub const ESRGAN_HRF: &str = "esrgan_hrf";
pub const RESIZE_HRF_IMAGE: &str = "resize_hrf_image";
pub const IMAGE_TO_LATENTS_HRF: &str = "image_to_latents_hrf";
pub const DENOISE_LATENTS_HRF: &str = "denoise_latents_hrf";
pub const LATENTS_TO_IMAGE_HRF_HR: &str = "latents_to_image_hrf_hr";

/// The graph's main model loader, whichever family it belongs to.
pub(crate) fn model_loader(graph: &Graph) -> Result<NodeHandle, GraphError> {
    [MAIN_MODEL_LOADER, SDXL_MODEL_LOADER]
        .into_iter()
        .find(|id| graph.has_node(id))
        .map(|id| graph.handle(id))
        .unwrap_or_else(|| {
            Err(GraphError::NodeNotFound {
                node_id: MAIN_MODEL_LOADER.to_string(),
                context: "the model loader lookup".to_string(),
            })
        })
}
