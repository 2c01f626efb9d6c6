//! The read-only parameter snapshot consumed by the graph builders.

use super::infill::InfillMethod;
use crate::graph::{
    BoardField, ColorField, ControlMode, ControlResizeMode, ImageField, ModelIdentifier, Scheduler,
};
use serde::{Deserialize, Serialize};

/// Generation parameters, as exported by the front end's parameter panels.
///
/// Every field has a default, so a partial JSON document is a valid state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationState {
    pub positive_prompt: String,
    pub negative_prompt: String,
    pub positive_style_prompt: String,
    pub negative_style_prompt: String,
    /// Reuse the main prompts as SDXL style prompts.
    pub should_concat_prompts: bool,

    pub model: Option<ModelIdentifier>,
    pub vae: Option<ModelIdentifier>,
    pub vae_fp32: bool,

    pub seed: u64,
    pub steps: u32,
    pub cfg_scale: f64,
    pub cfg_rescale_multiplier: f64,
    pub scheduler: Scheduler,
    pub width: u32,
    pub height: u32,
    pub use_cpu_noise: bool,

    pub loras: Vec<LoraSettings>,
    pub control_nets: Vec<ControlNetSettings>,
    pub ip_adapters: Vec<IpAdapterSettings>,

    pub hrf: HrfSettings,
    pub infill: InfillSettings,
    pub upscale: UpscaleSettings,

    /// Board that output images are added to. `"none"` means no board.
    pub auto_add_board_id: Option<String>,
}

impl Default for GenerationState {
    fn default() -> Self {
        Self {
            positive_prompt: String::new(),
            negative_prompt: String::new(),
            positive_style_prompt: String::new(),
            negative_style_prompt: String::new(),
            should_concat_prompts: true,
            model: None,
            vae: None,
            vae_fp32: false,
            seed: 0,
            steps: 50,
            cfg_scale: 7.5,
            cfg_rescale_multiplier: 0.0,
            scheduler: Scheduler::default(),
            width: 512,
            height: 512,
            use_cpu_noise: true,
            loras: Vec::new(),
            control_nets: Vec::new(),
            ip_adapters: Vec::new(),
            hrf: HrfSettings::default(),
            infill: InfillSettings::default(),
            upscale: UpscaleSettings::default(),
            auto_add_board_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoraSettings {
    pub model: Option<ModelIdentifier>,
    pub weight: f64,
    pub is_enabled: bool,
}

impl Default for LoraSettings {
    fn default() -> Self {
        Self {
            model: None,
            weight: 0.75,
            is_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlNetSettings {
    pub model: Option<ModelIdentifier>,
    pub image: Option<ImageField>,
    pub weight: f64,
    pub begin_step_pct: f64,
    pub end_step_pct: f64,
    pub control_mode: ControlMode,
    pub resize_mode: ControlResizeMode,
    pub is_enabled: bool,
}

impl Default for ControlNetSettings {
    fn default() -> Self {
        Self {
            model: None,
            image: None,
            weight: 1.0,
            begin_step_pct: 0.0,
            end_step_pct: 1.0,
            control_mode: ControlMode::default(),
            resize_mode: ControlResizeMode::default(),
            is_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IpAdapterSettings {
    pub model: Option<ModelIdentifier>,
    pub image: Option<ImageField>,
    pub weight: f64,
    pub begin_step_pct: f64,
    pub end_step_pct: f64,
    pub is_enabled: bool,
}

impl Default for IpAdapterSettings {
    fn default() -> Self {
        Self {
            model: None,
            image: None,
            weight: 1.0,
            begin_step_pct: 0.0,
            end_step_pct: 1.0,
            is_enabled: true,
        }
    }
}

/// How the first-pass result is enlarged before the second denoise pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HrfMethod {
    #[default]
    Esrgan,
    /// Resize the latents directly.
    Latent,
}

impl HrfMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HrfMethod::Esrgan => "esrgan",
            HrfMethod::Latent => "latent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HrfSettings {
    pub enabled: bool,
    pub scale: f64,
    pub strength: f64,
    pub method: HrfMethod,
}

impl Default for HrfSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            scale: 2.0,
            strength: 0.45,
            method: HrfMethod::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfillSettings {
    pub method: InfillMethod,
    pub image: Option<ImageField>,
    pub patchmatch_downscale: f64,
    pub tile_size: u32,
    pub color: ColorField,
}

impl Default for InfillSettings {
    fn default() -> Self {
        Self {
            method: InfillMethod::default(),
            image: None,
            patchmatch_downscale: 2.0,
            tile_size: 32,
            color: ColorField::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpscaleSettings {
    pub esrgan_model_name: String,
    pub tile_size: u32,
}

impl Default for UpscaleSettings {
    fn default() -> Self {
        Self {
            esrgan_model_name: "RealESRGAN_x4plus.pth".to_string(),
            tile_size: 400,
        }
    }
}

impl GenerationState {
    /// LoRAs that are switched on and have a model selected.
    pub fn enabled_loras(&self) -> impl Iterator<Item = (&LoraSettings, &ModelIdentifier)> {
        self.loras
            .iter()
            .filter(|lora| lora.is_enabled)
            .filter_map(|lora| lora.model.as_ref().map(|model| (lora, model)))
    }

    /// The board output images go to, if any.
    pub fn board(&self) -> Option<BoardField> {
        match self.auto_add_board_id.as_deref() {
            None | Some("none") | Some("") => None,
            Some(board_id) => Some(BoardField {
                board_id: board_id.to_string(),
            }),
        }
    }
}
