use super::catalog::{self, InvocationSpec};
use super::fields::{
    BoardField, ColorField, ControlMode, ControlResizeMode, ImageField, LatentsResizeMode,
    ModelIdentifier, ResampleMode, Scheduler,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Typed access to one variant of `Invocation`.
pub trait InvocationVariant: Sized {
    const KIND: InvocationKind;
    fn from_ref(invocation: &Invocation) -> Option<&Self>;
    fn from_mut(invocation: &mut Invocation) -> Option<&mut Self>;
}

/// Master macro defining the closed set of invocation variants, their kinds,
/// type tags and catalog entries.
macro_rules! define_invocations {
    ( $( ($variant:ident, $type_tag:literal, $spec:ident) ),* $(,)? ) => {
        /// A single typed unit of work in an execution graph, discriminated by `type`.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type")]
        pub enum Invocation {
            $( #[serde(rename = $type_tag)] $variant($variant), )*
        }

        /// Field-less discriminant of `Invocation`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum InvocationKind {
            $( $variant, )*
        }

        impl InvocationKind {
            pub const ALL: &'static [InvocationKind] = &[ $( InvocationKind::$variant, )* ];

            pub fn type_name(self) -> &'static str {
                match self {
                    $( InvocationKind::$variant => $type_tag, )*
                }
            }

            pub fn spec(self) -> &'static InvocationSpec {
                match self {
                    $( InvocationKind::$variant => &catalog::$spec, )*
                }
            }

            pub fn from_type_name(name: &str) -> Option<Self> {
                match name {
                    $( $type_tag => Some(InvocationKind::$variant), )*
                    _ => None,
                }
            }
        }

        impl Invocation {
            pub fn id(&self) -> &str {
                match self {
                    $( Invocation::$variant(node) => &node.id, )*
                }
            }

            pub fn kind(&self) -> InvocationKind {
                match self {
                    $( Invocation::$variant(_) => InvocationKind::$variant, )*
                }
            }

            pub fn is_intermediate(&self) -> Option<bool> {
                match self {
                    $( Invocation::$variant(node) => node.is_intermediate, )*
                }
            }

            pub fn set_intermediate(&mut self, is_intermediate: bool) {
                match self {
                    $(
                        Invocation::$variant(node) => {
                            node.is_intermediate = Some(is_intermediate)
                        }
                    )*
                }
            }
        }

        $(
            impl From<$variant> for Invocation {
                fn from(node: $variant) -> Self {
                    Invocation::$variant(node)
                }
            }

            impl InvocationVariant for $variant {
                const KIND: InvocationKind = InvocationKind::$variant;

                fn from_ref(invocation: &Invocation) -> Option<&Self> {
                    match invocation {
                        Invocation::$variant(node) => Some(node),
                        _ => None,
                    }
                }

                fn from_mut(invocation: &mut Invocation) -> Option<&mut Self> {
                    match invocation {
                        Invocation::$variant(node) => Some(node),
                        _ => None,
                    }
                }
            }
        )*
    };
}

define_invocations! {
    (MainModelLoader, "main_model_loader", MAIN_MODEL_LOADER),
    (SdxlModelLoader, "sdxl_model_loader", SDXL_MODEL_LOADER),
    (VaeLoader, "vae_loader", VAE_LOADER),
    (LoraLoader, "lora_loader", LORA_LOADER),
    (SdxlLoraLoader, "sdxl_lora_loader", SDXL_LORA_LOADER),
    (Compel, "compel", COMPEL),
    (SdxlCompelPrompt, "sdxl_compel_prompt", SDXL_COMPEL_PROMPT),
    (Noise, "noise", NOISE),
    (DenoiseLatents, "denoise_latents", DENOISE_LATENTS),
    (LatentsToImage, "l2i", LATENTS_TO_IMAGE),
    (ImageToLatents, "i2l", IMAGE_TO_LATENTS),
    (ResizeLatents, "lresize", RESIZE_LATENTS),
    (ImageResize, "img_resize", IMAGE_RESIZE),
    (Esrgan, "esrgan", ESRGAN),
    (InfillPatchMatch, "infill_patchmatch", INFILL_PATCHMATCH),
    (InfillLama, "infill_lama", INFILL_LAMA),
    (InfillCv2, "infill_cv2", INFILL_CV2),
    (InfillTile, "infill_tile", INFILL_TILE),
    (InfillColor, "infill_rgba", INFILL_COLOR),
    (ControlNet, "controlnet", CONTROLNET),
    (IpAdapter, "ip_adapter", IP_ADAPTER_NODE),
    (Collect, "collect", COLLECT),
    (ImagePrimitive, "image", IMAGE_PRIMITIVE),
    (CoreMetadata, "core_metadata", CORE_METADATA),
}

impl Invocation {
    pub fn spec(&self) -> &'static InvocationSpec {
        self.kind().spec()
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }
}

// --- Model loaders ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MainModelLoader {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SdxlModelLoader {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VaeLoader {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vae_model: Option<ModelIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoraLoader {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora: Option<ModelIdentifier>,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SdxlLoraLoader {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora: Option<ModelIdentifier>,
    pub weight: f64,
}

// --- Conditioning ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Compel {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SdxlCompelPrompt {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub original_width: u32,
    pub original_height: u32,
    pub crop_top: u32,
    pub crop_left: u32,
    pub target_width: u32,
    pub target_height: u32,
}

// --- Latents ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Noise {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub use_cpu: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DenoiseLatents {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    pub steps: u32,
    pub cfg_scale: f64,
    pub cfg_rescale_multiplier: f64,
    pub scheduler: Scheduler,
    pub denoising_start: f64,
    pub denoising_end: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LatentsToImage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    pub fp32: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<BoardField>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageToLatents {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
    pub fp32: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResizeLatents {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    pub width: u32,
    pub height: u32,
    pub mode: LatentsResizeMode,
    pub antialias: bool,
}

// --- Images ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageResize {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
    pub width: u32,
    pub height: u32,
    pub resample_mode: ResampleMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<BoardField>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Esrgan {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
    pub model_name: String,
    pub tile_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<BoardField>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImagePrimitive {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
}

// --- Infill ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InfillPatchMatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
    pub downscale: f64,
    pub resample_mode: ResampleMode,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InfillLama {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InfillCv2 {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InfillTile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
    pub tile_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InfillColor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
    pub color: ColorField,
}

// --- Control adapters ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlNet {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_model: Option<ModelIdentifier>,
    pub control_weight: f64,
    pub begin_step_percent: f64,
    pub end_step_percent: f64,
    pub control_mode: ControlMode,
    pub resize_mode: ControlResizeMode,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IpAdapter {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_adapter_model: Option<ModelIdentifier>,
    pub weight: f64,
    pub begin_step_percent: f64,
    pub end_step_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Collect {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
}

// --- Metadata ---

/// Accumulates generation metadata. Any key is accepted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoreMetadata {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_intermediate: Option<bool>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
