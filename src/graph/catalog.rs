//! Declared field contracts for every invocation type.
//!
//! The catalog is the single source of truth for which fields a node accepts and
//! produces. `Graph::add_edge` checks edge endpoints against it, and the built-in
//! templates are generated from it.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// How a field may be populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Only an incoming edge may provide the value.
    Connection,
    /// Only a literal value may provide it.
    Direct,
    /// Either an edge or a literal value.
    #[default]
    Any,
}

/// Whether a field holds one value, many, or either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Single,
    Collection,
    CollectionOrScalar,
}

/// Compile-time default value of an input field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'static str),
}

impl DefaultValue {
    pub fn to_json(self) -> Value {
        match self {
            DefaultValue::None => Value::Null,
            DefaultValue::Bool(b) => json!(b),
            DefaultValue::Int(i) => json!(i),
            DefaultValue::Float(f) => json!(f),
            DefaultValue::Str(s) => json!(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub field_type: &'static str,
    pub cardinality: Cardinality,
    pub input: InputKind,
    pub default: DefaultValue,
}

impl FieldSpec {
    const fn connection(name: &'static str, title: &'static str, field_type: &'static str) -> Self {
        Self {
            name,
            title,
            field_type,
            cardinality: Cardinality::Single,
            input: InputKind::Connection,
            default: DefaultValue::None,
        }
    }

    const fn any(
        name: &'static str,
        title: &'static str,
        field_type: &'static str,
        default: DefaultValue,
    ) -> Self {
        Self {
            name,
            title,
            field_type,
            cardinality: Cardinality::Single,
            input: InputKind::Any,
            default,
        }
    }

    const fn direct(
        name: &'static str,
        title: &'static str,
        field_type: &'static str,
        default: DefaultValue,
    ) -> Self {
        Self {
            name,
            title,
            field_type,
            cardinality: Cardinality::Single,
            input: InputKind::Direct,
            default,
        }
    }

    const fn many(self) -> Self {
        Self {
            cardinality: Cardinality::CollectionOrScalar,
            ..self
        }
    }

    /// Whether several edges may target this field at once.
    pub fn accepts_many_edges(&self) -> bool {
        self.field_type == COLLECTION_ITEM
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputSpec {
    pub name: &'static str,
    pub field_type: &'static str,
    pub cardinality: Cardinality,
}

impl OutputSpec {
    const fn new(name: &'static str, field_type: &'static str) -> Self {
        Self {
            name,
            field_type,
            cardinality: Cardinality::Single,
        }
    }

    const fn collection(name: &'static str, field_type: &'static str) -> Self {
        Self {
            name,
            field_type,
            cardinality: Cardinality::Collection,
        }
    }
}

/// The declared contract of a single invocation type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvocationSpec {
    pub node_type: &'static str,
    pub title: &'static str,
    pub version: &'static str,
    pub inputs: &'static [FieldSpec],
    pub outputs: &'static [OutputSpec],
    /// Accepts edges into arbitrarily named inputs (metadata collectors).
    pub open_inputs: bool,
}

impl InvocationSpec {
    pub fn input(&self, name: &str) -> Option<&'static FieldSpec> {
        self.inputs.iter().find(|f| f.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&'static OutputSpec> {
        self.outputs.iter().find(|f| f.name == name)
    }

    pub fn accepts_input(&self, name: &str) -> bool {
        self.open_inputs || self.input(name).is_some()
    }
}

// Field type names shared with templates and workflow documents.
pub const INTEGER: &str = "IntegerField";
pub const FLOAT: &str = "FloatField";
pub const STRING: &str = "StringField";
pub const BOOLEAN: &str = "BooleanField";
pub const ENUM: &str = "EnumField";
pub const SCHEDULER: &str = "SchedulerField";
pub const IMAGE: &str = "ImageField";
pub const BOARD: &str = "BoardField";
pub const COLOR: &str = "ColorField";
pub const LATENTS: &str = "LatentsField";
pub const CONDITIONING: &str = "ConditioningField";
pub const UNET: &str = "UNetField";
pub const CLIP: &str = "CLIPField";
pub const VAE: &str = "VAEField";
pub const CONTROL: &str = "ControlField";
pub const IP_ADAPTER: &str = "IPAdapterField";
pub const T2I_ADAPTER: &str = "T2IAdapterField";
pub const DENOISE_MASK: &str = "DenoiseMaskField";
pub const METADATA: &str = "MetadataField";
pub const MAIN_MODEL: &str = "MainModelField";
pub const SDXL_MAIN_MODEL: &str = "SDXLMainModelField";
pub const VAE_MODEL: &str = "VAEModelField";
pub const LORA_MODEL: &str = "LoRAModelField";
pub const CONTROLNET_MODEL: &str = "ControlNetModelField";
pub const IP_ADAPTER_MODEL: &str = "IPAdapterModelField";
pub const T2I_ADAPTER_MODEL: &str = "T2IAdapterModelField";
pub const SDXL_REFINER_MODEL: &str = "SDXLRefinerModelField";
pub const ONNX_MODEL: &str = "ONNXModelField";
pub const METADATA_ITEM: &str = "MetadataItemField";
pub const COLLECTION: &str = "CollectionField";
pub const COLLECTION_ITEM: &str = "CollectionItemField";

const NONE: DefaultValue = DefaultValue::None;

pub static MAIN_MODEL_LOADER: InvocationSpec = InvocationSpec {
    node_type: "main_model_loader",
    title: "Main Model",
    version: "1.0.2",
    inputs: &[FieldSpec::direct("model", "Model", MAIN_MODEL, NONE)],
    outputs: &[
        OutputSpec::new("unet", UNET),
        OutputSpec::new("clip", CLIP),
        OutputSpec::new("vae", VAE),
    ],
    open_inputs: false,
};

pub static SDXL_MODEL_LOADER: InvocationSpec = InvocationSpec {
    node_type: "sdxl_model_loader",
    title: "SDXL Main Model",
    version: "1.0.2",
    inputs: &[FieldSpec::direct("model", "Model", SDXL_MAIN_MODEL, NONE)],
    outputs: &[
        OutputSpec::new("unet", UNET),
        OutputSpec::new("clip", CLIP),
        OutputSpec::new("clip2", CLIP),
        OutputSpec::new("vae", VAE),
    ],
    open_inputs: false,
};

pub static VAE_LOADER: InvocationSpec = InvocationSpec {
    node_type: "vae_loader",
    title: "VAE",
    version: "1.0.2",
    inputs: &[FieldSpec::direct("vae_model", "VAE", VAE_MODEL, NONE)],
    outputs: &[OutputSpec::new("vae", VAE)],
    open_inputs: false,
};

pub static LORA_LOADER: InvocationSpec = InvocationSpec {
    node_type: "lora_loader",
    title: "LoRA",
    version: "1.0.2",
    inputs: &[
        FieldSpec::direct("lora", "LoRA", LORA_MODEL, NONE),
        FieldSpec::direct("weight", "Weight", FLOAT, DefaultValue::Float(0.75)),
        FieldSpec::connection("unet", "UNet", UNET),
        FieldSpec::connection("clip", "CLIP", CLIP),
    ],
    outputs: &[OutputSpec::new("unet", UNET), OutputSpec::new("clip", CLIP)],
    open_inputs: false,
};

pub static SDXL_LORA_LOADER: InvocationSpec = InvocationSpec {
    node_type: "sdxl_lora_loader",
    title: "SDXL LoRA",
    version: "1.0.2",
    inputs: &[
        FieldSpec::direct("lora", "LoRA", LORA_MODEL, NONE),
        FieldSpec::direct("weight", "Weight", FLOAT, DefaultValue::Float(0.75)),
        FieldSpec::connection("unet", "UNet", UNET),
        FieldSpec::connection("clip", "CLIP 1", CLIP),
        FieldSpec::connection("clip2", "CLIP 2", CLIP),
    ],
    outputs: &[
        OutputSpec::new("unet", UNET),
        OutputSpec::new("clip", CLIP),
        OutputSpec::new("clip2", CLIP),
    ],
    open_inputs: false,
};

pub static COMPEL: InvocationSpec = InvocationSpec {
    node_type: "compel",
    title: "Prompt",
    version: "1.0.1",
    inputs: &[
        FieldSpec::any("prompt", "Prompt", STRING, DefaultValue::Str("")),
        FieldSpec::connection("clip", "CLIP", CLIP),
    ],
    outputs: &[OutputSpec::new("conditioning", CONDITIONING)],
    open_inputs: false,
};

pub static SDXL_COMPEL_PROMPT: InvocationSpec = InvocationSpec {
    node_type: "sdxl_compel_prompt",
    title: "SDXL Prompt",
    version: "1.0.1",
    inputs: &[
        FieldSpec::any("prompt", "Prompt", STRING, DefaultValue::Str("")),
        FieldSpec::any("style", "Style", STRING, DefaultValue::Str("")),
        FieldSpec::any("original_width", "Original Width", INTEGER, DefaultValue::Int(1024)),
        FieldSpec::any("original_height", "Original Height", INTEGER, DefaultValue::Int(1024)),
        FieldSpec::any("crop_top", "Crop Top", INTEGER, DefaultValue::Int(0)),
        FieldSpec::any("crop_left", "Crop Left", INTEGER, DefaultValue::Int(0)),
        FieldSpec::any("target_width", "Target Width", INTEGER, DefaultValue::Int(1024)),
        FieldSpec::any("target_height", "Target Height", INTEGER, DefaultValue::Int(1024)),
        FieldSpec::connection("clip", "CLIP 1", CLIP),
        FieldSpec::connection("clip2", "CLIP 2", CLIP),
    ],
    outputs: &[OutputSpec::new("conditioning", CONDITIONING)],
    open_inputs: false,
};

pub static NOISE: InvocationSpec = InvocationSpec {
    node_type: "noise",
    title: "Noise",
    version: "1.0.1",
    inputs: &[
        FieldSpec::any("seed", "Seed", INTEGER, DefaultValue::Int(0)),
        FieldSpec::any("width", "Width", INTEGER, DefaultValue::Int(512)),
        FieldSpec::any("height", "Height", INTEGER, DefaultValue::Int(512)),
        FieldSpec::direct("use_cpu", "Use CPU", BOOLEAN, DefaultValue::Bool(true)),
    ],
    outputs: &[
        OutputSpec::new("noise", LATENTS),
        OutputSpec::new("width", INTEGER),
        OutputSpec::new("height", INTEGER),
    ],
    open_inputs: false,
};

pub static DENOISE_LATENTS: InvocationSpec = InvocationSpec {
    node_type: "denoise_latents",
    title: "Denoise Latents",
    version: "1.5.1",
    inputs: &[
        FieldSpec::connection("positive_conditioning", "Positive Conditioning", CONDITIONING),
        FieldSpec::connection("negative_conditioning", "Negative Conditioning", CONDITIONING),
        FieldSpec::connection("noise", "Noise", LATENTS),
        FieldSpec::any("steps", "Steps", INTEGER, DefaultValue::Int(10)),
        FieldSpec::any("cfg_scale", "CFG Scale", FLOAT, DefaultValue::Float(7.5)),
        FieldSpec::direct(
            "cfg_rescale_multiplier",
            "CFG Rescale Multiplier",
            FLOAT,
            DefaultValue::Float(0.0),
        ),
        FieldSpec::direct("denoising_start", "Denoising Start", FLOAT, DefaultValue::Float(0.0)),
        FieldSpec::direct("denoising_end", "Denoising End", FLOAT, DefaultValue::Float(1.0)),
        FieldSpec::any("scheduler", "Scheduler", SCHEDULER, DefaultValue::Str("euler")),
        FieldSpec::connection("unet", "UNet", UNET),
        FieldSpec::connection("control", "Control", CONTROL).many(),
        FieldSpec::connection("ip_adapter", "IP-Adapter", IP_ADAPTER).many(),
        FieldSpec::connection("t2i_adapter", "T2I-Adapter", T2I_ADAPTER).many(),
        FieldSpec::connection("latents", "Latents", LATENTS),
        FieldSpec::connection("denoise_mask", "Denoise Mask", DENOISE_MASK),
        FieldSpec::connection("vae", "VAE", VAE),
        FieldSpec::connection("metadata", "Metadata", METADATA),
    ],
    outputs: &[
        OutputSpec::new("latents", LATENTS),
        OutputSpec::new("width", INTEGER),
        OutputSpec::new("height", INTEGER),
    ],
    open_inputs: false,
};

pub static LATENTS_TO_IMAGE: InvocationSpec = InvocationSpec {
    node_type: "l2i",
    title: "Latents to Image",
    version: "1.2.2",
    inputs: &[
        FieldSpec::connection("latents", "Latents", LATENTS),
        FieldSpec::connection("vae", "VAE", VAE),
        FieldSpec::any("fp32", "FP32", BOOLEAN, DefaultValue::Bool(false)),
        FieldSpec::direct("board", "Board", BOARD, NONE),
        FieldSpec::connection("metadata", "Metadata", METADATA),
    ],
    outputs: &[
        OutputSpec::new("image", IMAGE),
        OutputSpec::new("width", INTEGER),
        OutputSpec::new("height", INTEGER),
    ],
    open_inputs: false,
};

pub static IMAGE_TO_LATENTS: InvocationSpec = InvocationSpec {
    node_type: "i2l",
    title: "Image to Latents",
    version: "1.0.2",
    inputs: &[
        FieldSpec::any("image", "Image", IMAGE, NONE),
        FieldSpec::connection("vae", "VAE", VAE),
        FieldSpec::any("fp32", "FP32", BOOLEAN, DefaultValue::Bool(false)),
    ],
    outputs: &[
        OutputSpec::new("latents", LATENTS),
        OutputSpec::new("width", INTEGER),
        OutputSpec::new("height", INTEGER),
    ],
    open_inputs: false,
};

pub static RESIZE_LATENTS: InvocationSpec = InvocationSpec {
    node_type: "lresize",
    title: "Resize Latents",
    version: "1.0.2",
    inputs: &[
        FieldSpec::connection("latents", "Latents", LATENTS),
        FieldSpec::any("width", "Width", INTEGER, DefaultValue::Int(512)),
        FieldSpec::any("height", "Height", INTEGER, DefaultValue::Int(512)),
        FieldSpec::direct("mode", "Mode", ENUM, DefaultValue::Str("bilinear")),
        FieldSpec::direct("antialias", "Antialias", BOOLEAN, DefaultValue::Bool(false)),
    ],
    outputs: &[
        OutputSpec::new("latents", LATENTS),
        OutputSpec::new("width", INTEGER),
        OutputSpec::new("height", INTEGER),
    ],
    open_inputs: false,
};

pub static IMAGE_RESIZE: InvocationSpec = InvocationSpec {
    node_type: "img_resize",
    title: "Resize Image",
    version: "1.2.2",
    inputs: &[
        FieldSpec::any("image", "Image", IMAGE, NONE),
        FieldSpec::any("width", "Width", INTEGER, DefaultValue::Int(512)),
        FieldSpec::any("height", "Height", INTEGER, DefaultValue::Int(512)),
        FieldSpec::direct("resample_mode", "Resample Mode", ENUM, DefaultValue::Str("bicubic")),
        FieldSpec::direct("board", "Board", BOARD, NONE),
        FieldSpec::connection("metadata", "Metadata", METADATA),
    ],
    outputs: &[
        OutputSpec::new("image", IMAGE),
        OutputSpec::new("width", INTEGER),
        OutputSpec::new("height", INTEGER),
    ],
    open_inputs: false,
};

pub static ESRGAN: InvocationSpec = InvocationSpec {
    node_type: "esrgan",
    title: "Upscale (RealESRGAN)",
    version: "1.3.2",
    inputs: &[
        FieldSpec::any("image", "Image", IMAGE, NONE),
        FieldSpec::direct(
            "model_name",
            "Model Name",
            ENUM,
            DefaultValue::Str("RealESRGAN_x4plus.pth"),
        ),
        FieldSpec::direct("tile_size", "Tile Size", INTEGER, DefaultValue::Int(400)),
        FieldSpec::direct("board", "Board", BOARD, NONE),
        FieldSpec::connection("metadata", "Metadata", METADATA),
    ],
    outputs: &[
        OutputSpec::new("image", IMAGE),
        OutputSpec::new("width", INTEGER),
        OutputSpec::new("height", INTEGER),
    ],
    open_inputs: false,
};

const INFILL_OUTPUTS: &[OutputSpec] = &[
    OutputSpec::new("image", IMAGE),
    OutputSpec::new("width", INTEGER),
    OutputSpec::new("height", INTEGER),
];

pub static INFILL_PATCHMATCH: InvocationSpec = InvocationSpec {
    node_type: "infill_patchmatch",
    title: "PatchMatch Infill",
    version: "1.2.2",
    inputs: &[
        FieldSpec::any("image", "Image", IMAGE, NONE),
        FieldSpec::direct("downscale", "Downscale", FLOAT, DefaultValue::Float(2.0)),
        FieldSpec::direct("resample_mode", "Resample Mode", ENUM, DefaultValue::Str("bicubic")),
    ],
    outputs: INFILL_OUTPUTS,
    open_inputs: false,
};

pub static INFILL_LAMA: InvocationSpec = InvocationSpec {
    node_type: "infill_lama",
    title: "LaMa Infill",
    version: "1.2.2",
    inputs: &[FieldSpec::any("image", "Image", IMAGE, NONE)],
    outputs: INFILL_OUTPUTS,
    open_inputs: false,
};

pub static INFILL_CV2: InvocationSpec = InvocationSpec {
    node_type: "infill_cv2",
    title: "CV2 Infill",
    version: "1.2.2",
    inputs: &[FieldSpec::any("image", "Image", IMAGE, NONE)],
    outputs: INFILL_OUTPUTS,
    open_inputs: false,
};

pub static INFILL_TILE: InvocationSpec = InvocationSpec {
    node_type: "infill_tile",
    title: "Tile Infill",
    version: "1.2.2",
    inputs: &[
        FieldSpec::any("image", "Image", IMAGE, NONE),
        FieldSpec::direct("tile_size", "Tile Size", INTEGER, DefaultValue::Int(32)),
        FieldSpec::any("seed", "Seed", INTEGER, DefaultValue::Int(0)),
    ],
    outputs: INFILL_OUTPUTS,
    open_inputs: false,
};

pub static INFILL_COLOR: InvocationSpec = InvocationSpec {
    node_type: "infill_rgba",
    title: "Solid Color Infill",
    version: "1.2.2",
    inputs: &[
        FieldSpec::any("image", "Image", IMAGE, NONE),
        FieldSpec::direct("color", "Color", COLOR, NONE),
    ],
    outputs: INFILL_OUTPUTS,
    open_inputs: false,
};

pub static CONTROLNET: InvocationSpec = InvocationSpec {
    node_type: "controlnet",
    title: "ControlNet",
    version: "1.1.1",
    inputs: &[
        FieldSpec::any("image", "Image", IMAGE, NONE),
        FieldSpec::direct("control_model", "Control Model", CONTROLNET_MODEL, NONE),
        FieldSpec::any("control_weight", "Control Weight", FLOAT, DefaultValue::Float(1.0)),
        FieldSpec::direct("begin_step_percent", "Begin Step %", FLOAT, DefaultValue::Float(0.0)),
        FieldSpec::direct("end_step_percent", "End Step %", FLOAT, DefaultValue::Float(1.0)),
        FieldSpec::direct("control_mode", "Control Mode", ENUM, DefaultValue::Str("balanced")),
        FieldSpec::direct("resize_mode", "Resize Mode", ENUM, DefaultValue::Str("just_resize")),
    ],
    outputs: &[OutputSpec::new("control", CONTROL)],
    open_inputs: false,
};

pub static IP_ADAPTER_NODE: InvocationSpec = InvocationSpec {
    node_type: "ip_adapter",
    title: "IP-Adapter",
    version: "1.1.2",
    inputs: &[
        FieldSpec::any("image", "Image", IMAGE, NONE),
        FieldSpec::direct("ip_adapter_model", "IP-Adapter Model", IP_ADAPTER_MODEL, NONE),
        FieldSpec::any("weight", "Weight", FLOAT, DefaultValue::Float(1.0)),
        FieldSpec::direct("begin_step_percent", "Begin Step %", FLOAT, DefaultValue::Float(0.0)),
        FieldSpec::direct("end_step_percent", "End Step %", FLOAT, DefaultValue::Float(1.0)),
    ],
    outputs: &[OutputSpec::new("ip_adapter", IP_ADAPTER)],
    open_inputs: false,
};

pub static COLLECT: InvocationSpec = InvocationSpec {
    node_type: "collect",
    title: "Collect",
    version: "1.0.0",
    inputs: &[FieldSpec::connection("item", "Collection Item", COLLECTION_ITEM)],
    outputs: &[OutputSpec::collection("collection", COLLECTION)],
    open_inputs: false,
};

pub static IMAGE_PRIMITIVE: InvocationSpec = InvocationSpec {
    node_type: "image",
    title: "Image Primitive",
    version: "1.0.1",
    inputs: &[FieldSpec::direct("image", "Image", IMAGE, NONE)],
    outputs: &[
        OutputSpec::new("image", IMAGE),
        OutputSpec::new("width", INTEGER),
        OutputSpec::new("height", INTEGER),
    ],
    open_inputs: false,
};

pub static CORE_METADATA: InvocationSpec = InvocationSpec {
    node_type: "core_metadata",
    title: "Core Metadata",
    version: "1.0.1",
    inputs: &[],
    outputs: &[OutputSpec::new("metadata", METADATA)],
    open_inputs: true,
};

/// Whether an output of `source` type may feed an input of `destination` type.
pub fn types_compatible(
    source: (&str, Cardinality),
    destination: (&str, Cardinality),
) -> bool {
    let (source_type, source_cardinality) = source;
    let (destination_type, destination_cardinality) = destination;

    if destination_type == COLLECTION_ITEM || source_type == COLLECTION_ITEM {
        return true;
    }
    // A generic collection feeds any input that takes a collection.
    if source_type == COLLECTION {
        return destination_cardinality != Cardinality::Single;
    }

    let cardinality_ok = match (source_cardinality, destination_cardinality) {
        (a, b) if a == b => true,
        (_, Cardinality::CollectionOrScalar) => true,
        _ => false,
    };
    if !cardinality_ok {
        return false;
    }

    source_type == destination_type || (source_type == INTEGER && destination_type == FLOAT)
}
