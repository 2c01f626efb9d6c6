//! Value types carried by invocation fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The model family a main model belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BaseModel {
    #[default]
    #[serde(rename = "sd-1")]
    StableDiffusion1,
    #[serde(rename = "sd-2")]
    StableDiffusion2,
    #[serde(rename = "sdxl")]
    StableDiffusionXl,
    #[serde(rename = "sdxl-refiner")]
    StableDiffusionXlRefiner,
}

impl BaseModel {
    pub fn as_str(self) -> &'static str {
        match self {
            BaseModel::StableDiffusion1 => "sd-1",
            BaseModel::StableDiffusion2 => "sd-2",
            BaseModel::StableDiffusionXl => "sdxl",
            BaseModel::StableDiffusionXlRefiner => "sdxl-refiner",
        }
    }
}

impl fmt::Display for BaseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to an installed model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelIdentifier {
    pub key: String,
    pub name: String,
    pub base: BaseModel,
    #[serde(rename = "type")]
    pub model_type: String,
}

impl ModelIdentifier {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        base: BaseModel,
        model_type: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            base,
            model_type: model_type.into(),
        }
    }
}

/// A reference to an image stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageField {
    pub image_name: String,
}

impl ImageField {
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
        }
    }
}

/// A reference to a board that output images are added to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardField {
    pub board_id: String,
}

/// An RGBA fill color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorField {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for ColorField {
    fn default() -> Self {
        Self {
            r: 127,
            g: 127,
            b: 127,
            a: 255,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scheduler {
    Ddim,
    Ddpm,
    Deis,
    Lms,
    LmsK,
    Pndm,
    Heun,
    HeunK,
    #[default]
    Euler,
    EulerK,
    EulerA,
    #[serde(rename = "kdpm_2")]
    Kdpm2,
    #[serde(rename = "kdpm_2_a")]
    Kdpm2A,
    #[serde(rename = "dpmpp_2s")]
    Dpmpp2s,
    #[serde(rename = "dpmpp_2s_k")]
    Dpmpp2sK,
    #[serde(rename = "dpmpp_2m")]
    Dpmpp2m,
    #[serde(rename = "dpmpp_2m_k")]
    Dpmpp2mK,
    #[serde(rename = "dpmpp_2m_sde")]
    Dpmpp2mSde,
    #[serde(rename = "dpmpp_2m_sde_k")]
    Dpmpp2mSdeK,
    DpmppSde,
    DpmppSdeK,
    Unipc,
    Lcm,
}

/// Interpolation used when resizing latents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LatentsResizeMode {
    Nearest,
    Linear,
    #[default]
    Bilinear,
    Bicubic,
    Trilinear,
    Area,
    NearestExact,
}

/// Resampling filter used when resizing images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResampleMode {
    Nearest,
    Box,
    Bilinear,
    Hamming,
    #[default]
    Bicubic,
    Lanczos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    #[default]
    Balanced,
    MorePrompt,
    MoreControl,
    Unbalanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControlResizeMode {
    #[default]
    JustResize,
    CropResize,
    FillResize,
    JustResizeSimple,
}
