use super::INFILL;
use super::state::InfillSettings;
use crate::error::BuildError;
use crate::graph::{
    Graph, InfillColor, InfillCv2, InfillLama, InfillPatchMatch, InfillTile, Invocation,
    NodeHandle, ResampleMode,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of infill algorithms.
///
/// Deserialization goes through `FromStr`, so unknown names surface as
/// `BuildError::UnknownInfillMethod` on every input path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "&'static str")]
pub enum InfillMethod {
    #[default]
    PatchMatch,
    Lama,
    Cv2,
    Tile,
    Color,
}

impl InfillMethod {
    pub const ALL: [InfillMethod; 5] = [
        InfillMethod::PatchMatch,
        InfillMethod::Lama,
        InfillMethod::Cv2,
        InfillMethod::Tile,
        InfillMethod::Color,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InfillMethod::PatchMatch => "patchmatch",
            InfillMethod::Lama => "lama",
            InfillMethod::Cv2 => "cv2",
            InfillMethod::Tile => "tile",
            InfillMethod::Color => "color",
        }
    }
}

impl fmt::Display for InfillMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InfillMethod {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InfillMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| BuildError::UnknownInfillMethod(s.to_string()))
    }
}

impl TryFrom<String> for InfillMethod {
    type Error = BuildError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InfillMethod> for &'static str {
    fn from(method: InfillMethod) -> Self {
        method.as_str()
    }
}

/// Inserts exactly one infill node matching `settings.method`.
pub fn add_infill(graph: &mut Graph, settings: &InfillSettings) -> Result<NodeHandle, BuildError> {
    let id = INFILL.to_string();
    let image = settings.image.clone();
    let is_intermediate = Some(true);

    let node: Invocation = match settings.method {
        InfillMethod::PatchMatch => InfillPatchMatch {
            id,
            is_intermediate,
            image,
            downscale: settings.patchmatch_downscale,
            resample_mode: ResampleMode::Bicubic,
        }
        .into(),
        InfillMethod::Lama => InfillLama {
            id,
            is_intermediate,
            image,
        }
        .into(),
        InfillMethod::Cv2 => InfillCv2 {
            id,
            is_intermediate,
            image,
        }
        .into(),
        InfillMethod::Tile => InfillTile {
            id,
            is_intermediate,
            image,
            tile_size: settings.tile_size,
            seed: None,
        }
        .into(),
        InfillMethod::Color => InfillColor {
            id,
            is_intermediate,
            image,
            color: settings.color,
        }
        .into(),
    };

    tracing::debug!(method = %settings.method, "Adding infill node");
    Ok(graph.add_node(node)?)
}
