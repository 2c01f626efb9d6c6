//! Restores generation parameters from stored image metadata.
//!
//! Recall never touches global state: each recognised metadata key becomes a
//! `RecallCommand` handed to a caller-supplied `Dispatch`.

use crate::builders::{GenerationState, HrfMethod};
use crate::graph::{ModelIdentifier, Scheduler};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A single parameter change produced by recall.
#[derive(Debug, Clone, PartialEq)]
pub enum RecallCommand {
    PositivePrompt(String),
    NegativePrompt(String),
    PositiveStylePrompt(String),
    NegativeStylePrompt(String),
    Seed(u64),
    Steps(u32),
    CfgScale(f64),
    CfgRescaleMultiplier(f64),
    Scheduler(Scheduler),
    Width(u32),
    Height(u32),
    Model(ModelIdentifier),
    Vae(ModelIdentifier),
    HrfEnabled(bool),
    HrfMethod(HrfMethod),
    HrfStrength(f64),
    EsrganModel(String),
}

/// Receives recalled parameters.
pub trait Dispatch {
    fn dispatch(&mut self, command: RecallCommand);
}

impl Dispatch for GenerationState {
    fn dispatch(&mut self, command: RecallCommand) {
        match command {
            RecallCommand::PositivePrompt(prompt) => self.positive_prompt = prompt,
            RecallCommand::NegativePrompt(prompt) => self.negative_prompt = prompt,
            RecallCommand::PositiveStylePrompt(prompt) => self.positive_style_prompt = prompt,
            RecallCommand::NegativeStylePrompt(prompt) => self.negative_style_prompt = prompt,
            RecallCommand::Seed(seed) => self.seed = seed,
            RecallCommand::Steps(steps) => self.steps = steps,
            RecallCommand::CfgScale(scale) => self.cfg_scale = scale,
            RecallCommand::CfgRescaleMultiplier(multiplier) => {
                self.cfg_rescale_multiplier = multiplier
            }
            RecallCommand::Scheduler(scheduler) => self.scheduler = scheduler,
            RecallCommand::Width(width) => self.width = width,
            RecallCommand::Height(height) => self.height = height,
            RecallCommand::Model(model) => self.model = Some(model),
            RecallCommand::Vae(vae) => self.vae = Some(vae),
            RecallCommand::HrfEnabled(enabled) => self.hrf.enabled = enabled,
            RecallCommand::HrfMethod(method) => self.hrf.method = method,
            RecallCommand::HrfStrength(strength) => self.hrf.strength = strength,
            RecallCommand::EsrganModel(name) => self.upscale.esrgan_model_name = name,
        }
    }
}

/// A metadata key that was present but could not be recalled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedKey {
    pub key: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecallReport {
    pub recalled: Vec<&'static str>,
    pub skipped: Vec<SkippedKey>,
}

type Parser = fn(&Value) -> Result<RecallCommand, String>;

fn parse<T: DeserializeOwned>(value: &Value) -> Result<T, String> {
    serde_json::from_value(value.clone()).map_err(|e| e.to_string())
}

const RECALLABLE: &[(&str, Parser)] = &[
    ("positive_prompt", |v| parse(v).map(RecallCommand::PositivePrompt)),
    ("negative_prompt", |v| parse(v).map(RecallCommand::NegativePrompt)),
    ("positive_style_prompt", |v| parse(v).map(RecallCommand::PositiveStylePrompt)),
    ("negative_style_prompt", |v| parse(v).map(RecallCommand::NegativeStylePrompt)),
    ("seed", |v| parse(v).map(RecallCommand::Seed)),
    ("steps", |v| parse(v).map(RecallCommand::Steps)),
    ("cfg_scale", |v| parse(v).map(RecallCommand::CfgScale)),
    ("cfg_rescale_multiplier", |v| parse(v).map(RecallCommand::CfgRescaleMultiplier)),
    ("scheduler", |v| parse(v).map(RecallCommand::Scheduler)),
    ("width", |v| parse(v).map(RecallCommand::Width)),
    ("height", |v| parse(v).map(RecallCommand::Height)),
    ("model", |v| parse(v).map(RecallCommand::Model)),
    ("vae", |v| parse(v).map(RecallCommand::Vae)),
    ("hrf_enabled", |v| parse(v).map(RecallCommand::HrfEnabled)),
    ("hrf_method", |v| parse(v).map(RecallCommand::HrfMethod)),
    ("hrf_strength", |v| parse(v).map(RecallCommand::HrfStrength)),
    ("esrgan_model", |v| parse(v).map(RecallCommand::EsrganModel)),
];

/// Dispatches one command per recognised, well-typed key in `metadata`.
/// Unknown keys are ignored.
pub fn recall_parameters(
    metadata: &Map<String, Value>,
    dispatch: &mut impl Dispatch,
) -> RecallReport {
    let mut report = RecallReport::default();
    for (key, parser) in RECALLABLE {
        let Some(value) = metadata.get(*key) else {
            continue;
        };
        match parser(value) {
            Ok(command) => {
                dispatch.dispatch(command);
                report.recalled.push(*key);
            }
            Err(reason) => {
                tracing::debug!(key = *key, %reason, "Skipping metadata key");
                report.skipped.push(SkippedKey { key: *key, reason });
            }
        }
    }
    report
}
