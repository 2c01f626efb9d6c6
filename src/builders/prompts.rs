use super::state::GenerationState;

/// The style prompts fed to the second text encoder of dual-encoder models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylePrompts {
    pub positive: String,
    pub negative: String,
}

/// Concatenation on: the style prompts repeat the main prompts.
/// Off: the separately entered style prompts are used.
pub fn resolve_style_prompts(state: &GenerationState) -> StylePrompts {
    if state.should_concat_prompts {
        StylePrompts {
            positive: state.positive_prompt.clone(),
            negative: state.negative_prompt.clone(),
        }
    } else {
        StylePrompts {
            positive: state.positive_style_prompt.clone(),
            negative: state.negative_style_prompt.clone(),
        }
    }
}
