//! # genflow - Generation Graph Construction and Workflow Validation
//!
//! **genflow** turns image-generation parameters into typed execution graphs for
//! a remote backend, and loads user workflow documents back into a validated,
//! current-schema form.
//!
//! ## Core Workflow
//!
//! 1.  **Describe the request**: Deserialize a `GenerationState` from the front end's parameters.
//! 2.  **Build**: Run a builder such as `build_text_to_image_graph`. Builders append typed
//!     `Invocation` nodes and catalog-checked edges to a `Graph`.
//! 3.  **Submit**: Take an immutable `GraphSnapshot` with `Graph::get_graph` and serialize it.
//! 4.  **Load**: Feed workflow or graph JSON to a `WorkflowValidator`. Old schema versions are
//!     migrated, structure is validated, and references to images, boards and models are
//!     checked through an injected `ResourceChecker`. Problems that leave the workflow usable
//!     come back as warnings.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use genflow::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let state: GenerationState = serde_json::from_str(r#"{
//!         "positivePrompt": "a lighthouse at dusk",
//!         "model": { "key": "sd15", "name": "SD 1.5", "base": "sd-1", "type": "main" },
//!         "hrf": { "enabled": true, "scale": 1.5 }
//!     }"#)?;
//!
//!     let built = build_text_to_image_graph(&state)?;
//!     built.graph.validate()?;
//!     println!("{}", serde_json::to_string_pretty(&built.graph.get_graph())?);
//!
//!     let templates = Templates::builtin();
//!     let validator = WorkflowValidator::builder(&templates).build();
//!     let text = std::fs::read_to_string("workflow.json")?;
//!     let loaded = futures::executor::block_on(validator.load(&text))?;
//!     for warning in &loaded.warnings {
//!         println!("warning: {}", warning);
//!     }
//!     Ok(())
//! }
//! ```

pub mod builders;
pub mod error;
pub mod graph;
pub mod prelude;
pub mod recall;
pub mod templates;
pub mod workflow;
