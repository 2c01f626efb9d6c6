//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and functions from the genflow crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use genflow::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let state = GenerationState::default();
//! let graph = build_adhoc_upscale_graph(&state, &ImageField::new("abc123"))?;
//! println!("{:?}", graph.get_graph());
//! # Ok(())
//! # }
//! ```

// Graph construction
pub use crate::graph::{
    BaseModel, Edge, Graph, GraphSnapshot, ImageField, Invocation, InvocationKind, ModelIdentifier,
    NodeHandle,
};

// Builders
pub use crate::builders::{
    BuiltGraph, GenerationState, InfillMethod, add_hrf, add_infill, build_adhoc_upscale_graph,
    build_text_to_image_graph,
};

// Workflows
pub use crate::templates::Templates;
pub use crate::workflow::{
    GraphDocument, ResourceChecker, ValidatedWorkflow, Workflow, WorkflowValidator,
    WorkflowWarning, graph_to_workflow,
};

// Recall
pub use crate::recall::{Dispatch, RecallCommand, recall_parameters};

// Error types
pub use crate::error::{BuildError, CheckError, GraphError, WorkflowError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
