//! Workflow documents: the model, the migration chain, structural validation,
//! the loader and the graph converter.

mod convert;
pub mod migrations;
mod model;
mod schema;
mod validator;

pub use convert::{GraphDocument, NODE_HEIGHT, NODE_SPACING, NODE_WIDTH, graph_to_workflow};
pub use migrations::{CURRENT_VERSION, SUPPORTED_VERSIONS, detect_version, migrate};
pub use model::*;
pub use schema::{SchemaIssue, SchemaIssues, validate_structure};
pub use validator::{
    AllowAll, ResourceChecker, ResourceRef, ValidatedWorkflow, WorkflowValidator,
    WorkflowValidatorBuilder, WorkflowWarning,
};
