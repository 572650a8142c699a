//! Mission Model Library
//!
//! Typed scenario, node and task records for the contact plan designer.
//! Records are deserialized strictly (unknown or missing fields are rejected)
//! and validated before any planning starts.

use std::path::PathBuf;
use thiserror::Error;

pub mod loader;
pub mod node;
pub mod scenario;
pub mod task;

pub use node::{GroundNode, NodeRole, Satellite};
pub use scenario::Scenario;
pub use task::{Task, TaskTarget};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),
    #[error("Unknown node {id} referenced by {context}")]
    UnknownNode { context: String, id: String },
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("Invalid TLE for satellite {id}: {reason}")]
    InvalidTle { id: String, reason: String },
    #[error("{artifact} artifact already set to {existing:?}")]
    ArtifactAlreadySet { artifact: &'static str, existing: PathBuf },
    #[error("Task {0} already has a solution")]
    SolutionAlreadySet(u32),
}

pub type Result<T> = std::result::Result<T, ModelError>;

pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidField {
        field: field.into(),
        reason: reason.into(),
    }
}
