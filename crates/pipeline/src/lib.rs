//! Classification Pipeline
//!
//! Serializes access to a classifier resource and exposes a race-free
//! submit/observe contract:
//! - at most one classification request in flight at a time
//! - monotonic request ids; stale completions are discarded, never applied
//! - cooperative cancellation and optional timeout
//! - load-once classifier lifecycle (single-flight on the loader)
//!
//! A presentation layer observes [`PipelineState`] snapshots through
//! [`ClassificationPipeline::subscribe`] and renders them.

pub mod config;
mod model;
pub mod pipeline;
pub mod state;

pub use config::{CollisionPolicy, PipelineConfig};
pub use pipeline::ClassificationPipeline;
pub use state::{PipelineState, RequestId};

use classifier::ClassifierError;
use thiserror::Error;

/// Pipeline error types
///
/// All of these are recoverable; the pipeline stays usable after any of
/// them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Classifier model is not ready")]
    ModelNotReady,

    #[error("Submitted image holds no pixel data")]
    InvalidImage,

    #[error("A classification request is already in flight")]
    Busy,

    #[error("Classification timed out after {0}ms")]
    Timeout(u64),

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Classification failed: {0}")]
    Classification(String),
}

impl From<ClassifierError> for PipelineError {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::ModelLoad(message) => PipelineError::ModelLoad(message),
            other => PipelineError::Classification(other.to_string()),
        }
    }
}
