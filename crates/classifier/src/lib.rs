//! Image Classification Backends
//!
//! A [`Classifier`] maps a decoded image to a probability-labeled
//! prediction list. Backends are opaque pretrained models; the bundled
//! ONNX backend loads a model directory (`model.onnx` + `metadata.json`).
//! [`FakeClassifier`] and [`FakeLoader`] give tests full control over
//! outcomes and timing.

pub mod fake;
pub mod metadata;
pub mod onnx;
pub mod prediction;

pub use fake::{FakeClassifier, FakeGate, FakeLoader};
pub use metadata::ModelMetadata;
pub use onnx::{OnnxClassifier, OnnxLoader};
pub use prediction::{LabelScore, Prediction};

use std::sync::Arc;

use async_trait::async_trait;
use capture::ImageHandle;
use thiserror::Error;

/// Errors from classification backends
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Classification failed: {0}")]
    Inference(String),

    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
}

/// Opaque pretrained model capable of labeling an image
///
/// Implementations must be shareable read-only across requests; the
/// pipeline never mutates a classifier after load.
#[async_trait]
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Classify a single image into a probability-labeled prediction list.
    async fn classify(&self, image: &ImageHandle) -> Result<Prediction, ClassifierError>;
}

/// Loads a classifier from an opaque model locator
#[async_trait]
pub trait ClassifierLoader: Send + Sync {
    /// Load the model behind `model_ref` and return a ready classifier.
    async fn load(&self, model_ref: &str) -> Result<Arc<dyn Classifier>, ClassifierError>;
}
