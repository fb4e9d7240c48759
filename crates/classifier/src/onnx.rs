//! ONNX classification backend
//!
//! Loads a model directory containing `model.onnx` and `metadata.json`
//! and runs inference through an `ort` session. Input frames are resized
//! to the model input edge and normalized to [-1, 1], NCHW.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use capture::ImageHandle;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{debug, info};

use crate::{
    Classifier, ClassifierError, ClassifierLoader, LabelScore, ModelMetadata, Prediction,
};

/// Default model input edge length (pixels)
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Model file name expected inside a model directory
const MODEL_FILE: &str = "model.onnx";
/// Metadata file name expected inside a model directory
const METADATA_FILE: &str = "metadata.json";

/// ONNX-backed image classifier
///
/// The session is shared read-only across requests once built.
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Session,
    labels: Vec<String>,
    input_size: u32,
}

impl OnnxClassifier {
    /// Load a classifier from a model directory.
    pub fn from_dir(dir: &Path, input_size: u32) -> Result<Self, ClassifierError> {
        let metadata = ModelMetadata::from_file(&dir.join(METADATA_FILE))?;
        let model_path = dir.join(MODEL_FILE);
        info!(
            "Loading ONNX model from {} ({} labels)",
            model_path.display(),
            metadata.labels.len()
        );

        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.commit_from_file(&model_path))
            .map_err(|e| ClassifierError::ModelLoad(e.to_string()))?;

        Ok(Self {
            session,
            labels: metadata.labels,
            input_size,
        })
    }

    /// Class labels in model output order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Resize and normalize a frame into the model input tensor (1x3xSxS, [-1, 1])
pub(crate) fn image_to_tensor(
    image: &ImageHandle,
    size: u32,
) -> Result<Array4<f32>, ClassifierError> {
    let buf = image::ImageBuffer::<image::Rgb<u8>, _>::from_raw(
        image.width(),
        image.height(),
        image.data().to_vec(),
    )
    .ok_or_else(|| ClassifierError::InvalidInputShape {
        expected: format!("{}x{} RGB frame", image.width(), image.height()),
        actual: format!("{} bytes", image.data().len()),
    })?;

    let resized = image::imageops::resize(&buf, size, size, image::imageops::FilterType::Triangle);

    let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = (pixel[0] as f32 / 127.5) - 1.0;
        input[[0, 1, y as usize, x as usize]] = (pixel[1] as f32 / 127.5) - 1.0;
        input[[0, 2, y as usize, x as usize]] = (pixel[2] as f32 / 127.5) - 1.0;
    }
    Ok(input)
}

#[async_trait]
impl Classifier for OnnxClassifier {
    async fn classify(&self, image: &ImageHandle) -> Result<Prediction, ClassifierError> {
        let start = Instant::now();
        let input = image_to_tensor(image, self.input_size)?;

        let outputs = self
            .session
            .run(ort::inputs![input].map_err(|e| ClassifierError::Inference(e.to_string()))?)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let tensor = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let scores: Vec<f32> = tensor.iter().copied().collect();

        if scores.len() != self.labels.len() {
            return Err(ClassifierError::InvalidInputShape {
                expected: format!("{} class scores", self.labels.len()),
                actual: format!("{} class scores", scores.len()),
            });
        }

        let prediction = Prediction::new(
            self.labels
                .iter()
                .cloned()
                .zip(scores)
                .map(|(label, probability)| LabelScore { label, probability })
                .collect(),
        );

        debug!("Classified image in {}ms", start.elapsed().as_millis());
        Ok(prediction)
    }
}

/// Loads [`OnnxClassifier`] instances from model directories
pub struct OnnxLoader {
    input_size: u32,
}

impl OnnxLoader {
    /// Loader with the default input size
    pub fn new() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
        }
    }

    /// Loader for models with a non-default input edge length
    pub fn with_input_size(input_size: u32) -> Self {
        Self { input_size }
    }
}

impl Default for OnnxLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClassifierLoader for OnnxLoader {
    async fn load(&self, model_ref: &str) -> Result<Arc<dyn Classifier>, ClassifierError> {
        let dir = PathBuf::from(model_ref);
        let classifier = OnnxClassifier::from_dir(&dir, self.input_size)?;
        Ok(Arc::new(classifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(value: u8) -> ImageHandle {
        ImageHandle::from_rgb8(vec![value; 2 * 2 * 3], 2, 2).unwrap()
    }

    #[test]
    fn tensor_has_nchw_shape() {
        let tensor = image_to_tensor(&gray_frame(128), 8).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 8, 8]);
    }

    #[test]
    fn tensor_values_are_normalized() {
        let white = image_to_tensor(&gray_frame(255), 4).unwrap();
        assert!(white.iter().all(|&v| (v - 1.0).abs() < 1e-5));

        let black = image_to_tensor(&gray_frame(0), 4).unwrap();
        assert!(black.iter().all(|&v| (v + 1.0).abs() < 1e-5));
    }

    #[test]
    fn missing_model_dir_is_model_load_error() {
        let err = OnnxClassifier::from_dir(Path::new("/nonexistent/model"), 224).unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
    }
}
