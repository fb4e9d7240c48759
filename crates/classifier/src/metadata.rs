//! Model metadata
//!
//! A model directory carries a `metadata.json` next to the weights with
//! the class labels in the order the model emits its scores.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ClassifierError;

/// Metadata shipped alongside a pretrained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Class labels in model output order
    pub labels: Vec<String>,
    /// Optional model name
    #[serde(default)]
    pub name: Option<String>,
}

impl ModelMetadata {
    /// Read metadata from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ClassifierError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::ModelLoad(format!("reading {}: {}", path.display(), e))
        })?;
        let metadata: ModelMetadata = serde_json::from_str(&raw).map_err(|e| {
            ClassifierError::ModelLoad(format!("parsing {}: {}", path.display(), e))
        })?;
        if metadata.labels.is_empty() {
            return Err(ClassifierError::ModelLoad(format!(
                "{} declares no labels",
                path.display()
            )));
        }
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(
            &path,
            r#"{"name": "crop-disease", "labels": ["Blight", "Rust", "Healthy"]}"#,
        )
        .unwrap();

        let metadata = ModelMetadata::from_file(&path).unwrap();
        assert_eq!(metadata.labels, vec!["Blight", "Rust", "Healthy"]);
        assert_eq!(metadata.name.as_deref(), Some("crop-disease"));
    }

    #[test]
    fn missing_file_is_model_load_error() {
        let err = ModelMetadata::from_file(Path::new("/nonexistent/metadata.json")).unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
    }

    #[test]
    fn empty_label_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, r#"{"labels": []}"#).unwrap();

        let err = ModelMetadata::from_file(&path).unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
    }

    #[test]
    fn garbage_json_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, "not json").unwrap();

        let err = ModelMetadata::from_file(&path).unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
    }
}
