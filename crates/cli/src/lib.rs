//! CropSight CLI
//!
//! Minimal presentation layer over the classification pipeline: decodes an
//! image file, loads the ONNX classifier, submits the image, and prints
//! the observed state transitions and the top label.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use capture::ImageHandle;
use clap::Parser;
use classifier::OnnxLoader;
use pipeline::{ClassificationPipeline, PipelineConfig, PipelineState};
use serde::Deserialize;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Classify a crop image with a pretrained model
#[derive(Parser, Debug)]
#[command(name = "cropsight", version, about)]
pub struct Args {
    /// Model directory containing model.onnx and metadata.json
    #[arg(long)]
    pub model: PathBuf,

    /// Image file to classify
    #[arg(long)]
    pub image: PathBuf,

    /// Optional TOML settings file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Application settings
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Load settings from defaults, an optional TOML file, and
/// `CROPSIGHT_*` environment variables (in that order of precedence).
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("CROPSIGHT")
            .separator("__")
            .try_parsing(true),
    );

    let settings = builder
        .build()
        .context("building configuration")?
        .try_deserialize()
        .context("deserializing configuration")?;
    Ok(settings)
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run a single classification end to end
pub async fn run(args: Args) -> anyhow::Result<()> {
    info!("=== CropSight v{} ===", env!("CARGO_PKG_VERSION"));

    let settings = load_settings(args.config.as_deref())?;
    debug!("Settings: {:?}", settings);

    let pipeline = ClassificationPipeline::new(settings.pipeline, Arc::new(OnnxLoader::new()));
    pipeline
        .load_classifier(&args.model.display().to_string())
        .await
        .context("loading classifier")?;

    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("reading {}", args.image.display()))?;
    let image = ImageHandle::decode(&bytes).context("decoding image")?;

    let mut states = pipeline.subscribe();
    let id = pipeline.submit(image).context("submitting image")?;
    info!("Submitted request {}", id);

    loop {
        states.changed().await.context("pipeline dropped")?;
        let state = states.borrow_and_update().clone();
        match state {
            PipelineState::Succeeded { prediction, .. } => {
                match prediction.top() {
                    Some(top) => {
                        println!("{} ({:.1}%)", top.label, top.probability * 100.0)
                    }
                    None => println!("model produced no prediction"),
                }
                return Ok(());
            }
            PipelineState::Failed { error, .. } => {
                anyhow::bail!("classification failed: {error}");
            }
            state => debug!("Pipeline state: {:?}", state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::CollisionPolicy;

    #[test]
    fn settings_default_to_reject_new_without_timeout() {
        let settings = load_settings(None).unwrap();
        assert_eq!(
            settings.pipeline.collision_policy,
            CollisionPolicy::RejectNew
        );
        assert_eq!(settings.pipeline.timeout_ms, None);
    }

    #[test]
    fn settings_parse_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cropsight.toml");
        std::fs::write(
            &path,
            "[pipeline]\ncollision_policy = \"preempt\"\ntimeout_ms = 250\n",
        )
        .unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.pipeline.collision_policy, CollisionPolicy::Preempt);
        assert_eq!(settings.pipeline.timeout_ms, Some(250));
    }
}
