//! Load-once classifier holder
//!
//! The classifier is a single owned resource behind the pipeline:
//! loaded once, then shared read-only by every request. Loading is
//! single-flight: a `load` call that finds a load already pending joins
//! its outcome instead of starting a duplicate.

use std::sync::Arc;

use classifier::{Classifier, ClassifierLoader};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::PipelineError;

/// Classifier lifecycle phase
#[derive(Clone)]
enum LoadPhase {
    Unloaded,
    Loading,
    Ready(Arc<dyn Classifier>),
    Failed(String),
}

pub(crate) struct ModelSlot {
    phase: watch::Sender<LoadPhase>,
}

impl ModelSlot {
    pub(crate) fn new() -> Self {
        let (phase, _) = watch::channel(LoadPhase::Unloaded);
        Self { phase }
    }

    /// The loaded classifier, when ready
    pub(crate) fn ready(&self) -> Option<Arc<dyn Classifier>> {
        match &*self.phase.borrow() {
            LoadPhase::Ready(classifier) => Some(classifier.clone()),
            _ => None,
        }
    }

    /// Load the classifier behind `model_ref`, or join the load already in
    /// flight. A previously failed load may be retried.
    pub(crate) async fn load(
        &self,
        loader: &dyn ClassifierLoader,
        model_ref: &str,
    ) -> Result<(), PipelineError> {
        // Subscribe before claiming so a lost claim can still observe the
        // winner's outcome.
        let mut rx = self.phase.subscribe();

        let mut claimed = false;
        self.phase.send_if_modified(|phase| match phase {
            LoadPhase::Unloaded | LoadPhase::Failed(_) => {
                *phase = LoadPhase::Loading;
                claimed = true;
                true
            }
            _ => false,
        });

        if claimed {
            info!("Loading classifier from {}", model_ref);
            match loader.load(model_ref).await {
                Ok(classifier) => {
                    info!("Classifier ready");
                    self.phase.send_replace(LoadPhase::Ready(classifier));
                    Ok(())
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!("Classifier load failed: {}", message);
                    self.phase.send_replace(LoadPhase::Failed(message.clone()));
                    Err(PipelineError::ModelLoad(message))
                }
            }
        } else {
            loop {
                {
                    match &*rx.borrow_and_update() {
                        LoadPhase::Ready(_) => return Ok(()),
                        LoadPhase::Failed(message) => {
                            return Err(PipelineError::ModelLoad(message.clone()))
                        }
                        _ => {}
                    }
                }
                if rx.changed().await.is_err() {
                    return Err(PipelineError::ModelLoad(
                        "pipeline dropped while loading".to_string(),
                    ));
                }
            }
        }
    }
}
