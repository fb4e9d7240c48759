//! Classification pipeline implementation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use capture::ImageHandle;
use classifier::{Classifier, ClassifierLoader, Prediction};
use tokio::sync::{watch, Mutex};
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::{CollisionPolicy, PipelineConfig};
use crate::model::ModelSlot;
use crate::state::{PipelineState, RequestId};
use crate::PipelineError;

/// Single-flight classification pipeline
///
/// Owns one classifier resource, accepts one image at a time, and applies
/// completions to state only while their request id is still the active
/// one. Cloning yields another handle to the same pipeline.
///
/// `submit` spawns the classification as a background task, so the
/// pipeline must be used from within a tokio runtime.
#[derive(Clone)]
pub struct ClassificationPipeline {
    inner: Arc<Inner>,
}

struct Inner {
    config: PipelineConfig,
    loader: Arc<dyn ClassifierLoader>,
    model: ModelSlot,
    state_tx: watch::Sender<PipelineState>,
    next_id: AtomicU64,
    /// Serializes actual classifier invocations; submissions are still
    /// accepted promptly.
    invoke_lock: Mutex<()>,
}

impl ClassificationPipeline {
    /// Create a pipeline around a classifier loader
    pub fn new(config: PipelineConfig, loader: Arc<dyn ClassifierLoader>) -> Self {
        info!("Creating classification pipeline with config: {:?}", config);
        let (state_tx, _) = watch::channel(PipelineState::Idle);
        Self {
            inner: Arc::new(Inner {
                config,
                loader,
                model: ModelSlot::new(),
                state_tx,
                next_id: AtomicU64::new(0),
                invoke_lock: Mutex::new(()),
            }),
        }
    }

    /// Load the classifier behind `model_ref`.
    ///
    /// Single-flight: a call made while a load is already pending awaits
    /// that load's outcome instead of starting a duplicate; a call made
    /// when the classifier is ready returns immediately.
    pub async fn load_classifier(&self, model_ref: &str) -> Result<(), PipelineError> {
        self.inner
            .model
            .load(self.inner.loader.as_ref(), model_ref)
            .await
    }

    /// Submit an image for classification.
    ///
    /// Validates synchronously and returns the assigned request id without
    /// waiting for the classifier; the result arrives as a state
    /// transition. While a request is in flight the configured collision
    /// policy decides between rejecting the new submission (`Busy`) and
    /// preempting the active one.
    pub fn submit(&self, image: ImageHandle) -> Result<RequestId, PipelineError> {
        let classifier = self
            .inner
            .model
            .ready()
            .ok_or(PipelineError::ModelNotReady)?;
        if image.is_empty() {
            return Err(PipelineError::InvalidImage);
        }

        let mut assigned = None;
        self.inner.state_tx.send_if_modified(|state| {
            if state.is_loading()
                && self.inner.config.collision_policy == CollisionPolicy::RejectNew
            {
                return false;
            }
            let id = RequestId(self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            *state = PipelineState::Loading { id };
            assigned = Some(id);
            true
        });

        let id = match assigned {
            Some(id) => id,
            None => return Err(PipelineError::Busy),
        };

        debug!("Submitted request {}", id);
        tokio::spawn(run_request(self.inner.clone(), classifier, image, id));
        Ok(id)
    }

    /// Cancel the request with the given id.
    ///
    /// Moves the pipeline back to `Idle` when `id` is the active request;
    /// a stale id or a pipeline that is not loading makes this a no-op.
    /// The underlying classifier call is not interrupted, but its eventual
    /// completion is discarded.
    pub fn cancel(&self, id: RequestId) {
        let cancelled = self.inner.state_tx.send_if_modified(|state| match state {
            PipelineState::Loading { id: active } if *active == id => {
                *state = PipelineState::Idle;
                true
            }
            _ => false,
        });
        if cancelled {
            info!("Cancelled request {}", id);
        } else {
            debug!("cancel({}) ignored: not the active request", id);
        }
    }

    /// Return the pipeline to `Idle`, clearing any held result or error.
    ///
    /// Always legal; resetting an idle pipeline is an observable no-op. A
    /// still-running classification keeps running, but its completion is
    /// then stale and discarded.
    pub fn reset(&self) {
        self.inner.state_tx.send_if_modified(|state| {
            if matches!(state, PipelineState::Idle) {
                return false;
            }
            debug!("Pipeline reset");
            *state = PipelineState::Idle;
            true
        });
    }

    /// Snapshot of the current state; never blocks
    pub fn current_state(&self) -> PipelineState {
        self.inner.state_tx.borrow().clone()
    }

    /// Subscribe to state-change notifications
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.inner.state_tx.subscribe()
    }
}

impl Inner {
    fn is_current(&self, id: RequestId) -> bool {
        self.state_tx.borrow().active_id() == Some(id)
    }

    /// Apply a completion to state, unless its id went stale
    fn apply_completion(&self, id: RequestId, result: Result<Prediction, PipelineError>) {
        let applied = self.state_tx.send_if_modified(|state| match state {
            PipelineState::Loading { id: active } if *active == id => {
                *state = match result {
                    Ok(prediction) => PipelineState::Succeeded { id, prediction },
                    Err(error) => PipelineState::Failed { id, error },
                };
                true
            }
            _ => false,
        });

        if applied {
            debug!("Applied completion for request {}", id);
        } else {
            warn!("Discarding stale completion for request {}", id);
        }
    }
}

/// Background task driving one classification request
async fn run_request(
    inner: Arc<Inner>,
    classifier: Arc<dyn Classifier>,
    image: ImageHandle,
    id: RequestId,
) {
    let work = async {
        let _guard = inner.invoke_lock.lock().await;
        if !inner.is_current(id) {
            debug!("Skipping superseded request {}", id);
            return None;
        }
        Some(classifier.classify(&image).await)
    };

    let outcome: Option<Result<Prediction, PipelineError>> = match inner.config.timeout_ms {
        Some(ms) => match time::timeout(Duration::from_millis(ms), work).await {
            Ok(done) => done.map(|r| r.map_err(PipelineError::from)),
            Err(_) => Some(Err(PipelineError::Timeout(ms))),
        },
        None => work.await.map(|r| r.map_err(PipelineError::from)),
    };

    if let Some(result) = outcome {
        inner.apply_completion(id, result);
    }
}
