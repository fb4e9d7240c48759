//! Controllable backends for tests
//!
//! [`FakeClassifier`] serves queued outcomes, optionally waiting on a
//! [`FakeGate`] so tests control exactly when each call completes.
//! [`FakeLoader`] does the same for model loading and counts how many
//! loads actually ran.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use capture::ImageHandle;
use tokio::sync::Semaphore;

use crate::{Classifier, ClassifierError, ClassifierLoader, Prediction};

/// Gate controlling when gated fakes are allowed to complete
#[derive(Clone, Debug)]
pub struct FakeGate {
    permits: Arc<Semaphore>,
}

impl FakeGate {
    fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
        }
    }

    /// Allow `n` pending calls to complete
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    async fn wait(&self) -> Result<(), ClassifierError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ClassifierError::Inference("fake gate closed".to_string()))?;
        permit.forget();
        Ok(())
    }
}

#[derive(Debug)]
enum Mode {
    /// Complete as soon as called
    Immediate,
    /// Complete once the gate releases a permit
    Gated(FakeGate),
    /// Never complete
    Pending,
}

/// Classifier test double serving queued outcomes
#[derive(Debug)]
pub struct FakeClassifier {
    outcomes: Mutex<VecDeque<Result<Prediction, ClassifierError>>>,
    mode: Mode,
    calls: AtomicUsize,
}

impl FakeClassifier {
    /// Classifier that resolves each call immediately with the next
    /// queued outcome
    pub fn resolving(outcomes: Vec<Result<Prediction, ClassifierError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            mode: Mode::Immediate,
            calls: AtomicUsize::new(0),
        }
    }

    /// Classifier whose calls never complete
    pub fn pending() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            mode: Mode::Pending,
            calls: AtomicUsize::new(0),
        }
    }

    /// Classifier whose calls complete only when the gate is released
    pub fn gated(outcomes: Vec<Result<Prediction, ClassifierError>>) -> (Self, FakeGate) {
        let gate = FakeGate::new();
        (
            Self {
                outcomes: Mutex::new(outcomes.into()),
                mode: Mode::Gated(gate.clone()),
                calls: AtomicUsize::new(0),
            },
            gate,
        )
    }

    /// Number of classify calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> Result<Prediction, ClassifierError> {
        self.outcomes
            .lock()
            .expect("fake outcome queue poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(ClassifierError::Inference("no outcome queued".to_string())))
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, _image: &ImageHandle) -> Result<Prediction, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            Mode::Immediate => {}
            Mode::Gated(gate) => gate.wait().await?,
            Mode::Pending => std::future::pending::<()>().await,
        }
        self.next_outcome()
    }
}

enum LoadOutcome {
    Ready(Arc<dyn Classifier>),
    Fail(String),
}

/// Loader test double
pub struct FakeLoader {
    outcome: LoadOutcome,
    gate: Option<FakeGate>,
    loads: AtomicUsize,
}

impl FakeLoader {
    /// Loader that immediately yields the given classifier
    pub fn ready(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            outcome: LoadOutcome::Ready(classifier),
            gate: None,
            loads: AtomicUsize::new(0),
        }
    }

    /// Loader that always fails with the given message
    pub fn failing(message: &str) -> Self {
        Self {
            outcome: LoadOutcome::Fail(message.to_string()),
            gate: None,
            loads: AtomicUsize::new(0),
        }
    }

    /// Loader that yields the classifier once the gate is released
    pub fn gated(classifier: Arc<dyn Classifier>) -> (Self, FakeGate) {
        let gate = FakeGate::new();
        (
            Self {
                outcome: LoadOutcome::Ready(classifier),
                gate: Some(gate.clone()),
                loads: AtomicUsize::new(0),
            },
            gate,
        )
    }

    /// Number of load calls that actually ran
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassifierLoader for FakeLoader {
    async fn load(&self, _model_ref: &str) -> Result<Arc<dyn Classifier>, ClassifierError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.wait().await?;
        }
        match &self.outcome {
            LoadOutcome::Ready(classifier) => Ok(classifier.clone()),
            LoadOutcome::Fail(message) => Err(ClassifierError::ModelLoad(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LabelScore;
    use std::time::Duration;

    fn frame() -> ImageHandle {
        ImageHandle::from_rgb8(vec![0; 12], 2, 2).unwrap()
    }

    fn prediction(label: &str) -> Prediction {
        Prediction::new(vec![LabelScore::new(label, 1.0)])
    }

    #[tokio::test]
    async fn resolving_serves_outcomes_in_order() {
        let classifier = FakeClassifier::resolving(vec![
            Ok(prediction("first")),
            Err(ClassifierError::Inference("boom".to_string())),
        ]);

        let first = classifier.classify(&frame()).await.unwrap();
        assert_eq!(first.top().unwrap().label, "first");

        let err = classifier.classify(&frame()).await.unwrap_err();
        assert!(matches!(err, ClassifierError::Inference(_)));
        assert_eq!(classifier.call_count(), 2);
    }

    #[tokio::test]
    async fn gated_call_waits_for_release() {
        let (classifier, gate) = FakeClassifier::gated(vec![Ok(prediction("late"))]);
        let classifier = Arc::new(classifier);

        let task = tokio::spawn({
            let classifier = classifier.clone();
            async move { classifier.classify(&frame()).await }
        });

        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        gate.release(1);
        let result = task.await.unwrap().unwrap();
        assert_eq!(result.top().unwrap().label, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn pending_call_never_resolves() {
        let classifier = Arc::new(FakeClassifier::pending());
        let task = tokio::spawn({
            let classifier = classifier.clone();
            async move { classifier.classify(&frame()).await }
        });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!task.is_finished());
        task.abort();
    }

    #[tokio::test]
    async fn failing_loader_reports_model_load() {
        let loader = FakeLoader::failing("corrupt weights");
        let err = loader.load("fake://model").await.unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
        assert_eq!(loader.load_count(), 1);
    }
}
