//! Prediction types

use serde::{Deserialize, Serialize};

/// One label with its probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    /// Human-readable class label
    pub label: String,
    /// Probability in [0, 1]
    pub probability: f32,
}

impl LabelScore {
    /// Create a new label score
    pub fn new(label: impl Into<String>, probability: f32) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }
}

/// Ordered prediction list produced by one classification call
///
/// Scores are kept in model output order; probabilities sum to ~1.0
/// (advisory, not enforced).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Scores in model output order
    pub scores: Vec<LabelScore>,
}

impl Prediction {
    /// Create a prediction from a score list
    pub fn new(scores: Vec<LabelScore>) -> Self {
        Self { scores }
    }

    /// Number of scored labels
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// True when no labels were scored
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Entry with the strictly maximal probability.
    ///
    /// Ties are broken by earliest position in the sequence, so the result
    /// is deterministic for a given score list.
    pub fn top(&self) -> Option<&LabelScore> {
        let mut best: Option<&LabelScore> = None;
        for score in &self.scores {
            match best {
                Some(current) if score.probability <= current.probability => {}
                _ => best = Some(score),
            }
        }
        best
    }
}
