//! Pipeline state and request identifiers

use std::fmt;

use classifier::Prediction;

use crate::PipelineError;

/// Identifier of a classification request
///
/// Ids are assigned monotonically per pipeline and never reused, so a
/// completion carrying an old id can always be told apart from the active
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub(crate) u64);

impl RequestId {
    /// Numeric value of the id
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable pipeline state
///
/// Exactly one variant is current at any instant.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    /// No request active, no result held
    Idle,
    /// Request `id` is in flight
    Loading { id: RequestId },
    /// Request `id` completed with a prediction
    Succeeded {
        id: RequestId,
        prediction: Prediction,
    },
    /// Request `id` failed
    Failed { id: RequestId, error: PipelineError },
}

impl PipelineState {
    /// Id of the in-flight request, when loading
    pub fn active_id(&self) -> Option<RequestId> {
        match self {
            PipelineState::Loading { id } => Some(*id),
            _ => None,
        }
    }

    /// True while a request is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, PipelineState::Loading { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_id_only_while_loading() {
        let id = RequestId(7);
        assert_eq!(PipelineState::Loading { id }.active_id(), Some(id));
        assert_eq!(PipelineState::Idle.active_id(), None);
        assert_eq!(
            PipelineState::Failed {
                id,
                error: PipelineError::Timeout(100),
            }
            .active_id(),
            None
        );
    }

    #[test]
    fn request_id_displays_as_number() {
        assert_eq!(RequestId(42).to_string(), "42");
    }
}
