//! Pipeline configuration

use serde::{Deserialize, Serialize};

/// Policy applied when `submit` arrives while a request is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Reject the new submission with `Busy`
    #[default]
    RejectNew,
    /// Invalidate the active request and start a new one
    Preempt,
}

/// Pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Collision policy (default: reject-new)
    #[serde(default)]
    pub collision_policy: CollisionPolicy,

    /// Classification timeout in milliseconds, > 0; no timeout when absent
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl PipelineConfig {
    /// Config with the preempt collision policy
    pub fn preempting() -> Self {
        Self {
            collision_policy: CollisionPolicy::Preempt,
            ..Default::default()
        }
    }

    /// Set the classification timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_rejects_new_without_timeout() {
        let config = PipelineConfig::default();
        assert_eq!(config.collision_policy, CollisionPolicy::RejectNew);
        assert_eq!(config.timeout_ms, None);
    }

    #[test]
    fn collision_policy_uses_kebab_case_names() {
        let policy: CollisionPolicy = serde_json::from_str("\"preempt\"").unwrap();
        assert_eq!(policy, CollisionPolicy::Preempt);

        let policy: CollisionPolicy = serde_json::from_str("\"reject-new\"").unwrap();
        assert_eq!(policy, CollisionPolicy::RejectNew);
    }
}
