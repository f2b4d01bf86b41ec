use serde::{Deserialize, Serialize};

/// Default ceiling on the number of tasks a single decomposition may produce.
const DEFAULT_MAX_TASKS_PER_PLAN: usize = 20;

/// Configuration for the planning engine.
///
/// This is the only externally supplied configuration; the embedding
/// assistant owns loading and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Whether model-driven decomposition is enabled.
    ///
    /// When disabled, the orchestrator plans a single task over the
    /// verbatim goal without a model round-trip.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Maximum number of tasks a decomposition may propose.
    #[serde(default = "default_max_tasks")]
    pub max_tasks_per_plan: usize,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tasks_per_plan: DEFAULT_MAX_TASKS_PER_PLAN,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_tasks() -> usize {
    DEFAULT_MAX_TASKS_PER_PLAN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlanningConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_tasks_per_plan, 20);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: PlanningConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.max_tasks_per_plan, 20);

        let config: PlanningConfig = serde_json::from_str(r#"{"enabled": false}"#).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.max_tasks_per_plan, 20);
    }
}
