//! Tuner configuration.

use gt_core::{invalid_argument, InvalidArgument, ObjectiveDirection};
use serde::{Deserialize, Serialize};

/// What to do when the scorer fails for one combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the whole search and return the failure.
    Abort,
    /// Record the failure and keep going.
    Skip,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::Abort
    }
}

/// Top-level configuration for a grid search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Label carried into logs and the final status.
    pub name: String,

    /// Direction of optimization.
    pub direction: ObjectiveDirection,

    /// Abort on the first scoring failure, or skip failed combinations.
    pub failure_policy: FailurePolicy,

    /// Evaluate at most this many combinations, in enumeration order.
    pub max_trials: Option<usize>,

    /// How many combinations to score at once in the parallel and
    /// concurrent modes.
    pub workers: usize,

    /// Keep a ranked list of this many best candidates besides the winner.
    pub keep_top: Option<usize>,

    /// Number of points per continuous dimension when discretizing a
    /// range-based search space.
    pub grid_steps: usize,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            name: "grid_search".to_string(),
            direction: ObjectiveDirection::Maximize,
            failure_policy: FailurePolicy::Abort,
            max_trials: None,
            workers: 4,
            keep_top: None,
            grid_steps: 5,
        }
    }
}

impl TunerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_direction(mut self, direction: ObjectiveDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_max_trials(mut self, n: usize) -> Self {
        self.max_trials = Some(n);
        self
    }

    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    pub fn with_keep_top(mut self, n: usize) -> Self {
        self.keep_top = Some(n);
        self
    }

    pub fn with_grid_steps(mut self, n: usize) -> Self {
        self.grid_steps = n;
        self
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, InvalidArgument> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| invalid_argument!("malformed tuner config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InvalidArgument> {
        if self.workers == 0 {
            return Err(invalid_argument!("workers must be at least 1"));
        }
        if self.max_trials == Some(0) {
            return Err(invalid_argument!("max_trials must be at least 1"));
        }
        Ok(())
    }
}
