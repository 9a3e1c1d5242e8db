//! Run tracking for a single grid search.

use chrono::{DateTime, Utc};
use gt_core::{Combination, ObjectiveDirection, ParameterValue, ScoredCandidate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique search run identifier.
pub type SearchId = Uuid;

/// Lifecycle state for a search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    Pending,
    Running,
    Completed,
    Cancelled,
}

/// A combination the scorer could not score, kept under the skip policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedCandidate<V = ParameterValue> {
    pub index: usize,
    pub combination: Combination<V>,
    pub reason: String,
}

/// Aggregate status, and final report, of a search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStatus<V = ParameterValue> {
    pub id: SearchId,
    pub name: String,
    pub direction: ObjectiveDirection,
    pub state: SearchState,
    /// Combinations scheduled for this run.
    pub total: usize,
    /// Combinations whose scorer returned, successfully or not.
    pub evaluated: usize,
    pub best: Option<ScoredCandidate<V>>,
    /// Best candidates in rank order, filled when a ranked list was requested.
    #[serde(default = "Vec::new")]
    pub ranked: Vec<ScoredCandidate<V>>,
    #[serde(default = "Vec::new")]
    pub failures: Vec<FailedCandidate<V>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl<V> SearchStatus<V> {
    pub fn new(name: impl Into<String>, direction: ObjectiveDirection, total: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            direction,
            state: SearchState::Pending,
            total,
            evaluated: 0,
            best: None,
            ranked: Vec::new(),
            failures: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = SearchState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.state = SearchState::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_cancelled(&mut self) {
        self.state = SearchState::Cancelled;
        self.finished_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, SearchState::Completed | SearchState::Cancelled)
    }

    /// Record a failed combination.
    pub fn record_failure(&mut self, failure: FailedCandidate<V>) {
        self.evaluated += 1;
        self.failures.push(failure);
    }

    /// Record a scored combination, replacing the best only on strict
    /// improvement. Returns whether it became the new best.
    pub fn record(&mut self, candidate: ScoredCandidate<V>) -> bool {
        self.evaluated += 1;
        let improves = match &self.best {
            None => true,
            Some(current_best) => candidate.beats(current_best, self.direction),
        };
        if improves {
            self.best = Some(candidate);
        }
        improves
    }

    /// Best candidate, consuming the status.
    pub fn into_best(self) -> Option<ScoredCandidate<V>> {
        self.best
    }
}
