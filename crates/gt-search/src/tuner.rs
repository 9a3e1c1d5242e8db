//! Exhaustive grid search driver.
//!
//! Every mode scores each combination exactly once and folds the results in
//! enumeration order, so the winner (first-seen on ties) and the reported
//! failure are the same whether scoring ran sequentially, on a rayon pool or
//! as concurrent tokio tasks.

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::future::Future;

use gt_core::{
    invalid_argument, BoxError, Combination, ObjectiveDirection, ParameterSpace,
    ScoredCandidate, ScoringCause, TuneError, TuneResult,
};
use rayon::prelude::*;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::config::{FailurePolicy, TunerConfig};
use crate::grid::ParameterGridExpander;
use crate::select::top_n;
use crate::status::{FailedCandidate, SearchStatus};

/// Evaluates every combination of a parameter space and keeps the best.
#[derive(Debug, Clone, Default)]
pub struct GridSearchTuner {
    config: TunerConfig,
    cancellation: Option<CancellationToken>,
}

impl GridSearchTuner {
    pub fn new(config: TunerConfig) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Stop scheduling new combinations once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Score every combination with an infallible scorer.
    ///
    /// Non-finite scores still fail the combination.
    pub fn search<V, F>(
        &self,
        space: &ParameterSpace<V>,
        mut scorer: F,
    ) -> TuneResult<SearchStatus<V>, V>
    where
        V: Clone,
        F: FnMut(&Combination<V>) -> f64,
    {
        self.try_search(space, |combination| Ok::<f64, Infallible>(scorer(combination)))
    }

    /// Score every combination sequentially, in enumeration order.
    pub fn try_search<V, F, E>(
        &self,
        space: &ParameterSpace<V>,
        mut scorer: F,
    ) -> TuneResult<SearchStatus<V>, V>
    where
        V: Clone,
        F: FnMut(&Combination<V>) -> Result<f64, E>,
        E: Into<BoxError>,
    {
        let mut run = self.prepare(space)?;
        let total = run.status.total;
        let mut cancelled = false;

        let grid = ParameterGridExpander::new(space).iter().take(total);
        for (index, combination) in grid.enumerate() {
            if self.is_cancelled() {
                cancelled = true;
                break;
            }
            let outcome = scorer(&combination).map_err(ScoringCause::from_error);
            run.absorb(index, combination, outcome)?;
        }

        run.finish(cancelled)
    }

    /// Score combinations on a rayon pool of `workers` threads.
    pub fn par_search<V, F, E>(
        &self,
        space: &ParameterSpace<V>,
        scorer: F,
    ) -> TuneResult<SearchStatus<V>, V>
    where
        V: Clone + Send + Sync,
        F: Fn(&Combination<V>) -> Result<f64, E> + Sync,
        E: Into<BoxError>,
    {
        let mut run = self.prepare(space)?;
        let total = run.status.total;
        let expander = ParameterGridExpander::new(space);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| invalid_argument!("cannot start {} workers: {e}", self.config.workers))?;

        // Collecting an indexed parallel iterator keeps enumeration order.
        let outcomes: Vec<Option<(Combination<V>, Result<f64, ScoringCause>)>> = pool.install(|| {
            (0..total)
                .into_par_iter()
                .map(|index| {
                    if self.is_cancelled() {
                        return None;
                    }
                    let combination = expander.combination_at(index)?;
                    let outcome = scorer(&combination).map_err(ScoringCause::from_error);
                    Some((combination, outcome))
                })
                .collect()
        });

        let mut cancelled = false;
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some((combination, outcome)) => run.absorb(index, combination, outcome)?,
                None => cancelled = true,
            }
        }

        run.finish(cancelled)
    }

    /// Await an asynchronous scorer for one combination at a time.
    pub async fn search_async<V, F, Fut, E>(
        &self,
        space: &ParameterSpace<V>,
        mut scorer: F,
    ) -> TuneResult<SearchStatus<V>, V>
    where
        V: Clone,
        F: FnMut(Combination<V>) -> Fut,
        Fut: Future<Output = Result<f64, E>>,
        E: Into<BoxError>,
    {
        let mut run = self.prepare(space)?;
        let total = run.status.total;
        let mut cancelled = false;

        let grid = ParameterGridExpander::new(space).iter().take(total);
        for (index, combination) in grid.enumerate() {
            if self.is_cancelled() {
                cancelled = true;
                break;
            }
            let outcome = scorer(combination.clone())
                .await
                .map_err(ScoringCause::from_error);
            run.absorb(index, combination, outcome)?;
        }

        run.finish(cancelled)
    }

    /// Keep up to `workers` scoring futures in flight as tokio tasks.
    ///
    /// Results are folded in enumeration order as soon as a contiguous
    /// prefix has completed. Must be called from within a tokio runtime.
    pub async fn search_concurrent<V, F, Fut, E>(
        &self,
        space: &ParameterSpace<V>,
        mut scorer: F,
    ) -> TuneResult<SearchStatus<V>, V>
    where
        V: Clone,
        F: FnMut(Combination<V>) -> Fut,
        Fut: Future<Output = Result<f64, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let mut run = self.prepare(space)?;
        let total = run.status.total;
        let mut grid = ParameterGridExpander::new(space).iter().take(total).enumerate();

        let mut tasks: JoinSet<Result<f64, BoxError>> = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, (usize, Combination<V>)> = HashMap::new();
        let mut ready: BTreeMap<usize, (Combination<V>, Result<f64, ScoringCause>)> = BTreeMap::new();
        let mut next_index = 0;
        let mut cancelled = false;

        loop {
            while tasks.len() < self.config.workers && !cancelled {
                if self.is_cancelled() {
                    cancelled = true;
                    break;
                }
                let Some((index, combination)) = grid.next() else {
                    break;
                };
                let future = scorer(combination.clone());
                let handle = tasks.spawn(async move { future.await.map_err(Into::into) });
                in_flight.insert(handle.id(), (index, combination));
            }

            let Some(joined) = tasks.join_next_with_id().await else {
                break;
            };
            let (id, outcome) = match joined {
                Ok((id, result)) => (id, result.map_err(ScoringCause::Error)),
                Err(err) => (err.id(), Err(ScoringCause::Panicked(err.to_string()))),
            };
            let Some((index, combination)) = in_flight.remove(&id) else {
                continue;
            };
            ready.insert(index, (combination, outcome));

            // Returning early drops the JoinSet, which aborts the remaining tasks.
            while let Some((combination, outcome)) = ready.remove(&next_index) {
                run.absorb(next_index, combination, outcome)?;
                next_index += 1;
            }
        }

        run.finish(cancelled)
    }

    fn prepare<V>(&self, space: &ParameterSpace<V>) -> TuneResult<Run<V>, V> {
        self.config.validate()?;
        // A grid too large to count can still be searched up to a cap.
        let total = match (space.grid_size(), self.config.max_trials) {
            (Some(size), cap) => cap.map_or(size, |cap| cap.min(size)),
            (None, Some(cap)) => cap,
            (None, None) => {
                return Err(invalid_argument!(
                    "parameter space has more combinations than usize can count; set max_trials"
                )
                .into())
            }
        };
        if total == 0 {
            return Err(TuneError::EmptySearchSpace);
        }

        let mut status = SearchStatus::new(self.config.name.clone(), self.config.direction, total);
        status.mark_running();
        info!(
            "Starting grid search '{}' over {} combinations ({} parameters)",
            self.config.name,
            total,
            space.len()
        );

        Ok(Run {
            status,
            policy: self.config.failure_policy,
            keep_top: self.config.keep_top,
            pool: self.config.keep_top.map(|_| Vec::new()),
        })
    }
}

/// Score every combination of `space` with the default configuration and
/// return the best one.
pub fn grid_search<V, F>(space: &ParameterSpace<V>, scorer: F) -> TuneResult<ScoredCandidate<V>, V>
where
    V: Clone,
    F: FnMut(&Combination<V>) -> f64,
{
    GridSearchTuner::default()
        .search(space, scorer)?
        .into_best()
        .ok_or(TuneError::EmptySearchSpace)
}

/// Running fold over scored combinations, fed in enumeration order.
struct Run<V> {
    status: SearchStatus<V>,
    policy: FailurePolicy,
    keep_top: Option<usize>,
    pool: Option<Vec<ScoredCandidate<V>>>,
}

impl<V: Clone> Run<V> {
    fn absorb(
        &mut self,
        index: usize,
        combination: Combination<V>,
        outcome: Result<f64, ScoringCause>,
    ) -> TuneResult<(), V> {
        match outcome.and_then(ScoringCause::check) {
            Ok(score) => {
                let candidate = ScoredCandidate::new(index, combination, score);
                if let Some(pool) = &mut self.pool {
                    pool.push(candidate.clone());
                }
                if self.status.record(candidate) {
                    debug!("New best at combination #{}: score {}", index, score);
                }
                Ok(())
            }
            Err(cause) => match self.policy {
                FailurePolicy::Abort => {
                    warn!("Scoring failed for combination #{}, aborting: {}", index, cause);
                    Err(TuneError::ScoringFailure {
                        index,
                        combination,
                        cause,
                    })
                }
                FailurePolicy::Skip => {
                    warn!("Scoring failed for combination #{}, skipping: {}", index, cause);
                    self.status.record_failure(FailedCandidate {
                        index,
                        combination,
                        reason: cause.to_string(),
                    });
                    Ok(())
                }
            },
        }
    }

    fn finish(mut self, cancelled: bool) -> TuneResult<SearchStatus<V>, V> {
        if let (Some(pool), Some(n)) = (self.pool.take(), self.keep_top) {
            let scores: Vec<f64> = pool
                .iter()
                .map(|candidate| match self.status.direction {
                    ObjectiveDirection::Maximize => candidate.score,
                    ObjectiveDirection::Minimize => -candidate.score,
                })
                .collect();
            self.status.ranked = top_n(pool, &scores, n)?
                .into_iter()
                .map(|(candidate, _)| candidate)
                .collect();
        }

        if cancelled {
            self.status.mark_cancelled();
            info!(
                "Grid search '{}' cancelled after {} of {} combinations",
                self.status.name, self.status.evaluated, self.status.total
            );
        } else {
            self.status.mark_completed();
            info!(
                "Grid search '{}' completed: {} evaluated, {} failed",
                self.status.name,
                self.status.evaluated,
                self.status.failures.len()
            );
        }
        if let Some(best) = &self.status.best {
            info!("Best score {} at combination #{}", best.score, best.index);
        }

        Ok(self.status)
    }
}
