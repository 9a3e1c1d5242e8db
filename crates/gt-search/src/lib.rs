//! # gt-search
//!
//! Combinatorial search and sampling for gridtune.
//!
//! Provides the Cartesian grid expander, the grid search tuner (sequential,
//! rayon-parallel and async), top-N selection, reservoir sampling, run
//! configuration and status tracking.

mod cancel;
mod config;
mod grid;
mod sampling;
mod select;
mod status;
mod tuner;

pub use cancel::CancellationToken;
pub use config::{FailurePolicy, TunerConfig};
pub use grid::{expand, GridIter, ParameterGridExpander};
pub use sampling::{reservoir_sample, reservoir_sample_seeded, ReservoirSampler};
pub use select::{top_n, TopNSelector};
pub use status::{FailedCandidate, SearchId, SearchState, SearchStatus};
pub use tuner::{grid_search, GridSearchTuner};
