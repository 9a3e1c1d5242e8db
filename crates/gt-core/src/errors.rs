use thiserror::Error;

use crate::space::{Combination, ParameterValue};

/// Boxed error produced by a caller-supplied scoring function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for a tuning run.
///
/// Generic over the candidate value type so a scoring failure can hand the
/// offending combination back to the caller.
#[derive(Error, Debug)]
pub enum TuneError<V = ParameterValue> {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),

    #[error("scoring failed for combination #{index} {combination:?}: {cause}")]
    ScoringFailure {
        /// Position of the combination in grid enumeration order.
        index: usize,
        combination: Combination<V>,
        #[source]
        cause: ScoringCause,
    },

    #[error("parameter space produced zero combinations")]
    EmptySearchSpace,
}

impl<V> TuneError<V> {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    pub fn is_scoring_failure(&self) -> bool {
        matches!(self, Self::ScoringFailure { .. })
    }

    pub fn is_empty_search_space(&self) -> bool {
        matches!(self, Self::EmptySearchSpace)
    }
}

/// Rejected input, raised before any scoring happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid argument: {message}")]
pub struct InvalidArgument {
    pub message: String,
}

impl InvalidArgument {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a single combination could not be scored.
#[derive(Error, Debug)]
pub enum ScoringCause {
    #[error("{0}")]
    Error(#[source] BoxError),

    #[error("score {0} is not a finite number")]
    NonFinite(f64),

    #[error("scoring task panicked: {0}")]
    Panicked(String),
}

impl ScoringCause {
    /// Wrap any error a scorer returns.
    pub fn from_error(error: impl Into<BoxError>) -> Self {
        Self::Error(error.into())
    }

    /// Accept `score` only if it is finite.
    pub fn check(score: f64) -> Result<f64, ScoringCause> {
        if score.is_finite() {
            Ok(score)
        } else {
            Err(Self::NonFinite(score))
        }
    }
}

/// Result type alias for tuning operations
pub type TuneResult<T, V = ParameterValue> = Result<T, TuneError<V>>;

/// Macro for creating invalid-argument errors
#[macro_export]
macro_rules! invalid_argument {
    ($($arg:tt)*) => {
        $crate::InvalidArgument::new(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let combination = Combination::from_entries(vec![("a".to_string(), 2)]);
        let error: TuneError<i32> = TuneError::ScoringFailure {
            index: 3,
            combination,
            cause: ScoringCause::NonFinite(f64::NAN),
        };

        let message = error.to_string();
        assert!(message.contains("#3"));
        assert!(message.contains("\"a\""));
        assert!(message.contains("not a finite number"));
    }

    #[test]
    fn test_error_conversion() {
        let error: TuneError = invalid_argument!("bad value: {}", 42).into();
        match error {
            TuneError::InvalidArgument(inner) => assert_eq!(inner.message, "bad value: 42"),
            _ => panic!("Expected InvalidArgument error"),
        }
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error as _;

        let cause = ScoringCause::from_error("backend unreachable");
        let error: TuneError<i32> = TuneError::ScoringFailure {
            index: 0,
            combination: Combination::from_entries(Vec::new()),
            cause,
        };
        let source = error.source().expect("scoring failure has a source");
        assert_eq!(source.to_string(), "backend unreachable");
    }

    #[test]
    fn test_check_rejects_non_finite() {
        assert_eq!(ScoringCause::check(1.5).unwrap(), 1.5);
        assert!(matches!(ScoringCause::check(f64::NAN), Err(ScoringCause::NonFinite(_))));
        assert!(matches!(
            ScoringCause::check(f64::INFINITY),
            Err(ScoringCause::NonFinite(_))
        ));
    }

    #[test]
    fn test_kind_predicates() {
        let empty: TuneError = TuneError::EmptySearchSpace;
        assert!(empty.is_empty_search_space());
        assert!(!empty.is_scoring_failure());
        assert!(!empty.is_invalid_argument());
    }
}
