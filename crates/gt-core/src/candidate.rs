use serde::{Deserialize, Serialize};

use crate::space::{Combination, ParameterValue};

/// Whether we are maximizing or minimizing the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveDirection {
    Maximize,
    Minimize,
}

impl ObjectiveDirection {
    /// Strict improvement test: equal scores never improve, so the
    /// incumbent (found earlier) keeps its place.
    pub fn improves(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Maximize => candidate > incumbent,
            Self::Minimize => candidate < incumbent,
        }
    }
}

impl Default for ObjectiveDirection {
    fn default() -> Self {
        Self::Maximize
    }
}

/// A combination together with the score it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate<V = ParameterValue> {
    /// Position of the combination in grid enumeration order.
    pub index: usize,
    pub combination: Combination<V>,
    pub score: f64,
}

impl<V> ScoredCandidate<V> {
    pub fn new(index: usize, combination: Combination<V>, score: f64) -> Self {
        Self {
            index,
            combination,
            score,
        }
    }

    /// Whether `self` should replace `incumbent` as the best candidate.
    pub fn beats(&self, incumbent: &Self, direction: ObjectiveDirection) -> bool {
        direction.improves(self.score, incumbent.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(index: usize, a: i64, b: i64, score: f64) -> ScoredCandidate {
        ScoredCandidate::new(
            index,
            Combination::from_entries(vec![
                ("a".to_string(), ParameterValue::Int(a)),
                ("b".to_string(), ParameterValue::Int(b)),
            ]),
            score,
        )
    }

    #[test]
    fn equal_scores_do_not_improve() {
        assert!(!ObjectiveDirection::Maximize.improves(1.0, 1.0));
        assert!(!ObjectiveDirection::Minimize.improves(1.0, 1.0));
        assert!(ObjectiveDirection::Maximize.improves(2.0, 1.0));
        assert!(ObjectiveDirection::Minimize.improves(0.5, 1.0));
    }

    #[test]
    fn beats_follows_direction() {
        let low = candidate(0, 1, 10, 11.0);
        let high = candidate(3, 2, 20, 22.0);
        assert!(high.beats(&low, ObjectiveDirection::Maximize));
        assert!(low.beats(&high, ObjectiveDirection::Minimize));
        assert!(!low.beats(&low.clone(), ObjectiveDirection::Maximize));
    }

    #[test]
    fn serialized_shape() {
        let value = serde_json::to_value(candidate(3, 2, 20, 22.0)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"index": 3, "combination": {"a": 2, "b": 20}, "score": 22.0})
        );
    }

    #[test]
    fn json_round_trip_is_exact() {
        let original = candidate(1, 1, 20, -0.375);
        let json = serde_json::to_string(&original).unwrap();
        let back: ScoredCandidate = serde_json::from_str(&json).unwrap();
        assert_eq!(original, back);
        assert_eq!(back.combination.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(back.score.to_bits(), original.score.to_bits());
    }

    #[test]
    fn direction_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&ObjectiveDirection::Minimize).unwrap(),
            "\"minimize\""
        );
    }
}
