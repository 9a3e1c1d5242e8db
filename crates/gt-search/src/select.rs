//! Top-N selection over parallel item/score sequences.

use gt_core::{invalid_argument, InvalidArgument};
use std::cmp::Ordering;

/// Selects the N highest-scoring items.
///
/// Ties keep their input order. NaN scores rank below every real number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopNSelector {
    pub n: usize,
}

impl TopNSelector {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Pair `items[i]` with `scores[i]` and return at most `n` pairs in
    /// descending score order.
    pub fn select<T>(
        &self,
        items: Vec<T>,
        scores: &[f64],
    ) -> Result<Vec<(T, f64)>, InvalidArgument> {
        if items.len() != scores.len() {
            return Err(invalid_argument!(
                "{} items but {} scores",
                items.len(),
                scores.len()
            ));
        }
        if self.n == 0 {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<(T, f64)> = items.into_iter().zip(scores.iter().copied()).collect();
        // `sort_by` is stable, which keeps tied items in input order.
        ranked.sort_by(|a, b| descending(a.1, b.1));
        ranked.truncate(self.n);
        Ok(ranked)
    }
}

/// Shorthand for `TopNSelector::new(n).select(items, scores)`.
pub fn top_n<T>(
    items: Vec<T>,
    scores: &[f64],
    n: usize,
) -> Result<Vec<(T, f64)>, InvalidArgument> {
    TopNSelector::new(n).select(items, scores)
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_top_two_with_stable_ties() {
        let picked = top_n(vec!['x', 'y', 'z'], &[5.0, 5.0, 9.0], 2).unwrap();
        assert_eq!(picked, vec![('z', 9.0), ('x', 5.0)]);
    }

    #[test]
    fn zero_returns_empty() {
        let picked = top_n(vec![1, 2, 3], &[0.1, 0.2, 0.3], 0).unwrap();
        assert!(picked.is_empty());
    }

    #[test]
    fn n_larger_than_input_returns_everything_sorted() {
        let picked = top_n(vec!["a", "b", "c"], &[1.0, 3.0, 2.0], 10).unwrap();
        assert_eq!(picked, vec![("b", 3.0), ("c", 2.0), ("a", 1.0)]);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = top_n(vec![1, 2, 3], &[1.0, 2.0], 2).unwrap_err();
        assert!(err.message.contains("3 items but 2 scores"));

        // Rejected even when nothing would be returned.
        assert!(top_n(vec![1], &[], 0).is_err());
    }

    #[test]
    fn nan_ranks_last() {
        let picked = top_n(vec!['a', 'b', 'c'], &[f64::NAN, -1.0, 2.0], 3).unwrap();
        let order: Vec<char> = picked.iter().map(|(c, _)| *c).collect();
        assert_eq!(order, vec!['c', 'b', 'a']);
    }

    #[test]
    fn many_ties_preserve_order() {
        let items: Vec<usize> = (0..50).collect();
        let scores = vec![1.0; 50];
        let picked = TopNSelector::new(10).select(items, &scores).unwrap();
        let order: Vec<usize> = picked.into_iter().map(|(i, _)| i).collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }
}
