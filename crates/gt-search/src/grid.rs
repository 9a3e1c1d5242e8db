//! Cartesian expansion of a parameter space.
//!
//! Combinations are produced in odometer order: the first parameter varies
//! slowest and the last parameter varies fastest, exactly like counting in a
//! mixed-radix number system whose digits are candidate indices.

use gt_core::{Combination, ParameterSpace};

/// Enumerates the full Cartesian product of a [`ParameterSpace`].
#[derive(Debug)]
pub struct ParameterGridExpander<'a, V> {
    space: &'a ParameterSpace<V>,
}

impl<'a, V> Clone for ParameterGridExpander<'a, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, V> Copy for ParameterGridExpander<'a, V> {}

impl<'a, V: Clone> ParameterGridExpander<'a, V> {
    pub fn new(space: &'a ParameterSpace<V>) -> Self {
        Self { space }
    }

    /// Number of combinations, `None` if it does not fit in `usize`.
    pub fn len(&self) -> Option<usize> {
        self.space.grid_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Lazily walk the grid in enumeration order.
    pub fn iter(&self) -> GridIter<'a, V> {
        GridIter::new(self.space)
    }

    /// Materialize every combination.
    pub fn expand(&self) -> Vec<Combination<V>> {
        self.iter().collect()
    }

    /// Decode the combination at `index` without walking the grid.
    ///
    /// On a grid too large to count every `usize` index is in range.
    pub fn combination_at(&self, index: usize) -> Option<Combination<V>> {
        match self.len() {
            Some(total) if index >= total => return None,
            _ => {}
        }

        let axes: Vec<(&str, &[V])> = self.space.iter().collect();
        let mut picks = vec![0usize; axes.len()];
        let mut rest = index;
        for (pos, (_, values)) in axes.iter().enumerate().rev() {
            picks[pos] = rest % values.len();
            rest /= values.len();
        }

        Some(build(&axes, &picks))
    }
}

/// Expand `space` into all of its combinations.
pub fn expand<V: Clone>(space: &ParameterSpace<V>) -> Vec<Combination<V>> {
    ParameterGridExpander::new(space).expand()
}

/// Odometer iterator over a parameter grid.
///
/// Runs until the odometer wraps, so grids whose size overflows `usize` can
/// still be walked (typically with `take`). `size_hint` is exact for
/// countable grids and `(usize::MAX, None)` otherwise.
#[derive(Debug, Clone)]
pub struct GridIter<'a, V> {
    axes: Vec<(&'a str, &'a [V])>,
    digits: Vec<usize>,
    /// `None` when the grid is too large to count.
    remaining: Option<usize>,
    done: bool,
}

impl<'a, V> GridIter<'a, V> {
    fn new(space: &'a ParameterSpace<V>) -> Self {
        let axes: Vec<(&'a str, &'a [V])> = space.iter().collect();
        let remaining = space.grid_size();
        Self {
            digits: vec![0; axes.len()],
            axes,
            remaining,
            done: remaining == Some(0),
        }
    }

    fn advance(&mut self) {
        for pos in (0..self.digits.len()).rev() {
            self.digits[pos] += 1;
            if self.digits[pos] < self.axes[pos].1.len() {
                return;
            }
            self.digits[pos] = 0;
        }
        self.done = true;
    }
}

impl<'a, V: Clone> Iterator for GridIter<'a, V> {
    type Item = Combination<V>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let combination = build(&self.axes, &self.digits);
        if let Some(remaining) = &mut self.remaining {
            *remaining -= 1;
        }
        self.advance();
        Some(combination)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.remaining {
            Some(remaining) => (remaining, Some(remaining)),
            None => (usize::MAX, None),
        }
    }
}

fn build<V: Clone>(axes: &[(&str, &[V])], picks: &[usize]) -> Combination<V> {
    Combination::from_entries(
        axes.iter()
            .zip(picks)
            .map(|((name, values), &pick)| (name.to_string(), values[pick].clone()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn combo(pairs: &[(&str, i64)]) -> Combination<i64> {
        Combination::from_entries(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    #[test]
    fn two_by_two_in_odometer_order() {
        let space = ParameterSpace::new()
            .add("a", vec![1i64, 2])
            .add("b", vec![10i64, 20]);

        assert_eq!(
            expand(&space),
            vec![
                combo(&[("a", 1), ("b", 10)]),
                combo(&[("a", 1), ("b", 20)]),
                combo(&[("a", 2), ("b", 10)]),
                combo(&[("a", 2), ("b", 20)]),
            ]
        );
    }

    #[test]
    fn empty_space_yields_single_empty_combination() {
        let space: ParameterSpace<i64> = ParameterSpace::new();
        let combos = expand(&space);
        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
    }

    #[test]
    fn empty_candidate_list_yields_nothing() {
        let space = ParameterSpace::new()
            .add("a", vec![1i64, 2])
            .add("b", Vec::<i64>::new())
            .add("c", vec![3i64]);
        let expander = ParameterGridExpander::new(&space);
        assert!(expander.is_empty());
        assert_eq!(expander.iter().count(), 0);
        assert_eq!(expander.combination_at(0), None);
    }

    #[test]
    fn iterator_reports_exact_length() {
        let space = ParameterSpace::new()
            .add("a", vec![1i64, 2, 3])
            .add("b", vec![1i64, 2]);
        let mut iter = ParameterGridExpander::new(&space).iter();
        assert_eq!(iter.size_hint(), (6, Some(6)));
        iter.next();
        assert_eq!(iter.size_hint(), (5, Some(5)));
        assert_eq!(iter.by_ref().count(), 5);
        assert_eq!(iter.size_hint(), (0, Some(0)));
    }

    fn uncountable_space() -> ParameterSpace<i64> {
        // 10^20 combinations, more than usize::MAX.
        (0..5).fold(ParameterSpace::new(), |space, i| {
            space.add(format!("p{i}"), 0..10_000i64)
        })
    }

    #[test]
    fn uncountable_grid_has_no_upper_bound_but_still_iterates() {
        let space = uncountable_space();
        let expander = ParameterGridExpander::new(&space);
        assert_eq!(expander.len(), None);
        assert!(!expander.is_empty());

        let iter = expander.iter();
        assert_eq!(iter.size_hint(), (usize::MAX, None));

        let first: Vec<Combination<i64>> = iter.take(3).collect();
        let last: Vec<i64> = first[2].iter().map(|(_, v)| *v).collect();
        assert_eq!(last, vec![0, 0, 0, 0, 2]);
        for (index, combination) in first.into_iter().enumerate() {
            assert_eq!(expander.combination_at(index), Some(combination));
        }

        let far = expander.combination_at(10_001).unwrap();
        assert_eq!(far.iter().map(|(_, v)| *v).collect::<Vec<_>>(), vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn combination_at_out_of_range() {
        let space = ParameterSpace::new().add("a", vec![1i64, 2]);
        assert_eq!(ParameterGridExpander::new(&space).combination_at(2), None);
    }

    fn space_from_lengths(lengths: &[usize]) -> ParameterSpace<i64> {
        lengths.iter().enumerate().fold(ParameterSpace::new(), |space, (i, &len)| {
            space.add(format!("p{i}"), (0..len as i64).map(|v| v * 10 + i as i64))
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn prop_count_is_product_and_combinations_distinct(
            lengths in prop::collection::vec(0usize..5, 0..5)
        ) {
            let space = space_from_lengths(&lengths);
            let combos = expand(&space);
            let expected: usize = lengths.iter().product();
            prop_assert_eq!(combos.len(), expected);

            let distinct: HashSet<Vec<i64>> = combos
                .iter()
                .map(|c| c.iter().map(|(_, v)| *v).collect())
                .collect();
            prop_assert_eq!(distinct.len(), expected);

            for c in &combos {
                prop_assert!(c.matches(&space));
            }
        }

        #[test]
        fn prop_enumeration_is_deterministic(
            lengths in prop::collection::vec(1usize..4, 0..5)
        ) {
            let space = space_from_lengths(&lengths);
            prop_assert_eq!(expand(&space), expand(&space.clone()));
        }

        #[test]
        fn prop_random_access_matches_iteration(
            lengths in prop::collection::vec(1usize..4, 0..5)
        ) {
            let space = space_from_lengths(&lengths);
            let expander = ParameterGridExpander::new(&space);
            for (index, combination) in expander.iter().enumerate() {
                prop_assert_eq!(expander.combination_at(index), Some(combination));
            }
        }

        #[test]
        fn prop_last_parameter_varies_fastest(
            lengths in prop::collection::vec(2usize..4, 2..4)
        ) {
            let space = space_from_lengths(&lengths);
            let combos = expand(&space);
            let last = lengths.len() - 1;
            let name = format!("p{last}");
            // The first two combinations differ only in the last parameter.
            for (n, _) in space.iter().take(last) {
                prop_assert_eq!(combos[0].get(n), combos[1].get(n));
            }
            prop_assert_ne!(combos[0].get(&name), combos[1].get(&name));
        }
    }
}
