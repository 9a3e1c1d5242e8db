//! Uniform reservoir sampling (Algorithm R).
//!
//! The first `k` elements fill the reservoir. The element at zero-based
//! position `i >= k` draws `j` uniformly from `[0, i]` and replaces slot `j`
//! when `j < k`, so after `n` elements each one is in the sample with
//! probability `k / n`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Streaming reservoir holding at most `capacity` elements.
#[derive(Debug, Clone)]
pub struct ReservoirSampler<T> {
    capacity: usize,
    seen: usize,
    reservoir: Vec<T>,
}

impl<T> ReservoirSampler<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: 0,
            reservoir: Vec::with_capacity(capacity),
        }
    }

    /// Consider one more element of the stream.
    pub fn offer<R: Rng + ?Sized>(&mut self, item: T, rng: &mut R) {
        let i = self.seen;
        self.seen += 1;

        if i < self.capacity {
            self.reservoir.push(item);
            return;
        }

        let j = rng.gen_range(0..=i);
        if j < self.capacity {
            self.reservoir[j] = item;
        }
    }

    pub fn offer_all<I, R>(&mut self, items: I, rng: &mut R)
    where
        I: IntoIterator<Item = T>,
        R: Rng + ?Sized,
    {
        for item in items {
            self.offer(item, rng);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of elements offered so far.
    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn len(&self) -> usize {
        self.reservoir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservoir.is_empty()
    }

    pub fn sample(&self) -> &[T] {
        &self.reservoir
    }

    pub fn into_sample(self) -> Vec<T> {
        self.reservoir
    }
}

/// Draw a uniform sample of up to `k` elements from `input`.
///
/// When `k` is at least the input length the whole input comes back in its
/// original order.
pub fn reservoir_sample<T, I, R>(input: I, k: usize, rng: &mut R) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    R: Rng + ?Sized,
{
    let mut sampler = ReservoirSampler::new(k);
    sampler.offer_all(input, rng);
    sampler.into_sample()
}

/// [`reservoir_sample`] with a reproducible ChaCha stream.
pub fn reservoir_sample_seeded<T, I>(input: I, k: usize, seed: u64) -> Vec<T>
where
    I: IntoIterator<Item = T>,
{
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    reservoir_sample(input, k, &mut rng)
}
