/*!

Selection of a single member from a candidate list, either uniformly or in proportion to the
weights a caller-supplied weighting function assigns.

A `WeightedSampler` owns one scratch buffer (cumulative weights and the matching candidates) that
is reused by every weighted sample, so sampling in the inner loop of a model does not allocate.
The buffer grows to the largest candidate list seen so far, by 50% or to the exact size needed,
whichever is larger.

Because the buffer is shared, at most one sample may be in flight at a time. The weighting
function is arbitrary caller code and could try to sample again from inside its own evaluation;
that nested call fails with [`StoreError::ReentrantSamplingAccess`] instead of clobbering the
buffer. The buffer is held through a [`SamplingGuard`], which is released when it is dropped, on
every exit path including errors.

*/

use std::cell::{RefCell, RefMut};

use log::trace;

use crate::error::StoreError;
use crate::random::UniformRandomSource;

struct Scratch<T> {
    /// Non-decreasing running sums of the positive weights.
    weights: Vec<f64>,
    /// `ids[i]` is the candidate whose weight brought the running sum to `weights[i]`.
    ids: Vec<T>,
}

impl<T> Default for Scratch<T> {
    fn default() -> Self {
        Self {
            weights: Vec::new(),
            ids: Vec::new(),
        }
    }
}

impl<T> Scratch<T> {
    /// Empties the buffer and makes room for `needed` entries.
    fn prepare(&mut self, needed: usize) {
        self.weights.clear();
        self.ids.clear();
        let capacity = self.weights.capacity();
        if capacity < needed {
            let target = needed.max(capacity + capacity / 2);
            self.weights.reserve_exact(target);
            self.ids.reserve_exact(target);
        }
    }
}

/// Exclusive access to a sampler's scratch buffer. Obtained from [`WeightedSampler::acquire`].
pub struct SamplingGuard<'a, T> {
    scratch: RefMut<'a, Scratch<T>>,
}

pub struct WeightedSampler<T> {
    scratch: RefCell<Scratch<T>>,
}

impl<T> Default for WeightedSampler<T> {
    fn default() -> Self {
        Self {
            scratch: RefCell::new(Scratch::default()),
        }
    }
}

impl<T: Copy + PartialEq> WeightedSampler<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes exclusive hold of the scratch buffer until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReentrantSamplingAccess`] if the buffer is already held.
    pub fn acquire(&self) -> Result<SamplingGuard<'_, T>, StoreError> {
        self.scratch
            .try_borrow_mut()
            .map(|scratch| SamplingGuard { scratch })
            .map_err(|_| StoreError::ReentrantSamplingAccess)
    }

    /// Returns true while a sample is in flight.
    #[must_use]
    pub fn is_sampling(&self) -> bool {
        self.scratch.try_borrow_mut().is_err()
    }

    /// The number of candidates the scratch buffer can hold without growing.
    #[must_use]
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.borrow().weights.capacity()
    }

    /// Selects one member of `candidates` other than `excluded`.
    ///
    /// Without a weighting function every eligible candidate is equally likely. With one, each
    /// candidate is chosen with probability proportional to its weight; candidates of weight
    /// zero are never chosen. Returns `Ok(None)` when nothing is eligible.
    ///
    /// # Errors
    ///
    /// - [`StoreError::MalformedWeightingFunction`] if any weight is negative, NaN or infinite, or
    ///   if the weights sum to a non-finite total.
    /// - [`StoreError::ReentrantSamplingAccess`] if called while another sample from this
    ///   sampler is in flight.
    pub fn sample(
        &self,
        candidates: &[T],
        excluded: Option<T>,
        weighting_function: Option<&mut dyn FnMut(T) -> f64>,
        rng: &mut dyn UniformRandomSource,
    ) -> Result<Option<T>, StoreError> {
        let guard = self.acquire()?;
        match weighting_function {
            None => Ok(Self::sample_uniform(candidates, excluded, rng)),
            Some(weighting_function) => {
                Self::sample_weighted(guard, candidates, excluded, weighting_function, rng)
            }
        }
    }

    fn sample_uniform(
        candidates: &[T],
        excluded: Option<T>,
        rng: &mut dyn UniformRandomSource,
    ) -> Option<T> {
        if candidates.is_empty() {
            return None;
        }
        let Some(excluded) = excluded else {
            return Some(candidates[rng.next_index(candidates.len())]);
        };
        if !candidates.iter().any(|candidate| *candidate != excluded) {
            return None;
        }
        // At least one candidate is eligible, so the expected number of draws is bounded.
        loop {
            let candidate = candidates[rng.next_index(candidates.len())];
            if candidate != excluded {
                return Some(candidate);
            }
        }
    }

    fn sample_weighted(
        mut guard: SamplingGuard<'_, T>,
        candidates: &[T],
        excluded: Option<T>,
        weighting_function: &mut dyn FnMut(T) -> f64,
        rng: &mut dyn UniformRandomSource,
    ) -> Result<Option<T>, StoreError> {
        guard.scratch.prepare(candidates.len());

        let mut sum = 0.0;
        for &candidate in candidates {
            if excluded == Some(candidate) {
                continue;
            }
            let weight = weighting_function(candidate);
            if !weight.is_finite() || weight < 0.0 {
                return Err(StoreError::MalformedWeightingFunction(format!(
                    "weight {weight} is not a finite non-negative number"
                )));
            }
            if weight > 0.0 {
                sum += weight;
                guard.scratch.weights.push(sum);
                guard.scratch.ids.push(candidate);
            }
        }

        if guard.scratch.weights.is_empty() {
            return Ok(None);
        }
        if !sum.is_finite() {
            return Err(StoreError::MalformedWeightingFunction(
                "sum of weights is not finite".to_string(),
            ));
        }

        let target = rng.next_double() * sum;
        let Some(index) = binary_search_cumulative(&guard.scratch.weights, target) else {
            return Ok(None);
        };
        trace!(
            "selected index {index} of {} weighted candidates",
            guard.scratch.weights.len()
        );
        Ok(Some(guard.scratch.ids[index]))
    }
}

/// Returns an index `i` with `cumulative[i] >= target` and `cumulative[i - 1] <= target`, or
/// `None` if `cumulative` is empty.
///
/// When several entries equal `target` any of them may be returned. A `target` beyond the last
/// entry yields the last index. `cumulative` must be non-decreasing.
#[must_use]
pub fn binary_search_cumulative(cumulative: &[f64], target: f64) -> Option<usize> {
    let mut high = cumulative.len().checked_sub(1)?;
    let mut low = 0;
    while low < high {
        let mid = low + (high - low) / 2;
        let mid_weight = cumulative[mid];
        if mid_weight < target {
            low = mid + 1;
        } else if mid_weight > target {
            high = mid;
        } else {
            return Some(mid);
        }
    }
    Some(low)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    /// Always draws the same values.
    struct FixedDraw(f64);

    impl UniformRandomSource for FixedDraw {
        fn next_double(&mut self) -> f64 {
            self.0
        }

        fn next_index(&mut self, bound: usize) -> usize {
            ((self.0 * bound as f64) as usize).min(bound - 1)
        }
    }

    #[test]
    fn binary_search_finds_first_reaching_target() {
        let cumulative = [2.0, 5.0, 5.0, 9.0];
        assert_eq!(binary_search_cumulative(&cumulative, 0.0), Some(0));
        assert_eq!(binary_search_cumulative(&cumulative, 1.5), Some(0));
        assert_eq!(binary_search_cumulative(&cumulative, 2.5), Some(1));
        assert_eq!(binary_search_cumulative(&cumulative, 8.9), Some(3));
        assert_eq!(binary_search_cumulative(&cumulative, 12.0), Some(3));
    }

    #[test]
    fn binary_search_on_empty_weights() {
        assert_eq!(binary_search_cumulative(&[], 0.0), None);
        assert_eq!(binary_search_cumulative(&[], 3.0), None);
        assert_eq!(binary_search_cumulative(&[4.0], 3.0), Some(0));
    }

    #[test]
    fn binary_search_tie_returns_a_tied_index() {
        let cumulative = [2.0, 5.0, 5.0, 9.0];
        let index = binary_search_cumulative(&cumulative, 5.0).unwrap();
        assert!(index == 1 || index == 2);
        assert_eq!(cumulative[index], 5.0);
    }

    #[test]
    fn uniform_sample_never_returns_excluded() {
        let sampler = WeightedSampler::new();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let sample = sampler.sample(&[1, 2, 3], Some(2), None, &mut rng).unwrap();
            assert!(matches!(sample, Some(1) | Some(3)));
        }
    }

    #[test]
    fn uniform_sample_empty_and_fully_excluded() {
        let sampler = WeightedSampler::<u32>::new();
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(sampler.sample(&[], None, None, &mut rng).unwrap(), None);
        assert_eq!(sampler.sample(&[1], Some(1), None, &mut rng).unwrap(), None);
        assert_eq!(sampler.sample(&[1], None, None, &mut rng).unwrap(), Some(1));
        // An excluded id that is not a candidate changes nothing.
        assert_eq!(sampler.sample(&[1], Some(9), None, &mut rng).unwrap(), Some(1));
    }

    #[test]
    fn weighted_sample_matches_weights() {
        let sampler = WeightedSampler::new();
        let mut rng = StdRng::seed_from_u64(42);
        let weights = [1.0, 2.0, 3.0, 4.0];
        let candidates = [0usize, 1, 2, 3];
        let n_samples = 20_000;
        let mut counts = [0usize; 4];
        for _ in 0..n_samples {
            let mut weighting = |id: usize| weights[id];
            let sample = sampler
                .sample(&candidates, None, Some(&mut weighting), &mut rng)
                .unwrap()
                .unwrap();
            counts[sample] += 1;
        }
        for (id, count) in counts.iter().enumerate() {
            let expected = weights[id] / 10.0;
            let observed = *count as f64 / n_samples as f64;
            assert!(
                (observed - expected).abs() < 0.02,
                "candidate {id}: observed {observed}, expected {expected}"
            );
        }
    }

    #[test]
    fn zero_weight_is_never_selected() {
        let sampler = WeightedSampler::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let mut weighting = |id: u32| if id == 2 { 0.0 } else { 1.0 };
            let sample = sampler
                .sample(&[1, 2, 3], None, Some(&mut weighting), &mut rng)
                .unwrap();
            assert_ne!(sample, Some(2));
        }
        let mut all_zero = |_: u32| 0.0;
        assert_eq!(
            sampler
                .sample(&[1, 2, 3], None, Some(&mut all_zero), &mut rng)
                .unwrap(),
            None
        );
    }

    #[test]
    fn weighted_sample_skips_excluded_without_calling_weighting() {
        let sampler = WeightedSampler::new();
        let mut rng = FixedDraw(0.99);
        let mut weighting = |id: u32| {
            assert_ne!(id, 3);
            1.0
        };
        let sample = sampler
            .sample(&[1, 2, 3], Some(3), Some(&mut weighting), &mut rng)
            .unwrap();
        assert_eq!(sample, Some(2));
    }

    #[test]
    fn malformed_weights_abort_the_call() {
        let sampler = WeightedSampler::new();
        let mut rng = StdRng::seed_from_u64(1);
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let mut weighting = |id: u32| if id == 2 { bad } else { 1.0 };
            let result = sampler.sample(&[1, 2, 3], None, Some(&mut weighting), &mut rng);
            assert!(matches!(
                result,
                Err(StoreError::MalformedWeightingFunction(_))
            ));
            // The guard was released on the error path.
            assert!(!sampler.is_sampling());
        }
    }

    #[test]
    fn overflowing_sum_is_malformed() {
        let sampler = WeightedSampler::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut weighting = |_: u32| f64::MAX;
        let result = sampler.sample(&[1, 2], None, Some(&mut weighting), &mut rng);
        assert!(matches!(
            result,
            Err(StoreError::MalformedWeightingFunction(_))
        ));
    }

    #[test]
    fn reentrant_sampling_is_rejected() {
        let sampler = WeightedSampler::new();
        let mut rng = StdRng::seed_from_u64(3);
        let nested_rejected = Cell::new(false);
        let mut weighting = |_: u32| {
            let mut inner_rng = StdRng::seed_from_u64(4);
            let nested = sampler.sample(&[5, 6], None, None, &mut inner_rng);
            if matches!(nested, Err(StoreError::ReentrantSamplingAccess)) {
                nested_rejected.set(true);
            }
            1.0
        };
        let outer = sampler.sample(&[1, 2], None, Some(&mut weighting), &mut rng);
        assert!(outer.unwrap().is_some());
        assert!(nested_rejected.get());
        assert!(!sampler.is_sampling());
    }

    #[test]
    fn guard_blocks_until_dropped() {
        let sampler = WeightedSampler::<u32>::new();
        let guard = sampler.acquire().unwrap();
        assert!(sampler.is_sampling());
        assert!(matches!(
            sampler.acquire(),
            Err(StoreError::ReentrantSamplingAccess)
        ));
        drop(guard);
        assert!(sampler.acquire().is_ok());
    }

    #[test]
    fn scratch_grows_by_half_or_exact() {
        let sampler = WeightedSampler::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut weighting = |_: usize| 1.0;

        let candidates: Vec<usize> = (0..10).collect();
        sampler
            .sample(&candidates, None, Some(&mut weighting), &mut rng)
            .unwrap();
        assert!(sampler.scratch_capacity() >= 10);
        let after_first = sampler.scratch_capacity();

        // Smaller lists reuse the buffer.
        sampler
            .sample(&candidates[..4], None, Some(&mut weighting), &mut rng)
            .unwrap();
        assert_eq!(sampler.scratch_capacity(), after_first);

        // A slightly larger list grows by at least half.
        let candidates: Vec<usize> = (0..after_first + 1).collect();
        sampler
            .sample(&candidates, None, Some(&mut weighting), &mut rng)
            .unwrap();
        assert!(sampler.scratch_capacity() >= after_first + after_first / 2);
    }
}
