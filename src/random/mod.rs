//! Random number consumption.
//!
//! The data managers never seed or own a random number generator. Callers hand in whatever
//! generator stream they use for the purpose (one per subsystem, typically), and the managers
//! only draw uniform values from it through [`UniformRandomSource`]. Every `rand::Rng` is a
//! `UniformRandomSource`.

mod weighted_sampler;

pub use weighted_sampler::{binary_search_cumulative, SamplingGuard, WeightedSampler};

use crate::rand::Rng;

pub trait UniformRandomSource {
    /// Returns a value drawn uniformly from `[0, 1)`.
    fn next_double(&mut self) -> f64;

    /// Returns a value drawn uniformly from `0..bound`. `bound` must be positive.
    fn next_index(&mut self, bound: usize) -> usize;
}

impl<R: Rng + ?Sized> UniformRandomSource for R {
    fn next_double(&mut self) -> f64 {
        self.random::<f64>()
    }

    fn next_index(&mut self, bound: usize) -> usize {
        self.random_range(0..bound)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::UniformRandomSource;

    #[test]
    fn draws_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let x = rng.next_double();
            assert!((0.0..1.0).contains(&x));
            assert!(rng.next_index(7) < 7);
        }
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = StdRng::seed_from_u64(8);
        let mut b = StdRng::seed_from_u64(8);
        for _ in 0..10 {
            assert_eq!(a.next_index(1000), b.next_index(1000));
        }
    }
}
