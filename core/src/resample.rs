//! Resampling strategies: weight distribution in, index assignment out.
//!
//! Resampling converts the normalized weight vector into a fresh population drawn with
//! replacement, combating weight degeneracy. The two schemes here share the contract —
//! `n` indices, each in `[0, n)`, distributed according to the categorical distribution
//! the weights define — but consume randomness differently, so they are never substituted
//! for one another implicitly: multinomial is the portable reference everywhere and
//! systematic must be selected explicitly.

use std::fmt::{self, Display};

use crate::rng::RandomSource;

/// Scheme used to convert weights into a new index assignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ResamplingStrategy {
    /// N independent draws against the cumulative weight distribution. The reference
    /// behavior; higher variance, one uniform draw per particle.
    #[default]
    Multinomial,
    /// One uniform offset in `[0, 1/N)` plus a fixed `1/N` stride through the cumulative
    /// distribution. Lower variance and a single uniform draw per call, but different
    /// output statistics for a fixed seed — opt-in only.
    Systematic,
}

impl Display for ResamplingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResamplingStrategy::Multinomial => write!(f, "multinomial"),
            ResamplingStrategy::Systematic => write!(f, "systematic"),
        }
    }
}

impl ResamplingStrategy {
    /// Draw a length-`n` index assignment from the categorical distribution defined by
    /// `weights`. Every returned index lies in `[0, n)`.
    ///
    /// Weights are expected to be normalized; the implementations scale by the actual
    /// total so a slightly off-unit sum from floating accumulation cannot push a draw
    /// out of range.
    pub fn resample(&self, weights: &[f64], rng: &mut RandomSource) -> Vec<usize> {
        match self {
            ResamplingStrategy::Multinomial => multinomial(weights, rng),
            ResamplingStrategy::Systematic => systematic(weights, rng),
        }
    }
}

fn multinomial(weights: &[f64], rng: &mut RandomSource) -> Vec<usize> {
    let n = weights.len();
    let mut cumulative = Vec::with_capacity(n);
    let mut total = 0.0;
    for weight in weights {
        total += weight;
        cumulative.push(total);
    }
    (0..n)
        .map(|_| {
            let u = rng.unit() * total;
            // First bin whose cumulative weight exceeds the draw.
            cumulative.partition_point(|&c| c <= u).min(n - 1)
        })
        .collect()
}

fn systematic(weights: &[f64], rng: &mut RandomSource) -> Vec<usize> {
    let n = weights.len();
    let total: f64 = weights.iter().sum();
    let step = total / n as f64;
    let mut u = rng.unit() * step;
    let mut indices = Vec::with_capacity(n);
    let mut i = 0;
    let mut cumulative = weights[0];
    for _ in 0..n {
        while u > cumulative && i + 1 < n {
            i += 1;
            cumulative += weights[i];
        }
        indices.push(i);
        u += step;
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_multinomial() {
        assert_eq!(ResamplingStrategy::default(), ResamplingStrategy::Multinomial);
    }

    #[test]
    fn test_multinomial_indices_in_range() {
        let mut rng = RandomSource::from_seed(42);
        let weights: Vec<f64> = (0..100).map(|_| rng.unit()).collect();
        let total: f64 = weights.iter().sum();
        let weights: Vec<f64> = weights.iter().map(|w| w / total).collect();
        for _ in 0..50 {
            let indices = ResamplingStrategy::Multinomial.resample(&weights, &mut rng);
            assert_eq!(indices.len(), 100);
            assert!(indices.iter().all(|&i| i < 100));
        }
    }

    #[test]
    fn test_systematic_indices_in_range() {
        let mut rng = RandomSource::from_seed(42);
        let weights: Vec<f64> = (0..100).map(|_| 0.5 + rng.unit()).collect();
        let total: f64 = weights.iter().sum();
        let weights: Vec<f64> = weights.iter().map(|w| w / total).collect();
        for _ in 0..50 {
            let indices = ResamplingStrategy::Systematic.resample(&weights, &mut rng);
            assert_eq!(indices.len(), 100);
            assert!(indices.iter().all(|&i| i < 100));
        }
    }

    #[test]
    fn test_multinomial_point_mass_always_wins() {
        let mut rng = RandomSource::from_seed(42);
        let mut weights = vec![0.0; 10];
        weights[7] = 1.0;
        let indices = ResamplingStrategy::Multinomial.resample(&weights, &mut rng);
        assert!(indices.iter().all(|&i| i == 7));
    }

    #[test]
    fn test_systematic_point_mass_always_wins() {
        let mut rng = RandomSource::from_seed(42);
        let mut weights = vec![0.0; 10];
        weights[3] = 1.0;
        let indices = ResamplingStrategy::Systematic.resample(&weights, &mut rng);
        assert!(indices.iter().all(|&i| i == 3));
    }

    #[test]
    fn test_systematic_uniform_weights_keep_every_particle() {
        let mut rng = RandomSource::from_seed(42);
        let weights = vec![0.1; 10];
        let indices = ResamplingStrategy::Systematic.resample(&weights, &mut rng);
        // With equal weights the stride lands in every bin exactly once, in order.
        assert_eq!(indices, (0..10).collect::<Vec<usize>>());
    }

    #[test]
    fn test_multinomial_reproducible_for_fixed_seed() {
        let weights = vec![0.25; 4];
        let mut rng_a = RandomSource::from_seed(7);
        let mut rng_b = RandomSource::from_seed(7);
        let a = ResamplingStrategy::Multinomial.resample(&weights, &mut rng_a);
        let b = ResamplingStrategy::Multinomial.resample(&weights, &mut rng_b);
        assert_eq!(a, b);
    }
}
