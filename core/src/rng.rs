//! Seedable random number source with a fixed worker-partitioning scheme.
//!
//! Every component that needs randomness takes an explicit [`RandomSource`] handle rather
//! than reaching for an ambient generator, so a run is fully determined by its seed. For
//! parallel execution each worker owns its own generator derived from the base seed with a
//! fixed scheme (see [`RandomSource::for_worker`]), which keeps a given (seed, worker count)
//! pair reproducible without serializing access to a shared generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::errors::FilterError;

/// Odd multiplier used to spread worker indices across the seed space
/// (the 64-bit golden ratio constant, as used by splitmix-style generators).
const WORKER_SEED_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// A seedable source of uniform and Gaussian draws backed by [`StdRng`].
#[derive(Clone, Debug)]
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    /// Create a source from a 64-bit seed.
    pub fn from_seed(seed: u64) -> Self {
        RandomSource {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create the generator owned by worker `worker` of a parallel run.
    ///
    /// The partitioning scheme is fixed: worker $w$ is seeded with
    /// `seed ^ (w + 1) * GAMMA` (wrapping), where GAMMA is the 64-bit golden ratio
    /// constant. Worker streams are therefore disjoint from each other and from the
    /// main stream produced by [`RandomSource::from_seed`], and a given seed plus
    /// worker count always reproduces the same draws.
    pub fn for_worker(seed: u64, worker: usize) -> Self {
        let stream = seed ^ (worker as u64 + 1).wrapping_mul(WORKER_SEED_GAMMA);
        RandomSource {
            rng: StdRng::seed_from_u64(stream),
        }
    }

    /// Draw a uniform value in `[low, high]`.
    ///
    /// The bounds are inclusive so that a degenerate point domain (`low == high`) is
    /// usable for initializing every particle at one exact position.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if low == high {
            low
        } else {
            self.rng.random_range(low..=high)
        }
    }

    /// Draw a uniform value in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Draw from a Gaussian with the given mean and standard deviation.
    ///
    /// Prefer building the distribution once with [`gaussian`] and sampling it via
    /// [`RandomSource::sample`] in hot loops.
    ///
    /// # Errors
    /// Returns [`FilterError::RandomSource`] if the distribution cannot be constructed
    /// (negative or NaN standard deviation).
    pub fn gaussian(&mut self, mean: f64, std_dev: f64) -> Result<f64, FilterError> {
        let dist = gaussian(mean, std_dev)?;
        Ok(dist.sample(&mut self.rng))
    }

    /// Sample a pre-built distribution.
    pub fn sample(&mut self, dist: &Normal<f64>) -> f64 {
        dist.sample(&mut self.rng)
    }
}

/// Build a Gaussian distribution, mapping construction failure to [`FilterError`].
///
/// A standard deviation of exactly zero is valid and produces constant output equal to
/// the mean, which is what a noise-free run requires.
pub fn gaussian(mean: f64, std_dev: f64) -> Result<Normal<f64>, FilterError> {
    Normal::new(mean, std_dev).map_err(|e| {
        FilterError::RandomSource(format!(
            "cannot build Normal(mean = {mean}, std_dev = {std_dev}): {e}"
        ))
    })
}
