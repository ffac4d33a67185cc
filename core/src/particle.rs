//! Weighted particle ensemble and its per-step operations.
//!
//! A [`ParticleCloud`] is an ordered sequence of N 2D positions with a parallel sequence of
//! N importance weights. Particle identity is purely positional: resampling rewrites the
//! position array by index and identity is not retained across steps. The per-particle
//! kernels (advance one particle, score one particle) are shared between the sequential
//! and rayon-parallel entry points, so execution strategies differ only in how the loop
//! runs, never in what it computes.

use log::debug;
use nalgebra::Vector2;
use rand_distr::Normal;
use rayon::prelude::*;

use crate::rng::RandomSource;

/// Weight totals below this threshold are numerically indistinguishable from zero and
/// trigger the uniform fallback in [`ParticleCloud::normalize`].
const DEGENERACY_FLOOR: f64 = 1e-300;

/// Relative tolerance for deciding that a weight vector is uniform.
const UNIFORM_TOLERANCE: f64 = 1e-9;

/// The weighted ensemble of state hypotheses.
///
/// Invariant: `positions.len() == weights.len()` at all times.
#[derive(Clone, Debug)]
pub struct ParticleCloud {
    positions: Vec<Vector2<f64>>,
    weights: Vec<f64>,
}

/// Advance a single particle through the motion model. Shared by the sequential and
/// parallel predict loops.
#[inline]
fn advance_particle(
    position: &mut Vector2<f64>,
    velocity: &Vector2<f64>,
    motion_noise: &Normal<f64>,
    rng: &mut RandomSource,
) {
    position.x += velocity.x + rng.sample(motion_noise);
    position.y += velocity.y + rng.sample(motion_noise);
}

/// Gaussian likelihood of a particle given the measurement, with the sensor variance
/// precomputed. Zero sensor variance collapses the likelihood to an exact-match
/// indicator, the limit of the Gaussian as its width goes to zero.
#[inline]
fn likelihood(position: &Vector2<f64>, measurement: &Vector2<f64>, variance: f64) -> f64 {
    let dx = position.x - measurement.x;
    let dy = position.y - measurement.y;
    let dist2 = dx * dx + dy * dy;
    if variance == 0.0 {
        if dist2 == 0.0 { 1.0 } else { 0.0 }
    } else {
        (-0.5 * dist2 / variance).exp()
    }
}

impl ParticleCloud {
    /// Initialize `n` particles uniformly over the square `[low, high] x [low, high]`
    /// with uniform weights `1/n`.
    pub fn new_uniform(n: usize, low: f64, high: f64, rng: &mut RandomSource) -> Self {
        let positions = (0..n)
            .map(|_| Vector2::new(rng.uniform(low, high), rng.uniform(low, high)))
            .collect();
        ParticleCloud {
            positions,
            weights: vec![1.0 / n as f64; n],
        }
    }

    /// Number of particles in the ensemble.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the ensemble is empty. Never true for a cloud built through a validated
    /// configuration.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Read-only view of the particle positions.
    pub fn positions(&self) -> &[Vector2<f64>] {
        &self.positions
    }

    /// Read-only view of the importance weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Predict step: advance every particle independently through the motion model.
    pub fn predict(
        &mut self,
        velocity: &Vector2<f64>,
        motion_noise: &Normal<f64>,
        rng: &mut RandomSource,
    ) {
        for position in &mut self.positions {
            advance_particle(position, velocity, motion_noise, rng);
        }
    }

    /// Data-parallel predict step.
    ///
    /// The ensemble is split into fixed chunks of `ceil(n / workers)` particles; chunk `w`
    /// draws its noise from `worker_rngs[w]`. Chunk boundaries depend only on the particle
    /// and worker counts, so the output is reproducible for a given (seed, worker count)
    /// regardless of thread scheduling.
    pub fn predict_parallel(
        &mut self,
        velocity: &Vector2<f64>,
        motion_noise: &Normal<f64>,
        worker_rngs: &mut [RandomSource],
    ) {
        debug_assert!(!worker_rngs.is_empty());
        let chunk = self.positions.len().div_ceil(worker_rngs.len());
        self.positions
            .par_chunks_mut(chunk)
            .zip(worker_rngs.par_iter_mut())
            .for_each(|(positions, rng)| {
                for position in positions {
                    advance_particle(position, velocity, motion_noise, rng);
                }
            });
    }

    /// Weight step: score every particle against the measurement with the Gaussian
    /// likelihood `exp(-0.5 * dist2 / sigma_sensor^2)`.
    pub fn update_weights(&mut self, measurement: &Vector2<f64>, sigma_sensor: f64) {
        let variance = sigma_sensor * sigma_sensor;
        for (weight, position) in self.weights.iter_mut().zip(self.positions.iter()) {
            *weight = likelihood(position, measurement, variance);
        }
    }

    /// Data-parallel weight step. Pure per-particle map, no randomness involved.
    pub fn update_weights_parallel(&mut self, measurement: &Vector2<f64>, sigma_sensor: f64) {
        let variance = sigma_sensor * sigma_sensor;
        self.weights
            .par_iter_mut()
            .zip(self.positions.par_iter())
            .for_each(|(weight, position)| {
                *weight = likelihood(position, measurement, variance);
            });
    }

    /// Normalize the weights to sum to one.
    ///
    /// If the total is non-finite or numerically indistinguishable from zero, every weight
    /// is set to exactly `1/n` instead and `true` is returned. This is a recovery policy,
    /// not an error: the measurement's influence is discarded for this step and the run
    /// continues.
    pub fn normalize(&mut self) -> bool {
        let total: f64 = self.weights.iter().sum();
        if total.is_finite() && total >= DEGENERACY_FLOOR {
            for weight in &mut self.weights {
                *weight /= total;
            }
            false
        } else {
            debug!("degenerate weight total {total:e}; resetting ensemble to uniform weights");
            let uniform = 1.0 / self.weights.len() as f64;
            for weight in &mut self.weights {
                *weight = uniform;
            }
            true
        }
    }

    /// Unweighted arithmetic mean of the particle positions.
    ///
    /// Only a valid state estimate while the weights are uniform, i.e. directly after
    /// resampling; [`ParticleCloud::estimate`] enforces that distinction.
    pub fn mean(&self) -> Vector2<f64> {
        let n = self.positions.len() as f64;
        let mut sum = Vector2::new(0.0, 0.0);
        for position in &self.positions {
            sum += *position;
        }
        sum / n
    }

    /// Weight-proportional mean of the particle positions. Assumes normalized weights.
    pub fn weighted_mean(&self) -> Vector2<f64> {
        let mut mean = Vector2::new(0.0, 0.0);
        for (position, weight) in self.positions.iter().zip(self.weights.iter()) {
            mean += position.scale(*weight);
        }
        mean
    }

    /// State estimate for the current cloud.
    ///
    /// Dispatches on the weight vector: the unweighted mean is used only when the weights
    /// are uniform (the post-resample situation in the canonical loop); any non-uniform
    /// weight vector gets the weighted mean instead.
    pub fn estimate(&self) -> Vector2<f64> {
        if self.weights_are_uniform() {
            self.mean()
        } else {
            self.weighted_mean()
        }
    }

    fn weights_are_uniform(&self) -> bool {
        let uniform = 1.0 / self.positions.len() as f64;
        self.weights
            .iter()
            .all(|w| (w - uniform).abs() <= uniform * UNIFORM_TOLERANCE)
    }

    /// Rebuild the position array from a resampling index assignment.
    ///
    /// `indices` must have length `n` with every value in `[0, n)`; duplicates are the
    /// whole point of resampling with replacement.
    pub fn reindex(&mut self, indices: &[usize]) {
        debug_assert_eq!(indices.len(), self.positions.len());
        self.positions = indices.iter().map(|&i| self.positions[i]).collect();
    }

    /// Reset every weight to exactly `1/n` (the post-resample state).
    pub fn reset_weights(&mut self) {
        let uniform = 1.0 / self.weights.len() as f64;
        for weight in &mut self.weights {
            *weight = uniform;
        }
    }
}
