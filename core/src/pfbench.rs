//! Bootstrap particle filter toolbox for 2D state tracking benchmarks
//!
//! This crate provides a bootstrap (sequential importance resampling) particle filter that
//! tracks a two-dimensional hidden state from noisy measurements, together with the synthetic
//! truth simulator that drives it and a timing harness for sweeping particle counts. The filter
//! is deliberately small and self-contained: it exists both as a usable estimator and as a
//! benchmark target for comparing execution strategies (plain sequential loops versus a
//! data-parallel loop over the particle ensemble).
//!
//! Primarily built off of two crate dependencies:
//! - [`nalgebra`](https://crates.io/crates/nalgebra): Provides the vector types for states and
//!   measurements.
//! - [`rand`](https://crates.io/crates/rand) / [`rand_distr`](https://crates.io/crates/rand_distr):
//!   Provide the seedable generators and Gaussian distributions for process and sensor noise.
//!
//! # State-space model
//!
//! The hidden state is a 2D position $x_t$ advancing under a constant commanded velocity $v$
//! with additive Gaussian process noise, observed through an identity measurement model with
//! additive Gaussian sensor noise:
//!
//! $$
//! x_t = x_{t-1} + v + \epsilon_t, \quad \epsilon_t \sim \mathcal{N}(0, \sigma_m^2 I)
//! $$
//!
//! $$
//! z_t = x_t + \eta_t, \quad \eta_t \sim \mathcal{N}(0, \sigma_s^2 I)
//! $$
//!
//! Each of the $N$ particles is a hypothesis of $x_t$ carrying an importance weight. Every
//! timestep runs the canonical bootstrap cycle over the ensemble:
//!
//! 1. **Predict**: every particle advances through the motion model with its own noise draw.
//! 2. **Weight**: every particle is scored against the measurement with the Gaussian
//!    likelihood $w_i = \exp(-\tfrac{1}{2} d_i^2 / \sigma_s^2)$ where $d_i$ is the particle's
//!    distance to the measurement.
//! 3. **Normalize**: weights are scaled to sum to one, with a uniform fallback when the whole
//!    ensemble has underflowed to zero (see [`particle::ParticleCloud::normalize`]).
//! 4. **Resample**: a new index assignment is drawn with replacement proportional to the
//!    weights, the cloud is reindexed, and weights reset to $1/N$.
//!
//! Timesteps are strictly sequential — the truth and measurement at step $t$ depend on step
//! $t-1$ — but the predict and weight stages are embarrassingly parallel over particles, which
//! is what [`filter::ExecutionStrategy`] exploits.
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector2;
//! use pfbench::{FilterConfig, run};
//!
//! let mut config = FilterConfig::new(500, 25, Vector2::new(1.0, 0.5), 0.5, 1.0);
//! config.seed = 7;
//! let result = run(&config).unwrap();
//! assert!(result.position_error().is_finite());
//! ```

pub mod errors;
pub mod filter;
pub mod particle;
pub mod resample;
pub mod rng;
pub mod sim;

pub use errors::FilterError;
pub use filter::{Diagnostics, ExecutionStrategy, FilterResult, run};
pub use resample::ResamplingStrategy;

use nalgebra::Vector2;

/// Immutable per-run configuration for the filter.
///
/// Constructed once at entry and validated before any simulation state is allocated. The
/// fields mirror the knobs of the underlying model: ensemble size, horizon, commanded
/// velocity, and the two noise scales. The remaining fields select the random seed, the
/// initialization domain, and the resampling/execution strategies.
///
/// Defaults reproduce the canonical benchmark scenario: 1000 particles, 50 steps,
/// velocity (1.0, 0.5), process noise 0.5, sensor noise 1.0, particles initialized
/// uniformly over the square [0, 10] x [0, 10].
#[derive(Clone, Debug)]
pub struct FilterConfig {
    /// Number of particles N in the ensemble
    pub num_particles: usize,
    /// Number of timesteps T to run
    pub num_steps: usize,
    /// Commanded velocity applied to the truth and every particle each step
    pub velocity: Vector2<f64>,
    /// Process noise standard deviation (motion model)
    pub sigma_motion: f64,
    /// Sensor noise standard deviation (measurement model)
    pub sigma_sensor: f64,
    /// Lower bound of the square particle initialization domain
    pub init_low: f64,
    /// Upper bound of the square particle initialization domain
    pub init_high: f64,
    /// Seed for all random draws; a fixed seed (plus worker count, when parallel)
    /// fully determines the run
    pub seed: u64,
    /// Resampling scheme; multinomial unless explicitly overridden
    pub resampling: ResamplingStrategy,
    /// How the per-particle predict and weight loops execute
    pub execution: ExecutionStrategy,
    /// When true, the result carries the final particle positions and last measurement
    pub diagnostics: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            num_particles: 1000,
            num_steps: 50,
            velocity: Vector2::new(1.0, 0.5),
            sigma_motion: 0.5,
            sigma_sensor: 1.0,
            init_low: 0.0,
            init_high: 10.0,
            seed: 42,
            resampling: ResamplingStrategy::default(),
            execution: ExecutionStrategy::default(),
            diagnostics: false,
        }
    }
}

impl FilterConfig {
    /// Create a configuration from the five core model parameters, leaving the seed,
    /// initialization domain, and strategy fields at their defaults.
    ///
    /// # Arguments
    /// * `num_particles` - Ensemble size N, must be positive.
    /// * `num_steps` - Horizon T, must be positive.
    /// * `velocity` - Commanded velocity, applied per step.
    /// * `sigma_motion` - Process noise standard deviation.
    /// * `sigma_sensor` - Sensor noise standard deviation.
    pub fn new(
        num_particles: usize,
        num_steps: usize,
        velocity: Vector2<f64>,
        sigma_motion: f64,
        sigma_sensor: f64,
    ) -> Self {
        FilterConfig {
            num_particles,
            num_steps,
            velocity,
            sigma_motion,
            sigma_sensor,
            ..Default::default()
        }
    }

    /// Check the configuration for fatal problems.
    ///
    /// Called by [`run`] before any state is allocated; no partial run occurs on failure.
    /// Sigmas of exactly zero are accepted — a noise-free run is well-defined and useful
    /// for deterministic testing — but negative or non-finite values are rejected.
    ///
    /// # Errors
    /// Returns [`FilterError::InvalidConfiguration`] describing the first offending field.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.num_particles == 0 {
            return Err(FilterError::InvalidConfiguration(
                "particle count must be positive".to_string(),
            ));
        }
        if self.num_steps == 0 {
            return Err(FilterError::InvalidConfiguration(
                "step count must be positive".to_string(),
            ));
        }
        if !self.velocity.x.is_finite() || !self.velocity.y.is_finite() {
            return Err(FilterError::InvalidConfiguration(format!(
                "velocity must be finite, got ({}, {})",
                self.velocity.x, self.velocity.y
            )));
        }
        for (name, sigma) in [
            ("sigma_motion", self.sigma_motion),
            ("sigma_sensor", self.sigma_sensor),
        ] {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(FilterError::InvalidConfiguration(format!(
                    "{name} must be finite and non-negative, got {sigma}"
                )));
            }
        }
        if !self.init_low.is_finite() || !self.init_high.is_finite() || self.init_low > self.init_high
        {
            return Err(FilterError::InvalidConfiguration(format!(
                "initialization domain [{}, {}] is not a valid interval",
                self.init_low, self.init_high
            )));
        }
        if let ExecutionStrategy::Parallel { workers } = self.execution
            && workers == 0
        {
            return Err(FilterError::InvalidConfiguration(
                "parallel execution requires at least one worker".to_string(),
            ));
        }
        Ok(())
    }
}
