//! Synthetic truth-state and measurement generation.
//!
//! The benchmark has no external sensor stream; instead a [`TruthModel`] advances a hidden
//! 2D state once per timestep and emits the noisy measurement the filter consumes. The truth
//! trajectory is independent of the particle cloud — it shares only the commanded velocity
//! and the noise scales.

use nalgebra::Vector2;
use rand_distr::Normal;

use crate::errors::FilterError;
use crate::rng::{self, RandomSource};

/// Motion and measurement model for the hidden true state.
///
/// Both noise distributions are built once at construction so the per-step methods are
/// infallible; a zero standard deviation is valid and yields a deterministic trajectory.
#[derive(Clone, Debug)]
pub struct TruthModel {
    velocity: Vector2<f64>,
    motion_noise: Normal<f64>,
    sensor_noise: Normal<f64>,
}

impl TruthModel {
    /// Build the model from the commanded velocity and noise scales.
    ///
    /// # Errors
    /// Returns [`FilterError::RandomSource`] if either noise distribution cannot be
    /// constructed (negative or NaN standard deviation).
    pub fn new(
        velocity: Vector2<f64>,
        sigma_motion: f64,
        sigma_sensor: f64,
    ) -> Result<Self, FilterError> {
        Ok(TruthModel {
            velocity,
            motion_noise: rng::gaussian(0.0, sigma_motion)?,
            sensor_noise: rng::gaussian(0.0, sigma_sensor)?,
        })
    }

    /// The commanded velocity shared by the truth and the particle motion model.
    pub fn velocity(&self) -> Vector2<f64> {
        self.velocity
    }

    /// The process noise distribution, for reuse by the particle predict step.
    pub fn motion_noise(&self) -> &Normal<f64> {
        &self.motion_noise
    }

    /// Advance the true state one timestep: velocity plus an independent Gaussian
    /// process noise draw per dimension.
    pub fn advance(&self, state: Vector2<f64>, rng: &mut RandomSource) -> Vector2<f64> {
        Vector2::new(
            state.x + self.velocity.x + rng.sample(&self.motion_noise),
            state.y + self.velocity.y + rng.sample(&self.motion_noise),
        )
    }

    /// Produce a measurement of the given state: the state plus an independent Gaussian
    /// sensor noise draw per dimension.
    pub fn measure(&self, state: Vector2<f64>, rng: &mut RandomSource) -> Vector2<f64> {
        Vector2::new(
            state.x + rng.sample(&self.sensor_noise),
            state.y + rng.sample(&self.sensor_noise),
        )
    }
}
