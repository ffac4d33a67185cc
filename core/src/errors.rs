//! Error types for filter configuration and execution.
//!
//! Only genuinely fatal conditions are represented here. Weight degeneracy — the whole
//! ensemble underflowing to zero after a weighting step — is deliberately absent: it is
//! recovered locally inside [`crate::particle::ParticleCloud::normalize`] by resetting to
//! uniform weights, and never aborts a run.

use thiserror::Error;

/// Errors surfaced by the filter entry point.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The run configuration is unusable: zero particle or step counts, negative or
    /// non-finite noise scales, an inverted initialization domain, or a zero worker count.
    /// Reported before any simulation state is allocated.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A noise distribution could not be constructed from the configured parameters.
    #[error("random source failure: {0}")]
    RandomSource(String),
}
