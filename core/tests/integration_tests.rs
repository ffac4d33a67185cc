//! Integration tests for the bootstrap particle filter.
//!
//! These exercise the full run loop end to end: the deterministic zero-noise scenario,
//! the seeded statistical tracking scenario used as a regression check, reproducibility
//! under both execution strategies, and the statistical behavior of the resampling
//! schemes over many seeded draws.

use nalgebra::Vector2;
use pfbench::rng::RandomSource;
use pfbench::{ExecutionStrategy, FilterConfig, FilterError, ResamplingStrategy, run};

/// The canonical seeded tracking scenario: N=1000, T=100, velocity (1.0, 0.5),
/// process noise 0.5, sensor noise 1.0.
fn tracking_config(seed: u64) -> FilterConfig {
    let mut config = FilterConfig::new(1000, 100, Vector2::new(1.0, 0.5), 0.5, 1.0);
    config.seed = seed;
    config
}

#[test]
fn test_zero_noise_run_is_exactly_deterministic() {
    // All noise off, every particle initialized at the true starting position: after
    // five unit steps east both the truth and the estimate sit at exactly (5, 0).
    let mut config = FilterConfig::new(10, 5, Vector2::new(1.0, 0.0), 0.0, 0.0);
    config.init_low = 0.0;
    config.init_high = 0.0;

    let result = run(&config).unwrap();
    assert_eq!(result.true_state, Vector2::new(5.0, 0.0));
    assert_eq!(result.estimate, Vector2::new(5.0, 0.0));
}

#[test]
fn test_seeded_scenario_tracks_truth() {
    // Regression bound, not exact-value equality: the estimate stays within 3.0 of the
    // true final position for any seed, checked here across a handful of fixed ones.
    for seed in [7, 42, 1234, 99999] {
        let result = run(&tracking_config(seed)).unwrap();
        assert!(
            result.position_error() < 3.0,
            "seed {seed}: error {} exceeds bound",
            result.position_error()
        );
    }
}

#[test]
fn test_cloud_size_invariant_holds_after_run() {
    let mut config = tracking_config(42);
    config.diagnostics = true;
    let result = run(&config).unwrap();
    let diagnostics = result.diagnostics.expect("diagnostics requested");
    assert_eq!(diagnostics.particles.len(), 1000);
}

#[test]
fn test_parallel_strategy_tracks_truth() {
    let mut config = tracking_config(42);
    config.execution = ExecutionStrategy::Parallel { workers: 4 };
    let result = run(&config).unwrap();
    assert!(result.position_error() < 3.0);
}

#[test]
fn test_parallel_runs_reproducible_for_fixed_seed_and_workers() {
    let mut config = tracking_config(42);
    config.execution = ExecutionStrategy::Parallel { workers: 4 };
    let a = run(&config).unwrap();
    let b = run(&config).unwrap();
    assert_eq!(a.estimate, b.estimate);
    assert_eq!(a.true_state, b.true_state);
}

#[test]
fn test_systematic_resampling_tracks_truth() {
    let mut config = tracking_config(42);
    config.resampling = ResamplingStrategy::Systematic;
    let result = run(&config).unwrap();
    assert!(result.position_error() < 3.0);
}

#[test]
fn test_run_survives_weight_underflow() {
    // Initializing the cloud absurdly far from the truth underflows every weight on the
    // first steps; the uniform fallback must carry the run to completion rather than
    // aborting it.
    let mut config = FilterConfig::new(100, 10, Vector2::new(1.0, 0.0), 0.5, 1.0);
    config.init_low = 1.0e6;
    config.init_high = 1.0e6 + 10.0;

    let result = run(&config).unwrap();
    assert!(result.degenerate_steps > 0);
    assert!(result.estimate.x.is_finite());
    assert!(result.estimate.y.is_finite());
}

#[test]
fn test_invalid_configurations_fail_before_running() {
    let zero_particles = FilterConfig::new(0, 10, Vector2::new(1.0, 0.0), 0.5, 1.0);
    let zero_steps = FilterConfig::new(10, 0, Vector2::new(1.0, 0.0), 0.5, 1.0);
    let bad_sigma = FilterConfig::new(10, 10, Vector2::new(1.0, 0.0), -0.5, 1.0);
    for config in [zero_particles, zero_steps, bad_sigma] {
        assert!(matches!(
            run(&config),
            Err(FilterError::InvalidConfiguration(_))
        ));
    }
}

#[test]
fn test_multinomial_uniform_weights_are_uniformly_distributed() {
    // Chi-square goodness-of-fit of resampled index frequencies against the discrete
    // uniform distribution. With 10 categories (9 degrees of freedom) and 20000 draws,
    // a statistic below 35 comfortably covers the 99.9% quantile (~27.9); the seeded
    // draws make the test deterministic.
    let n = 10;
    let draws_per_call = n;
    let calls = 2000;
    let weights = vec![1.0 / n as f64; n];
    let mut rng = RandomSource::from_seed(42);

    let mut counts = vec![0usize; n];
    for _ in 0..calls {
        for index in ResamplingStrategy::Multinomial.resample(&weights, &mut rng) {
            counts[index] += 1;
        }
    }

    let total = (draws_per_call * calls) as f64;
    let expected = total / n as f64;
    let chi_square: f64 = counts
        .iter()
        .map(|&observed| {
            let diff = observed as f64 - expected;
            diff * diff / expected
        })
        .sum();
    assert!(
        chi_square < 35.0,
        "chi-square statistic {chi_square} too large for uniform resampling"
    );
}

#[test]
fn test_resample_indices_always_in_range() {
    let mut rng = RandomSource::from_seed(42);
    let n = 257;
    let raw: Vec<f64> = (0..n).map(|_| rng.unit()).collect();
    let total: f64 = raw.iter().sum();
    let weights: Vec<f64> = raw.iter().map(|w| w / total).collect();

    for strategy in [ResamplingStrategy::Multinomial, ResamplingStrategy::Systematic] {
        for _ in 0..20 {
            let indices = strategy.resample(&weights, &mut rng);
            assert_eq!(indices.len(), n);
            assert!(indices.iter().all(|&i| i < n));
        }
    }
}

#[test]
fn test_sequential_and_parallel_agree_statistically() {
    // The two strategies consume randomness differently, so their outputs differ for a
    // fixed seed; both must still land near the truth.
    let sequential = run(&tracking_config(7)).unwrap();
    let mut parallel_config = tracking_config(7);
    parallel_config.execution = ExecutionStrategy::Parallel { workers: 8 };
    let parallel = run(&parallel_config).unwrap();

    assert!(sequential.position_error() < 3.0);
    assert!(parallel.position_error() < 3.0);
    assert!((sequential.estimate - parallel.estimate).norm() < 3.0);
}
