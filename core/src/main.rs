//! PFBENCH: A timing harness for the 2D bootstrap particle filter.
//!
//! This program runs the particle filter in one of two modes:
//!
//! - Run mode: a single filter run with the given particle count, horizon, and noise
//!   scales, reporting the final estimate, the true state, and the elapsed wall time.
//!
//! - Sweep mode: the benchmark proper. The filter is run for each particle count in a
//!   sweep list (optionally repeated), and one timing record per run is emitted as CSV —
//!   to a file or to stdout — for downstream plotting and comparison across execution
//!   strategies.
//!
//! Both modes accept the same model flags, a seed, a resampling scheme, and an execution
//! strategy (sequential, or data-parallel with a fixed worker count). A given seed plus
//! worker count reproduces a run exactly.

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use nalgebra::Vector2;
use pfbench::{ExecutionStrategy, FilterConfig, ResamplingStrategy, run};
use serde::Serialize;
use std::error::Error;
use std::fmt::{self, Display};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "A timing harness for the 2D bootstrap particle filter."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Clone)]
enum Command {
    #[command(
        about = "Run the filter once and report the estimate and elapsed time",
        long_about = "Run the particle filter once with the given configuration. Prints the final estimate, the true final state, the position error, and the elapsed wall time. With --diagnostics the final particle count and last measurement are reported as well."
    )]
    Run(RunArgs),

    #[command(
        about = "Sweep particle counts and emit one CSV timing record per run",
        long_about = "Run the filter for every particle count in the sweep list, optionally several times each, and emit one CSV record per run with the elapsed wall time and the run's outcome. Records go to the output file when one is given, otherwise to stdout. The repeat index is added to the seed so repeats are independent but still reproducible."
    )]
    Sweep(SweepArgs),
}

/// Model and strategy flags shared by both subcommands.
#[derive(Args, Clone, Debug)]
struct FilterArgs {
    /// Number of timesteps
    #[arg(short = 't', long, default_value_t = 100)]
    num_steps: usize,

    /// Commanded velocity as "X,Y"
    #[arg(long, default_value = "1.0,0.5", value_parser = parse_velocity)]
    velocity: (f64, f64),

    /// Process noise standard deviation
    #[arg(long, default_value_t = 0.5)]
    sigma_motion: f64,

    /// Sensor noise standard deviation
    #[arg(long, default_value_t = 1.0)]
    sigma_sensor: f64,

    /// RNG seed for all stochastic processes
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Resampling scheme
    #[arg(long, value_enum, default_value_t = ResamplingStrategy::Multinomial)]
    resampling: ResamplingStrategy,

    /// Execution strategy for the per-particle loops
    #[arg(long, value_enum, default_value_t = ExecutionMode::Sequential)]
    execution: ExecutionMode,

    /// Worker count for parallel execution (defaults to the available parallelism)
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExecutionMode {
    Sequential,
    Parallel,
}

impl Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Parallel => write!(f, "parallel"),
        }
    }
}

#[derive(Args, Clone, Debug)]
struct RunArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Number of particles
    #[arg(short = 'n', long, default_value_t = 1000)]
    num_particles: usize,

    /// Report the final particle cloud size and last measurement
    #[arg(long)]
    diagnostics: bool,
}

#[derive(Args, Clone, Debug)]
struct SweepArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Comma-separated list of particle counts to sweep
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "10000,100000,1000000"
    )]
    num_particles: Vec<usize>,

    /// Number of repeated runs per particle count
    #[arg(long, default_value_t = 1)]
    repeats: usize,

    /// Output CSV file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// One benchmark measurement, serialized as a CSV row.
#[derive(Debug, Serialize)]
struct TimingRecord {
    /// Wall-clock timestamp of the run
    time: String,
    num_particles: usize,
    num_steps: usize,
    execution: String,
    resampling: String,
    seed: u64,
    seconds: f64,
    estimate_x: f64,
    estimate_y: f64,
    true_x: f64,
    true_y: f64,
    position_error: f64,
}

fn parse_velocity(raw: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        return Err(format!("expected \"X,Y\", got '{raw}'"));
    }
    let x = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad X component '{}': {e}", parts[0]))?;
    let y = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad Y component '{}': {e}", parts[1]))?;
    Ok((x, y))
}

/// Initialize the logger with the specified configuration.
///
/// # Arguments
/// * `log_level` - Log level string (off, error, warn, info, debug, trace)
/// * `log_file` - Optional path to log file (logs to stderr if None)
///
/// # Errors
/// Returns an error if the log file cannot be opened or logger initialization fails.
fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    use std::io::Write;

    let level = log_level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', defaulting to 'info'", log_level);
        log::LevelFilter::Info
    });

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.args()
        )
    });

    if let Some(log_path) = log_file {
        if let Some(parent) = log_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let target = Box::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)?,
        );
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.try_init()?;
    Ok(())
}

impl FilterArgs {
    /// Build a library configuration for the given particle count and seed.
    fn to_config(&self, num_particles: usize, seed: u64) -> FilterConfig {
        let execution = match self.execution {
            ExecutionMode::Sequential => ExecutionStrategy::Sequential,
            ExecutionMode::Parallel => ExecutionStrategy::Parallel {
                workers: self.workers.unwrap_or_else(|| {
                    std::thread::available_parallelism()
                        .map(|n| n.get())
                        .unwrap_or(1)
                }),
            },
        };
        let mut config = FilterConfig::new(
            num_particles,
            self.num_steps,
            Vector2::new(self.velocity.0, self.velocity.1),
            self.sigma_motion,
            self.sigma_sensor,
        );
        config.seed = seed;
        config.resampling = self.resampling;
        config.execution = execution;
        config
    }
}

fn run_once(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let mut config = args.filter.to_config(args.num_particles, args.filter.seed);
    config.diagnostics = args.diagnostics;

    info!(
        "running filter: {} particles, {} steps, {} execution",
        config.num_particles, config.num_steps, config.execution
    );
    let start = Instant::now();
    let result = run(&config)?;
    let seconds = start.elapsed().as_secs_f64();

    println!(
        "Estimate:       [{:.4}, {:.4}]",
        result.estimate.x, result.estimate.y
    );
    println!(
        "True state:     [{:.4}, {:.4}]",
        result.true_state.x, result.true_state.y
    );
    println!("Position error: {:.4}", result.position_error());
    println!("Elapsed:        {:.4} s", seconds);
    if let Some(diagnostics) = &result.diagnostics {
        println!(
            "Diagnostics:    {} particles, last measurement [{:.4}, {:.4}]",
            diagnostics.particles.len(),
            diagnostics.last_measurement.x,
            diagnostics.last_measurement.y
        );
    }
    Ok(())
}

fn run_sweep(args: &SweepArgs) -> Result<(), Box<dyn Error>> {
    let mut records = Vec::with_capacity(args.num_particles.len() * args.repeats);

    for &num_particles in &args.num_particles {
        for repeat in 0..args.repeats {
            let seed = args.filter.seed + repeat as u64;
            let config = args.filter.to_config(num_particles, seed);

            let start = Instant::now();
            let result = run(&config)?;
            let seconds = start.elapsed().as_secs_f64();

            info!(
                "swept N = {}: {:.4} s, position error {:.4}",
                num_particles,
                seconds,
                result.position_error()
            );
            records.push(TimingRecord {
                time: chrono::Local::now()
                    .format("%Y-%m-%d %H:%M:%S%.3f")
                    .to_string(),
                num_particles,
                num_steps: config.num_steps,
                execution: config.execution.to_string(),
                resampling: config.resampling.to_string(),
                seed,
                seconds,
                estimate_x: result.estimate.x,
                estimate_y: result.estimate.y,
                true_x: result.true_state.x,
                true_y: result.true_state.y,
                position_error: result.position_error(),
            });
        }
    }

    match &args.output {
        Some(path) => {
            let mut writer = csv::Writer::from_path(path)?;
            for record in &records {
                writer.serialize(record)?;
            }
            writer.flush()?;
            info!("wrote {} timing records to {}", records.len(), path.display());
        }
        None => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for record in &records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logger(&cli.log_level, cli.log_file.as_ref())?;

    match &cli.command {
        Command::Run(args) => run_once(args),
        Command::Sweep(args) => run_sweep(args),
    }
}
