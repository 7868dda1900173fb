use clap::Parser;
use std::path::PathBuf;

/// Integrates an ensemble of Duffing oscillators with two Runge-Kutta schemes
/// and records how far their trajectories drift apart.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config TOML
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Step size (overrides config)
    #[arg(long, value_name = "SECONDS")]
    pub dt: Option<f64>,

    /// Total simulated time (overrides config)
    #[arg(short = 'T', long, value_name = "SECONDS")]
    pub duration: Option<f64>,

    /// Number of particles per ensemble (overrides config)
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub particles: Option<usize>,

    /// Random seed for the initial conditions (overrides config)
    #[arg(short, long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Directory for the output files (overrides config)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Advance particles on all cores
    #[arg(long, default_value_t = false)]
    pub parallel: bool,

    /// Skip the per-step trajectory dumps
    #[arg(long, default_value_t = false)]
    pub no_trajectories: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long, default_value_t = false)]
    pub print_config: bool,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
