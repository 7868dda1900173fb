mod cli;
mod config;
mod seeding;
mod sinks;

use anyhow::Result;
use clap::Parser;
use cli::Args;
use config::RunConfig;
use duffing_core::run_comparison;
use seeding::UniformSeeder;
use sinks::DatFileSink;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    config.apply_overrides(&args);

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    config.validate()?;
    let (low, high) = config.schemes.build()?;
    let (initial, seed) = UniformSeeder::from_config(&config.ensemble)
        .draw(config.ensemble.particles)?;
    info!(
        seed,
        particles = initial.len(),
        output = %config.output.directory.display(),
        "seeded ensemble"
    );

    let mut sink = DatFileSink::create(&config.output)?;
    let summary = run_comparison(
        &config.params,
        &low,
        &high,
        &initial,
        &config.integration,
        &mut sink,
    )?;

    let output = &config.output;
    if output.write_trajectories {
        println!("{} trajectories: {}", summary.low_scheme, output.low_path().display());
        println!("{} trajectories: {}", summary.high_scheme, output.high_path().display());
    }
    println!("divergence: {}", output.divergence_path().display());
    println!("summary: {}", output.summary_path().display());
    println!("seed: {seed}");
    println!(
        "max |x_low - x_high| = {:e}, max |v_low - v_high| = {:e} over {} steps",
        summary.global_max.position, summary.global_max.velocity, summary.steps
    );
    Ok(())
}
