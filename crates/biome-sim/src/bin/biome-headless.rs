//! Run the biome simulation without rendering and print population counts.
//!
//! Log verbosity follows `RUST_LOG` (default `warn`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use biome_sim::driver::{DriverConfig, Simulation};
use biome_sim::settings::SimSettings;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "biome-headless")]
#[command(about = "Run the biome simulation headless and report population counts")]
struct Args {
    /// JSON settings file; unset fields keep their defaults
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Number of frames to run
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Seed for every random stream
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Seconds per frame
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f64,

    /// Resume from a snapshot written by --save
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write a snapshot here after the last frame
    #[arg(long)]
    save: Option<PathBuf>,

    /// Print population every N frames (0 to disable)
    #[arg(long, default_value_t = 60)]
    report_every: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let settings = match &args.settings {
        Some(path) => SimSettings::load(path)?,
        None => SimSettings::default(),
    };
    let config = DriverConfig {
        fixed_dt: args.dt,
        seed: args.seed,
        settings,
    };

    let mut sim = match &args.load {
        Some(path) => Simulation::load(path, config).context("failed to resume simulation")?,
        None => Simulation::new(config).context("failed to create simulation")?,
    };

    for frame in 1..=args.frames {
        sim.frame()?;
        if args.report_every > 0 && frame % args.report_every == 0 {
            let population = sim.population()?;
            println!(
                "t={:>8.2}s creatures={:>4} bushes={:>4} frame_time={:?}",
                sim.sim_time(),
                population.creatures,
                population.bushes,
                sim.last_diagnostics().frame_time
            );
        }
    }

    if let Some(path) = &args.save {
        sim.save(path)
            .with_context(|| format!("failed to save snapshot to {}", path.display()))?;
    }
    Ok(())
}
