//! Run an experiment file and write the time grid and basis-state populations
//! to `<output>/qsim.npz`.
//!
//! ```bash
//! qsim --config demos/rabi.toml --output output
//! ```

use std::path::PathBuf;
use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{ fmt, prelude::*, EnvFilter };
use qsim::{
    mkdir,
    write_npz,
    experiment::Experiment,
    evolve::Rk4Solver,
    pulse::time_grid,
    qsim::QSim,
    utils::populations,
};

/// Compile and evolve a multilevel quantum system described by a TOML file.
#[derive(Parser)]
#[command(name = "qsim")]
#[command(version)]
struct Cli {
    /// Path to the experiment file
    #[arg(short, long, env = "QSIM_CONFIG")]
    config: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter
        = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let exp = Experiment::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let qsystem = exp.build_system()?;
    info!(species = ?qsystem.info(), dim = qsystem.dim(), "built system");

    let mut sim = QSim::new(&qsystem);
    exp.configure(&mut sim)?;
    let psi0 = exp.initial_state(&qsystem)?;
    let states = sim.run(
        &mut Rk4Solver,
        &psi0,
        exp.run.total_time,
        exp.run.samples,
        &exp.solver_options(),
    )?;

    let time = time_grid(exp.run.total_time, exp.run.samples)?;
    let pops = populations(&states);
    mkdir!(cli.output)?;
    let outfile = cli.output.join("qsim.npz");
    write_npz!(
        outfile.as_path(),
        arrays: {
            "time" => &time,
            "populations" => &pops,
        }
    )?;
    info!(path = %outfile.display(), status = %sim.status(), "done");
    Ok(())
}
