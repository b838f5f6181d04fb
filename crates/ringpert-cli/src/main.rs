//! Ringpert command-line interface.
//!
//! Run perturbation studies from TOML configuration files:
//! ```sh
//! ringpert run study.toml
//! ringpert validate study.toml
//! ringpert defaults > study.toml
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ringpert")]
#[command(about = "Ringpert: perturbation-theory convergence study for ring resonators")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a study (the reference study if no configuration is given).
    Run {
        /// Path to the study configuration file.
        config: Option<PathBuf>,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running the study.
    Validate {
        /// Path to the study configuration file.
        config: PathBuf,
    },
    /// Print the default configuration as TOML.
    Defaults,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Ringpert Perturbation Study");
            println!("===========================");
            let job = match &config {
                Some(path) => {
                    let job = config::load_config(path)?;
                    println!("Configuration: {}", path.display());
                    job
                }
                None => {
                    println!("Configuration: built-in defaults");
                    config::JobConfig::default()
                }
            };

            let report = runner::run_study(&job)?;
            for line in report.summary_lines() {
                println!("  {}", line);
            }

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            runner::write_outputs(&report, &job, &out_dir)?;

            println!("Study complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let geometry = runner::build_geometry(&job)?;
            let settings = runner::build_settings(&job)?;
            runner::solver_factory(&job.simulation.solver)?;
            println!("Configuration is valid: {}", config.display());
            println!("  {}", geometry);
            println!(
                "  {} perturbation(s), {} resolution(s)",
                settings.perturbations.len(),
                settings.resolutions.len()
            );
            Ok(())
        }
        Commands::Defaults => {
            let text = toml::to_string_pretty(&config::JobConfig::default())?;
            print!("{}", text);
            Ok(())
        }
    }
}
