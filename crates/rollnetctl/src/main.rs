// rollnet Control CLI
// Train an actor-critic agent against the simulated robot and inspect what it saved

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod settings;

#[derive(Parser)]
#[command(name = "rollnetctl")]
#[command(about = "rollnet actor-critic control CLI", version)]
struct Cli {
    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the agent against the simulated robot
    Run {
        /// JSON config with optional `agent`, `trainer` and `sim` sections
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Weight snapshot to resume from and save to
        #[arg(long)]
        weights: Option<PathBuf>,

        /// Collision log file
        #[arg(long)]
        collision_log: Option<PathBuf>,

        /// Stop after this many learning steps
        #[arg(long)]
        max_steps: Option<usize>,

        /// Milliseconds between a roll command and the next state reading
        #[arg(long)]
        step_interval_ms: Option<u64>,

        /// Simulated battery life in telemetry ticks
        #[arg(long)]
        battery_ticks: Option<u64>,

        /// Seed for weight initialisation and the simulated start position
        #[arg(long)]
        seed: Option<u64>,

        /// Ignore saved weights and start from random ones
        #[arg(long)]
        fresh: bool,
    },

    /// Show what a weight snapshot contains
    Inspect {
        /// Weight snapshot file
        #[arg(default_value = "rollnet-weights.bin.gz")]
        weights: PathBuf,

        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the logged collision positions
    Collisions {
        /// Collision log file
        #[arg(default_value = "collisions.txt")]
        path: PathBuf,
    },

    /// Print the default configuration as JSON
    Config,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            weights,
            collision_log,
            max_steps,
            step_interval_ms,
            battery_ticks,
            seed,
            fresh,
        } => {
            let mut settings = settings::Settings::load(config.as_deref())?;
            if let Some(path) = weights {
                settings.trainer.weights_path = path;
            }
            if let Some(path) = collision_log {
                settings.trainer.collision_log_path = path;
            }
            if max_steps.is_some() {
                settings.trainer.max_steps = max_steps;
            }
            if let Some(ms) = step_interval_ms {
                settings.trainer.step_interval_ms = ms;
            }
            if battery_ticks.is_some() {
                settings.sim.battery_ticks = battery_ticks;
            }
            if seed.is_some() {
                settings.sim.seed = seed;
            }
            commands::run(settings, seed, fresh).await?;
        }

        Commands::Inspect { weights, json } => {
            commands::inspect(&weights, json).await?;
        }

        Commands::Collisions { path } => {
            commands::collisions(&path).await?;
        }

        Commands::Config => {
            println!(
                "{}",
                serde_json::to_string_pretty(&settings::Settings::default())?
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "rollnetctl",
            "run",
            "--max-steps",
            "50",
            "--seed",
            "7",
            "--fresh",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                max_steps,
                seed,
                fresh,
                ..
            } => {
                assert_eq!(max_steps, Some(50));
                assert_eq!(seed, Some(7));
                assert!(fresh);
            }
            _ => panic!("expected run"),
        }
    }
}
