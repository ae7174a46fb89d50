//! Tether command-line driver
//!
//! `tether build` runs one build; `tether watch` keeps a bundler alive and
//! rebuilds whenever the input tree changes.

mod commands;
mod logging;

use clap::{Parser, Subcommand};
use commands::BuildArgs;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Bundle packages into a single script with an embedded module loader", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the artifact once
    Build {
        #[command(flatten)]
        args: BuildArgs,
    },

    /// Build, then rebuild on every change below the input directory
    Watch {
        #[command(flatten)]
        args: BuildArgs,
        /// Quiet period before a rebuild, in milliseconds
        #[arg(long, default_value_t = 100)]
        debounce_ms: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Build { args } => commands::build::execute(&args),
        Commands::Watch { args, debounce_ms } => {
            commands::watch::execute(&args, Duration::from_millis(debounce_ms))
        }
    }
}
