//! clipdeck CLI
//!
//! Command-line interface for loading and playing sound clips.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

use clipdeck::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG still wins over the -v default
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("clipdeck v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("clipdeck v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Play {
            files,
            reverb,
            device,
        } => commands::play(&files, reverb, &device).context("Failed to play clips"),
        Commands::Track { entries, device } => {
            commands::track(&entries, &device).context("Failed to play track")
        }
        Commands::Info { files } => commands::info(&files).context("Failed to read clip info"),
        Commands::Presets => {
            commands::presets();
            Ok(())
        }
    }
}
