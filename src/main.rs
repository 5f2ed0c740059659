//! Retouch Panel CLI
//!
//! Command-line interface for replaying panel sessions and running effect
//! pipelines against the in-memory host.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;

use retouch_panel::cli::{commands, Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    info!("Retouch Panel v{}", env!("CARGO_PKG_VERSION"));

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Replay { script }) => commands::replay(&script, config).await,
        Some(Commands::Pipeline { steps, layers }) => {
            commands::run_pipeline(&steps, &layers, config).await
        }
        Some(Commands::PrintConfig) => commands::print_config(&config),
        None => {
            println!("Retouch Panel v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}
