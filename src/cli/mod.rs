//! CLI Module
//!
//! Command-line interface for driving the panel core against the in-memory
//! host.

pub mod commands;
pub mod script;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Retouch Panel - white balance panel core and effect pipelines
#[derive(Parser, Debug)]
#[command(name = "retouch-panel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Panel configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a scripted panel session
    #[command(name = "replay")]
    Replay {
        /// Session script (JSON)
        script: PathBuf,
    },

    /// Run an effect pipeline on a fresh document
    #[command(name = "pipeline")]
    Pipeline {
        /// Pipeline steps (JSON)
        steps: PathBuf,

        /// Layers of the starting document, topmost first
        #[arg(short, long, value_delimiter = ',', default_value = "Background")]
        layers: Vec<String>,
    },

    /// Print the effective configuration
    #[command(name = "print-config")]
    PrintConfig,
}
