//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;

use crate::cli::script::{self, Script};
use crate::config::PanelConfig;
use crate::host::MemoryHost;
use crate::layers::{Pipeline, PipelineExecutor, PipelineReport};
use crate::state::{TransactionManager, TransactionOutcome};

/// Load the configuration file if one was given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<PanelConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration: {}", path.display());
            PanelConfig::load(path)
                .with_context(|| format!("invalid configuration in {}", path.display()))
        }
        None => Ok(PanelConfig::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
}

/// Replay a session script and print the resulting report.
pub async fn replay(script_path: &Path, config: PanelConfig) -> Result<()> {
    info!("Replaying session: {}", script_path.display());

    let script: Script = read_json(script_path)?;
    let report = script::replay(&script, config)
        .await
        .with_context(|| format!("session {} aborted", script_path.display()))?;

    for notice in &report.notices {
        warn!("Notice: {}", notice.message);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

#[derive(Debug, Serialize)]
struct PipelineRun {
    committed: bool,
    error: Option<String>,
    report: Option<PipelineReport>,
    layers: Vec<String>,
    history: Vec<String>,
}

/// Run a pipeline file against a fresh document.
pub async fn run_pipeline(steps_path: &Path, layers: &[String], config: PanelConfig) -> Result<()> {
    info!("Running pipeline: {}", steps_path.display());

    let pipeline: Pipeline = read_json(steps_path)?;
    let host = Rc::new(MemoryHost::new());
    let names: Vec<&str> = layers.iter().map(String::as_str).collect();
    let document = host.open_document("Untitled", &names);
    let executor = PipelineExecutor::new(Rc::new(TransactionManager::new(host.clone())));

    let outcome = executor
        .execute(&pipeline, &config.transaction_names.pipeline)
        .await
        .with_context(|| format!("pipeline {} rejected", steps_path.display()))?;

    let run = match outcome {
        TransactionOutcome::Committed(report) => PipelineRun {
            committed: true,
            error: None,
            report: Some(report),
            layers: host.layer_names(document),
            history: host.history(document),
        },
        TransactionOutcome::Failed(err) => PipelineRun {
            committed: false,
            error: Some(err.to_string()),
            report: None,
            layers: host.layer_names(document),
            history: host.history(document),
        },
    };
    println!("{}", serde_json::to_string_pretty(&run)?);

    Ok(())
}

/// Print the effective configuration.
pub fn print_config(config: &PanelConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
