//! Retouch Panel - white balance panel core for a host image editor
//!
//! The panel drives an external editor ("host") through a command channel and
//! keeps its UI in step with a distinguished marker layer in the document.
//!
//! # Architecture
//!
//! - `host`: the command channel (descriptor batches, history suspensions)
//! - `state`: transactions that collapse host work into one undo step
//! - `layers`: name-addressed layers, marker commands and effect pipelines
//! - `panel`: the marker-layer state machine and its serialized driver
//! - `config`, `error`, `cli`: ambient plumbing

pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod layers;
pub mod panel;
pub mod state;

pub use config::PanelConfig;
pub use error::{PanelError, Result};
