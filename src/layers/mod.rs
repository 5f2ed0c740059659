//! Layer Addressing
//!
//! Everything that touches host layers by name:
//! - `index`: the single name → layer lookup rule (topmost match wins)
//! - `marker`: command sequences for the marker layer
//! - `pipeline`: multi-step effects with per-run name tables

pub mod index;
pub mod marker;
pub mod pipeline;

pub use index::{find_by_name, LayerIndex};
pub use pipeline::{Pipeline, PipelineExecutor, PipelineReport, PipelineStep};
