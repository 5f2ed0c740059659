//! Host Command Channel
//!
//! The external image editor is reached only through this module:
//! - `Host` trait: ordered descriptor batches, history suspensions and the
//!   few read-only document queries the panel needs
//! - `descriptor`: builders for the commands the panel issues
//! - `memory`: deterministic in-memory host used by tests and the CLI

pub mod descriptor;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use descriptor::{Descriptor, WhiteBalance, WhiteBalanceMode};
pub use memory::MemoryHost;

/// Result type for raw host calls
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Errors reported by the host itself
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("command rejected: {0}")]
    Rejected(String),

    #[error("unknown document: {0}")]
    NoSuchDocument(DocumentId),

    #[error("unknown layer: {0}")]
    NoSuchLayer(LayerId),

    #[error("malformed descriptor: {0}")]
    Malformed(String),

    #[error("suspension {0} is not open")]
    UnknownSuspension(Uuid),
}

/// Host-assigned document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u32);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document #{}", self.0)
    }
}

/// Host-assigned layer identifier, stable for the layer's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer #{}", self.0)
    }
}

/// A layer as listed by the host: identity plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRef {
    pub id: LayerId,
    pub name: String,
}

/// Whether the host shows its own UI while executing a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogMode {
    #[default]
    Silent,
    Display,
}

/// Per-call options for `Host::submit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubmitOptions {
    pub dialog: DialogMode,
}

impl SubmitOptions {
    pub fn silent() -> Self {
        Self {
            dialog: DialogMode::Silent,
        }
    }

    pub fn display() -> Self {
        Self {
            dialog: DialogMode::Display,
        }
    }
}

/// An open history suspension.
///
/// Deliberately not `Clone`: `Host::end_suspension` consumes the token, so a
/// suspension can only be closed once.
#[derive(Debug, PartialEq, Eq)]
pub struct SuspensionToken {
    pub id: Uuid,
    pub document: DocumentId,
    pub name: String,
}

impl SuspensionToken {
    pub fn new(document: DocumentId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document,
            name: name.into(),
        }
    }
}

/// The external host application.
///
/// Futures are `!Send`: the panel runs on a single-threaded cooperative
/// runtime and document access is serialized by the host.
#[async_trait(?Send)]
pub trait Host {
    /// The active document, if any is open
    fn active_document(&self) -> Option<DocumentId>;

    /// Layers of `document`, topmost first
    fn layers(&self, document: DocumentId) -> Vec<LayerRef>;

    /// The layer currently targeted in `document`
    fn active_layer(&self, document: DocumentId) -> Option<LayerId>;

    /// Execute an ordered batch of descriptors, returning one reply per command
    async fn submit(
        &self,
        commands: &[Descriptor],
        options: SubmitOptions,
    ) -> HostResult<Vec<Descriptor>>;

    /// Start grouping all subsequent changes to `document` into one undo step
    async fn begin_suspension(&self, document: DocumentId, name: &str)
        -> HostResult<SuspensionToken>;

    /// Close a suspension, committing the grouped undo step
    async fn end_suspension(&self, token: SuspensionToken) -> HostResult<()>;
}
