//! Error handling for the panel core
//!
//! Precondition failures map to short user notices, host failures inside a
//! transaction are swallowed and recorded, and suspension failures are fatal.

use thiserror::Error;

use crate::host::{DocumentId, HostError};

/// Result type alias for panel operations
pub type Result<T> = std::result::Result<T, PanelError>;

/// Main error type for panel operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PanelError {
    // Precondition Errors
    #[error("No active document")]
    NoActiveDocument,

    #[error("Marker layer '{name}' not found")]
    MarkerNotFound { name: String },

    // Host Errors
    #[error("Host command failed: {0}")]
    Host(#[from] HostError),

    #[error("Failed to open history suspension '{name}' on {document}: {source}")]
    SuspensionOpen {
        name: String,
        document: DocumentId,
        #[source]
        source: HostError,
    },

    #[error("Failed to close history suspension '{name}': {source}")]
    SuspensionClose {
        name: String,
        #[source]
        source: HostError,
    },

    #[error("Unexpected host reply: {reason}")]
    UnexpectedReply { reason: String },

    // Pipeline Errors
    #[error("Step {step} selects layer '{name}' before any step named it")]
    UnassignedLayerName { step: usize, name: String },

    #[error("Step {step} names a layer but the document has no target layer")]
    NoTargetLayer { step: usize },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl PanelError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            PanelError::NoActiveDocument => "NO_ACTIVE_DOCUMENT",
            PanelError::MarkerNotFound { .. } => "MARKER_NOT_FOUND",
            PanelError::Host(_) => "HOST_ERROR",
            PanelError::SuspensionOpen { .. } => "SUSPENSION_OPEN",
            PanelError::SuspensionClose { .. } => "SUSPENSION_CLOSE",
            PanelError::UnexpectedReply { .. } => "UNEXPECTED_REPLY",
            PanelError::UnassignedLayerName { .. } => "UNASSIGNED_LAYER_NAME",
            PanelError::NoTargetLayer { .. } => "NO_TARGET_LAYER",
            PanelError::InvalidConfig { .. } => "INVALID_CONFIG",
        }
    }

    /// Check if the panel can carry on after this error.
    ///
    /// Suspension failures leave the host history in an unknown state and
    /// are the only unrecoverable class.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PanelError::SuspensionOpen { .. } | PanelError::SuspensionClose { .. }
        )
    }

    /// Get the one-line notice shown to the user, if this error has one.
    pub fn notice_text(&self) -> Option<String> {
        match self {
            PanelError::NoActiveDocument => Some("Please open a document first.".to_string()),
            PanelError::MarkerNotFound { name } => Some(format!("No '{}' layer found.", name)),
            _ => None,
        }
    }
}
