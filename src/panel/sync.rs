//! Marker-Layer Synchronizer
//!
//! Keeps the panel's sliders, mode label and auto toggle consistent with the
//! marker layer in the active document. Every gesture that changes the host
//! runs as exactly one transaction; notifications only read.
//!
//! States are derived from marker presence and mode:
//!
//! ```text
//!   NoMarker ──slider release / auto on──▶ ManualWithMarker / AutoWithMarker
//!   AutoWithMarker ──auto off──▶ ManualWithMarker (marker zeroed)
//!   *WithMarker ──marker deleted / flattened away──▶ NoMarker
//! ```

use std::fmt;
use std::mem;
use std::rc::Rc;

use log::{debug, warn};

use crate::config::PanelConfig;
use crate::error::{PanelError, Result};
use crate::host::{DocumentId, Host, WhiteBalance};
use crate::layers::marker::{
    apply_auto, create_marker, find_marker, read_white_balance, write_white_balance,
};
use crate::panel::event::{HostNotification, Notice, NoticeLevel, PanelEvent};
use crate::panel::state::{Mode, PanelState};
use crate::state::{TransactionManager, TransactionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Temperature,
    Tint,
}

impl Axis {
    /// Replace this axis, keep the other one
    fn apply(self, current: WhiteBalance, value: f64) -> WhiteBalance {
        match self {
            Axis::Temperature => WhiteBalance::custom(value, current.tint),
            Axis::Tint => WhiteBalance::custom(current.temperature, value),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Temperature => write!(f, "temperature"),
            Axis::Tint => write!(f, "tint"),
        }
    }
}

/// The panel's state machine
pub struct WhiteBalanceSync<H: Host> {
    transactions: Rc<TransactionManager<H>>,
    config: PanelConfig,
    state: PanelState,
    notices: Vec<Notice>,
}

impl<H: Host> WhiteBalanceSync<H> {
    pub fn new(transactions: Rc<TransactionManager<H>>, config: PanelConfig) -> Self {
        let state = PanelState::new(&config.labels);
        Self {
            transactions,
            config,
            state,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn transactions(&self) -> &Rc<TransactionManager<H>> {
        &self.transactions
    }

    /// Notices raised so far and not yet taken
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        mem::take(&mut self.notices)
    }

    /// Whether toggle, label and flags agree with the mode
    pub fn is_settled(&self) -> bool {
        self.state.is_consistent(&self.config.labels)
    }

    /// Reflect a toggle click in the UI before its debounced handling runs
    pub fn preview_auto_toggle(&mut self, checked: bool) {
        self.state.auto_checked = checked;
    }

    /// Handle one event to completion.
    ///
    /// Only the fatal transaction class (suspension open/close refused) is
    /// returned as `Err`; everything else settles the panel state.
    pub async fn handle(&mut self, event: PanelEvent) -> Result<()> {
        let before = self.state.marker_state();
        match event {
            PanelEvent::Host(notification) => self.on_notification(&notification).await,
            PanelEvent::TemperatureReleased { value } => {
                self.edit_axis(Axis::Temperature, value).await?
            }
            PanelEvent::TintReleased { value } => self.edit_axis(Axis::Tint, value).await?,
            PanelEvent::AutoToggled { checked } => self.on_auto_toggle(checked).await?,
            PanelEvent::ResetClicked => self.on_reset().await?,
        }
        let after = self.state.marker_state();
        if before != after {
            debug!("[SYNC] {} -> {}", before, after);
        }
        Ok(())
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    pub async fn on_notification(&mut self, notification: &HostNotification) {
        match notification {
            HostNotification::PanelVisibility { visible: false } => {
                debug!("[SYNC] Panel hidden, nothing to refresh");
            }
            HostNotification::LayerDeleted => self.refresh("layer deleted").await,
            HostNotification::HistoryChanged { command } => {
                if self.config.is_flatten_command(command) {
                    self.refresh("flatten").await
                } else {
                    self.refresh("history change").await
                }
            }
            _ => self.refresh("notification").await,
        }
    }

    /// Re-read the marker: absent resets the panel, present mirrors its values
    async fn refresh(&mut self, cause: &str) {
        let Some(document) = self.require_document(NoticeLevel::Info) else {
            return;
        };
        let host = self.transactions.host().clone();
        match find_marker(host.as_ref(), document, &self.config.marker_layer_name) {
            None => {
                if self.state.marker_present {
                    debug!("[SYNC] Marker gone after {}", cause);
                }
                self.state.reset(&self.config.labels);
            }
            Some(layer) => match read_white_balance(host.as_ref(), layer).await {
                Ok(wb) => self.state.show(wb),
                // Leave the sliders stale until the next notification
                Err(err) => warn!("[SYNC] Could not read marker after {}: {}", cause, err),
            },
        }
    }

    // ========================================================================
    // Gestures
    // ========================================================================

    pub async fn on_temperature_release(&mut self, value: f64) -> Result<()> {
        self.edit_axis(Axis::Temperature, value).await
    }

    pub async fn on_tint_release(&mut self, value: f64) -> Result<()> {
        self.edit_axis(Axis::Tint, value).await
    }

    async fn edit_axis(&mut self, axis: Axis, value: f64) -> Result<()> {
        if self.require_document(NoticeLevel::Warning).is_none() {
            return Ok(());
        }
        let value = self.config.clamp(value);
        let name = match axis {
            Axis::Temperature => self.config.transaction_names.temperature.clone(),
            Axis::Tint => self.config.transaction_names.tint.clone(),
        };
        let label = format!("Setting {} to {}", axis, value);
        let marker_name = self.config.marker_layer_name.clone();
        let host = self.transactions.host().clone();

        let result = self
            .transactions
            .run(&name, &label, |ctx| async move {
                let host = host.as_ref();
                let (layer, current) = match find_marker(host, ctx.document, &marker_name) {
                    Some(layer) => (layer, read_white_balance(host, layer).await?),
                    None => (
                        create_marker(host, ctx.document, &marker_name).await?,
                        WhiteBalance::neutral(),
                    ),
                };
                let wb = axis.apply(current, value);
                write_white_balance(host, layer, wb).await?;
                Ok(wb)
            })
            .await;

        if let Some(wb) = self.settle(result)? {
            self.state.show(wb);
            self.state.set_manual(&self.config.labels);
        }
        Ok(())
    }

    pub async fn on_auto_toggle(&mut self, checked: bool) -> Result<()> {
        if checked {
            self.enable_auto().await
        } else {
            self.disable_auto().await
        }
    }

    async fn enable_auto(&mut self) -> Result<()> {
        if self.require_document(NoticeLevel::Warning).is_none() {
            return Ok(());
        }
        let name = self.config.transaction_names.auto.clone();
        let marker_name = self.config.marker_layer_name.clone();
        let host = self.transactions.host().clone();

        let result = self
            .transactions
            .run(&name, "Applying auto white balance...", |ctx| async move {
                let host = host.as_ref();
                let layer = match find_marker(host, ctx.document, &marker_name) {
                    Some(layer) => layer,
                    None => create_marker(host, ctx.document, &marker_name).await?,
                };
                apply_auto(host, layer).await?;
                read_white_balance(host, layer).await
            })
            .await;

        match self.settle(result)? {
            Some(wb) => {
                self.state.show(wb);
                self.state.set_auto(&self.config.labels);
            }
            None => self.revert_toggle(),
        }
        Ok(())
    }

    async fn disable_auto(&mut self) -> Result<()> {
        let Some(document) = self.require_document(NoticeLevel::Warning) else {
            return Ok(());
        };
        if !self.state.was_auto {
            self.state.set_manual(&self.config.labels);
            return Ok(());
        }
        let host = self.transactions.host().clone();
        if find_marker(host.as_ref(), document, &self.config.marker_layer_name).is_none() {
            self.state.reset(&self.config.labels);
            return Ok(());
        }

        let name = self.config.transaction_names.auto_off.clone();
        let marker_name = self.config.marker_layer_name.clone();
        let result = self
            .transactions
            .run(&name, "Restoring manual white balance...", |ctx| async move {
                zero_marker(host.as_ref(), ctx.document, &marker_name).await
            })
            .await;

        match self.settle(result)? {
            Some(()) => {
                self.state.show(WhiteBalance::neutral());
                self.state.set_manual(&self.config.labels);
            }
            None => self.revert_toggle(),
        }
        Ok(())
    }

    /// Zero the marker in one transaction. Never creates a marker.
    pub async fn on_reset(&mut self) -> Result<()> {
        let Some(document) = self.require_document(NoticeLevel::Warning) else {
            return Ok(());
        };
        let marker_name = self.config.marker_layer_name.clone();
        let host = self.transactions.host().clone();
        if find_marker(host.as_ref(), document, &marker_name).is_none() {
            self.notify(
                NoticeLevel::Warning,
                &PanelError::MarkerNotFound { name: marker_name },
            );
            return Ok(());
        }

        let name = self.config.transaction_names.reset.clone();
        let result = self
            .transactions
            .run(&name, "Resetting white balance...", |ctx| async move {
                zero_marker(host.as_ref(), ctx.document, &marker_name).await
            })
            .await;

        if let Some(()) = self.settle(result)? {
            self.state.show(WhiteBalance::neutral());
            self.state.set_manual(&self.config.labels);
        }
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// The active document, or a notice plus a safe reset with no host calls
    fn require_document(&mut self, level: NoticeLevel) -> Option<DocumentId> {
        let document = self.transactions.host().active_document();
        if document.is_none() {
            self.state.reset(&self.config.labels);
            self.notify(level, &PanelError::NoActiveDocument);
        }
        document
    }

    fn notify(&mut self, level: NoticeLevel, err: &PanelError) {
        if let Some(message) = err.notice_text() {
            debug!("[SYNC] Notice: {}", message);
            self.notices.push(Notice { level, message });
        }
    }

    /// Unwrap a transaction result into the committed value.
    ///
    /// A failed transaction leaves the panel as it was; a document that
    /// vanished before the suspension opened is treated like the guard.
    fn settle<T>(&mut self, result: Result<TransactionOutcome<T>>) -> Result<Option<T>> {
        match result {
            Ok(TransactionOutcome::Committed(value)) => Ok(Some(value)),
            Ok(TransactionOutcome::Failed(_)) => Ok(None),
            Err(PanelError::NoActiveDocument) => {
                self.state.reset(&self.config.labels);
                self.notify(NoticeLevel::Warning, &PanelError::NoActiveDocument);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Put the toggle back in line with the mode after a failed switch
    fn revert_toggle(&mut self) {
        self.state.auto_checked = self.state.mode == Mode::Auto;
    }
}

async fn zero_marker<H: Host + ?Sized>(
    host: &H,
    document: DocumentId,
    marker_name: &str,
) -> Result<()> {
    let layer = find_marker(host, document, marker_name).ok_or_else(|| {
        PanelError::MarkerNotFound {
            name: marker_name.to_string(),
        }
    })?;
    write_white_balance(host, layer, WhiteBalance::neutral()).await
}
