//! Panel UI state
//!
//! The slice of panel state mirrored from the marker layer: two sliders, the
//! mode label and the auto toggle. Owned by the synchronizer; the UI only
//! renders it.

use std::fmt;

use serde::Serialize;

use crate::config::Labels;
use crate::host::WhiteBalance;

/// Manual or automatic white balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Manual,
    Auto,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Manual => write!(f, "Manual"),
            Mode::Auto => write!(f, "Auto"),
        }
    }
}

/// Synchronizer state derived from marker presence and mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerState {
    NoMarker,
    ManualWithMarker,
    AutoWithMarker,
}

impl fmt::Display for MarkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerState::NoMarker => write!(f, "NoMarker"),
            MarkerState::ManualWithMarker => write!(f, "ManualWithMarker"),
            MarkerState::AutoWithMarker => write!(f, "AutoWithMarker"),
        }
    }
}

/// What the panel shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelState {
    pub temperature: f64,
    pub tint: f64,
    pub mode: Mode,
    /// Text of the mode label
    pub label: String,
    /// Checked state of the auto toggle as the user last saw it
    pub auto_checked: bool,
    /// Whether the current marker values came from auto white balance
    pub was_auto: bool,
    pub sliders_enabled: bool,
    /// Whether the marker existed when the panel last settled
    pub marker_present: bool,
}

impl PanelState {
    pub fn new(labels: &Labels) -> Self {
        Self {
            temperature: 0.0,
            tint: 0.0,
            mode: Mode::Manual,
            label: labels.manual.clone(),
            auto_checked: false,
            was_auto: false,
            sliders_enabled: true,
            marker_present: false,
        }
    }

    /// Back to the no-marker state: zero sliders, manual, toggle off
    pub fn reset(&mut self, labels: &Labels) {
        *self = Self::new(labels);
    }

    /// Manual mode; slider values untouched
    pub fn set_manual(&mut self, labels: &Labels) {
        self.mode = Mode::Manual;
        self.label = labels.manual.clone();
        self.auto_checked = false;
        self.was_auto = false;
        self.sliders_enabled = true;
    }

    /// Auto mode; sliders are disabled and show the host's values
    pub fn set_auto(&mut self, labels: &Labels) {
        self.mode = Mode::Auto;
        self.label = labels.auto.clone();
        self.auto_checked = true;
        self.was_auto = true;
        self.sliders_enabled = false;
    }

    /// Mirror a marker's persisted values
    pub fn show(&mut self, wb: WhiteBalance) {
        self.temperature = wb.temperature;
        self.tint = wb.tint;
        self.marker_present = true;
    }

    pub fn marker_state(&self) -> MarkerState {
        match (self.marker_present, self.mode) {
            (false, _) => MarkerState::NoMarker,
            (true, Mode::Manual) => MarkerState::ManualWithMarker,
            (true, Mode::Auto) => MarkerState::AutoWithMarker,
        }
    }

    /// Toggle, was-auto flag, label and slider enablement agree with the mode.
    pub fn is_consistent(&self, labels: &Labels) -> bool {
        let auto = self.mode == Mode::Auto;
        let label = if auto { &labels.auto } else { &labels.manual };
        self.auto_checked == auto
            && self.was_auto == auto
            && self.sliders_enabled != auto
            && &self.label == label
            && (self.marker_present || (self.temperature == 0.0 && self.tint == 0.0 && !auto))
    }
}
