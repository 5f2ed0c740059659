//! Panel inputs and outputs
//!
//! Host notifications and UI gestures come in as `PanelEvent`s; the only
//! user-visible output besides `PanelState` is a one-line `Notice`.

use serde::{Deserialize, Serialize};

/// Push notifications from the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "notification", rename_all = "snake_case")]
pub enum HostNotification {
    DocumentOpened,
    DocumentClosed,
    SelectionChanged,
    LayerDeleted,
    /// A history entry was added; `command` is its name (e.g. "Flatten Image")
    HistoryChanged { command: String },
    PanelVisibility { visible: bool },
}

impl HostNotification {
    /// Notifications that only ask the panel to re-read the marker.
    ///
    /// Deletions and history changes (flatten included) settle through the
    /// same re-read, so consecutive refreshes can be collapsed to the latest
    /// one. Hiding the panel is not a refresh.
    pub fn is_refresh(&self) -> bool {
        !matches!(self, HostNotification::PanelVisibility { visible: false })
    }
}

/// Everything the panel reacts to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PanelEvent {
    Host(HostNotification),
    /// Temperature slider released at a value
    TemperatureReleased { value: f64 },
    /// Tint slider released at a value
    TintReleased { value: f64 },
    AutoToggled { checked: bool },
    ResetClicked,
}

impl PanelEvent {
    pub fn is_refresh(&self) -> bool {
        matches!(self, PanelEvent::Host(n) if n.is_refresh())
    }
}

impl From<HostNotification> for PanelEvent {
    fn from(notification: HostNotification) -> Self {
        PanelEvent::Host(notification)
    }
}

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// A single-line alert for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Collapse runs of consecutive refresh events to their latest member.
pub fn coalesce_refreshes(events: Vec<PanelEvent>) -> Vec<PanelEvent> {
    let mut out: Vec<PanelEvent> = Vec::with_capacity(events.len());
    for event in events {
        match out.last_mut() {
            Some(last) if last.is_refresh() && event.is_refresh() => *last = event,
            _ => out.push(event),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_classification() {
        assert!(HostNotification::SelectionChanged.is_refresh());
        assert!(HostNotification::PanelVisibility { visible: true }.is_refresh());
        assert!(!HostNotification::PanelVisibility { visible: false }.is_refresh());
        assert!(HostNotification::LayerDeleted.is_refresh());
        assert!(HostNotification::HistoryChanged {
            command: "Flatten Image".to_string()
        }
        .is_refresh());
        assert!(!PanelEvent::ResetClicked.is_refresh());
    }

    #[test]
    fn test_coalesce_keeps_latest_refresh() {
        let events = vec![
            HostNotification::DocumentOpened.into(),
            HostNotification::SelectionChanged.into(),
            PanelEvent::TemperatureReleased { value: 15.0 },
            HostNotification::SelectionChanged.into(),
            HostNotification::PanelVisibility { visible: false }.into(),
            HostNotification::LayerDeleted.into(),
            HostNotification::DocumentClosed.into(),
        ];

        let out = coalesce_refreshes(events);
        assert_eq!(
            out,
            vec![
                HostNotification::SelectionChanged.into(),
                PanelEvent::TemperatureReleased { value: 15.0 },
                HostNotification::SelectionChanged.into(),
                HostNotification::PanelVisibility { visible: false }.into(),
                HostNotification::DocumentClosed.into(),
            ]
        );
    }

    #[test]
    fn test_event_json_shape() {
        let event: PanelEvent =
            serde_json::from_str(r#"{ "event": "tint_released", "value": -10.0 }"#).unwrap();
        assert_eq!(event, PanelEvent::TintReleased { value: -10.0 });

        let event: PanelEvent = serde_json::from_str(
            r#"{ "event": "host", "notification": "history_changed", "command": "Flatten Image" }"#,
        )
        .unwrap();
        assert_eq!(
            event,
            PanelEvent::Host(HostNotification::HistoryChanged {
                command: "Flatten Image".to_string()
            })
        );
    }
}
