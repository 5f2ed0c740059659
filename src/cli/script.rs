//! Session scripts
//!
//! A script is an ordered list of steps replayed against the in-memory host:
//! host-side user actions (which also fire the matching notification), panel
//! gestures, and waits. The result is a `SessionReport` of what the panel and
//! the host ended up with.

use std::rc::Rc;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Receiver;

use crate::config::PanelConfig;
use crate::error::{PanelError, Result};
use crate::host::{DocumentId, Host, MemoryHost, WhiteBalance};
use crate::panel::{
    channel, HostNotification, Notice, PanelDriver, PanelEvent, PanelHandle, PanelState,
    WhiteBalanceSync,
};
use crate::state::{TransactionManager, TransactionRecord};

/// One scripted step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Open a document (layers topmost first) and make it active
    OpenDocument {
        title: String,
        #[serde(default = "default_layers")]
        layers: Vec<String>,
    },
    /// Close the active document
    CloseDocument,
    /// Delete the first layer with this name from the active document
    DeleteLayer { name: String },
    /// Flatten the active document
    Flatten,
    /// Values the host's auto white balance computes for the active document
    SetAutoResult { temperature: f64, tint: f64 },
    /// Deliver a panel event
    Panel { event: PanelEvent },
    /// Let time pass (e.g. for the auto-toggle debounce)
    Wait { ms: u64 },
}

fn default_layers() -> Vec<String> {
    vec!["Background".to_string()]
}

/// A replayable session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<ScriptStep>,
}

/// What a replayed session left behind
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Title of the document open at the end, if any
    pub document: Option<String>,
    pub state: PanelState,
    pub notices: Vec<Notice>,
    /// Layer stack of the active document, topmost first
    pub layers: Vec<String>,
    /// Undo history of the active document
    pub history: Vec<String>,
    pub journal: Vec<TransactionRecord>,
}

/// Replay `script` through a panel driver against a fresh in-memory host.
pub async fn replay(script: &Script, config: PanelConfig) -> Result<SessionReport> {
    let host = Rc::new(MemoryHost::new());
    let transactions = Rc::new(TransactionManager::new(host.clone()));
    let mut driver = PanelDriver::new(WhiteBalanceSync::new(transactions.clone(), config));
    let notice_rx = driver.notices();
    let (handle, rx) = channel();

    let (driven, fed, notices) = tokio::join!(
        driver.run(rx),
        feed(host.as_ref(), handle, &script.steps),
        collect_notices(notice_rx)
    );
    fed?;
    let sync = driven?;

    let document = host.active_document();
    Ok(SessionReport {
        document: document.and_then(|d| host.document_title(d)),
        state: sync.state().clone(),
        notices,
        layers: document.map(|d| host.layer_names(d)).unwrap_or_default(),
        history: document.map(|d| host.history(d)).unwrap_or_default(),
        journal: transactions.journal().records().to_vec(),
    })
}

async fn collect_notices(mut rx: Receiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Some(notice) = rx.recv().await {
        notices.push(notice);
    }
    notices
}

async fn feed(host: &MemoryHost, handle: PanelHandle, steps: &[ScriptStep]) -> Result<()> {
    for (idx, step) in steps.iter().enumerate() {
        debug!("[SCRIPT] Step {}: {:?}", idx, step);
        if let Some(event) = apply_step(host, step).await? {
            handle.send_async(event).await;
        }
        handle.drained().await;
    }
    Ok(())
}

async fn apply_step(host: &MemoryHost, step: &ScriptStep) -> Result<Option<PanelEvent>> {
    let event = match step {
        ScriptStep::OpenDocument { title, layers } => {
            let names: Vec<&str> = layers.iter().map(String::as_str).collect();
            host.open_document(title, &names);
            Some(HostNotification::DocumentOpened.into())
        }
        ScriptStep::CloseDocument => {
            if let Some(document) = host.active_document() {
                host.close_document(document);
            }
            Some(HostNotification::DocumentClosed.into())
        }
        ScriptStep::DeleteLayer { name } => {
            host.delete_layer_named(active(host)?, name)?;
            Some(HostNotification::LayerDeleted.into())
        }
        ScriptStep::Flatten => {
            host.flatten(active(host)?)?;
            Some(
                HostNotification::HistoryChanged {
                    command: "Flatten Image".to_string(),
                }
                .into(),
            )
        }
        ScriptStep::SetAutoResult { temperature, tint } => {
            host.set_auto_result(active(host)?, WhiteBalance::custom(*temperature, *tint))?;
            None
        }
        ScriptStep::Panel { event } => Some(event.clone()),
        ScriptStep::Wait { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            None
        }
    };
    Ok(event)
}

fn active(host: &MemoryHost) -> Result<DocumentId> {
    host.active_document().ok_or(PanelError::NoActiveDocument)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::Mode;
    use serde_json::json;

    #[test]
    fn test_script_from_json() {
        let script: Script = serde_json::from_value(json!({
            "steps": [
                { "action": "open_document", "title": "portrait" },
                { "action": "panel", "event": { "event": "temperature_released", "value": 15.0 } },
                { "action": "wait", "ms": 350 },
                { "action": "delete_layer", "name": "White Balance" }
            ]
        }))
        .unwrap();

        assert_eq!(script.steps.len(), 4);
        assert_eq!(
            script.steps[0],
            ScriptStep::OpenDocument {
                title: "portrait".to_string(),
                layers: vec!["Background".to_string()]
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_auto_session() {
        let script = Script {
            steps: vec![
                ScriptStep::OpenDocument {
                    title: "portrait".to_string(),
                    layers: default_layers(),
                },
                ScriptStep::Panel {
                    event: PanelEvent::AutoToggled { checked: true },
                },
                ScriptStep::Wait { ms: 400 },
            ],
        };

        let report = replay(&script, PanelConfig::default()).await.unwrap();

        assert_eq!(report.document.as_deref(), Some("portrait"));
        assert_eq!(report.state.mode, Mode::Auto);
        assert_eq!(report.layers[0], "White Balance");
        assert_eq!(report.history, vec!["Open", "Auto White Balance"]);
        assert_eq!(report.journal.len(), 1);
    }

    #[tokio::test]
    async fn test_replay_collects_notices() {
        let script = Script {
            steps: vec![
                ScriptStep::Panel {
                    event: PanelEvent::ResetClicked,
                },
                ScriptStep::OpenDocument {
                    title: "portrait".to_string(),
                    layers: default_layers(),
                },
                ScriptStep::Panel {
                    event: PanelEvent::ResetClicked,
                },
            ],
        };

        let report = replay(&script, PanelConfig::default()).await.unwrap();

        let messages: Vec<_> = report.notices.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Please open a document first.", "No 'White Balance' layer found."]
        );
        assert!(report.journal.is_empty());
    }

    #[tokio::test]
    async fn test_replay_rejects_action_without_document() {
        let script = Script {
            steps: vec![ScriptStep::Flatten],
        };

        let err = replay(&script, PanelConfig::default()).await.unwrap_err();
        assert_eq!(err, PanelError::NoActiveDocument);
    }
}
