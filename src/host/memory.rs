//! In-memory host
//!
//! A deterministic stand-in for the external editor. It interprets the
//! descriptors in `descriptor`, keeps a per-document undo log that honours
//! history suspensions, records every call for inspection, and can inject
//! failures. Methods without the `Host` trait model what a user does directly
//! in the host UI (opening documents, deleting layers, flattening).

use std::cell::RefCell;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::descriptor::{self, verb, Descriptor, WhiteBalance, WhiteBalanceMode};
use super::{
    DocumentId, Host, HostError, HostResult, LayerId, LayerRef, SubmitOptions, SuspensionToken,
};

/// Name given to the layer a flatten leaves behind
const BACKGROUND_LAYER: &str = "Background";

/// One recorded call into the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum HostCall {
    Submit {
        verbs: Vec<String>,
        options: SubmitOptions,
    },
    BeginSuspension {
        document: DocumentId,
        name: String,
    },
    EndSuspension {
        name: String,
    },
}

#[derive(Debug, Clone, Serialize)]
struct MemoryLayer {
    id: LayerId,
    name: String,
    white_balance: Option<WhiteBalance>,
    effects: Vec<Descriptor>,
}

#[derive(Debug, Clone)]
struct MemoryDocument {
    id: DocumentId,
    title: String,
    /// Topmost first
    layers: Vec<MemoryLayer>,
    active_layer: Option<LayerId>,
    history: Vec<String>,
    auto_result: WhiteBalance,
}

impl MemoryDocument {
    fn position(&self, layer: LayerId) -> HostResult<usize> {
        self.layers
            .iter()
            .position(|l| l.id == layer)
            .ok_or(HostError::NoSuchLayer(layer))
    }

    fn layer_mut(&mut self, layer: LayerId) -> HostResult<&mut MemoryLayer> {
        let idx = self.position(layer)?;
        Ok(&mut self.layers[idx])
    }
}

#[derive(Debug)]
struct OpenSuspension {
    id: Uuid,
    document: DocumentId,
    name: String,
}

#[derive(Debug, Default)]
struct Inner {
    documents: Vec<MemoryDocument>,
    active_document: Option<DocumentId>,
    next_id: u32,
    suspensions: Vec<OpenSuspension>,
    calls: Vec<HostCall>,
    fail_next_submit: Option<String>,
    fail_begin: Option<String>,
    fail_end: Option<String>,
}

impl Inner {
    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn document_mut(&mut self, id: DocumentId) -> HostResult<&mut MemoryDocument> {
        self.documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(HostError::NoSuchDocument(id))
    }

    fn document(&self, id: DocumentId) -> Option<&MemoryDocument> {
        self.documents.iter().find(|d| d.id == id)
    }

    fn is_suspended(&self, document: DocumentId) -> bool {
        self.suspensions.iter().any(|s| s.document == document)
    }

    /// Record an undo entry unless a suspension is collecting changes
    fn record_history(&mut self, document: DocumentId, entry: &str) -> HostResult<()> {
        if self.is_suspended(document) {
            return Ok(());
        }
        self.document_mut(document)?.history.push(entry.to_string());
        Ok(())
    }

    fn apply(&mut self, command: &Descriptor) -> HostResult<(Descriptor, bool)> {
        let doc_id = self
            .active_document
            .ok_or_else(|| HostError::Rejected("no document is open".to_string()))?;
        let op = descriptor::verb_of(command)
            .ok_or_else(|| HostError::Malformed("missing _obj".to_string()))?
            .to_string();
        let new_id = LayerId(self.allocate_id());
        let doc = self.document_mut(doc_id)?;

        let target = || {
            descriptor::target_layer(command)
                .ok_or_else(|| HostError::Malformed(format!("{} needs a layer target", op)))
        };

        match op.as_str() {
            verb::STAMP_VISIBLE => {
                let insert_at = match doc.active_layer {
                    Some(active) => doc.position(active)?,
                    None => 0,
                };
                let name = format!("Layer {}", doc.layers.len());
                doc.layers.insert(
                    insert_at,
                    MemoryLayer {
                        id: new_id,
                        name,
                        white_balance: None,
                        effects: Vec::new(),
                    },
                );
                doc.active_layer = Some(new_id);
                Ok((json!({ "layerID": new_id.0 }), true))
            }
            verb::MOVE => {
                let idx = doc.position(target()?)?;
                let layer = doc.layers.remove(idx);
                doc.layers.insert(0, layer);
                Ok((json!({}), true))
            }
            verb::SET => {
                let name = command
                    .pointer("/to/name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| HostError::Malformed("set needs to.name".to_string()))?
                    .to_string();
                doc.layer_mut(target()?)?.name = name;
                Ok((json!({}), true))
            }
            verb::SELECT => {
                let layer = target()?;
                doc.position(layer)?;
                doc.active_layer = Some(layer);
                Ok((json!({}), false))
            }
            verb::WHITE_BALANCE => {
                let auto = doc.auto_result;
                let layer = doc.layer_mut(target()?)?;
                let mode: WhiteBalanceMode = command
                    .get("mode")
                    .cloned()
                    .and_then(|m| serde_json::from_value(m).ok())
                    .unwrap_or_default();
                // The whole record is replaced: omitted axes fall back to zero.
                layer.white_balance = Some(match mode {
                    WhiteBalanceMode::Auto => WhiteBalance {
                        mode: WhiteBalanceMode::Auto,
                        ..auto
                    },
                    WhiteBalanceMode::Custom => WhiteBalance::custom(
                        command.get("temperature").and_then(|v| v.as_f64()).unwrap_or(0.0),
                        command.get("tint").and_then(|v| v.as_f64()).unwrap_or(0.0),
                    ),
                });
                Ok((json!({}), true))
            }
            verb::GET => {
                let layer = &doc.layers[doc.position(target()?)?];
                let mut reply = json!({
                    "_obj": "layer",
                    "layerID": layer.id.0,
                    "name": layer.name,
                });
                if let Some(wb) = layer.white_balance {
                    reply["filterFX"] = json!({
                        "_obj": verb::WHITE_BALANCE,
                        "mode": wb.mode,
                        "temperature": wb.temperature,
                        "tint": wb.tint,
                    });
                }
                Ok((reply, false))
            }
            verb::DELETE => {
                let idx = doc.position(target()?)?;
                let removed = doc.layers.remove(idx);
                if doc.active_layer == Some(removed.id) {
                    doc.active_layer = doc.layers.first().map(|l| l.id);
                }
                Ok((json!({}), true))
            }
            verb::FLATTEN | verb::MERGE_VISIBLE => {
                doc.layers = vec![MemoryLayer {
                    id: new_id,
                    name: BACKGROUND_LAYER.to_string(),
                    white_balance: None,
                    effects: Vec::new(),
                }];
                doc.active_layer = Some(new_id);
                Ok((json!({ "layerID": new_id.0 }), true))
            }
            _ => {
                // Opaque effect: attach to the targeted (or active) layer.
                let layer = descriptor::target_layer(command)
                    .or(doc.active_layer)
                    .ok_or_else(|| HostError::Rejected(format!("{} needs a layer", op)))?;
                doc.layer_mut(layer)?.effects.push(command.clone());
                Ok((json!({}), true))
            }
        }
    }
}

/// Deterministic in-memory implementation of [`Host`]
#[derive(Debug, Default)]
pub struct MemoryHost {
    inner: RefCell<Inner>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Host-side user actions
    // ========================================================================

    /// Open a document with the given layers (topmost first) and activate it
    pub fn open_document(&self, title: &str, layers: &[&str]) -> DocumentId {
        let mut inner = self.inner.borrow_mut();
        let id = DocumentId(inner.allocate_id());
        let mut doc_layers = Vec::with_capacity(layers.len());
        for name in layers {
            let layer_id = LayerId(inner.allocate_id());
            doc_layers.push(MemoryLayer {
                id: layer_id,
                name: name.to_string(),
                white_balance: None,
                effects: Vec::new(),
            });
        }
        let active_layer = doc_layers.first().map(|l| l.id);
        inner.documents.push(MemoryDocument {
            id,
            title: title.to_string(),
            layers: doc_layers,
            active_layer,
            history: vec!["Open".to_string()],
            auto_result: WhiteBalance::custom(12.0, -4.0),
        });
        inner.active_document = Some(id);
        id
    }

    /// Close a document; the most recently opened remaining one becomes active
    pub fn close_document(&self, document: DocumentId) {
        let mut inner = self.inner.borrow_mut();
        inner.documents.retain(|d| d.id != document);
        if inner.active_document == Some(document) {
            inner.active_document = inner.documents.last().map(|d| d.id);
        }
    }

    pub fn activate_document(&self, document: DocumentId) -> HostResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.document_mut(document)?;
        inner.active_document = Some(document);
        Ok(())
    }

    /// Add a plain layer on top of the stack
    pub fn add_layer(&self, document: DocumentId, name: &str) -> HostResult<LayerId> {
        let mut inner = self.inner.borrow_mut();
        let id = LayerId(inner.allocate_id());
        let doc = inner.document_mut(document)?;
        doc.layers.insert(
            0,
            MemoryLayer {
                id,
                name: name.to_string(),
                white_balance: None,
                effects: Vec::new(),
            },
        );
        doc.history.push("New Layer".to_string());
        Ok(id)
    }

    /// Add a layer that already carries a white balance record
    pub fn add_white_balance_layer(
        &self,
        document: DocumentId,
        name: &str,
        wb: WhiteBalance,
    ) -> HostResult<LayerId> {
        let id = self.add_layer(document, name)?;
        let mut inner = self.inner.borrow_mut();
        inner.document_mut(document)?.layer_mut(id)?.white_balance = Some(wb);
        Ok(id)
    }

    /// Delete the first layer called `name`, as a user would in the layers panel
    pub fn delete_layer_named(&self, document: DocumentId, name: &str) -> HostResult<()> {
        let mut inner = self.inner.borrow_mut();
        let doc = inner.document_mut(document)?;
        let idx = doc
            .layers
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| HostError::Rejected(format!("no layer named '{}'", name)))?;
        let removed = doc.layers.remove(idx);
        if doc.active_layer == Some(removed.id) {
            doc.active_layer = doc.layers.first().map(|l| l.id);
        }
        doc.history.push("Delete Layer".to_string());
        Ok(())
    }

    /// Flatten the document from the host's own menu
    pub fn flatten(&self, document: DocumentId) -> HostResult<()> {
        let mut inner = self.inner.borrow_mut();
        let id = LayerId(inner.allocate_id());
        let doc = inner.document_mut(document)?;
        doc.layers = vec![MemoryLayer {
            id,
            name: BACKGROUND_LAYER.to_string(),
            white_balance: None,
            effects: Vec::new(),
        }];
        doc.active_layer = Some(id);
        doc.history.push("Flatten Image".to_string());
        Ok(())
    }

    /// Set the values the host's auto white balance will compute
    pub fn set_auto_result(&self, document: DocumentId, wb: WhiteBalance) -> HostResult<()> {
        self.inner.borrow_mut().document_mut(document)?.auto_result = wb;
        Ok(())
    }

    // ========================================================================
    // Fault injection
    // ========================================================================

    /// Make the next `submit` fail with `reason`
    pub fn fail_next_submit(&self, reason: &str) {
        self.inner.borrow_mut().fail_next_submit = Some(reason.to_string());
    }

    /// Make the next `begin_suspension` fail with `reason`
    pub fn fail_next_begin(&self, reason: &str) {
        self.inner.borrow_mut().fail_begin = Some(reason.to_string());
    }

    /// Make the next `end_suspension` fail with `reason`
    pub fn fail_next_end(&self, reason: &str) {
        self.inner.borrow_mut().fail_end = Some(reason.to_string());
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn calls(&self) -> Vec<HostCall> {
        self.inner.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    pub fn submit_count(&self) -> usize {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|c| matches!(c, HostCall::Submit { .. }))
            .count()
    }

    /// Number of (begin, end) suspension calls recorded
    pub fn suspension_counts(&self) -> (usize, usize) {
        let inner = self.inner.borrow();
        let begins = inner
            .calls
            .iter()
            .filter(|c| matches!(c, HostCall::BeginSuspension { .. }))
            .count();
        let ends = inner
            .calls
            .iter()
            .filter(|c| matches!(c, HostCall::EndSuspension { .. }))
            .count();
        (begins, ends)
    }

    pub fn open_suspensions(&self) -> usize {
        self.inner.borrow().suspensions.len()
    }

    /// Undo log of a document, oldest first
    pub fn history(&self, document: DocumentId) -> Vec<String> {
        self.inner
            .borrow()
            .document(document)
            .map(|d| d.history.clone())
            .unwrap_or_default()
    }

    pub fn layer_names(&self, document: DocumentId) -> Vec<String> {
        self.inner
            .borrow()
            .document(document)
            .map(|d| d.layers.iter().map(|l| l.name.clone()).collect())
            .unwrap_or_default()
    }

    /// White balance of the first layer called `name`
    pub fn white_balance_of(&self, document: DocumentId, name: &str) -> Option<WhiteBalance> {
        self.inner
            .borrow()
            .document(document)?
            .layers
            .iter()
            .find(|l| l.name == name)?
            .white_balance
    }

    /// Opaque effects attached to the first layer called `name`
    pub fn effects_of(&self, document: DocumentId, name: &str) -> Vec<Descriptor> {
        self.inner
            .borrow()
            .document(document)
            .and_then(|d| d.layers.iter().find(|l| l.name == name))
            .map(|l| l.effects.clone())
            .unwrap_or_default()
    }

    pub fn document_title(&self, document: DocumentId) -> Option<String> {
        self.inner.borrow().document(document).map(|d| d.title.clone())
    }
}

#[async_trait(?Send)]
impl Host for MemoryHost {
    fn active_document(&self) -> Option<DocumentId> {
        self.inner.borrow().active_document
    }

    fn layers(&self, document: DocumentId) -> Vec<LayerRef> {
        self.inner
            .borrow()
            .document(document)
            .map(|d| {
                d.layers
                    .iter()
                    .map(|l| LayerRef {
                        id: l.id,
                        name: l.name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn active_layer(&self, document: DocumentId) -> Option<LayerId> {
        self.inner.borrow().document(document)?.active_layer
    }

    async fn submit(
        &self,
        commands: &[Descriptor],
        options: SubmitOptions,
    ) -> HostResult<Vec<Descriptor>> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(HostCall::Submit {
            verbs: commands
                .iter()
                .map(|c| descriptor::verb_of(c).unwrap_or("?").to_string())
                .collect(),
            options,
        });
        if let Some(reason) = inner.fail_next_submit.take() {
            return Err(HostError::Rejected(reason));
        }

        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            let (reply, mutating) = inner.apply(command)?;
            if mutating {
                if let Some(doc) = inner.active_document {
                    let entry = descriptor::verb_of(command).unwrap_or("Command").to_string();
                    inner.record_history(doc, &entry)?;
                }
            }
            replies.push(reply);
        }
        Ok(replies)
    }

    async fn begin_suspension(
        &self,
        document: DocumentId,
        name: &str,
    ) -> HostResult<SuspensionToken> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(HostCall::BeginSuspension {
            document,
            name: name.to_string(),
        });
        if let Some(reason) = inner.fail_begin.take() {
            return Err(HostError::Rejected(reason));
        }
        inner.document_mut(document)?;

        let token = SuspensionToken::new(document, name);
        inner.suspensions.push(OpenSuspension {
            id: token.id,
            document,
            name: name.to_string(),
        });
        Ok(token)
    }

    async fn end_suspension(&self, token: SuspensionToken) -> HostResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(HostCall::EndSuspension {
            name: token.name.clone(),
        });
        let idx = inner
            .suspensions
            .iter()
            .position(|s| s.id == token.id)
            .ok_or(HostError::UnknownSuspension(token.id))?;
        let suspension = inner.suspensions.remove(idx);
        if let Some(reason) = inner.fail_end.take() {
            return Err(HostError::Rejected(reason));
        }
        // The document may have been closed while the suspension was open.
        if let Ok(doc) = inner.document_mut(suspension.document) {
            doc.history.push(suspension.name);
        }
        Ok(())
    }
}
