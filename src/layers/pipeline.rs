//! Descriptor Pipeline Executor
//!
//! Applies a composite effect as an ordered list of steps inside one
//! transaction. A step is a command, a "name the layer just created or
//! targeted" directive, or a "re-select the layer named earlier" directive.
//! Steps are never retried or reordered.

use std::rc::Rc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PanelError, Result};
use crate::host::descriptor::{self, Descriptor};
use crate::host::{DialogMode, DocumentId, Host, LayerId, SubmitOptions};
use crate::layers::index::LayerIndex;
use crate::state::{TransactionManager, TransactionOutcome};

/// One step of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PipelineStep {
    /// Submit a descriptor as-is
    Command {
        descriptor: Descriptor,
        #[serde(default)]
        dialog: DialogMode,
    },
    /// Name the layer the previous command created or targeted
    Name { name: String },
    /// Re-select a layer named by an earlier step
    Select { name: String },
}

/// An ordered, validated-before-run list of steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Undo-step name; the configured default is used when absent
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<PipelineStep>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            steps: Vec::new(),
        }
    }

    pub fn command(mut self, descriptor: Descriptor) -> Self {
        self.steps.push(PipelineStep::Command {
            descriptor,
            dialog: DialogMode::Silent,
        });
        self
    }

    pub fn name_layer(mut self, name: impl Into<String>) -> Self {
        self.steps.push(PipelineStep::Name { name: name.into() });
        self
    }

    pub fn select(mut self, name: impl Into<String>) -> Self {
        self.steps.push(PipelineStep::Select { name: name.into() });
        self
    }

    /// Check that every `Select` refers to a name assigned by an earlier step.
    pub fn validate(&self) -> Result<()> {
        let mut assigned: Vec<&str> = Vec::new();
        for (idx, step) in self.steps.iter().enumerate() {
            match step {
                PipelineStep::Name { name } => assigned.push(name),
                PipelineStep::Select { name } if !assigned.contains(&name.as_str()) => {
                    return Err(PanelError::UnassignedLayerName {
                        step: idx,
                        name: name.clone(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn command_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, PipelineStep::Command { .. }))
            .count()
    }
}

/// What a committed pipeline did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    /// Number of submit calls made
    pub submitted: usize,
    /// Names assigned during the run, in order
    pub named: Vec<(String, LayerId)>,
}

/// Runs pipelines through a transaction manager
pub struct PipelineExecutor<H: Host> {
    transactions: Rc<TransactionManager<H>>,
}

impl<H: Host> PipelineExecutor<H> {
    pub fn new(transactions: Rc<TransactionManager<H>>) -> Self {
        Self { transactions }
    }

    /// Validate, then run every step as one undo step.
    ///
    /// Validation failures are returned before any host call.
    pub async fn execute(
        &self,
        pipeline: &Pipeline,
        default_name: &str,
    ) -> Result<TransactionOutcome<PipelineReport>> {
        pipeline.validate()?;
        let name = pipeline.name.as_deref().unwrap_or(default_name);
        let label = format!("Applying {}...", name);
        let host = self.transactions.host().clone();

        self.transactions
            .run(name, &label, |ctx| async move {
                run_steps(host.as_ref(), ctx.document, &pipeline.steps).await
            })
            .await
    }
}

async fn run_steps<H: Host + ?Sized>(
    host: &H,
    document: DocumentId,
    steps: &[PipelineStep],
) -> Result<PipelineReport> {
    let mut index = LayerIndex::new();
    let mut report = PipelineReport::default();
    let mut last_created: Option<LayerId> = None;

    for (idx, step) in steps.iter().enumerate() {
        match step {
            PipelineStep::Command { descriptor, dialog } => {
                let replies = host
                    .submit(
                        std::slice::from_ref(descriptor),
                        SubmitOptions { dialog: *dialog },
                    )
                    .await?;
                report.submitted += 1;
                last_created = replies.first().and_then(descriptor::reply_layer_id);
            }
            PipelineStep::Name { name } => {
                let layer = last_created
                    .or_else(|| host.active_layer(document))
                    .ok_or(PanelError::NoTargetLayer { step: idx })?;
                host.submit(
                    &[descriptor::rename_layer(layer, name)],
                    SubmitOptions::silent(),
                )
                .await?;
                report.submitted += 1;
                index.assign(name.clone(), layer);
                report.named.push((name.clone(), layer));
                debug!("[PIPELINE] Step {} named {} '{}'", idx, layer, name);
            }
            PipelineStep::Select { name } => {
                let layer = index
                    .resolve(name)
                    .ok_or_else(|| PanelError::UnassignedLayerName {
                        step: idx,
                        name: name.clone(),
                    })?;
                host.submit(&[descriptor::select_layer(layer)], SubmitOptions::silent())
                    .await?;
                report.submitted += 1;
                last_created = None;
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use serde_json::json;

    fn glow_pipeline() -> Pipeline {
        Pipeline::named("Soft Glow")
            .command(descriptor::stamp_visible())
            .name_layer("Glow Base")
            .command(json!({ "_obj": "gaussianBlur", "radius": 12.0 }))
            .command(descriptor::stamp_visible())
            .name_layer("Glow Detail")
            .select("Glow Base")
            .command(json!({ "_obj": "highPass", "radius": 3.0 }))
    }

    fn executor() -> (Rc<MemoryHost>, PipelineExecutor<MemoryHost>, DocumentId) {
        let host = Rc::new(MemoryHost::new());
        let doc = host.open_document("portrait", &["Background"]);
        let tx = Rc::new(TransactionManager::new(host.clone()));
        (host, PipelineExecutor::new(tx), doc)
    }

    #[test]
    fn test_validate_rejects_forward_reference() {
        let pipeline = Pipeline::new()
            .select("Glow Base")
            .command(descriptor::stamp_visible())
            .name_layer("Glow Base");

        let err = pipeline.validate().unwrap_err();
        assert_eq!(
            err,
            PanelError::UnassignedLayerName {
                step: 0,
                name: "Glow Base".to_string()
            }
        );
        assert!(glow_pipeline().validate().is_ok());
    }

    #[tokio::test]
    async fn test_unassigned_name_detected_before_submission() {
        let (host, exec, _doc) = executor();
        let pipeline = Pipeline::new().select("Missing");

        let err = exec.execute(&pipeline, "Apply Effect").await.unwrap_err();
        assert_eq!(err.error_code(), "UNASSIGNED_LAYER_NAME");
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_runs_as_one_undo_step() {
        let (host, exec, doc) = executor();

        let report = exec
            .execute(&glow_pipeline(), "Apply Effect")
            .await
            .unwrap()
            .committed()
            .unwrap();

        assert_eq!(report.submitted, 7);
        assert_eq!(report.named.len(), 2);
        assert_eq!(host.history(doc), vec!["Open", "Soft Glow"]);
        assert_eq!(host.suspension_counts(), (1, 1));

        // The high-pass landed on the re-selected base layer.
        let effects = host.effects_of(doc, "Glow Base");
        let verbs: Vec<_> = effects
            .iter()
            .filter_map(|d| descriptor::verb_of(d).map(str::to_string))
            .collect();
        assert_eq!(verbs, vec!["gaussianBlur", "highPass"]);
    }

    #[tokio::test]
    async fn test_failed_step_stops_pipeline() {
        let (host, exec, doc) = executor();
        host.fail_next_submit("plugin crashed");

        let outcome = exec.execute(&glow_pipeline(), "Apply Effect").await.unwrap();

        assert!(!outcome.is_committed());
        assert_eq!(host.submit_count(), 1);
        assert_eq!(host.open_suspensions(), 0);
        assert_eq!(host.layer_names(doc), vec!["Background"]);
    }

    #[test]
    fn test_pipeline_from_json() {
        let pipeline: Pipeline = serde_json::from_value(json!({
            "name": "Dodge & Burn",
            "steps": [
                { "step": "command", "descriptor": { "_obj": "stampVisible" } },
                { "step": "name", "name": "Dodge" },
                { "step": "select", "name": "Dodge" }
            ]
        }))
        .unwrap();

        assert_eq!(pipeline.steps.len(), 3);
        assert_eq!(pipeline.command_count(), 1);
        assert!(pipeline.validate().is_ok());
    }
}
