//! Transaction Manager
//!
//! Runs a unit of host work inside one history suspension so everything it
//! changes collapses into a single undo step. The suspension is closed
//! exactly once on every path, and failures of the work itself are logged,
//! journaled and swallowed.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{PanelError, Result};
use crate::host::{DocumentId, Host};
use crate::state::journal::{TransactionJournal, TransactionRecord};

/// What the unit of work receives when it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Document the suspension targets
    pub document: DocumentId,
    /// Id of the open suspension
    pub suspension: Uuid,
    /// Undo-step name
    pub name: String,
    /// Progress label
    pub label: String,
}

/// Result of the unit of work inside a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome<T> {
    Committed(T),
    Failed(PanelError),
}

impl<T> TransactionOutcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, TransactionOutcome::Committed(_))
    }

    /// The work's value, if it committed
    pub fn committed(self) -> Option<T> {
        match self {
            TransactionOutcome::Committed(value) => Some(value),
            TransactionOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PanelError> {
        match self {
            TransactionOutcome::Committed(_) => None,
            TransactionOutcome::Failed(err) => Some(err),
        }
    }
}

/// Wraps host work in atomic, named undo steps.
pub struct TransactionManager<H: Host> {
    host: Rc<H>,
    /// Serializes transactions so interleaved callers never share a suspension
    gate: Mutex<()>,
    journal: RefCell<TransactionJournal>,
}

impl<H: Host> TransactionManager<H> {
    pub fn new(host: Rc<H>) -> Self {
        Self {
            host,
            gate: Mutex::new(()),
            journal: RefCell::new(TransactionJournal::default()),
        }
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    /// Snapshot of the journal
    pub fn journal(&self) -> TransactionJournal {
        self.journal.borrow().clone()
    }

    /// Run `work` as one undo step named `name`.
    ///
    /// Returns `Ok(Committed)` or `Ok(Failed)` depending on the work; the
    /// work's error is never propagated. `Err` is reserved for the fatal
    /// class: no active document when the suspension is about to open, or
    /// the host refusing to open or close the suspension.
    pub async fn run<T, F, Fut>(
        &self,
        name: &str,
        label: &str,
        work: F,
    ) -> Result<TransactionOutcome<T>>
    where
        F: FnOnce(ExecutionContext) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _guard = self.gate.lock().await;

        // The document may have closed between the caller's guard and now.
        let document = self
            .host
            .active_document()
            .ok_or(PanelError::NoActiveDocument)?;

        let started_at = Utc::now();
        let token = self
            .host
            .begin_suspension(document, name)
            .await
            .map_err(|source| PanelError::SuspensionOpen {
                name: name.to_string(),
                document,
                source,
            })?;
        debug!("[TRANSACTION] Opened '{}' on {}", name, document);

        let ctx = ExecutionContext {
            document,
            suspension: token.id,
            name: name.to_string(),
            label: label.to_string(),
        };
        let outcome = match work(ctx).await {
            Ok(value) => TransactionOutcome::Committed(value),
            Err(err) => {
                warn!(
                    "[TRANSACTION] '{}' failed ({}): {}",
                    name,
                    err.error_code(),
                    err
                );
                TransactionOutcome::Failed(err)
            }
        };

        let closed = self.host.end_suspension(token).await;
        self.journal.borrow_mut().push(TransactionRecord::new(
            name,
            label,
            document,
            started_at,
            outcome.error(),
            closed.is_ok(),
        ));
        closed.map_err(|source| PanelError::SuspensionClose {
            name: name.to_string(),
            source,
        })?;

        if outcome.is_committed() {
            info!("[TRANSACTION] Committed '{}'", name);
        }
        Ok(outcome)
    }
}
