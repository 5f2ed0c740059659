//! Transaction Journal
//!
//! Structured record of every transaction the panel ran. Failures inside a
//! transaction never propagate, so this journal is how callers and tests
//! observe that one happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PanelError;
use crate::host::DocumentId;

/// Default maximum number of records to keep.
pub const DEFAULT_MAX_RECORDS: usize = 200;

/// How a transaction's unit of work ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// The work completed and its changes form one undo step.
    Committed,

    /// The work failed; the error was logged and swallowed.
    Failed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Committed => write!(f, "Committed"),
            TransactionStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// A single finished transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique identifier for this transaction.
    pub id: String,

    /// Undo-step name the host shows.
    pub name: String,

    /// Progress label shown while the work ran.
    pub label: String,

    /// Document the suspension targeted.
    pub document: DocumentId,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    pub status: TransactionStatus,

    /// Error code when the work failed.
    pub error_code: Option<String>,

    /// Error message when the work failed.
    pub error: Option<String>,

    /// Whether the host accepted the closing of the suspension.
    pub closed_cleanly: bool,
}

impl TransactionRecord {
    pub(crate) fn new(
        name: &str,
        label: &str,
        document: DocumentId,
        started_at: DateTime<Utc>,
        failure: Option<&PanelError>,
        closed_cleanly: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            label: label.to_string(),
            document,
            started_at,
            finished_at: Utc::now(),
            status: if failure.is_some() {
                TransactionStatus::Failed
            } else {
                TransactionStatus::Committed
            },
            error_code: failure.map(|e| e.error_code().to_string()),
            error: failure.map(|e| e.to_string()),
            closed_cleanly,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == TransactionStatus::Failed
    }
}

/// Bounded, append-only log of transaction records.
#[derive(Debug, Clone)]
pub struct TransactionJournal {
    records: Vec<TransactionRecord>,
    max_records: usize,
    discarded: usize,
}

impl Default for TransactionJournal {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORDS)
    }
}

impl TransactionJournal {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Vec::new(),
            max_records,
            discarded: 0,
        }
    }

    /// Append a record, dropping the oldest ones beyond the limit.
    pub fn push(&mut self, record: TransactionRecord) {
        self.records.push(record);
        if self.records.len() > self.max_records {
            let excess = self.records.len() - self.max_records;
            self.records.drain(..excess);
            self.discarded += excess;
        }
    }

    /// All retained records, oldest first.
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&TransactionRecord> {
        self.records.last()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter().filter(|r| r.is_failed())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records dropped because of the size limit.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Names of retained transactions, most recent first.
    pub fn summary(&self) -> Vec<(String, TransactionStatus)> {
        self.records
            .iter()
            .rev()
            .map(|r| (r.name.clone(), r.status))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostError;

    fn record(name: &str, failure: Option<&PanelError>) -> TransactionRecord {
        TransactionRecord::new(name, "Working...", DocumentId(1), Utc::now(), failure, true)
    }

    #[test]
    fn test_push_and_trim() {
        let mut journal = TransactionJournal::new(3);
        for i in 0..5 {
            journal.push(record(&format!("Step {}", i), None));
        }

        assert_eq!(journal.len(), 3);
        assert_eq!(journal.discarded(), 2);
        assert_eq!(journal.records()[0].name, "Step 2");
    }

    #[test]
    fn test_failed_record_carries_error() {
        let err = PanelError::Host(HostError::Rejected("boom".to_string()));
        let rec = record("Adjust Tint", Some(&err));

        assert!(rec.is_failed());
        assert_eq!(rec.error_code.as_deref(), Some("HOST_ERROR"));
        assert!(rec.error.unwrap().contains("boom"));
    }

    #[test]
    fn test_summary_most_recent_first() {
        let mut journal = TransactionJournal::default();
        journal.push(record("First", None));
        journal.push(record(
            "Second",
            Some(&PanelError::UnexpectedReply {
                reason: "empty".to_string(),
            }),
        ));

        let summary = journal.summary();
        assert_eq!(summary[0], ("Second".to_string(), TransactionStatus::Failed));
        assert_eq!(summary[1], ("First".to_string(), TransactionStatus::Committed));
        assert_eq!(journal.failures().count(), 1);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TransactionStatus::Committed.to_string(), "Committed");
        assert_eq!(TransactionStatus::Failed.to_string(), "Failed");
    }
}
