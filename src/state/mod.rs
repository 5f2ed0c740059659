//! Transaction State
//!
//! Atomic undo steps around host work, and the journal that records them.

pub mod journal;
pub mod transaction;

pub use journal::{TransactionJournal, TransactionRecord, TransactionStatus};
pub use transaction::{ExecutionContext, TransactionManager, TransactionOutcome};
