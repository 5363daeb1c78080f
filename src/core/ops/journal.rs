//! core::ops::journal
//!
//! Transaction journal.
//!
//! # Architecture
//!
//! Every transaction records each store mutation it performs, with enough
//! information to reverse it. The journal is the source of truth for:
//! - Rollback - undo steps in reverse order against the store
//! - Inspection - the last finished journal stays available on the document
//!
//! # Invariants
//!
//! - Steps are recorded in call order, after the store accepted them
//! - Attribute writes record both the old and the new value
//! - Structural steps record the store index they happened at
//! - A finished journal (committed or rolled back) is never appended to

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{ElementId, TxId, UtcTimestamp};

/// Errors from journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    /// JSON serialization error.
    #[error("journal json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid journal state.
    #[error("invalid journal state: {0}")]
    InvalidState(String),
}

/// The current phase of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxPhase {
    /// Transaction is open.
    InProgress,
    /// Transaction was committed.
    Committed,
    /// Transaction was rolled back.
    RolledBack,
}

impl TxPhase {
    /// Check if the transaction is finished (committed or rolled back).
    pub fn is_finished(&self) -> bool {
        matches!(self, TxPhase::Committed | TxPhase::RolledBack)
    }
}

/// A single step in a transaction journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalStep {
    /// Step kind with mutation-specific data.
    pub kind: StepKind,
    /// Timestamp when step was recorded.
    pub timestamp: UtcTimestamp,
}

/// The kind of journal step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// A fresh, detached element was synthesized.
    ///
    /// Nothing to undo: a detached element is invisible to the document.
    CreateElement { element: ElementId, tag: String },

    /// An attribute was written or removed.
    SetAttribute {
        element: ElementId,
        name: String,
        /// Value before the write, or None if it was unset.
        old: Option<String>,
        /// Value after the write, or None if it was removed.
        new: Option<String>,
    },

    /// A child element was inserted.
    InsertChild {
        parent: ElementId,
        child: ElementId,
        index: usize,
    },

    /// A child element was removed.
    RemoveChild {
        parent: ElementId,
        child: ElementId,
        index: usize,
    },
}

impl StepKind {
    /// Whether this step changed document structure.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            StepKind::InsertChild { .. } | StepKind::RemoveChild { .. }
        )
    }
}

/// A transaction journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    /// Unique transaction identifier.
    pub tx_id: TxId,
    /// When the transaction started.
    pub started_at: UtcTimestamp,
    /// When the transaction finished (if finished).
    pub finished_at: Option<UtcTimestamp>,
    /// Current phase.
    pub phase: TxPhase,
    /// Steps recorded so far.
    pub steps: Vec<JournalStep>,
}

impl Journal {
    /// Create a new journal for an opening transaction.
    pub fn new() -> Self {
        Self {
            tx_id: TxId::new(),
            started_at: UtcTimestamp::now(),
            finished_at: None,
            phase: TxPhase::InProgress,
            steps: vec![],
        }
    }

    /// Append a step.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::InvalidState` if the journal is finished.
    pub fn record(&mut self, kind: StepKind) -> Result<(), JournalError> {
        if self.phase.is_finished() {
            return Err(JournalError::InvalidState(format!(
                "transaction {} is already {:?}",
                self.tx_id, self.phase
            )));
        }
        self.steps.push(JournalStep {
            kind,
            timestamp: UtcTimestamp::now(),
        });
        Ok(())
    }

    /// Mark the journal as committed.
    pub fn commit(&mut self) {
        self.phase = TxPhase::Committed;
        self.finished_at = Some(UtcTimestamp::now());
    }

    /// Mark the journal as rolled back.
    pub fn rollback(&mut self) {
        self.phase = TxPhase::RolledBack;
        self.finished_at = Some(UtcTimestamp::now());
    }

    /// Steps in the order they must be undone (most recent first).
    pub fn steps_for_undo(&self) -> impl Iterator<Item = &StepKind> {
        self.steps.iter().rev().map(|step| &step.kind)
    }

    /// Number of structural steps recorded.
    pub fn structural_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.kind.is_structural()).count()
    }

    /// Serialize the journal for diagnostics.
    pub fn to_json(&self) -> Result<String, JournalError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(i: usize) -> ElementId {
        ElementId::new(i)
    }

    #[test]
    fn new_journal_is_in_progress() {
        let journal = Journal::new();
        assert_eq!(journal.phase, TxPhase::InProgress);
        assert!(journal.steps.is_empty());
        assert!(journal.finished_at.is_none());
    }

    #[test]
    fn record_appends_in_order() {
        let mut journal = Journal::new();
        journal
            .record(StepKind::CreateElement {
                element: e(4),
                tag: "inherits".into(),
            })
            .unwrap();
        journal
            .record(StepKind::InsertChild {
                parent: e(0),
                child: e(4),
                index: 2,
            })
            .unwrap();

        assert_eq!(journal.steps.len(), 2);
        assert_eq!(journal.structural_steps(), 1);
    }

    #[test]
    fn undo_order_is_reversed() {
        let mut journal = Journal::new();
        let first = StepKind::SetAttribute {
            element: e(1),
            name: "name".into(),
            old: None,
            new: Some("a".into()),
        };
        let second = StepKind::RemoveChild {
            parent: e(0),
            child: e(1),
            index: 0,
        };
        journal.record(first.clone()).unwrap();
        journal.record(second.clone()).unwrap();

        let undo: Vec<_> = journal.steps_for_undo().cloned().collect();
        assert_eq!(undo, vec![second, first]);
    }

    #[test]
    fn commit_sets_phase_and_timestamp() {
        let mut journal = Journal::new();
        journal.commit();
        assert_eq!(journal.phase, TxPhase::Committed);
        assert!(journal.finished_at.is_some());
    }

    #[test]
    fn rollback_sets_phase_and_timestamp() {
        let mut journal = Journal::new();
        journal.rollback();
        assert_eq!(journal.phase, TxPhase::RolledBack);
        assert!(journal.phase.is_finished());
        assert!(journal.finished_at.is_some());
    }

    #[test]
    fn finished_journal_rejects_steps() {
        let mut journal = Journal::new();
        journal.commit();
        let result = journal.record(StepKind::CreateElement {
            element: e(1),
            tag: "source".into(),
        });
        assert!(matches!(result, Err(JournalError::InvalidState(_))));
    }

    #[test]
    fn json_uses_tagged_steps() {
        let mut journal = Journal::new();
        journal
            .record(StepKind::InsertChild {
                parent: e(0),
                child: e(3),
                index: 1,
            })
            .unwrap();

        let json = journal.to_json().unwrap();
        assert!(json.contains("\"type\": \"insert_child\""));
        assert!(json.contains("\"phase\": \"in_progress\""));

        let parsed: Journal = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.tx_id, journal.tx_id);
        assert_eq!(parsed.steps[0].kind, journal.steps[0].kind);
    }
}
