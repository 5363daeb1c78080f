//! engine::transaction
//!
//! Transaction errors and the scoped transaction guard.
//!
//! # Invariants
//!
//! - At most one transaction is open per document
//! - The store write lock is released on every exit path: commit,
//!   rollback, error return, and unwinding through a [`TransactionGuard`]

use std::ops::{Deref, DerefMut};

use thiserror::Error;

use crate::core::ops::JournalError;
use crate::core::types::ComponentId;
use crate::model::ArenaError;
use crate::store::{BackingStore, StoreError};

use super::document::Document;
use super::sync::{SyncError, SyncReport};

/// Errors from transactional mutation.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// A mutation was attempted with no open transaction.
    #[error("no transaction is open")]
    NotOpen,

    /// A transaction is already open on this document.
    #[error("a transaction is already open")]
    AlreadyOpen,

    /// The component is stale or belongs to another document.
    #[error("component {0} does not belong to this document")]
    WrongModel(ComponentId),

    /// The component already sits in a container.
    #[error("component {0} is already in a container; remove it first")]
    AlreadyParented(ComponentId),

    /// The component is not in the container's list.
    #[error("component {child} is not a child of {parent}")]
    NotAChild {
        parent: ComponentId,
        child: ComponentId,
    },

    /// The model rejected the change.
    #[error(transparent)]
    Model(#[from] ArenaError),

    /// The backing store rejected the change.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The journal could not record the step.
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    /// Reconciliation after commit failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// An open transaction that rolls back unless committed.
///
/// Dereferences to the [`Document`], so mutations read the same as outside
/// a guard.
///
/// # Example
///
/// ```
/// use gwtmodule::engine::Document;
///
/// let mut doc = Document::from_xml("<module/>").unwrap();
/// let module = doc.module().unwrap();
/// {
///     let mut tx = doc.transaction().unwrap();
///     let inherits = tx.factory().unwrap().create_inherits().unwrap();
///     module.add_component(&mut tx, inherits).unwrap();
///     // dropped without commit
/// }
/// assert!(module.components(&doc).is_empty());
/// assert!(!doc.is_transaction_open());
/// ```
pub struct TransactionGuard<'d, S: BackingStore> {
    doc: &'d mut Document<S>,
    finished: bool,
}

impl<'d, S: BackingStore> TransactionGuard<'d, S> {
    pub(crate) fn new(doc: &'d mut Document<S>) -> Self {
        Self {
            doc,
            finished: false,
        }
    }

    /// Commit the transaction and reconcile.
    pub fn commit(mut self) -> Result<SyncReport, TransactionError> {
        self.finished = true;
        self.doc.end_transaction()
    }

    /// Undo every change made in the transaction.
    pub fn rollback(mut self) -> Result<(), TransactionError> {
        self.finished = true;
        self.doc.rollback_transaction()
    }
}

impl<S: BackingStore> Deref for TransactionGuard<'_, S> {
    type Target = Document<S>;

    fn deref(&self) -> &Document<S> {
        self.doc
    }
}

impl<S: BackingStore> DerefMut for TransactionGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Document<S> {
        self.doc
    }
}

impl<S: BackingStore> Drop for TransactionGuard<'_, S> {
    fn drop(&mut self) {
        if self.finished || !self.doc.is_transaction_open() {
            return;
        }
        tracing::warn!("transaction dropped without commit, rolling back");
        if let Err(e) = self.doc.rollback_transaction() {
            tracing::error!(error = %e, "rollback of dropped transaction failed");
        }
    }
}
