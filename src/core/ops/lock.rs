//! core::ops::lock
//!
//! Exclusive document write lock.
//!
//! # Architecture
//!
//! The write lock ensures only one transaction can mutate a document at a
//! time. It lives inside the backing store so that every handle onto the
//! same store sees the same lock.
//!
//! # Invariants
//!
//! - The lock is held for the entire transaction bracket
//! - Acquisition is non-blocking (fails fast if locked)
//! - Acquisition is not reentrant, even for the current holder
//! - Only the holder can release it

use thiserror::Error;

use crate::core::types::TxId;

/// Errors from locking operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    /// Another transaction already holds the lock.
    #[error("document is locked by transaction {holder}")]
    AlreadyLocked { holder: TxId },

    /// Release was attempted by someone who does not hold the lock.
    #[error("write lock is not held by transaction {requester}")]
    NotHeld { requester: TxId },
}

/// An exclusive, non-reentrant write lock on one document.
///
/// # Example
///
/// ```
/// use gwtmodule::core::ops::lock::{LockError, WriteLock};
/// use gwtmodule::core::types::TxId;
///
/// let mut lock = WriteLock::new();
/// let tx = TxId::new();
/// lock.acquire(&tx).unwrap();
/// assert!(matches!(lock.acquire(&TxId::new()), Err(LockError::AlreadyLocked { .. })));
/// lock.release(&tx).unwrap();
/// assert!(!lock.is_held());
/// ```
#[derive(Debug, Default, Clone)]
pub struct WriteLock {
    holder: Option<TxId>,
}

impl WriteLock {
    /// Create an unheld lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to acquire the lock for `tx`.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if any transaction holds the lock,
    ///   including `tx` itself
    pub fn acquire(&mut self, tx: &TxId) -> Result<(), LockError> {
        if let Some(holder) = &self.holder {
            return Err(LockError::AlreadyLocked {
                holder: holder.clone(),
            });
        }
        self.holder = Some(tx.clone());
        Ok(())
    }

    /// Release the lock held by `tx`.
    ///
    /// # Errors
    ///
    /// - [`LockError::NotHeld`] if `tx` is not the current holder
    pub fn release(&mut self, tx: &TxId) -> Result<(), LockError> {
        match &self.holder {
            Some(holder) if holder == tx => {
                self.holder = None;
                Ok(())
            }
            _ => Err(LockError::NotHeld {
                requester: tx.clone(),
            }),
        }
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }

    /// The transaction holding the lock, if any.
    pub fn holder(&self) -> Option<&TxId> {
        self.holder.as_ref()
    }
}
