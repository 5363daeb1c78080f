//! core::ops
//!
//! Transaction journaling and locking.
//!
//! # Modules
//!
//! - [`journal`] - Transaction journal for rollback and inspection
//! - [`lock`] - Exclusive document write lock
//!
//! # Architecture
//!
//! Every transaction:
//! 1. Acquires the exclusive document write lock
//! 2. Opens a journal
//! 3. Records each store mutation with enough data to reverse it
//! 4. On success: marks the journal committed and releases the lock
//! 5. On failure: undoes the journal in reverse and releases the lock

pub mod journal;
pub mod lock;

pub use journal::{Journal, JournalError, JournalStep, StepKind, TxPhase};
pub use lock::{LockError, WriteLock};
