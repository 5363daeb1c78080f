//! engine
//!
//! Transactions and reconciliation over a [`Document`].
//!
//! # Architecture
//!
//! Two paths change a document, and both end with the typed tree agreeing
//! with the store:
//!
//! 1. **Typed edits** run inside a transaction: lock, journal, mutate store
//!    and model together, commit or roll back.
//! 2. **Out-of-band edits** change the store only. The store records
//!    structural events and [`sync::apply`] replays them onto the model.
//!
//! After either path, [`verify::check`] can compare fingerprints of both
//! trees. It runs after every sync unless disabled in configuration.
//!
//! # Modules
//!
//! - [`document`] - Store plus model, transaction bracket, mutations
//! - [`sync`] - Structural event reconciliation
//! - [`transaction`] - Transaction errors and the RAII guard
//! - [`verify`] - Fingerprint comparison of model and store

pub mod document;
pub mod sync;
pub mod transaction;
pub mod verify;

pub use document::Document;
pub use sync::{SyncError, SyncReport};
pub use transaction::{TransactionError, TransactionGuard};
