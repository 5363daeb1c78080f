//! core
//!
//! Core domain types, the vocabulary table, configuration, and operations.
//!
//! # Modules
//!
//! - [`types`] - Strong types: ElementId, ComponentId, TxId, Fingerprint
//! - [`schema`] - Variants and the (parent, tag) resolution table
//! - [`ops`] - Transaction journaling and the write lock
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - The vocabulary is a closed, immutable table
//! - All resolution is deterministic

pub mod config;
pub mod ops;
pub mod schema;
pub mod types;
