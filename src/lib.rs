//! gwtmodule - A typed, transactional object model for GWT module descriptors
//!
//! A module descriptor (`*.gwt.xml`) is held twice: as a raw element tree in
//! a backing store, and as a typed component tree built over it. Typed
//! edits run in transactions that write through to the store; edits made
//! to the store directly are reconciled back into the typed tree without
//! disturbing components they did not touch.
//!
//! # Architecture
//!
//! - [`core`] - Identifiers, the tag resolution table, configuration,
//!   journal and write lock
//! - [`store`] - The backing store boundary and an in-memory XML store
//! - [`model`] - Component arena, typed handles, component factory
//! - [`engine`] - Documents, transactions, sync, verification
//!
//! # Example
//!
//! ```
//! use gwtmodule::engine::Document;
//!
//! let mut doc = Document::from_xml(
//!     r#"<module><source path="client"><include name="**"/></source></module>"#,
//! )
//! .unwrap();
//! let module = doc.module().unwrap();
//! let source = module.sources(&doc)[0];
//!
//! // Edit the raw tree; the typed tree follows.
//! let element = doc.element(source.id()).unwrap();
//! doc.edit_store(|store| store.append_element(element, "exclude", &[("name", "x")]))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(source.filters(&doc).len(), 2);
//! ```
//!
//! # Correctness Invariants
//!
//! 1. The typed tree contains exactly the schema-recognized elements of the
//!    store, in document order
//! 2. A component's identity survives every edit that does not remove its
//!    element
//! 3. Typed mutation happens only inside a transaction, and the store lock
//!    is released on every exit path

pub mod core;
pub mod engine;
pub mod model;
pub mod store;

pub use engine::{Document, SyncError, SyncReport, TransactionError, TransactionGuard};
pub use model::{
    Component, Exclude, FilterComponent, Include, Inherits, Module, ModuleComponent,
    SetConfigurationProperty, SetProperty, Source, StyleSheet,
};
pub use store::{BackingStore, DomStore, StoreError, StructuralEvent};
