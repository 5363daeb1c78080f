//! model
//!
//! The typed component tree.
//!
//! # Modules
//!
//! - [`arena`] - Component storage, identity, and parent/child lists
//! - [`component`] - Typed handles and their attribute accessors
//! - [`factory`] - Element-to-component construction

pub mod arena;
pub mod component;
pub mod factory;

pub use arena::{ArenaError, Model};
pub use component::{
    Component, Exclude, FilterComponent, Include, Inherits, Module, ModuleComponent,
    SetConfigurationProperty, SetProperty, Source, StyleSheet,
};
pub use factory::ComponentFactory;
