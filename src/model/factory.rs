//! model::factory
//!
//! Building components from backing elements.
//!
//! [`build`] is the single construction path: the initial load and every
//! `Added` event go through it, so both agree on which elements take part
//! in the model. [`ComponentFactory`] adds the detached constructors used
//! inside a transaction.

use crate::core::ops::{Journal, StepKind};
use crate::core::schema::Variant;
use crate::core::types::{ComponentId, ElementId};
use crate::engine::TransactionError;
use crate::store::BackingStore;

use super::arena::Model;
use super::component::{
    Component, Exclude, Include, Inherits, Module, SetConfigurationProperty, SetProperty, Source,
    StyleSheet,
};

/// Build the component for `element` and, recursively, for every
/// recognized descendant.
///
/// `parent` is the component the element sits under, or `None` at the
/// document root. Returns `None` when the schema does not recognize the
/// element in that position; unrecognized children are skipped the same
/// way. The new subtree is not linked into `parent`'s list.
///
/// A wrapper left behind by an earlier removal of the same element is
/// dropped first, so every element has at most one live component.
pub fn build<S: BackingStore + ?Sized>(
    model: &mut Model,
    store: &S,
    parent: Option<ComponentId>,
    element: ElementId,
    attached: bool,
) -> Option<ComponentId> {
    let parent_variant = match parent {
        Some(parent) => Some(model.variant(parent)?),
        None => None,
    };
    let tag = store.tag_name(element)?;
    let variant = model.schema().resolve(parent_variant, tag)?;

    if let Some(stale) = model.lookup(element) {
        tracing::trace!(%stale, %element, "dropping stale wrapper before rebuild");
        model.free(stale);
    }

    let id = model.alloc(variant, element, attached);
    if variant.hosted_list().is_some() {
        for child in store.children(element) {
            if let Some(child_id) = build(model, store, Some(id), child, attached) {
                model.push_child(id, child_id);
            }
        }
    }
    Some(id)
}

/// Build a whole model from the store's root.
pub fn build_model<S: BackingStore + ?Sized>(model: &mut Model, store: &S) {
    let root = store.root().and_then(|root| build(model, store, None, root, true));
    model.set_root(root);
    tracing::debug!(components = model.len(), has_root = root.is_some(), "model built");
}

/// Detached component constructors, bound to one open transaction.
///
/// Every `create_*` synthesizes a fresh element with the variant's
/// canonical tag, records it in the transaction journal, and returns a
/// wrapper that is not attached anywhere. Attach it with the owning
/// container's `add_*` or `insert_*`.
pub struct ComponentFactory<'a, S: BackingStore> {
    model: &'a mut Model,
    store: &'a mut S,
    journal: &'a mut Journal,
}

impl<'a, S: BackingStore> ComponentFactory<'a, S> {
    pub(crate) fn new(model: &'a mut Model, store: &'a mut S, journal: &'a mut Journal) -> Self {
        Self {
            model,
            store,
            journal,
        }
    }

    /// Wrap an existing store element.
    ///
    /// An element that already has a live component keeps it: that
    /// component is returned as is. Otherwise a new, unlinked component is
    /// built for it and every recognized descendant. Either way the result
    /// is `None` when the element does not resolve under `parent`.
    ///
    /// New components are never attached, since nothing links them into a
    /// list; attach them with the owning container's `add_*` or `insert_*`.
    pub fn create_component(
        &mut self,
        parent: Option<ComponentId>,
        element: ElementId,
    ) -> Option<ComponentId> {
        let parent_variant = match parent {
            Some(parent) => Some(self.model.variant(parent)?),
            None => None,
        };
        let variant = self
            .model
            .schema()
            .resolve(parent_variant, self.store.tag_name(element)?)?;
        if let Some(existing) = self.model.lookup(element) {
            return (self.model.variant(existing) == Some(variant)).then_some(existing);
        }
        build(self.model, &*self.store, parent, element, false)
    }

    fn create<C: Component>(&mut self) -> Result<C, TransactionError> {
        let variant: Variant = C::VARIANT;
        let element = self.store.create_element(variant.tag_name());
        self.journal.record(StepKind::CreateElement {
            element,
            tag: variant.tag_name().to_string(),
        })?;
        let id = self.model.alloc(variant, element, false);
        tracing::trace!(%id, %element, %variant, "created detached component");
        Ok(C::wrap(id))
    }

    pub fn create_module(&mut self) -> Result<Module, TransactionError> {
        self.create()
    }

    pub fn create_source(&mut self) -> Result<Source, TransactionError> {
        self.create()
    }

    pub fn create_inherits(&mut self) -> Result<Inherits, TransactionError> {
        self.create()
    }

    pub fn create_include(&mut self) -> Result<Include, TransactionError> {
        self.create()
    }

    pub fn create_exclude(&mut self) -> Result<Exclude, TransactionError> {
        self.create()
    }

    pub fn create_set_configuration_property(
        &mut self,
    ) -> Result<SetConfigurationProperty, TransactionError> {
        self.create()
    }

    pub fn create_set_property(&mut self) -> Result<SetProperty, TransactionError> {
        self.create()
    }

    pub fn create_style_sheet(&mut self) -> Result<StyleSheet, TransactionError> {
        self.create()
    }
}
