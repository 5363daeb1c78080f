//! engine::sync
//!
//! Reconcile the typed tree with structural events from the store.
//!
//! # Architecture
//!
//! Events are applied strictly in the order the store recorded them. For
//! each event the engine touches only the wrappers named by it; every
//! other component keeps its identity.
//!
//! Each event is checked against the store as it is now, so a batch can be
//! replayed, and an event later undone within the same batch is harmless.
//!
//! - `Added`: the parent must be a live, attached component. The child's
//!   tag is resolved against the parent's variant; unrecognized tags are
//!   ignored, as is a child that has since left the parent. A wrapper
//!   already sitting under that parent is only moved to where the store
//!   has its element. Otherwise the child subtree is built and inserted at
//!   the position its element holds among the parent's recognized children.
//! - `Removed`: if the element is back under the parent, the event is
//!   stale. Otherwise the child's wrapper, if it still sits under the
//!   parent's wrapper, is dropped with its subtree. No wrapper means
//!   nothing to do.
//!
//! # Invariants
//!
//! - Replaying a batch is a no-op
//! - A child is only ever inserted into the list its variant belongs to;
//!   a mismatch means the model is corrupt and aborts with a panic

use thiserror::Error;

use crate::core::types::{ComponentId, ElementId, Fingerprint};
use crate::model::arena::{ArenaError, Model};
use crate::model::factory;
use crate::store::{BackingStore, StructuralEvent};

/// Errors from an explicit sync.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    /// After applying events, the typed tree does not match the store.
    #[error("model diverged from store: expected {expected}, found {actual}")]
    Diverged {
        /// Fingerprint of the schema-filtered store tree.
        expected: Fingerprint,
        /// Fingerprint of the typed tree.
        actual: Fingerprint,
    },

    /// Sync was requested while a transaction is open.
    #[error("cannot sync while a transaction is open")]
    TransactionOpen,
}

/// What one batch did to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Components built and inserted.
    pub added: usize,
    /// Components dropped.
    pub removed: usize,
    /// Existing components moved to a new position.
    pub moved: usize,
    /// Events outside the model: unknown parent or unrecognized tag.
    pub ignored: usize,
    /// Events already reflected in the model.
    pub skipped: usize,
}

impl SyncReport {
    /// Whether the batch changed the model.
    pub fn changed(&self) -> bool {
        self.added > 0 || self.removed > 0 || self.moved > 0
    }

    /// Total number of events accounted for.
    pub fn events(&self) -> usize {
        self.added + self.removed + self.moved + self.ignored + self.skipped
    }
}

/// Apply `events` to `model`, reading the current element tree from `store`.
pub fn apply<S: BackingStore + ?Sized>(
    model: &mut Model,
    store: &S,
    events: &[StructuralEvent],
) -> SyncReport {
    let mut report = SyncReport::default();
    for event in events {
        match *event {
            StructuralEvent::Added {
                parent,
                child,
                index,
            } => on_added(model, store, parent, child, index, &mut report),
            StructuralEvent::Removed {
                parent,
                child,
                index,
            } => on_removed(model, store, parent, child, index, &mut report),
        }
    }
    tracing::debug!(
        events = events.len(),
        added = report.added,
        removed = report.removed,
        moved = report.moved,
        ignored = report.ignored,
        skipped = report.skipped,
        "sync batch applied"
    );
    report
}

fn on_added<S: BackingStore + ?Sized>(
    model: &mut Model,
    store: &S,
    parent: ElementId,
    child: ElementId,
    index: usize,
    report: &mut SyncReport,
) {
    let Some(parent_id) = model.lookup(parent).filter(|p| model.is_attached(*p)) else {
        tracing::warn!(%parent, %child, index, "ignoring add under element outside the model");
        report.ignored += 1;
        return;
    };
    let Some(parent_variant) = model.variant(parent_id) else {
        report.ignored += 1;
        return;
    };
    let Some(variant) = store
        .tag_name(child)
        .and_then(|tag| model.schema().resolve(Some(parent_variant), tag))
    else {
        tracing::trace!(%parent, %child, index, "ignoring unrecognized element");
        report.ignored += 1;
        return;
    };

    if store.parent(child) != Some(parent) {
        tracing::trace!(%parent, %child, index, %variant, "add superseded by a later edit");
        report.skipped += 1;
        return;
    }

    if let Some(existing) = model.lookup(child) {
        if model.parent(existing) == Some(parent_id) {
            reposition(model, store, parent_id, parent, existing, report);
            return;
        }
    }

    let position = list_position(model, store, parent_id, parent, child);
    let Some(id) = factory::build(model, store, Some(parent_id), child, true) else {
        report.ignored += 1;
        return;
    };
    match model.insert_at_index(parent_id, id, position) {
        Ok(()) => {}
        Err(ArenaError::Incompatible { parent, child }) => {
            panic!("sync tried to place {child} into the list of {parent}")
        }
        Err(e) => panic!("sync could not insert {id} into {parent_id}: {e}"),
    }
    tracing::trace!(%parent, %child, index, position, %variant, "added component");
    report.added += 1;
}

fn on_removed<S: BackingStore + ?Sized>(
    model: &mut Model,
    store: &S,
    parent: ElementId,
    child: ElementId,
    index: usize,
    report: &mut SyncReport,
) {
    if store.parent(child) == Some(parent) {
        tracing::trace!(%parent, %child, index, "remove superseded by a later add");
        report.skipped += 1;
        return;
    }
    let Some(parent_id) = model.lookup(parent) else {
        tracing::warn!(%parent, %child, index, "ignoring remove under element outside the model");
        report.ignored += 1;
        return;
    };
    match model.lookup(child) {
        Some(id) if model.parent(id) == Some(parent_id) => {
            let variant = model.variant(id);
            model.free(id);
            tracing::trace!(%parent, %child, index, ?variant, "removed component");
            report.removed += 1;
        }
        _ => {
            tracing::trace!(%parent, %child, index, "remove has no wrapper");
            report.skipped += 1;
        }
    }
}

/// Move an existing wrapper to where the store has its element.
fn reposition<S: BackingStore + ?Sized>(
    model: &mut Model,
    store: &S,
    parent_id: ComponentId,
    parent: ElementId,
    existing: ComponentId,
    report: &mut SyncReport,
) {
    let (Some(from), Some(element)) = (model.index_of(parent_id, existing), model.element(existing))
    else {
        report.skipped += 1;
        return;
    };
    model.detach(existing);
    let to = list_position(model, store, parent_id, parent, element);
    if let Err(e) = model.insert_at_index(parent_id, existing, to) {
        panic!("sync could not reinsert {existing} into {parent_id}: {e}");
    }
    // Edits made while the element was detached recorded no events.
    refresh(model, store, existing);
    if from == to {
        tracing::trace!(%parent, child = %element, "add already applied");
        report.skipped += 1;
    } else {
        tracing::trace!(%parent, child = %element, from, to, "moved component");
        report.moved += 1;
    }
}

/// Rebuild the child lists under `id` from the store, keeping every
/// wrapper whose element is still in place.
fn refresh<S: BackingStore + ?Sized>(model: &mut Model, store: &S, id: ComponentId) {
    let Some(element) = model.element(id) else {
        return;
    };
    let current = model.children(id).to_vec();
    for child in &current {
        model.detach(*child);
    }

    let mut kept = Vec::new();
    for child_element in store.children(element) {
        let reused = model.lookup(child_element).filter(|c| current.contains(c));
        let child = match reused {
            Some(c) => {
                kept.push(c);
                c
            }
            None => match factory::build(model, store, Some(id), child_element, false) {
                Some(c) => c,
                None => continue,
            },
        };
        let at = model.children(id).len();
        if let Err(e) = model.insert_at_index(id, child, at) {
            panic!("sync could not rebuild {id}: {e}");
        }
        if reused.is_some() {
            refresh(model, store, child);
        }
    }

    for stale in current.into_iter().filter(|c| !kept.contains(c)) {
        model.free(stale);
    }
}

/// Where `child` belongs in `parent_id`'s list: before the first wrapper
/// whose element follows `child` among the store siblings.
fn list_position<S: BackingStore + ?Sized>(
    model: &Model,
    store: &S,
    parent_id: ComponentId,
    parent: ElementId,
    child: ElementId,
) -> usize {
    let siblings = store.children(parent);
    let list = model.children(parent_id);
    let Some(at) = siblings.iter().position(|s| *s == child) else {
        return list.len();
    };
    list.iter()
        .position(|c| {
            model
                .element(*c)
                .and_then(|e| siblings.iter().position(|s| *s == e))
                .is_some_and(|p| p > at)
        })
        .unwrap_or(list.len())
}
