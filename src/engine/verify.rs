//! engine::verify
//!
//! Post-sync consistency check.
//!
//! # Architecture
//!
//! The typed tree is a filtered projection of the store: exactly the
//! elements the schema recognizes, in document order. [`check`] computes
//! that projection straight from the store and compares its
//! [`Fingerprint`] with the model's own shape.
//!
//! # Invariants
//!
//! - Verify is read-only
//! - A mismatch after a sync indicates a reconciliation bug

use crate::core::schema::{Schema, Variant};
use crate::core::types::{ElementId, Fingerprint, ShapeEntry};
use crate::model::arena::Model;
use crate::store::BackingStore;

use super::sync::SyncError;

/// Pre-order projection of the schema-recognized part of the store.
pub fn store_shape<S: BackingStore + ?Sized>(schema: &Schema, store: &S) -> Vec<ShapeEntry> {
    let mut out = Vec::new();
    if let Some(root) = store.root() {
        collect(schema, store, None, root, 0, &mut out);
    }
    out
}

fn collect<S: BackingStore + ?Sized>(
    schema: &Schema,
    store: &S,
    parent: Option<Variant>,
    element: ElementId,
    depth: usize,
    out: &mut Vec<ShapeEntry>,
) {
    let Some(variant) = store.tag_name(element).and_then(|tag| schema.resolve(parent, tag)) else {
        return;
    };
    out.push((depth, variant, element));
    for child in store.children(element) {
        collect(schema, store, Some(variant), child, depth + 1, out);
    }
}

/// Compare the typed tree against the store.
///
/// Returns the shared fingerprint when they agree.
pub fn check<S: BackingStore + ?Sized>(model: &Model, store: &S) -> Result<Fingerprint, SyncError> {
    let expected = Fingerprint::compute(&store_shape(model.schema(), store));
    let actual = Fingerprint::compute(&model.shape());
    if expected != actual {
        tracing::error!(%expected, %actual, "typed tree diverged from store");
        return Err(SyncError::Diverged { expected, actual });
    }
    Ok(actual)
}
