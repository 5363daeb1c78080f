//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`ElementId`] - Handle to one raw element inside a backing store
//! - [`ComponentId`] - Handle to one typed component inside a model arena
//! - [`ModelId`] - Identity of the model that owns a component
//! - [`TxId`] - Unique transaction identifier
//! - [`UtcTimestamp`] - RFC3339 timestamp
//! - [`Fingerprint`] - Tree shape hash for divergence detection
//!
//! Handles are plain copyable indices. They carry no ownership: the store
//! owns elements and the model arena owns components.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::schema::Variant;

/// Handle to a raw element held by a [`crate::store::BackingStore`].
///
/// Element ids are stable for the lifetime of the store: removing an
/// element from its parent detaches it but never invalidates the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(usize);

impl ElementId {
    /// Wrap a raw arena index.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// The raw arena index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Handle to a typed component inside a [`crate::model::Model`].
///
/// The handle names its owning model as a plain id: the model is found
/// through it, never kept alive by it. Slots are never reused, so two
/// handles compare equal exactly when they name the same component.
/// Identity across a sync is identity of this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId {
    model: ModelId,
    slot: usize,
}

impl ComponentId {
    pub(crate) fn new(model: ModelId, slot: usize) -> Self {
        Self { model, slot }
    }

    /// The model this component belongs to.
    pub fn model(&self) -> ModelId {
        self.model
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/c{}", self.model, self.slot)
    }
}

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a model.
///
/// Components record the id of the model that created them. It is used for
/// lookup checks only and never keeps anything alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(u64);

impl ModelId {
    /// Allocate a fresh, process-unique model id.
    pub fn next() -> Self {
        Self(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "model-{}", self.0)
    }
}

/// Unique identifier for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(String);

impl TxId {
    /// Generate a new unique transaction id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp in RFC3339 format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// One entry of a tree projection: nesting depth, variant, backing element.
pub type ShapeEntry = (usize, Variant, ElementId);

/// A stable hash over the ordered shape of a component tree.
///
/// Two trees hash equal when they contain the same variants, backed by the
/// same elements, in the same pre-order. Attribute values are not part of
/// the hash: they live in the store and are read through, never cached.
///
/// # Example
///
/// ```
/// use gwtmodule::core::schema::Variant;
/// use gwtmodule::core::types::{ElementId, Fingerprint};
///
/// let a = Fingerprint::compute(&[(0, Variant::Module, ElementId::new(0))]);
/// let b = Fingerprint::compute(&[(0, Variant::Module, ElementId::new(0))]);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a fingerprint from a pre-order projection.
    ///
    /// Order matters: the projection is hashed exactly as given.
    pub fn compute(entries: &[ShapeEntry]) -> Self {
        let mut hasher = Sha256::new();
        for (depth, variant, element) in entries {
            hasher.update(depth.to_le_bytes());
            hasher.update(variant.tag_name().as_bytes());
            hasher.update(b"\0");
            hasher.update(element.index().to_le_bytes());
            hasher.update(b"\n");
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_ids_are_unique() {
        let a = TxId::new();
        let b = TxId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.as_str());
    }

    #[test]
    fn model_ids_are_unique() {
        assert_ne!(ModelId::next(), ModelId::next());
    }

    #[test]
    fn element_id_display() {
        assert_eq!(ElementId::new(7).to_string(), "e7");
    }

    #[test]
    fn fingerprint_is_order_sensitive() {
        let a = (1, Variant::Inherits, ElementId::new(1));
        let b = (1, Variant::Source, ElementId::new(2));

        let forward = Fingerprint::compute(&[a, b]);
        let reversed = Fingerprint::compute(&[b, a]);
        assert_ne!(forward, reversed);
    }

    #[test]
    fn fingerprint_is_depth_sensitive() {
        let flat = Fingerprint::compute(&[(1, Variant::Include, ElementId::new(3))]);
        let nested = Fingerprint::compute(&[(2, Variant::Include, ElementId::new(3))]);
        assert_ne!(flat, nested);
        assert_eq!(flat.as_str().len(), 64);
    }
}
