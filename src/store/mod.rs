//! store
//!
//! The backing store boundary.
//!
//! # Architecture
//!
//! The backing store holds the raw element/attribute tree of a document. It
//! is the single place where document content lives: typed components read
//! attributes through it and never cache them.
//!
//! Every structural change to an element that is reachable from the root
//! is recorded as a [`StructuralEvent`]. Events accumulate until the owner
//! drains them with [`BackingStore::take_events`], so a batch of edits is
//! delivered as one ordered stream.
//!
//! # Modules
//!
//! - [`dom`] - In-memory reference store with XML parse and serialize
//! - [`diff`] - Turn a text reload into a minimal edit script

pub mod diff;
pub mod dom;

pub use dom::DomStore;

use thiserror::Error;

use crate::core::ops::lock::LockError;
use crate::core::types::{ElementId, TxId};

/// Errors from backing store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The element id does not belong to this store.
    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    /// The element is not a child of the given parent.
    #[error("element {child} is not a child of {parent}")]
    NotAChild { parent: ElementId, child: ElementId },

    /// The element already has a parent; detach it first.
    #[error("element {0} already has a parent")]
    AlreadyParented(ElementId),

    /// Inserting the element would make it its own ancestor.
    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: ElementId, child: ElementId },

    /// The requested insertion index is past the end of the child list.
    #[error("index {index} out of range for {parent} with {len} children")]
    IndexOutOfRange {
        parent: ElementId,
        index: usize,
        len: usize,
    },

    /// An out-of-band edit was attempted while a transaction holds the lock.
    #[error("store is write-locked by an open transaction")]
    WriteLocked,

    /// Lock acquisition or release failed.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The text could not be parsed as XML.
    #[error("failed to parse document: {0}")]
    Parse(String),
}

/// A notification that one child element was added to or removed from one
/// parent element.
///
/// `index` is the child's position among its element siblings at the time
/// of the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralEvent {
    Added {
        parent: ElementId,
        child: ElementId,
        index: usize,
    },
    Removed {
        parent: ElementId,
        child: ElementId,
        index: usize,
    },
}

impl StructuralEvent {
    /// The parent element the event happened under.
    pub fn parent(&self) -> ElementId {
        match self {
            StructuralEvent::Added { parent, .. } | StructuralEvent::Removed { parent, .. } => {
                *parent
            }
        }
    }

    /// The child element that was added or removed.
    pub fn child(&self) -> ElementId {
        match self {
            StructuralEvent::Added { child, .. } | StructuralEvent::Removed { child, .. } => *child,
        }
    }
}

/// The raw element tree a document model is built over.
///
/// Read accessors never fail: unknown elements read as absent. Mutators
/// report misuse through [`StoreError`].
pub trait BackingStore {
    /// The document root element, if there is one.
    fn root(&self) -> Option<ElementId>;

    /// The tag name of `element`.
    fn tag_name(&self, element: ElementId) -> Option<&str>;

    /// The parent of `element`, if it is attached to one.
    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// Child elements of `element`, in document order.
    fn children(&self, element: ElementId) -> Vec<ElementId>;

    /// The raw value of attribute `name` on `element`.
    fn attribute(&self, element: ElementId, name: &str) -> Option<&str>;

    /// Synthesize a new, detached element with no attributes.
    fn create_element(&mut self, tag: &str) -> ElementId;

    /// Write (`Some`) or remove (`None`) an attribute.
    ///
    /// Returns the previous value.
    fn set_attribute(
        &mut self,
        element: ElementId,
        name: &str,
        value: Option<&str>,
    ) -> Result<Option<String>, StoreError>;

    /// Insert a detached `child` under `parent` at `index` (append if `None`).
    ///
    /// Returns the index the child landed at.
    fn insert_child(
        &mut self,
        parent: ElementId,
        child: ElementId,
        index: Option<usize>,
    ) -> Result<usize, StoreError>;

    /// Detach `child` from `parent`. The element itself is kept.
    ///
    /// Returns the index the child was removed from.
    fn remove_child(&mut self, parent: ElementId, child: ElementId) -> Result<usize, StoreError>;

    /// Acquire the document write lock for `tx`.
    fn lock_write(&mut self, tx: &TxId) -> Result<(), StoreError>;

    /// Release the document write lock held by `tx`.
    fn unlock_write(&mut self, tx: &TxId) -> Result<(), StoreError>;

    /// Whether a transaction currently holds the write lock.
    fn is_write_locked(&self) -> bool;

    /// Number of events recorded and not yet drained.
    fn pending_events(&self) -> usize;

    /// Drain recorded events in the order they happened.
    fn take_events(&mut self) -> Vec<StructuralEvent>;

    /// Whether `element` is reachable from the document root.
    fn is_attached(&self, element: ElementId) -> bool {
        let Some(root) = self.root() else {
            return false;
        };
        let mut current = Some(element);
        while let Some(el) = current {
            if el == root {
                return true;
            }
            current = self.parent(el);
        }
        false
    }

    /// Position of `child` among the children of `parent`.
    fn index_of(&self, parent: ElementId, child: ElementId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }
}
