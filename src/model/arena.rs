//! model::arena
//!
//! Component storage.
//!
//! # Architecture
//!
//! Components live in an arena addressed by [`ComponentId`]. Parent/child
//! relationships are index lists inside the arena, so the tree has no
//! reference cycles. Each node wraps exactly one backing element and the
//! arena keeps the reverse map from element to component.
//!
//! # Invariants
//!
//! - One live component per element, at most
//! - A node's variant is fixed at allocation
//! - `children` holds only variants the parent's list kind accepts
//! - A node is attached iff it is the root or its parent is attached
//! - Slots are never reused; freed slots stay `None`

use std::collections::HashMap;

use thiserror::Error;

use crate::core::schema::{ListKind, Schema, Variant};
use crate::core::types::{ComponentId, ElementId, ModelId, ShapeEntry};

/// Errors from arena operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArenaError {
    /// The id is stale or belongs to another model.
    #[error("unknown component {0}")]
    UnknownComponent(ComponentId),

    /// The parent's list kind cannot host the child's variant.
    #[error("{parent} cannot host {child}")]
    Incompatible { parent: Variant, child: Variant },

    /// The child already sits in some parent's list.
    #[error("component {0} already has a parent")]
    AlreadyParented(ComponentId),

    /// Insertion index past the end of the list.
    #[error("index {index} out of range for list of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone)]
struct Node {
    variant: Variant,
    element: ElementId,
    parent: Option<ComponentId>,
    children: Vec<ComponentId>,
    attached: bool,
}

/// The typed component tree of one document.
#[derive(Debug, Clone)]
pub struct Model {
    id: ModelId,
    schema: Schema,
    nodes: Vec<Option<Node>>,
    by_element: HashMap<ElementId, ComponentId>,
    root: Option<ComponentId>,
}

impl Model {
    /// An empty model resolving against `schema`.
    pub fn new(schema: Schema) -> Self {
        Self {
            id: ModelId::next(),
            schema,
            nodes: Vec::new(),
            by_element: HashMap::new(),
            root: None,
        }
    }

    /// This model's identity.
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// The resolution table this model was built with.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The root `Module` component, if the document has one.
    pub fn root(&self) -> Option<ComponentId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: Option<ComponentId>) {
        self.root = root;
    }

    /// Whether `id` names a live component of this model.
    pub fn contains(&self, id: ComponentId) -> bool {
        self.node(id).is_some()
    }

    fn node(&self, id: ComponentId) -> Option<&Node> {
        if id.model() != self.id {
            return None;
        }
        self.nodes.get(id.slot())?.as_ref()
    }

    fn node_mut(&mut self, id: ComponentId) -> Result<&mut Node, ArenaError> {
        if id.model() != self.id {
            return Err(ArenaError::UnknownComponent(id));
        }
        self.nodes
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or(ArenaError::UnknownComponent(id))
    }

    /// Allocate a parentless component wrapping `element`.
    pub(crate) fn alloc(&mut self, variant: Variant, element: ElementId, attached: bool) -> ComponentId {
        let id = ComponentId::new(self.id, self.nodes.len());
        self.nodes.push(Some(Node {
            variant,
            element,
            parent: None,
            children: Vec::new(),
            attached,
        }));
        self.by_element.insert(element, id);
        id
    }

    /// The variant of `id`.
    pub fn variant(&self, id: ComponentId) -> Option<Variant> {
        self.node(id).map(|n| n.variant)
    }

    /// The backing element of `id`.
    pub fn element(&self, id: ComponentId) -> Option<ElementId> {
        self.node(id).map(|n| n.element)
    }

    /// The parent component of `id`.
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// The ordered child list of `id`, attached or not.
    pub fn children(&self, id: ComponentId) -> &[ComponentId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Whether `id` is reachable from the document root.
    pub fn is_attached(&self, id: ComponentId) -> bool {
        self.node(id).is_some_and(|n| n.attached)
    }

    /// The live component wrapping `element`.
    pub fn lookup(&self, element: ElementId) -> Option<ComponentId> {
        self.by_element
            .get(&element)
            .copied()
            .filter(|id| self.contains(*id))
    }

    /// Position of `child` in `parent`'s list, by identity.
    pub fn index_of(&self, parent: ComponentId, child: ComponentId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    /// Insert a parentless `child` into `parent`'s list at `index`.
    ///
    /// The child's subtree takes the parent's attachment state.
    pub fn insert_at_index(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
        index: usize,
    ) -> Result<(), ArenaError> {
        let parent_variant = self.variant(parent).ok_or(ArenaError::UnknownComponent(parent))?;
        let child_variant = self.variant(child).ok_or(ArenaError::UnknownComponent(child))?;
        let hosted: Option<ListKind> = parent_variant.hosted_list();
        if hosted.is_none() || hosted != child_variant.member_of() {
            return Err(ArenaError::Incompatible {
                parent: parent_variant,
                child: child_variant,
            });
        }
        if self.parent(child).is_some() || self.root == Some(child) {
            return Err(ArenaError::AlreadyParented(child));
        }
        let len = self.children(parent).len();
        if index > len {
            return Err(ArenaError::IndexOutOfRange { index, len });
        }

        let attached = self.is_attached(parent);
        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.set_attached(child, attached);
        Ok(())
    }

    /// Remove `child` from its parent's list, keeping the node alive.
    ///
    /// Returns the index it was removed from.
    pub fn detach(&mut self, child: ComponentId) -> Option<usize> {
        let parent = self.parent(child)?;
        let index = self.index_of(parent, child)?;
        self.node_mut(parent).ok()?.children.remove(index);
        self.node_mut(child).ok()?.parent = None;
        self.set_attached(child, false);
        Some(index)
    }

    /// Drop `id` and its whole subtree from the arena, detaching it first.
    pub fn free(&mut self, id: ComponentId) {
        if self.parent(id).is_some() {
            self.detach(id);
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            if let Some(node) = self.nodes[current.slot()].take() {
                if self.by_element.get(&node.element) == Some(&current) {
                    self.by_element.remove(&node.element);
                }
                stack.extend(node.children);
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }
    }

    /// Return to `snapshot`, an earlier clone of this model.
    ///
    /// Slots allocated since the snapshot stay retired, so handles created
    /// in between never alias a later component.
    pub(crate) fn restore(&mut self, mut snapshot: Model) {
        let high_water = self.nodes.len().max(snapshot.nodes.len());
        snapshot.nodes.resize_with(high_water, || None);
        *self = snapshot;
    }

    /// Set the attachment flag on a whole subtree.
    pub(crate) fn set_attached(&mut self, id: ComponentId, attached: bool) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Ok(node) = self.node_mut(current) {
                node.attached = attached;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Append `child` directly during construction.
    pub(crate) fn push_child(&mut self, parent: ComponentId, child: ComponentId) {
        let attached = self.is_attached(parent);
        if let Ok(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        if let Ok(node) = self.node_mut(child) {
            node.parent = Some(parent);
            node.attached = attached;
        }
    }

    /// Number of live components, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Whether the arena holds no live components.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pre-order projection of the attached tree.
    pub fn shape(&self) -> Vec<ShapeEntry> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect_shape(root, 0, &mut out);
        }
        out
    }

    fn collect_shape(&self, id: ComponentId, depth: usize, out: &mut Vec<ShapeEntry>) {
        let Some(node) = self.node(id) else {
            return;
        };
        out.push((depth, node.variant, node.element));
        for child in &node.children {
            self.collect_shape(*child, depth + 1, out);
        }
    }
}
