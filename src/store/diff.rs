//! store::diff
//!
//! Reload a [`DomStore`] from new text with minimal disruption.
//!
//! # Algorithm
//!
//! For each pair of matched elements, starting at the roots:
//!
//! 1. Rewrite attributes in place so they equal the new element's.
//! 2. Match children by the longest common subsequence keyed on
//!    (tag, attributes). Matched children keep their identity.
//! 3. Inside each gap between consecutive matches, pair remaining old and
//!    new children of the same tag in order. Pairs keep their identity and
//!    are patched in place.
//! 4. Remove every unpaired old child, then insert every unpaired new child
//!    at its final position.
//! 5. Recurse into every matched or paired child.
//!
//! Removals and insertions go through the [`BackingStore`] mutators, so the
//! store records the same structural events an interactive edit would.

use super::dom::{DomStore, ParsedDocument, ParsedElement};
use super::{BackingStore, StoreError};
use crate::core::types::ElementId;

/// What a reload did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The existing root was patched; events describe the changes.
    Patched,
    /// The root tag changed (or there was no root); a new tree replaced it
    /// without structural events.
    Replaced,
}

impl DomStore {
    /// Make the store content equal to `text`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Parse` if `text` is not well-formed; the store
    /// is left untouched in that case.
    pub fn reload(&mut self, text: &str) -> Result<ReloadOutcome, StoreError> {
        let ParsedDocument {
            doctype,
            root: parsed,
        } = ParsedDocument::parse(text)?;
        self.set_doctype(doctype);

        match self.root() {
            Some(root) if self.tag_name(root) == Some(parsed.tag.as_str()) => {
                patch(self, root, &parsed)?;
                Ok(ReloadOutcome::Patched)
            }
            _ => {
                let root = self.build_detached(&parsed);
                self.replace_root(root);
                Ok(ReloadOutcome::Replaced)
            }
        }
    }
}

fn key_of(store: &DomStore, element: ElementId) -> (Option<&str>, &[(String, String)]) {
    (store.tag_name(element), store.attributes(element))
}

fn same_key(store: &DomStore, old: ElementId, new: &ParsedElement) -> bool {
    let (tag, attributes) = key_of(store, old);
    tag == Some(new.tag.as_str()) && attributes == new.attributes.as_slice()
}

/// Longest common subsequence over keys; returns matched (old, new) index
/// pairs in increasing order.
fn lcs(store: &DomStore, old: &[ElementId], new: &[ParsedElement]) -> Vec<(usize, usize)> {
    let (n, m) = (old.len(), new.len());
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if same_key(store, old[i], &new[j]) {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if same_key(store, old[i], &new[j]) {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

/// Extend LCS anchors with same-tag pairs inside each gap.
fn pair_gaps(
    store: &DomStore,
    old: &[ElementId],
    new: &[ParsedElement],
    anchors: &[(usize, usize)],
) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let mut prev = (0usize, 0usize);
    let ends = anchors.iter().copied().chain(std::iter::once((old.len(), new.len())));

    for (anchor_old, anchor_new) in ends {
        let mut next_old = prev.0;
        for j in prev.1..anchor_new {
            let found = (next_old..anchor_old)
                .find(|&i| store.tag_name(old[i]) == Some(new[j].tag.as_str()));
            if let Some(i) = found {
                pairs.push((i, j));
                next_old = i + 1;
            }
        }
        if anchor_old < old.len() {
            pairs.push((anchor_old, anchor_new));
        }
        prev = (anchor_old + 1, anchor_new + 1);
    }
    pairs
}

fn patch(store: &mut DomStore, element: ElementId, target: &ParsedElement) -> Result<(), StoreError> {
    patch_attributes(store, element, target)?;

    let old_children = store.children(element);
    let anchors = lcs(store, &old_children, &target.children);
    let pairs = pair_gaps(store, &old_children, &target.children, &anchors);

    let mut kept: Vec<Option<ElementId>> = vec![None; target.children.len()];
    let mut survives = vec![false; old_children.len()];
    for &(i, j) in &pairs {
        kept[j] = Some(old_children[i]);
        survives[i] = true;
    }

    for (i, child) in old_children.iter().enumerate() {
        if !survives[i] {
            store.remove_child(element, *child)?;
        }
    }

    for (j, new_child) in target.children.iter().enumerate() {
        match kept[j] {
            Some(existing) => patch(store, existing, new_child)?,
            None => {
                let built = store.build_detached(new_child);
                store.insert_child(element, built, Some(j))?;
            }
        }
    }
    Ok(())
}

fn patch_attributes(
    store: &mut DomStore,
    element: ElementId,
    target: &ParsedElement,
) -> Result<(), StoreError> {
    let stale: Vec<String> = store
        .attributes(element)
        .iter()
        .filter(|(name, _)| !target.attributes.iter().any(|(n, _)| n == name))
        .map(|(name, _)| name.clone())
        .collect();
    for name in stale {
        store.set_attribute(element, &name, None)?;
    }
    for (name, value) in &target.attributes {
        if store.attribute(element, name) != Some(value.as_str()) {
            store.set_attribute(element, name, Some(value.as_str()))?;
        }
    }
    Ok(())
}
