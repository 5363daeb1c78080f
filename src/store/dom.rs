//! store::dom
//!
//! In-memory reference backing store.
//!
//! Elements live in an arena addressed by [`ElementId`]; ids are never
//! reused. Only elements and attributes are kept: text, comments and
//! processing instructions are dropped at parse time. A `<!DOCTYPE>`
//! declaration is accepted, never validated, and written back verbatim.
//!
//! Namespaced names keep their prefix (`x:inherits`), and namespace
//! declarations are kept as `xmlns` attributes, so foreign elements never
//! resolve to a module component and survive a save unchanged.

use crate::core::config::FormatConfig;
use crate::core::ops::lock::WriteLock;
use crate::core::types::{ElementId, TxId};

use super::{BackingStore, StoreError, StructuralEvent};

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

/// A parsed element tree, detached from any store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<ParsedElement>,
}

/// A parsed document: the optional DOCTYPE and the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub doctype: Option<String>,
    pub root: ParsedElement,
}

impl ParsedDocument {
    /// Parse `text`, accepting (but not validating) a DTD.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = roxmltree::Document::parse_with_options(text, options)
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        let root = doc.root_element();
        Ok(Self {
            doctype: doctype_of(&text[..root.range().start]).map(str::to_string),
            root: ParsedElement::from_node(root),
        })
    }
}

impl ParsedElement {
    /// Parse `text` into an element tree.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        Ok(ParsedDocument::parse(text)?.root)
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let mut attributes = declared_namespaces(node);
        attributes.extend(node.attributes().map(|a| {
            (
                qualified_name(node, a.namespace(), a.name()),
                a.value().to_string(),
            )
        }));
        Self {
            tag: qualified_name(node, node.tag_name().namespace(), node.tag_name().name()),
            attributes,
            children: node
                .children()
                .filter(|child| child.is_element())
                .map(Self::from_node)
                .collect(),
        }
    }
}

fn qualified_name(node: roxmltree::Node<'_, '_>, namespace: Option<&str>, name: &str) -> String {
    match namespace.and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{name}"),
        _ => name.to_string(),
    }
}

/// Namespace bindings introduced on `node` itself, as `xmlns` attributes.
fn declared_namespaces(node: roxmltree::Node<'_, '_>) -> Vec<(String, String)> {
    let inherited = |ns: &roxmltree::Namespace<'_>| {
        node.parent_element().is_some_and(|parent| {
            parent
                .namespaces()
                .any(|p| p.name() == ns.name() && p.uri() == ns.uri())
        })
    };
    node.namespaces()
        .filter(|ns| ns.name() != Some("xml") && !inherited(*ns))
        .map(|ns| {
            let name = match ns.name() {
                Some(prefix) => format!("xmlns:{prefix}"),
                None => "xmlns".to_string(),
            };
            (name, ns.uri().to_string())
        })
        .collect()
}

/// The `<!DOCTYPE ...>` declaration in a document prolog, if any.
fn doctype_of(prolog: &str) -> Option<&str> {
    let start = prolog.find("<!DOCTYPE")?;
    let mut subset_depth = 0usize;
    let mut quote = None;
    for (offset, c) in prolog[start..].char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => subset_depth += 1,
            (None, ']') => subset_depth = subset_depth.saturating_sub(1),
            (None, '>') if subset_depth == 0 => return Some(&prolog[start..=start + offset]),
            _ => {}
        }
    }
    None
}

/// In-memory element tree implementing [`BackingStore`].
///
/// # Example
///
/// ```
/// use gwtmodule::store::{BackingStore, DomStore};
///
/// let store = DomStore::parse(r#"<module><inherits name="a.B"/></module>"#).unwrap();
/// let root = store.root().unwrap();
/// let inherits = store.children(root)[0];
/// assert_eq!(store.tag_name(inherits), Some("inherits"));
/// assert_eq!(store.attribute(inherits, "name"), Some("a.B"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DomStore {
    elements: Vec<ElementData>,
    root: Option<ElementId>,
    doctype: Option<String>,
    events: Vec<StructuralEvent>,
    lock: WriteLock,
}

impl DomStore {
    /// An empty store with no root.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose root is a fresh element named `tag`.
    pub fn with_root(tag: &str) -> Self {
        let mut store = Self::new();
        let root = store.create_element(tag);
        store.root = Some(root);
        store
    }

    /// Parse `text` into a new store.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let parsed = ParsedDocument::parse(text)?;
        let mut store = Self::new();
        let root = store.build_detached(&parsed.root);
        store.root = Some(root);
        store.doctype = parsed.doctype;
        Ok(store)
    }

    /// The document's `<!DOCTYPE>` declaration, verbatim.
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    pub(crate) fn set_doctype(&mut self, doctype: Option<String>) {
        self.doctype = doctype;
    }

    /// Replace the root element. No structural events are recorded.
    pub(crate) fn replace_root(&mut self, root: ElementId) {
        self.root = Some(root);
    }

    /// Materialize a parsed tree as a detached subtree.
    ///
    /// Nothing is attached to the document, so no events are recorded.
    pub(crate) fn build_detached(&mut self, parsed: &ParsedElement) -> ElementId {
        let id = self.create_element(&parsed.tag);
        self.elements[id.index()].attributes = parsed.attributes.clone();
        for child in &parsed.children {
            let child_id = self.build_detached(child);
            self.elements[child_id.index()].parent = Some(id);
            self.elements[id.index()].children.push(child_id);
        }
        id
    }

    /// Create an element with attributes and insert it under `parent`.
    ///
    /// Convenience for out-of-band edits; records one `Added` event when
    /// `parent` is attached.
    pub fn insert_element(
        &mut self,
        parent: ElementId,
        index: Option<usize>,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<ElementId, StoreError> {
        self.data(parent)?;
        let id = self.create_element(tag);
        self.elements[id.index()].attributes = attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.insert_child(parent, id, index)?;
        Ok(id)
    }

    /// Append a new element under `parent`.
    pub fn append_element(
        &mut self,
        parent: ElementId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<ElementId, StoreError> {
        self.insert_element(parent, None, tag, attributes)
    }

    /// All attributes of `element`, in document order.
    pub fn attributes(&self, element: ElementId) -> &[(String, String)] {
        self.elements
            .get(element.index())
            .map(|data| data.attributes.as_slice())
            .unwrap_or(&[])
    }

    /// Serialize the document rooted at [`BackingStore::root`].
    pub fn to_xml(&self, format: &FormatConfig) -> String {
        let mut out = String::new();
        if format.xml_declaration {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        }
        if let Some(doctype) = &self.doctype {
            out.push_str(doctype);
            out.push('\n');
        }
        if let Some(root) = self.root {
            self.write_element(&mut out, root, 0, &format.indent);
        }
        out
    }

    fn write_element(&self, out: &mut String, id: ElementId, depth: usize, indent: &str) {
        let data = &self.elements[id.index()];
        out.push_str(&indent.repeat(depth));
        out.push('<');
        out.push_str(&data.tag);
        for (name, value) in &data.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }
        if data.children.is_empty() {
            out.push_str("/>\n");
            return;
        }
        out.push_str(">\n");
        for child in &data.children {
            self.write_element(out, *child, depth + 1, indent);
        }
        out.push_str(&indent.repeat(depth));
        out.push_str("</");
        out.push_str(&data.tag);
        out.push_str(">\n");
    }

    fn data(&self, element: ElementId) -> Result<&ElementData, StoreError> {
        self.elements
            .get(element.index())
            .ok_or(StoreError::UnknownElement(element))
    }

    fn data_mut(&mut self, element: ElementId) -> Result<&mut ElementData, StoreError> {
        self.elements
            .get_mut(element.index())
            .ok_or(StoreError::UnknownElement(element))
    }

    fn is_ancestor_or_self(&self, candidate: ElementId, of: ElementId) -> bool {
        let mut current = Some(of);
        while let Some(el) = current {
            if el == candidate {
                return true;
            }
            current = self.parent(el);
        }
        false
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
    out
}

impl BackingStore for DomStore {
    fn root(&self) -> Option<ElementId> {
        self.root
    }

    fn tag_name(&self, element: ElementId) -> Option<&str> {
        self.elements.get(element.index()).map(|d| d.tag.as_str())
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.elements.get(element.index()).and_then(|d| d.parent)
    }

    fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.elements
            .get(element.index())
            .map(|d| d.children.clone())
            .unwrap_or_default()
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<&str> {
        self.elements
            .get(element.index())?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn create_element(&mut self, tag: &str) -> ElementId {
        let id = ElementId::new(self.elements.len());
        self.elements.push(ElementData {
            tag: tag.to_string(),
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn set_attribute(
        &mut self,
        element: ElementId,
        name: &str,
        value: Option<&str>,
    ) -> Result<Option<String>, StoreError> {
        let data = self.data_mut(element)?;
        let existing = data.attributes.iter().position(|(k, _)| k == name);
        let old = match (existing, value) {
            (Some(pos), Some(value)) => {
                Some(std::mem::replace(&mut data.attributes[pos].1, value.to_string()))
            }
            (Some(pos), None) => Some(data.attributes.remove(pos).1),
            (None, Some(value)) => {
                data.attributes.push((name.to_string(), value.to_string()));
                None
            }
            (None, None) => None,
        };
        Ok(old)
    }

    fn insert_child(
        &mut self,
        parent: ElementId,
        child: ElementId,
        index: Option<usize>,
    ) -> Result<usize, StoreError> {
        let len = self.data(parent)?.children.len();
        if self.data(child)?.parent.is_some() {
            return Err(StoreError::AlreadyParented(child));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(StoreError::Cycle { parent, child });
        }
        let index = index.unwrap_or(len);
        if index > len {
            return Err(StoreError::IndexOutOfRange { parent, index, len });
        }

        self.data_mut(parent)?.children.insert(index, child);
        self.data_mut(child)?.parent = Some(parent);

        if self.is_attached(parent) {
            self.events.push(StructuralEvent::Added {
                parent,
                child,
                index,
            });
        }
        Ok(index)
    }

    fn remove_child(&mut self, parent: ElementId, child: ElementId) -> Result<usize, StoreError> {
        let index = self
            .data(parent)?
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or(StoreError::NotAChild { parent, child })?;
        let attached = self.is_attached(parent);

        self.data_mut(parent)?.children.remove(index);
        self.data_mut(child)?.parent = None;

        if attached {
            self.events.push(StructuralEvent::Removed {
                parent,
                child,
                index,
            });
        }
        Ok(index)
    }

    fn lock_write(&mut self, tx: &TxId) -> Result<(), StoreError> {
        Ok(self.lock.acquire(tx)?)
    }

    fn unlock_write(&mut self, tx: &TxId) -> Result<(), StoreError> {
        Ok(self.lock.release(tx)?)
    }

    fn is_write_locked(&self) -> bool {
        self.lock.is_held()
    }

    fn pending_events(&self) -> usize {
        self.events.len()
    }

    fn take_events(&mut self) -> Vec<StructuralEvent> {
        std::mem::take(&mut self.events)
    }
}
