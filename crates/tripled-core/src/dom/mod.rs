//! Rendered tree for TrippleD.
//!
//! Provides the in-memory document the binding engine keeps in sync:
//! - Stable node identifiers via arena-based storage
//! - Parent-child relationships with explicit detach and subtree destruction
//! - Attribute and text content access
//! - Ancestor / descendant search, deep cloning and placeholder substitution
//!
//! Nodes are owned by the [`Document`]. Anything else (models, collections)
//! only holds [`NodeId`] handles and must go through the document to mutate
//! or detach a node.
//!
//! # Key Types
//!
//! - [`Document`] - The arena owning every node
//! - [`NodeId`] - Stable handle to a node
//! - [`NodeKind`] - Element, text or comment payload
//!
//! # Example
//!
//! ```
//! use tripled_core::Document;
//!
//! let mut doc = Document::parse(r#"<ul td-collection="items"><li>One</li></ul>"#).unwrap();
//! let list = doc.first_element_child(doc.root()).unwrap().unwrap();
//! assert_eq!(doc.attribute(list, "td-collection"), Some("items"));
//!
//! let item = doc.create_element("li");
//! doc.set_text_content(item, "Two").unwrap();
//! doc.append_child(list, item).unwrap();
//! assert_eq!(doc.text_content(list).unwrap(), "OneTwo");
//! ```

mod markup;

use slotmap::{new_key_type, SlotMap};

use crate::error::{DomError, DomResult};
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a node in a [`Document`].
    ///
    /// `NodeId`s stay valid while the node is detached and become invalid
    /// once the node is destroyed with [`Document::remove`].
    pub struct NodeId;
}

impl NodeId {
    /// Convert the id to a raw u64 value.
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The synthetic document root. Exactly one per document.
    Document,
    /// An element with a tag name and ordered attributes.
    Element {
        /// Tag name as written in the markup.
        name: String,
        /// Attributes in source order.
        attributes: Vec<(String, String)>,
    },
    /// A text node.
    Text(String),
    /// A comment node.
    Comment(String),
}

/// Internal data stored in the arena for each node.
#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// The rendered tree.
///
/// Uses arena-based storage via SlotMap for stable node ids. A freshly
/// created node is detached; it becomes part of the rendered tree once it is
/// appended below [`Document::root`] (directly or through its ancestors).
#[derive(Debug, Clone)]
pub struct Document {
    nodes: SlotMap<NodeId, NodeData>,
    root: NodeId,
}

impl Document {
    /// Create an empty document containing only the root node.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(NodeData::new(NodeKind::Document));
        Self { nodes, root }
    }

    /// The synthetic root node. Top-level markup elements are its children.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes stored in the arena, detached nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check if a node exists in the arena.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    fn data(&self, id: NodeId) -> DomResult<&NodeData> {
        self.nodes.get(id).ok_or(DomError::InvalidNodeId(id))
    }

    fn data_mut(&mut self, id: NodeId) -> DomResult<&mut NodeData> {
        self.nodes.get_mut(id).ok_or(DomError::InvalidNodeId(id))
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Create a detached element.
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.nodes.insert(NodeData::new(NodeKind::Element {
            name: name.into(),
            attributes: Vec::new(),
        }));
        tracing::trace!(target: targets::DOM, ?id, "created element");
        id
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.nodes.insert(NodeData::new(NodeKind::Text(text.into())))
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.nodes.insert(NodeData::new(NodeKind::Comment(text.into())))
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Get the payload of a node.
    pub fn kind(&self, id: NodeId) -> DomResult<&NodeKind> {
        self.data(id).map(|d| &d.kind)
    }

    /// Whether the node is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(
            self.nodes.get(id).map(|d| &d.kind),
            Some(NodeKind::Element { .. })
        )
    }

    /// Tag name of an element, `None` for other nodes.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id).map(|d| &d.kind) {
            Some(NodeKind::Element { name, .. }) => Some(name),
            _ => None,
        }
    }

    /// Get the parent of a node.
    pub fn parent(&self, id: NodeId) -> DomResult<Option<NodeId>> {
        self.data(id).map(|d| d.parent)
    }

    /// Get the children of a node.
    pub fn children(&self, id: NodeId) -> DomResult<&[NodeId]> {
        self.data(id).map(|d| d.children.as_slice())
    }

    /// Get the element children of a node, skipping text and comments.
    pub fn child_elements(&self, id: NodeId) -> DomResult<Vec<NodeId>> {
        Ok(self
            .children(id)?
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
            .collect())
    }

    /// Get the first element child of a node.
    pub fn first_element_child(&self, id: NodeId) -> DomResult<Option<NodeId>> {
        Ok(self
            .children(id)?
            .iter()
            .copied()
            .find(|&child| self.is_element(child)))
    }

    /// Whether the node is connected to the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == self.root {
                return true;
            }
            current = self.nodes.get(current_id).and_then(|d| d.parent);
        }
        false
    }

    /// Check if `potential_ancestor` is `id` or one of its ancestors.
    fn is_ancestor_or_self(&self, potential_ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == potential_ancestor {
                return true;
            }
            current = self.nodes.get(current_id).and_then(|d| d.parent);
        }
        false
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// The child is detached from its previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.data(parent)?;
        self.data(child)?;
        // A leaf can only be an ancestor of `parent` by being `parent`.
        let has_children = !self.data(child)?.children.is_empty();
        if child == parent || (has_children && self.is_ancestor_or_self(child, parent)) {
            return Err(DomError::CircularParentage);
        }

        self.detach(child)?;
        self.data_mut(child)?.parent = Some(parent);
        self.data_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Remove a node from its parent without destroying it.
    ///
    /// Detaching an already detached node is a no-op.
    pub fn detach(&mut self, id: NodeId) -> DomResult<()> {
        let old_parent = self.data(id)?.parent;
        if let Some(parent_id) = old_parent {
            if let Some(parent_data) = self.nodes.get_mut(parent_id) {
                parent_data.children.retain(|&child| child != id);
            }
            self.data_mut(id)?.parent = None;
            tracing::trace!(target: targets::DOM, ?id, ?parent_id, "detached node");
        }
        Ok(())
    }

    /// Detach a node and destroy it together with all of its descendants.
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        if id == self.root {
            return Err(DomError::RootNode);
        }
        self.detach(id)?;
        let descendants = self.descendants(id)?;
        for descendant in descendants {
            self.nodes.remove(descendant);
        }
        self.nodes.remove(id);
        Ok(())
    }

    /// All ancestors of a node, from its parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> DomResult<Vec<NodeId>> {
        let mut result = Vec::new();
        let mut current = self.data(id)?.parent;
        while let Some(current_id) = current {
            result.push(current_id);
            current = self.nodes.get(current_id).and_then(|d| d.parent);
        }
        Ok(result)
    }

    /// All descendants of a node in document (pre-)order, excluding the node itself.
    pub fn descendants(&self, id: NodeId) -> DomResult<Vec<NodeId>> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.data(id)?.children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.data(node)?.children.iter().rev());
        }
        Ok(result)
    }

    /// Find the first descendant (document order) matching `predicate`.
    pub fn find_descendant<F>(&self, id: NodeId, mut predicate: F) -> DomResult<Option<NodeId>>
    where
        F: FnMut(&Self, NodeId) -> bool,
    {
        Ok(self
            .descendants(id)?
            .into_iter()
            .find(|&node| predicate(self, node)))
    }

    /// Find every descendant (document order) matching `predicate`.
    pub fn find_descendants<F>(&self, id: NodeId, mut predicate: F) -> DomResult<Vec<NodeId>>
    where
        F: FnMut(&Self, NodeId) -> bool,
    {
        Ok(self
            .descendants(id)?
            .into_iter()
            .filter(|&node| predicate(self, node))
            .collect())
    }

    /// Walk from `id` up to the root and return the first node matching
    /// `predicate`, starting with `id` itself.
    pub fn closest<F>(&self, id: NodeId, mut predicate: F) -> DomResult<Option<NodeId>>
    where
        F: FnMut(&Self, NodeId) -> bool,
    {
        self.data(id)?;
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == self.root {
                break;
            }
            if predicate(self, current_id) {
                return Ok(Some(current_id));
            }
            current = self.nodes.get(current_id).and_then(|d| d.parent);
        }
        Ok(None)
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Get an attribute value. Non-elements and unknown ids have no attributes.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.nodes.get(id).map(|d| &d.kind) {
            Some(NodeKind::Element { attributes, .. }) => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// Check if an element carries an attribute.
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Get all attributes of an element in source order.
    pub fn attributes(&self, id: NodeId) -> DomResult<&[(String, String)]> {
        match &self.data(id)?.kind {
            NodeKind::Element { attributes, .. } => Ok(attributes),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    /// Set an attribute, replacing the value in place if it already exists.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> DomResult<()> {
        let name = name.into();
        let value = value.into();
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => {
                match attributes.iter_mut().find(|(key, _)| *key == name) {
                    Some(slot) => slot.1 = value,
                    None => attributes.push((name, value)),
                }
                Ok(())
            }
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => {
                let position = attributes.iter().position(|(key, _)| key == name);
                Ok(position.map(|index| attributes.remove(index).1))
            }
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    // =========================================================================
    // Text
    // =========================================================================

    /// Concatenated text of the node and all of its descendants.
    pub fn text_content(&self, id: NodeId) -> DomResult<String> {
        let mut output = String::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let data = self.data(node)?;
            match &data.kind {
                NodeKind::Text(text) => output.push_str(text),
                NodeKind::Comment(_) => {}
                NodeKind::Document | NodeKind::Element { .. } => {
                    stack.extend(data.children.iter().rev());
                }
            }
        }
        Ok(output)
    }

    /// Replace every child of a node with a single text node.
    ///
    /// On a text node the text itself is replaced.
    pub fn set_text_content(&mut self, id: NodeId, text: impl Into<String>) -> DomResult<()> {
        let text = text.into();
        if let NodeKind::Text(current) = &mut self.data_mut(id)?.kind {
            *current = text;
            return Ok(());
        }

        let children = self.data(id)?.children.clone();
        for child in children {
            self.remove(child)?;
        }
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(id, text_node)?;
        }
        Ok(())
    }

    /// Replace every occurrence of `token` with `replacement` in the text
    /// nodes and attribute values of a subtree (the node itself included).
    ///
    /// Returns the number of nodes that changed.
    pub fn replace_text(&mut self, id: NodeId, token: &str, replacement: &str) -> DomResult<usize> {
        if token.is_empty() {
            return Ok(0);
        }
        let mut nodes = vec![id];
        nodes.extend(self.descendants(id)?);

        let mut changed = 0;
        for node in nodes {
            let data = self.data_mut(node)?;
            let touched = match &mut data.kind {
                NodeKind::Text(text) if text.contains(token) => {
                    *text = text.replace(token, replacement);
                    true
                }
                NodeKind::Element { attributes, .. } => {
                    let mut touched = false;
                    for (_, value) in attributes.iter_mut() {
                        if value.contains(token) {
                            *value = value.replace(token, replacement);
                            touched = true;
                        }
                    }
                    touched
                }
                _ => false,
            };
            if touched {
                changed += 1;
            }
        }
        Ok(changed)
    }

    // =========================================================================
    // Cloning
    // =========================================================================

    /// Deep-clone a subtree. The clone is detached.
    ///
    /// Nodes are copied parent first, so every copy can be appended to the
    /// copy of its parent as soon as it exists.
    pub fn deep_clone(&mut self, id: NodeId) -> DomResult<NodeId> {
        let kind = self.data(id)?.kind.clone();
        let clone = self.nodes.insert(NodeData::new(kind));

        // (source, copy of its parent)
        let mut stack: Vec<(NodeId, NodeId)> = self
            .data(id)?
            .children
            .iter()
            .rev()
            .map(|&child| (child, clone))
            .collect();
        while let Some((source, parent)) = stack.pop() {
            let data = self.data(source)?;
            let kind = data.kind.clone();
            let children = data.children.clone();

            let copy = self.nodes.insert(NodeData::new(kind));
            self.data_mut(copy)?.parent = Some(parent);
            self.data_mut(parent)?.children.push(copy);
            stack.extend(children.into_iter().rev().map(|child| (child, copy)));
        }
        Ok(clone)
    }
}

static_assertions::assert_impl_all!(Document: Send, Sync);

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element_with_text(doc: &mut Document, name: &str, text: &str) -> NodeId {
        let element = doc.create_element(name);
        doc.set_text_content(element, text).unwrap();
        element
    }

    #[test]
    fn test_append_and_parent() {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        let item = doc.create_element("li");
        doc.append_child(doc.root(), list).unwrap();
        doc.append_child(list, item).unwrap();

        assert_eq!(doc.parent(item).unwrap(), Some(list));
        assert_eq!(doc.children(list).unwrap(), &[item]);
        assert!(doc.is_attached(item));
    }

    #[test]
    fn test_circular_append_rejected() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();

        assert_eq!(
            doc.append_child(inner, outer),
            Err(DomError::CircularParentage)
        );
        assert_eq!(doc.append_child(outer, outer), Err(DomError::CircularParentage));
    }

    #[test]
    fn test_reparenting_moves_node() {
        let mut doc = Document::new();
        let first = doc.create_element("ul");
        let second = doc.create_element("ul");
        let item = doc.create_element("li");
        doc.append_child(first, item).unwrap();
        doc.append_child(second, item).unwrap();

        assert!(doc.children(first).unwrap().is_empty());
        assert_eq!(doc.children(second).unwrap(), &[item]);
    }

    #[test]
    fn test_detach_keeps_node() {
        let mut doc = Document::new();
        let item = doc.create_element("li");
        doc.append_child(doc.root(), item).unwrap();
        doc.detach(item).unwrap();

        assert!(doc.contains(item));
        assert!(!doc.is_attached(item));
        assert!(doc.children(doc.root()).unwrap().is_empty());
    }

    #[test]
    fn test_remove_destroys_subtree() {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        let item = element_with_text(&mut doc, "li", "One");
        doc.append_child(doc.root(), list).unwrap();
        doc.append_child(list, item).unwrap();
        let text = doc.children(item).unwrap()[0];

        doc.remove(list).unwrap();
        assert!(!doc.contains(list));
        assert!(!doc.contains(item));
        assert!(!doc.contains(text));
        assert_eq!(doc.parent(item), Err(DomError::InvalidNodeId(item)));
    }

    #[test]
    fn test_attributes() {
        let mut doc = Document::new();
        let element = doc.create_element("span");
        doc.set_attribute(element, "td-property", "title").unwrap();
        doc.set_attribute(element, "class", "a").unwrap();
        doc.set_attribute(element, "class", "b").unwrap();

        assert_eq!(doc.attribute(element, "td-property"), Some("title"));
        assert_eq!(doc.attributes(element).unwrap().len(), 2);
        assert_eq!(doc.remove_attribute(element, "class").unwrap(), Some("b".into()));
        assert!(!doc.has_attribute(element, "class"));

        let text = doc.create_text("x");
        assert_eq!(doc.set_attribute(text, "a", "b"), Err(DomError::NotAnElement(text)));
    }

    #[test]
    fn test_text_content_roundtrip() {
        let mut doc = Document::new();
        let outer = doc.create_element("p");
        let inner = element_with_text(&mut doc, "b", "bold");
        let before = doc.create_text("plain ");
        doc.append_child(outer, before).unwrap();
        doc.append_child(outer, inner).unwrap();

        assert_eq!(doc.text_content(outer).unwrap(), "plain bold");

        doc.set_text_content(outer, "replaced").unwrap();
        assert_eq!(doc.text_content(outer).unwrap(), "replaced");
        assert!(!doc.contains(inner));
    }

    #[test]
    fn test_closest_is_inclusive_and_stops_at_root() {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        doc.set_attribute(list, "td-collection", "items").unwrap();
        let item = doc.create_element("li");
        doc.append_child(doc.root(), list).unwrap();
        doc.append_child(list, item).unwrap();

        let found = doc
            .closest(item, |d, n| d.has_attribute(n, "td-collection"))
            .unwrap();
        assert_eq!(found, Some(list));
        let itself = doc.closest(list, |d, n| d.has_attribute(n, "td-collection")).unwrap();
        assert_eq!(itself, Some(list));
        let none = doc.closest(item, |d, n| d.has_attribute(n, "missing")).unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        let d = doc.create_element("d");
        doc.append_child(a, b).unwrap();
        doc.append_child(b, c).unwrap();
        doc.append_child(a, d).unwrap();

        assert_eq!(doc.descendants(a).unwrap(), vec![b, c, d]);
        assert_eq!(doc.ancestors(c).unwrap(), vec![b, a]);
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let mut doc = Document::new();
        let item = doc.create_element("li");
        let title = element_with_text(&mut doc, "span", "Before");
        doc.append_child(item, title).unwrap();

        let clone = doc.deep_clone(item).unwrap();
        assert_ne!(clone, item);
        assert_eq!(doc.parent(clone).unwrap(), None);

        let cloned_title = doc.first_element_child(clone).unwrap().unwrap();
        doc.set_text_content(cloned_title, "Changed").unwrap();
        assert_eq!(doc.text_content(item).unwrap(), "Before");
        assert_eq!(doc.text_content(clone).unwrap(), "Changed");
    }

    #[test]
    fn test_deeply_nested_subtree() {
        const DEPTH: usize = 100_000;
        let mut doc = Document::new();
        let mut top = element_with_text(&mut doc, "b", "deep");
        let leaf = top;
        for _ in 0..DEPTH {
            let wrapper = doc.create_element("div");
            doc.append_child(wrapper, top).unwrap();
            top = wrapper;
        }
        let root = doc.root();
        doc.append_child(root, top).unwrap();

        assert_eq!(doc.descendants(top).unwrap().len(), DEPTH + 1);
        assert_eq!(doc.text_content(top).unwrap(), "deep");
        assert!(doc.closest(leaf, |d, n| d.tag_name(n) == Some("div")).unwrap().is_some());

        let clone = doc.deep_clone(top).unwrap();
        assert_eq!(doc.descendants(clone).unwrap().len(), DEPTH + 1);
        assert_eq!(doc.text_content(clone).unwrap(), "deep");

        let markup = doc.to_markup();
        assert!(markup.starts_with("<div><div>"));
        assert!(markup.contains("<b>deep</b></div>"));

        doc.remove(top).unwrap();
        doc.remove(clone).unwrap();
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn test_replace_text_covers_attributes() {
        let mut doc = Document::new();
        let link = doc.create_element("a");
        doc.set_attribute(link, "href", "/items/{{ref}}").unwrap();
        let label = doc.create_text("Item {{ref}}");
        doc.append_child(link, label).unwrap();

        let changed = doc.replace_text(link, "{{ref}}", "42").unwrap();
        assert_eq!(changed, 2);
        assert_eq!(doc.attribute(link, "href"), Some("/items/42"));
        assert_eq!(doc.text_content(link).unwrap(), "Item 42");
    }
}
