//! Model and collection records.
//!
//! Records are the in-memory graph. They hold property values and the ids of
//! the rendered elements that display them; the [`Document`](tripled_core::Document)
//! owns those elements. Fields are private: anything outside this crate reads
//! a record through its getters and mutates it through
//! [`ObservedModel`](crate::ObservedModel) or
//! [`ObservedCollection`](crate::ObservedCollection), so every write reaches
//! the rendered tree.

use indexmap::IndexMap;
use tripled_core::NodeId;

/// Property name that can never be written. It used to hold the element list.
pub const RESERVED_KEY: &str = "_elements";

/// Insertion-ordered property values.
pub type PropertyMap = IndexMap<String, String>;

/// Build a [`PropertyMap`] from key/value pairs.
pub fn properties<K, V, I>(pairs: I) -> PropertyMap
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// A named record of string properties and the elements bound to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelRecord {
    properties: PropertyMap,
    elements: Vec<NodeId>,
}

impl ModelRecord {
    pub(crate) fn new(properties: PropertyMap) -> Self {
        Self {
            properties,
            elements: Vec::new(),
        }
    }

    /// Get a property value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Check if a property exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// All properties in insertion order.
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Rendered elements displaying this model.
    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    /// Merge `incoming` over the current values; incoming values win.
    pub(crate) fn merge(&mut self, incoming: PropertyMap) {
        self.properties.extend(incoming);
    }

    pub(crate) fn store(&mut self, key: String, value: String) {
        self.properties.insert(key, value);
    }

    pub(crate) fn take(&mut self, key: &str) -> Option<String> {
        self.properties.shift_remove(key)
    }

    pub(crate) fn push_element(&mut self, element: NodeId) {
        self.elements.push(element);
    }

    pub(crate) fn elements_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.elements
    }
}

/// The element subtrees a collection clones for every inserted model.
///
/// Captured once when the collection is first discovered. The subtrees are
/// detached nodes of the document and are never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    subtrees: Vec<NodeId>,
}

impl Template {
    pub(crate) fn new(subtrees: Vec<NodeId>) -> Self {
        Self { subtrees }
    }

    /// Roots of the template subtrees, in order.
    pub fn subtrees(&self) -> &[NodeId] {
        &self.subtrees
    }

    /// Number of clones produced per container by one insert.
    pub fn len(&self) -> usize {
        self.subtrees.len()
    }

    /// An empty template makes inserts produce no elements.
    pub fn is_empty(&self) -> bool {
        self.subtrees.is_empty()
    }
}

/// A named group of models rendered into one or more containers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionRecord {
    models: IndexMap<String, ModelRecord>,
    elements: Vec<NodeId>,
    template: Template,
}

impl CollectionRecord {
    pub(crate) fn new(container: NodeId, template: Template) -> Self {
        Self {
            models: IndexMap::new(),
            elements: vec![container],
            template,
        }
    }

    /// Get a model by reference.
    pub fn get(&self, reference: &str) -> Option<&ModelRecord> {
        self.models.get(reference)
    }

    /// Check if a model reference is in use.
    pub fn contains_key(&self, reference: &str) -> bool {
        self.models.contains_key(reference)
    }

    /// All models in insertion order.
    pub fn models(&self) -> &IndexMap<String, ModelRecord> {
        &self.models
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the collection holds no models.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Container elements the collection renders into.
    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    /// The captured template.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Add a container unless it is already listed.
    pub(crate) fn add_container(&mut self, container: NodeId) {
        if !self.elements.contains(&container) {
            self.elements.push(container);
        }
    }

    pub(crate) fn models_mut(&mut self) -> &mut IndexMap<String, ModelRecord> {
        &mut self.models
    }
}
