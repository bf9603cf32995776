//! Change interception.
//!
//! [`ObservedModel`] and [`ObservedCollection`] are the only ways to mutate
//! records. They borrow the document together with the record, so every
//! graph write is paired with the rendered-tree update it implies:
//!
//! - setting a model property rewrites the text of its bound elements;
//! - inserting a collection entry clones the template into every container;
//! - removing a collection entry destroys the entry's elements.
//!
//! Removing a property from a model only touches the record.

use tripled_core::logging::targets;
use tripled_core::{Document, DomResult, NodeId};

use crate::config::BindingConfig;
use crate::engine::{EngineSignals, ModelEvent, PropertyChange};
use crate::instantiate::instantiate;
use crate::query::QueryContext;
use crate::record::{CollectionRecord, ModelRecord, PropertyMap, RESERVED_KEY};
use crate::selector::ModelPath;
use crate::watch::WatcherRegistry;

/// Engine state an observed handle needs besides its record.
pub(crate) struct BindingContext<'a> {
    pub(crate) doc: &'a mut Document,
    pub(crate) config: &'a BindingConfig,
    pub(crate) watchers: &'a WatcherRegistry,
    pub(crate) signals: &'a EngineSignals,
    pub(crate) query: &'a mut QueryContext,
}

impl BindingContext<'_> {
    fn reborrow(&mut self) -> BindingContext<'_> {
        BindingContext {
            doc: &mut *self.doc,
            config: self.config,
            watchers: self.watchers,
            signals: self.signals,
            query: &mut *self.query,
        }
    }
}

/// Find the first descendant of `element` bound to `key`.
pub(crate) fn find_property(
    doc: &Document,
    config: &BindingConfig,
    element: NodeId,
    key: &str,
) -> DomResult<Option<NodeId>> {
    let attribute = config.property_attribute();
    doc.find_descendant(element, |d, node| d.attribute(node, &attribute) == Some(key))
}

/// Write handle for one model.
///
/// Watchers receive this handle, so a watcher can read the model and set
/// other properties on it.
pub struct ObservedModel<'a> {
    cx: BindingContext<'a>,
    path: ModelPath,
    record: &'a mut ModelRecord,
    active: Vec<String>,
}

impl<'a> ObservedModel<'a> {
    pub(crate) fn new(cx: BindingContext<'a>, path: ModelPath, record: &'a mut ModelRecord) -> Self {
        Self {
            cx,
            path,
            record,
            active: Vec::new(),
        }
    }

    /// Where this model lives.
    pub fn path(&self) -> &ModelPath {
        &self.path
    }

    /// Read-only view of the record.
    pub fn record(&self) -> &ModelRecord {
        self.record
    }

    /// Get a property value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.record.get(key)
    }

    /// The rendered document.
    pub fn document(&self) -> &Document {
        self.cx.doc
    }

    /// Set a property and render it.
    ///
    /// The watcher for this property runs first, unless it is already running
    /// further up the stack, and its return value is what gets stored. The
    /// query context is cleared. Returns `false` only for the reserved key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let mut value = value.into();
        if key == RESERVED_KEY {
            tracing::warn!(target: targets::OBSERVE, path = %self.path, "'{RESERVED_KEY}' cannot be set");
            return false;
        }

        if !self.active.contains(&key) {
            if let Some(watcher) = self.cx.watchers.get(self.path.scope(), &key) {
                self.active.push(key.clone());
                value = watcher(&value, self);
                self.active.pop();
            }
        }

        self.record.store(key.clone(), value.clone());
        for &element in self.record.elements() {
            match find_property(self.cx.doc, self.cx.config, element, &key) {
                Ok(Some(target)) => {
                    if let Err(e) = self.cx.doc.set_text_content(target, value.as_str()) {
                        tracing::warn!(target: targets::OBSERVE, error = %e, "failed to render property");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::trace!(target: targets::OBSERVE, ?element, error = %e, "skipping stale element");
                }
            }
        }
        self.cx.query.clear();

        tracing::debug!(target: targets::OBSERVE, path = %self.path, %key, %value, "property set");
        self.cx.signals.property_changed.emit(PropertyChange {
            path: self.path.clone(),
            key,
            value,
        });
        true
    }

    /// Set every pair in `data`.
    pub fn set_all(&mut self, data: PropertyMap) {
        for (key, value) in data {
            self.set(key, value);
        }
    }

    /// Remove a property from the record. Bound elements keep their text.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let removed = self.record.take(key);
        if removed.is_some() {
            tracing::debug!(target: targets::OBSERVE, path = %self.path, %key, "property removed");
        }
        removed
    }
}

impl std::fmt::Debug for ObservedModel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservedModel")
            .field("path", &self.path)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

/// Write handle for one collection.
pub struct ObservedCollection<'a> {
    cx: BindingContext<'a>,
    name: String,
    record: &'a mut CollectionRecord,
}

impl<'a> ObservedCollection<'a> {
    pub(crate) fn new(cx: BindingContext<'a>, name: String, record: &'a mut CollectionRecord) -> Self {
        Self { cx, name, record }
    }

    /// The collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read-only view of the record.
    pub fn record(&self) -> &CollectionRecord {
        self.record
    }

    /// Insert a model and render it into every container.
    ///
    /// Does nothing and returns `false` if the reference is empty or taken,
    /// or if `data` holds no writable property.
    pub fn insert(&mut self, reference: impl Into<String>, mut data: PropertyMap) -> bool {
        let reference = reference.into();
        if data.shift_remove(RESERVED_KEY).is_some() {
            tracing::warn!(target: targets::OBSERVE, collection = %self.name, "'{RESERVED_KEY}' dropped from insert");
        }
        if reference.is_empty() || data.is_empty() || self.record.contains_key(&reference) {
            return false;
        }

        let mut model = ModelRecord::new(data);
        for &container in self.record.elements() {
            let result = instantiate(
                self.cx.doc,
                self.cx.config,
                container,
                self.record.template(),
                &reference,
                model.properties(),
            );
            match result {
                Ok(clones) => model.elements_mut().extend(clones),
                Err(e) => {
                    tracing::warn!(target: targets::OBSERVE, collection = %self.name, %reference, error = %e, "insert failed");
                    for &clone in model.elements() {
                        let _ = self.cx.doc.remove(clone);
                    }
                    return false;
                }
            }
        }

        tracing::debug!(
            target: targets::OBSERVE,
            collection = %self.name,
            %reference,
            elements = model.elements().len(),
            "model inserted"
        );
        self.record.models_mut().insert(reference.clone(), model);
        self.cx.signals.model_inserted.emit(ModelEvent {
            path: ModelPath::in_collection(self.name.clone(), reference),
        });
        true
    }

    /// Remove a model and destroy its rendered elements.
    ///
    /// Clears the query context. Returns `false` if the reference is unknown.
    pub fn remove(&mut self, reference: &str) -> bool {
        let Some(model) = self.record.get(reference) else {
            return false;
        };
        for &element in model.elements() {
            if let Err(e) = self.cx.doc.remove(element) {
                tracing::trace!(target: targets::OBSERVE, ?element, error = %e, "element already gone");
            }
        }
        self.cx.query.clear();
        self.record.models_mut().shift_remove(reference);

        tracing::debug!(target: targets::OBSERVE, collection = %self.name, %reference, "model removed");
        self.cx.signals.model_removed.emit(ModelEvent {
            path: ModelPath::in_collection(self.name.clone(), reference),
        });
        true
    }

    /// Write handle for one of the collection's models.
    pub fn model(&mut self, reference: &str) -> Option<ObservedModel<'_>> {
        let record = self.record.models_mut().get_mut(reference)?;
        Some(ObservedModel::new(
            self.cx.reborrow(),
            ModelPath::in_collection(self.name.clone(), reference),
            record,
        ))
    }
}

impl std::fmt::Debug for ObservedCollection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservedCollection")
            .field("name", &self.name)
            .field("models", &self.record.len())
            .finish_non_exhaustive()
    }
}
