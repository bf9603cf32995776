//! The binding engine.
//!
//! [`Engine`] owns the rendered tree and the graph built from it, and exposes
//! the query/mutation API:
//!
//! ```
//! use tripled::{BindingConfig, Engine, properties};
//!
//! let mut engine = Engine::from_markup(
//!     r#"<ul td-collection="items"><li td-model="a"><span td-property="title">Foo</span></li></ul>"#,
//!     BindingConfig::default(),
//! ).unwrap();
//!
//! engine
//!     .collection("items")
//!     .and_then(|q| q.insert("b", properties([("title", "Baz")])))
//!     .map(|q| q.update(("title", "Bar")));
//!
//! assert_eq!(
//!     engine.document().to_markup(),
//!     r#"<ul td-collection="items"><li td-model="a"><span td-property="title">Foo</span></li><li td-model="b"><span td-property="title">Bar</span></li></ul>"#,
//! );
//! ```
//!
//! Lookups that miss log a warning and return `None`. Mutations that do not
//! apply return `false` and leave everything untouched.

use indexmap::IndexMap;
use tripled_core::logging::targets;
use tripled_core::{Document, Signal};

use crate::config::BindingConfig;
use crate::error::Result;
use crate::normalize::normalize;
use crate::observe::{BindingContext, ObservedCollection, ObservedModel};
use crate::query::{QueryContext, QueryTarget, Update};
use crate::record::{CollectionRecord, ModelRecord, PropertyMap};
use crate::scanner::scan;
use crate::selector::ModelPath;
use crate::watch::WatcherRegistry;

/// Payload of [`EngineSignals::property_changed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    /// The model that changed.
    pub path: ModelPath,
    /// Property name.
    pub key: String,
    /// Stored value, after watchers ran.
    pub value: String,
}

/// Payload of [`EngineSignals::model_inserted`] and
/// [`EngineSignals::model_removed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEvent {
    /// The model that was inserted or removed.
    pub path: ModelPath,
}

/// Notifications emitted after the graph and the tree have been updated.
#[derive(Debug, Default)]
pub struct EngineSignals {
    /// A model property was set.
    pub property_changed: Signal<PropertyChange>,
    /// A model was inserted into a collection.
    pub model_inserted: Signal<ModelEvent>,
    /// A model was deleted.
    pub model_removed: Signal<ModelEvent>,
}

/// Reactive binding between a document and its data graph.
#[derive(Debug)]
pub struct Engine {
    doc: Document,
    config: BindingConfig,
    collections: IndexMap<String, CollectionRecord>,
    models: IndexMap<String, ModelRecord>,
    query: QueryContext,
    watchers: WatcherRegistry,
    signals: EngineSignals,
}

static_assertions::assert_impl_all!(Engine: Send);

impl Engine {
    /// Normalize and scan `doc`, then bind it.
    pub fn new(mut doc: Document, config: BindingConfig) -> Result<Self> {
        config.validate()?;
        normalize(&mut doc, &config)?;
        let graph = scan(&mut doc, &config)?;
        Ok(Self {
            doc,
            config,
            collections: graph.collections,
            models: graph.models,
            query: QueryContext::new(),
            watchers: WatcherRegistry::new(),
            signals: EngineSignals::default(),
        })
    }

    /// Parse `markup` and bind it.
    pub fn from_markup(markup: &str, config: BindingConfig) -> Result<Self> {
        Self::new(Document::parse(markup)?, config)
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// The rendered tree.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The configuration in use.
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// All collections.
    pub fn collections(&self) -> &IndexMap<String, CollectionRecord> {
        &self.collections
    }

    /// All root models.
    pub fn models(&self) -> &IndexMap<String, ModelRecord> {
        &self.models
    }

    /// A collection by name. Does not touch the query context.
    pub fn collection_record(&self, name: &str) -> Option<&CollectionRecord> {
        self.collections.get(name)
    }

    /// A model by dotted selector. Does not touch the query context.
    pub fn model_record(&self, selector: &str) -> Option<&ModelRecord> {
        let path = ModelPath::parse(selector).ok()?;
        self.record_at(&path)
    }

    fn record_at(&self, path: &ModelPath) -> Option<&ModelRecord> {
        match path {
            ModelPath::Root(model) => self.models.get(model),
            ModelPath::InCollection { collection, model } => {
                self.collections.get(collection)?.get(model)
            }
        }
    }

    /// The target of the last lookup.
    pub fn query_context(&self) -> &QueryContext {
        &self.query
    }

    /// Change notifications.
    pub fn signals(&self) -> &EngineSignals {
        &self.signals
    }

    /// Registered watchers.
    pub fn watchers(&self) -> &WatcherRegistry {
        &self.watchers
    }

    // =========================================================================
    // Watchers
    // =========================================================================

    /// Run `watcher` whenever `property` is set on a model of `scope`.
    ///
    /// `scope` is a collection name or a root model reference. The watcher
    /// gets the incoming value and the model; its return value is stored.
    pub fn watch<F>(&mut self, scope: impl Into<String>, property: impl Into<String>, watcher: F)
    where
        F: Fn(&str, &mut ObservedModel<'_>) -> String + Send + Sync + 'static,
    {
        self.watchers.register(scope, property, watcher);
    }

    /// Remove a watcher. Returns `true` if one was registered.
    pub fn unwatch(&mut self, scope: &str, property: &str) -> bool {
        self.watchers.remove(scope, property)
    }

    // =========================================================================
    // Observed handles
    // =========================================================================

    /// Split the engine into the shared binding state and the two record maps.
    fn binding_context(
        &mut self,
    ) -> (
        BindingContext<'_>,
        &mut IndexMap<String, CollectionRecord>,
        &mut IndexMap<String, ModelRecord>,
    ) {
        (
            BindingContext {
                doc: &mut self.doc,
                config: &self.config,
                watchers: &self.watchers,
                signals: &self.signals,
                query: &mut self.query,
            },
            &mut self.collections,
            &mut self.models,
        )
    }

    /// Write handle for a model. Setting a property through it renders the
    /// value and clears the query context.
    pub fn observed_model(&mut self, path: &ModelPath) -> Option<ObservedModel<'_>> {
        let (cx, collections, models) = self.binding_context();
        let record = match path {
            ModelPath::Root(model) => models.get_mut(model)?,
            ModelPath::InCollection { collection, model } => {
                collections.get_mut(collection)?.models_mut().get_mut(model)?
            }
        };
        Some(ObservedModel::new(cx, path.clone(), record))
    }

    /// Write handle for a collection.
    pub fn observed_collection(&mut self, name: &str) -> Option<ObservedCollection<'_>> {
        let (cx, collections, _) = self.binding_context();
        let record = collections.get_mut(name)?;
        Some(ObservedCollection::new(cx, name.to_string(), record))
    }

    // =========================================================================
    // Query API
    // =========================================================================

    /// Look up a collection and make it the query target.
    pub fn collection(&mut self, selector: &str) -> Option<Query<'_>> {
        self.query.clear();
        if !self.collections.contains_key(selector) {
            tracing::warn!(target: targets::QUERY, %selector, "collection not found");
            return None;
        }
        self.query.set(QueryTarget::Collection(selector.to_string()));
        Some(Query { engine: self })
    }

    /// Look up a model by dotted selector and make it the query target.
    pub fn model(&mut self, selector: &str) -> Option<Query<'_>> {
        self.query.clear();
        let path = match ModelPath::parse(selector) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(target: targets::QUERY, %selector, error = %e, "model not found");
                return None;
            }
        };
        if self.record_at(&path).is_none() {
            tracing::warn!(target: targets::QUERY, %selector, "model not found");
            return None;
        }
        self.query.set(QueryTarget::Model(path));
        Some(Query { engine: self })
    }

    /// Insert a model into the targeted collection.
    ///
    /// Needs a collection target, a non-empty unused reference and non-empty
    /// data; otherwise nothing happens. On success the inserted model becomes
    /// the query target.
    pub fn insert(&mut self, reference: &str, data: PropertyMap) -> bool {
        let Some(QueryTarget::Collection(name)) = self.query.target().cloned() else {
            tracing::debug!(target: targets::QUERY, %reference, "insert needs a collection target");
            return false;
        };
        let inserted = self
            .observed_collection(&name)
            .is_some_and(|mut collection| collection.insert(reference, data));
        if inserted {
            self.query
                .set(QueryTarget::Model(ModelPath::in_collection(name, reference)));
        }
        inserted
    }

    /// Update the targeted model.
    ///
    /// [`Update::Key`] only applies when the property already exists;
    /// [`Update::Data`] sets every pair and needs at least one. Clears the
    /// query context when it applies.
    pub fn update(&mut self, update: impl Into<Update>) -> bool {
        let path = match self.query.target() {
            Some(QueryTarget::Model(path)) => path.clone(),
            Some(QueryTarget::Collection(name)) => {
                tracing::warn!(target: targets::QUERY, collection = %name, "cannot update a collection");
                return false;
            }
            None => return false,
        };
        let Some(mut model) = self.observed_model(&path) else {
            return false;
        };
        match update.into() {
            Update::Key(key, value) => {
                if !model.record().contains_key(&key) {
                    tracing::debug!(target: targets::QUERY, %path, %key, "update skipped: unknown key");
                    return false;
                }
                model.set(key, value)
            }
            Update::Data(data) => {
                if data.is_empty() {
                    tracing::debug!(target: targets::QUERY, %path, "update skipped: no data");
                    return false;
                }
                model.set_all(data);
                true
            }
        }
    }

    /// Delete the query target and clear the context.
    ///
    /// A collection entry loses its rendered elements. A root model or a
    /// whole collection is only dropped from the graph; its elements stay.
    pub fn delete(&mut self) -> bool {
        let Some(target) = self.query.target().cloned() else {
            return false;
        };
        self.query.clear();

        match target {
            QueryTarget::Model(ModelPath::InCollection { collection, model }) => self
                .observed_collection(&collection)
                .is_some_and(|mut handle| handle.remove(&model)),
            QueryTarget::Model(ModelPath::Root(model)) => {
                if self.models.shift_remove(&model).is_none() {
                    return false;
                }
                tracing::debug!(target: targets::QUERY, %model, "root model deleted");
                self.signals.model_removed.emit(ModelEvent {
                    path: ModelPath::Root(model),
                });
                true
            }
            QueryTarget::Collection(name) => {
                let Some(record) = self.collections.shift_remove(&name) else {
                    return false;
                };
                for &subtree in record.template().subtrees() {
                    let _ = self.doc.remove(subtree);
                }
                tracing::debug!(target: targets::QUERY, collection = %name, "collection deleted");
                true
            }
        }
    }

    /// Look up a model and update it in one call.
    pub fn update_at(&mut self, selector: &str, update: impl Into<Update>) -> bool {
        self.model(selector).is_some_and(|query| query.update(update))
    }

    /// Look up a model and delete it in one call.
    pub fn delete_at(&mut self, selector: &str) -> bool {
        self.model(selector).is_some_and(Query::delete)
    }
}

/// Handle returned by a successful lookup.
///
/// It borrows the engine, so the query context cannot change underneath it.
#[derive(Debug)]
pub struct Query<'a> {
    engine: &'a mut Engine,
}

impl<'a> Query<'a> {
    /// The current query target.
    pub fn target(&self) -> Option<&QueryTarget> {
        self.engine.query.target()
    }

    /// The targeted model, if the target is a model.
    pub fn model_record(&self) -> Option<&ModelRecord> {
        match self.engine.query.target()? {
            QueryTarget::Model(path) => self.engine.record_at(path),
            QueryTarget::Collection(_) => None,
        }
    }

    /// The targeted collection, if the target is a collection.
    pub fn collection_record(&self) -> Option<&CollectionRecord> {
        match self.engine.query.target()? {
            QueryTarget::Collection(name) => self.engine.collections.get(name),
            QueryTarget::Model(_) => None,
        }
    }

    /// A property of the targeted model.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.model_record()?.get(key)
    }

    /// See [`Engine::insert`]. Returns the handle, now targeting the new
    /// model, on success.
    pub fn insert(self, reference: &str, data: PropertyMap) -> Option<Query<'a>> {
        if self.engine.insert(reference, data) {
            Some(self)
        } else {
            None
        }
    }

    /// See [`Engine::update`].
    pub fn update(self, update: impl Into<Update>) -> bool {
        self.engine.update(update)
    }

    /// See [`Engine::delete`].
    pub fn delete(self) -> bool {
        self.engine.delete()
    }

    /// Give the engine back.
    pub fn into_engine(self) -> &'a mut Engine {
        self.engine
    }
}
