//! Property watchers.
//!
//! A watcher is registered for a (scope, property) pair. Whenever that
//! property is set through an [`ObservedModel`], the watcher runs first with
//! the incoming value and a handle to the model; the string it returns is the
//! value that gets stored and rendered. The scope is the collection name for
//! collection entries and the model reference for root models.
//!
//! ```
//! use tripled::{Engine, BindingConfig};
//!
//! let mut engine = Engine::from_markup(
//!     r#"<p td-model="cart"><b td-property="count">0</b><i td-property="label">none</i></p>"#,
//!     BindingConfig::default(),
//! ).unwrap();
//!
//! engine.watch("cart", "count", |value, model| {
//!     model.set("label", if value == "1" { "one item" } else { "items" });
//!     value.to_string()
//! });
//!
//! engine.update_at("cart", [("count", "1")]);
//! assert_eq!(engine.model_record("cart").unwrap().get("label"), Some("one item"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::observe::ObservedModel;

/// A watcher callback.
pub type Watcher = Arc<dyn Fn(&str, &mut ObservedModel<'_>) -> String + Send + Sync>;

/// Watchers keyed by scope, then property.
#[derive(Clone, Default)]
pub struct WatcherRegistry {
    scopes: HashMap<String, HashMap<String, Watcher>>,
}

impl WatcherRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a watcher, replacing any previous one for the same pair.
    pub fn register<F>(&mut self, scope: impl Into<String>, property: impl Into<String>, watcher: F)
    where
        F: Fn(&str, &mut ObservedModel<'_>) -> String + Send + Sync + 'static,
    {
        self.scopes
            .entry(scope.into())
            .or_default()
            .insert(property.into(), Arc::new(watcher));
    }

    /// Remove a watcher. Returns `true` if one was registered.
    pub fn remove(&mut self, scope: &str, property: &str) -> bool {
        let Some(properties) = self.scopes.get_mut(scope) else {
            return false;
        };
        let removed = properties.remove(property).is_some();
        if properties.is_empty() {
            self.scopes.remove(scope);
        }
        removed
    }

    /// The watcher for a (scope, property) pair.
    pub fn get(&self, scope: &str, property: &str) -> Option<Watcher> {
        self.scopes.get(scope)?.get(property).cloned()
    }

    /// Whether a watcher exists for the pair.
    pub fn contains(&self, scope: &str, property: &str) -> bool {
        self.scopes
            .get(scope)
            .is_some_and(|properties| properties.contains_key(property))
    }

    /// Total number of watchers.
    pub fn len(&self) -> usize {
        self.scopes.values().map(HashMap::len).sum()
    }

    /// Whether no watchers are registered.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Remove every watcher.
    pub fn clear(&mut self) {
        self.scopes.clear();
    }
}

impl fmt::Debug for WatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (scope, properties) in &self.scopes {
            let mut keys: Vec<_> = properties.keys().collect();
            keys.sort();
            map.entry(scope, &keys);
        }
        map.finish()
    }
}
