//! Query context and update payloads.
//!
//! The engine remembers the target of the last successful `collection()` or
//! `model()` lookup so that a following `insert`, `update` or `delete` knows
//! what to act on. The context holds at most one target and any new lookup
//! replaces it.

use crate::record::PropertyMap;
use crate::selector::ModelPath;

/// What the last lookup resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    /// A collection, by name.
    Collection(String),
    /// A model, root or inside a collection.
    Model(ModelPath),
}

/// The map a target lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryParent<'a> {
    /// The map of collections.
    Collections,
    /// The map of root models.
    Models,
    /// The models of one collection.
    Collection(&'a str),
}

/// Single-slot record of the last lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryContext {
    target: Option<QueryTarget>,
}

impl QueryContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current target.
    pub fn target(&self) -> Option<&QueryTarget> {
        self.target.as_ref()
    }

    /// Whether no target is set.
    pub fn is_empty(&self) -> bool {
        self.target.is_none()
    }

    /// Map holding the target.
    pub fn parent(&self) -> Option<QueryParent<'_>> {
        Some(match self.target.as_ref()? {
            QueryTarget::Collection(_) => QueryParent::Collections,
            QueryTarget::Model(ModelPath::Root(_)) => QueryParent::Models,
            QueryTarget::Model(ModelPath::InCollection { collection, .. }) => {
                QueryParent::Collection(collection)
            }
        })
    }

    /// Key of the target inside its parent.
    pub fn selector(&self) -> Option<&str> {
        Some(match self.target.as_ref()? {
            QueryTarget::Collection(name) => name,
            QueryTarget::Model(path) => path.reference(),
        })
    }

    pub(crate) fn set(&mut self, target: QueryTarget) {
        self.target = Some(target);
    }

    pub(crate) fn clear(&mut self) {
        self.target = None;
    }
}

/// Payload for [`Engine::update`](crate::Engine::update).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Set one property, but only if the model already has it.
    Key(String, String),
    /// Set every property in the map, creating missing ones.
    Data(PropertyMap),
}

impl Update {
    /// Single-key update.
    pub fn key(key: impl Into<String>, value: impl Into<String>) -> Self {
        Update::Key(key.into(), value.into())
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for Update {
    fn from((key, value): (K, V)) -> Self {
        Update::Key(key.into(), value.into())
    }
}

impl From<PropertyMap> for Update {
    fn from(data: PropertyMap) -> Self {
        Update::Data(data)
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Update {
    fn from(pairs: [(K, V); N]) -> Self {
        Update::Data(crate::record::properties(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_and_selector() {
        let mut context = QueryContext::new();
        assert_eq!(context.parent(), None);
        assert_eq!(context.selector(), None);

        context.set(QueryTarget::Collection("items".into()));
        assert_eq!(context.parent(), Some(QueryParent::Collections));
        assert_eq!(context.selector(), Some("items"));

        context.set(QueryTarget::Model(ModelPath::in_collection("items", "a")));
        assert_eq!(context.parent(), Some(QueryParent::Collection("items")));
        assert_eq!(context.selector(), Some("a"));

        context.set(QueryTarget::Model(ModelPath::Root("header".into())));
        assert_eq!(context.parent(), Some(QueryParent::Models));

        context.clear();
        assert!(context.is_empty());
    }

    #[test]
    fn test_update_conversions() {
        assert_eq!(Update::from(("title", "Bar")), Update::key("title", "Bar"));
        match Update::from([("a", "1"), ("b", "2")]) {
            Update::Data(map) => assert_eq!(map.len(), 2),
            other => panic!("expected data update, got {other:?}"),
        }
    }
}
