//! Dotted model selectors.
//!
//! `"header"` addresses the root model `header`; `"products.42"` addresses
//! model `42` of collection `products`. Anything else is a structural miss.

use std::fmt;
use std::str::FromStr;

/// Why a selector could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    /// The selector is an empty string.
    #[error("empty selector")]
    Empty,
    /// One of the dot-separated segments is empty.
    #[error("selector '{0}' has an empty segment")]
    EmptySegment(String),
    /// More than two segments.
    #[error("selector '{selector}' has {segments} segments, at most 2 are allowed")]
    TooManySegments { selector: String, segments: usize },
}

/// Address of a model in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelPath {
    /// A model outside any collection.
    Root(String),
    /// A model inside a collection.
    InCollection { collection: String, model: String },
}

impl ModelPath {
    /// Parse a dotted selector.
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        if selector.is_empty() {
            return Err(SelectorError::Empty);
        }
        let segments: Vec<&str> = selector.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(SelectorError::EmptySegment(selector.to_string()));
        }
        match segments.as_slice() {
            [model] => Ok(ModelPath::Root((*model).to_string())),
            [collection, model] => Ok(ModelPath::InCollection {
                collection: (*collection).to_string(),
                model: (*model).to_string(),
            }),
            _ => Err(SelectorError::TooManySegments {
                selector: selector.to_string(),
                segments: segments.len(),
            }),
        }
    }

    /// Address of a model inside a collection.
    pub fn in_collection(collection: impl Into<String>, model: impl Into<String>) -> Self {
        ModelPath::InCollection {
            collection: collection.into(),
            model: model.into(),
        }
    }

    /// The watcher scope: the collection name, or the model reference for
    /// root models.
    pub fn scope(&self) -> &str {
        match self {
            ModelPath::Root(model) => model,
            ModelPath::InCollection { collection, .. } => collection,
        }
    }

    /// The model reference.
    pub fn reference(&self) -> &str {
        match self {
            ModelPath::Root(model) => model,
            ModelPath::InCollection { model, .. } => model,
        }
    }

    /// The owning collection, if any.
    pub fn collection(&self) -> Option<&str> {
        match self {
            ModelPath::Root(_) => None,
            ModelPath::InCollection { collection, .. } => Some(collection),
        }
    }
}

impl FromStr for ModelPath {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ModelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelPath::Root(model) => write!(f, "{model}"),
            ModelPath::InCollection { collection, model } => write!(f, "{collection}.{model}"),
        }
    }
}
