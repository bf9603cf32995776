//! Binding configuration.
//!
//! [`BindingConfig`] names the attribute namespace and the placeholder token
//! used by the template instantiator. Every field has a default, so a config
//! file only needs the keys it changes:
//!
//! ```toml
//! namespace = "bind"
//! placeholder = "%ref%"
//! ```
//!
//! With the namespace above the engine reads `bind-model`, `bind-collection`,
//! `bind-property` and `bind-template`, and accepts the `data-bind-*` aliases.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The attribute kinds the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    /// Marks a model anchor; the value is the model reference.
    Model,
    /// Marks a collection container; the value is the collection name.
    Collection,
    /// Marks a property binding; the value is the property name.
    Property,
    /// Marks the template child of a collection container.
    Template,
}

impl Subject {
    /// Every subject, in normalization order.
    pub const ALL: [Subject; 4] = [
        Subject::Model,
        Subject::Collection,
        Subject::Property,
        Subject::Template,
    ];

    /// The attribute suffix for this subject.
    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Model => "model",
            Subject::Collection => "collection",
            Subject::Property => "property",
            Subject::Template => "template",
        }
    }
}

/// Configuration for a binding engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Attribute prefix, `td` by default.
    pub namespace: String,
    /// Token replaced with the model reference in every inserted clone.
    pub placeholder: String,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            namespace: "td".to_string(),
            placeholder: "{{ref}}".to_string(),
        }
    }
}

impl BindingConfig {
    /// Parse a config from TOML text. Missing keys fall back to defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| Error::config_io(path, e))?;
        Self::from_toml_str(&source)
    }

    /// Check that the values can form attribute names.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::invalid_config("namespace", "must not be empty"));
        }
        if self
            .namespace
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '=' | '<' | '>' | '/'))
        {
            return Err(Error::invalid_config(
                "namespace",
                format!("'{}' is not a valid attribute prefix", self.namespace),
            ));
        }
        if self.placeholder.is_empty() {
            return Err(Error::invalid_config("placeholder", "must not be empty"));
        }
        Ok(())
    }

    /// Canonical attribute name, e.g. `td-model`.
    pub fn attribute(&self, subject: Subject) -> String {
        format!("{}-{}", self.namespace, subject.as_str())
    }

    /// Alias attribute name, e.g. `data-td-model`.
    pub fn alias(&self, subject: Subject) -> String {
        format!("data-{}-{}", self.namespace, subject.as_str())
    }

    /// Shorthand for `attribute(Subject::Model)`.
    pub fn model_attribute(&self) -> String {
        self.attribute(Subject::Model)
    }

    /// Shorthand for `attribute(Subject::Collection)`.
    pub fn collection_attribute(&self) -> String {
        self.attribute(Subject::Collection)
    }

    /// Shorthand for `attribute(Subject::Property)`.
    pub fn property_attribute(&self) -> String {
        self.attribute(Subject::Property)
    }

    /// Shorthand for `attribute(Subject::Template)`.
    pub fn template_attribute(&self) -> String {
        self.attribute(Subject::Template)
    }
}
