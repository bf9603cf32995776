//! TrippleD: declarative data binding for markup documents.
//!
//! Elements declare what they display with a handful of attributes:
//!
//! - `td-model="ref"` marks the anchor of a model;
//! - `td-collection="name"` marks a container of models;
//! - `td-property="key"` binds an element's text to a model property;
//! - `td-template` marks the child of a container to clone for new entries.
//!
//! `data-td-*` spellings are accepted too. [`Engine`] scans the document once,
//! builds the matching graph of models and collections, and from then on keeps
//! the document in sync with every write to that graph.
//!
//! # Example
//!
//! ```
//! use tripled::{BindingConfig, Engine, properties};
//!
//! let markup = r#"<div>
//!     <h1 td-model="header"><span td-property="title">Products</span></h1>
//!     <ul td-collection="products">
//!         <li td-model="1"><span td-property="name">Tea</span></li>
//!     </ul>
//! </div>"#;
//!
//! let mut engine = Engine::from_markup(markup, BindingConfig::default()).unwrap();
//!
//! engine.update_at("header", ("title", "Our products"));
//! engine.collection("products").and_then(|q| q.insert("2", properties([("name", "Coffee")])));
//! engine.delete_at("products.1");
//!
//! assert_eq!(
//!     engine.document().to_markup(),
//!     r#"<div><h1 td-model="header"><span td-property="title">Our products</span></h1><ul td-collection="products"><li td-model="2"><span td-property="name">Coffee</span></li></ul></div>"#,
//! );
//! ```
//!
//! # Global instance
//!
//! Applications that bind a single document can install the engine globally
//! with [`bootstrap`] and reach it through [`with_engine`].

pub mod config;
pub mod engine;
mod error;
pub mod global;
mod instantiate;
pub mod normalize;
pub mod observe;
pub mod query;
pub mod record;
pub mod scanner;
pub mod selector;
pub mod watch;

pub use config::{BindingConfig, Subject};
pub use engine::{Engine, EngineSignals, ModelEvent, PropertyChange, Query};
pub use error::{Error, Result};
pub use global::{bootstrap, install, is_initialized, teardown, with_engine};
pub use observe::{ObservedCollection, ObservedModel};
pub use query::{QueryContext, QueryParent, QueryTarget, Update};
pub use record::{properties, CollectionRecord, ModelRecord, PropertyMap, Template, RESERVED_KEY};
pub use selector::{ModelPath, SelectorError};
pub use watch::{Watcher, WatcherRegistry};

pub use tripled_core::{Document, DomError, NodeId};
