//! Core systems for TrippleD.
//!
//! This crate provides the foundational pieces the binding engine builds on:
//!
//! - **Rendered Tree**: an arena-backed [`Document`] with stable [`NodeId`] handles
//! - **Markup**: parsing and serialization of well-formed markup via `quick-xml`
//! - **Signal/Slot System**: synchronous change notification with [`Signal`]
//! - **Logging**: `tracing` targets and a tree visualizer
//!
//! # Example
//!
//! ```
//! use tripled_core::Document;
//!
//! let mut doc = Document::parse(r#"<p td-model="greeting"><span td-property="text">Hi</span></p>"#).unwrap();
//! let anchor = doc.first_element_child(doc.root()).unwrap().unwrap();
//! let span = doc
//!     .find_descendant(anchor, |d, n| d.attribute(n, "td-property") == Some("text"))
//!     .unwrap()
//!     .unwrap();
//! doc.set_text_content(span, "Hello").unwrap();
//! assert_eq!(doc.to_markup(), r#"<p td-model="greeting"><span td-property="text">Hello</span></p>"#);
//! ```

pub mod dom;
mod error;
pub mod logging;
pub mod signal;

pub use dom::{Document, NodeId, NodeKind};
pub use error::{DomError, DomResult};
pub use logging::{TreeDebug, TreeFormatOptions, TreeStyle};
pub use signal::{ConnectionId, Signal};
