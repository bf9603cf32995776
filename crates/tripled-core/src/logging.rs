//! Logging and debugging facilities for TrippleD.
//!
//! TrippleD uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("tripled=debug")
//!     .init();
//! ```
//!
//! Lookup misses are reported at `warn`, graph mutations at `debug` and
//! per-node bookkeeping at `trace`.
//!
//! [`TreeDebug`] renders a document subtree for inspection:
//!
//! ```
//! use tripled_core::{Document, logging::TreeDebug};
//!
//! let doc = Document::parse(r#"<ul td-collection="items"><li>One</li></ul>"#).unwrap();
//! println!("{}", TreeDebug::new().format(&doc, doc.root()).unwrap());
//! ```

use std::fmt::Write as FmtWrite;

use crate::dom::{Document, NodeId, NodeKind};
use crate::error::DomResult;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Rendered tree target.
    pub const DOM: &str = "tripled_core::dom";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "tripled_core::signal";
    /// Attribute alias normalization.
    pub const NORMALIZE: &str = "tripled::normalize";
    /// Initial tree scan.
    pub const SCANNER: &str = "tripled::scanner";
    /// Change interception on models and collections.
    pub const OBSERVE: &str = "tripled::observe";
    /// Template cloning.
    pub const INSTANTIATE: &str = "tripled::instantiate";
    /// Query/mutation API.
    pub const QUERY: &str = "tripled::query";
    /// Global instance lifecycle.
    pub const GLOBAL: &str = "tripled::global";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show node ids.
    pub show_ids: bool,
    /// Whether to show element attributes.
    pub show_attributes: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: false,
            show_attributes: true,
            max_depth: None,
        }
    }
}

/// Debug utility for visualizing a document subtree.
#[derive(Debug, Clone, Default)]
pub struct TreeDebug {
    options: TreeFormatOptions,
}

impl TreeDebug {
    /// Create a visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the subtree rooted at `root`.
    pub fn format(&self, doc: &Document, root: NodeId) -> DomResult<String> {
        let mut output = String::new();
        self.format_into(doc, root, "", true, 0, &mut output)?;
        Ok(output)
    }

    fn format_into(
        &self,
        doc: &Document,
        id: NodeId,
        prefix: &str,
        is_last: bool,
        depth: usize,
        output: &mut String,
    ) -> DomResult<()> {
        let (branch, last_branch, pipe) = match self.options.style {
            TreeStyle::Ascii => ("|-- ", "`-- ", "|   "),
            TreeStyle::Unicode => ("├── ", "└── ", "│   "),
        };

        let connector = if depth == 0 {
            ""
        } else if is_last {
            last_branch
        } else {
            branch
        };
        let _ = write!(output, "{prefix}{connector}{}", self.label(doc, id)?);
        if self.options.show_ids {
            let _ = write!(output, " #{}", id.as_raw());
        }
        output.push('\n');

        if self.options.max_depth.is_some_and(|max| depth >= max) {
            return Ok(());
        }

        let child_prefix = if depth == 0 {
            String::new()
        } else if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}{pipe}")
        };
        let children = doc.children(id)?;
        for (index, &child) in children.iter().enumerate() {
            let last = index + 1 == children.len();
            self.format_into(doc, child, &child_prefix, last, depth + 1, output)?;
        }
        Ok(())
    }

    fn label(&self, doc: &Document, id: NodeId) -> DomResult<String> {
        Ok(match doc.kind(id)? {
            NodeKind::Document => "#document".to_string(),
            NodeKind::Element { name, attributes } => {
                let mut label = format!("<{name}");
                if self.options.show_attributes {
                    for (key, value) in attributes {
                        let _ = write!(label, " {key}=\"{value}\"");
                    }
                }
                label.push('>');
                label
            }
            NodeKind::Text(text) => format!("{text:?}"),
            NodeKind::Comment(text) => format!("<!--{text}-->"),
        })
    }
}

impl Document {
    /// Render the subtree at `id` with the default [`TreeDebug`] options.
    pub fn dump_tree(&self, id: NodeId) -> DomResult<String> {
        TreeDebug::new().format(self, id)
    }
}
