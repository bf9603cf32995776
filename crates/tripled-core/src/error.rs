//! Error types for the rendered tree.

use crate::dom::NodeId;

/// Result type alias for rendered tree operations.
pub type DomResult<T> = std::result::Result<T, DomError>;

/// Errors that can occur while building or mutating a [`Document`](crate::Document).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The node id is invalid or the node has been destroyed.
    #[error("invalid or destroyed node id {0:?}")]
    InvalidNodeId(NodeId),

    /// Attempted to append a node to itself or to one of its descendants.
    #[error("cannot append a node to itself or one of its descendants")]
    CircularParentage,

    /// The document root cannot be detached or removed.
    #[error("the document root cannot be removed")]
    RootNode,

    /// The operation requires an element node.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    /// The markup could not be parsed.
    #[error("markup parse error at byte {position}: {message}")]
    Parse {
        /// Human readable description.
        message: String,
        /// Byte offset in the source where the reader stopped.
        position: u64,
    },
}

impl DomError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>, position: u64) -> Self {
        Self::Parse {
            message: message.into(),
            position,
        }
    }
}
