use thiserror::Error;

use super::graph::RenderableKind;
use crate::model::NodeId;

#[derive(Debug, Error)]
pub enum DockError {
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("Expected a {expected} node, found {found} ({node:?})")]
    WrongKind {
        node: NodeId,
        expected: RenderableKind,
        found: RenderableKind,
    },
    #[error("A {child} cannot be placed inside a {parent}")]
    InvalidChild {
        parent: RenderableKind,
        child: RenderableKind,
    },
    #[error("{0:?} already holds its single child")]
    Occupied(NodeId),
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("{0:?} is not attached to the layout")]
    NotAttached(NodeId),
    #[error("Index {index} is out of range for {node:?}")]
    IndexOutOfRange { node: NodeId, index: usize },
    #[error("The layout root cannot be removed")]
    RootRemoval,
    #[error("Cannot move {0:?} inside its own subtree")]
    Cycle(NodeId),
    #[error("No creatable content for component `{component}`: {reason}")]
    NoCreatableContent { component: String, reason: String },
    #[error("Splitter {index} of {container:?} does not exist")]
    NoSuchSplitter { container: NodeId, index: usize },
    #[error("Splitter {index} of {container:?} is disabled")]
    SplitterDisabled { container: NodeId, index: usize },
    #[error("{0:?} cannot be closed")]
    NotCloseable(NodeId),
    #[error("Close of {node:?} failed: {reason}")]
    CloseFailed { node: NodeId, reason: String },
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("No serializer registered for `{0}`")]
    UnknownName(String),
    #[error("No serializer registered for {0} nodes")]
    UnknownKind(RenderableKind),
    #[error("{0:?} is not part of the layout")]
    UnknownNode(NodeId),
    #[error("No serializer registered for control `{0}`")]
    UnknownControl(String),
    #[error("`{name}` cannot appear here, expected `{expected}`")]
    Unexpected { name: String, expected: &'static str },
    #[error("{0:?} has no content child to serialize")]
    MissingChild(NodeId),
    #[error("Invalid `{name}` fields: {source}")]
    Fields {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Snapshot encoding failed: {0}")]
    Encoding(String),
}
