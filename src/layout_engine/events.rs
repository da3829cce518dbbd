//! Events the engine dispatches on node buses.

use crate::model::{NodeId, RenderableArea};

/// Sent down a subtree after it joins the tree under the layout root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attached {
    pub node: NodeId,
}

/// Sent down a subtree right before it leaves the tree under the layout root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detached {
    pub node: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resized {
    pub node: NodeId,
    pub area: RenderableArea,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityChanged {
    pub node: NodeId,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveTabChanged {
    pub stack: NodeId,
    pub index: usize,
    pub item: NodeId,
}

/// Payload of the cancellable event sent up from a stack item before it closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeforeClose {
    pub item: NodeId,
}
