//! Pointer dragging of tabs and the drop targets they can land on.

mod draggable;
mod host;
mod target;

pub use draggable::{DragEvent, DragPhase, Draggable};
pub use host::{DragError, DragHost, DragOutcome};
pub use target::{
    DragOrigin, DragSource, DropCandidate, DropTarget, DropTargetRef, Placement, StackHeaderTarget,
    StackRegionTarget, TabDragSource, drop_candidates,
};
