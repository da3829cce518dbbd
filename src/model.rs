pub mod area;
pub mod cancellable;
pub mod event;
pub mod tree;

pub use area::{Point, RenderableArea};
pub use tree::NodeId;
