pub mod config;
mod dock;
mod error;
pub mod events;
pub(crate) mod graph;
mod renderable;
pub mod serializer;
mod sizing;
mod splitter;
mod stack;

pub use config::{
    ComponentConfig, ContentConfig, NodeConfig, SplitConfig, SplitItemConfig, StackConfig,
    StackItemConfig,
};
pub use dock::{AddOptions, DockLayout, RemoveOptions};
pub use error::{DockError, SerializeError};
pub use graph::{Direction, Orientation, Region, RenderableKind};
pub use renderable::{
    AxisBounds, ComponentPane, Control, ItemFlags, NodeData, Renderable, Splitter, Stack,
    StackHeader, StackItem, StackTab, XyContainer, XyItem,
};
pub use serializer::{SerializedNode, SerializerContainer, SnapshotFormat};
pub use stack::{classify_region, region_highlight};
