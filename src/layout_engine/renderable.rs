//! Per-node state for every renderable kind.

use std::collections::BTreeSet;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::graph::{Direction, Orientation, RenderableKind};
use crate::model::{NodeId, Point, RenderableArea};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub renderable: Renderable,
    pub tags: BTreeSet<String>,
    pub area: RenderableArea,
    /// Visibility last reported to the node's listeners.
    pub(crate) shown: bool,
}

impl NodeData {
    pub fn new(renderable: Renderable) -> Self {
        NodeData {
            renderable,
            tags: BTreeSet::new(),
            area: RenderableArea::default(),
            shown: false,
        }
    }

    pub fn width(&self) -> f64 { self.area.width() }

    pub fn height(&self) -> f64 { self.area.height() }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Renderable {
    Root,
    XyContainer(XyContainer),
    XyItem(XyItem),
    Stack(Stack),
    StackItem(StackItem),
    Component(ComponentPane),
}

impl Renderable {
    pub fn kind(&self) -> RenderableKind {
        match self {
            Renderable::Root => RenderableKind::Root,
            Renderable::XyContainer(_) => RenderableKind::XyContainer,
            Renderable::XyItem(_) => RenderableKind::XyItem,
            Renderable::Stack(_) => RenderableKind::Stack,
            Renderable::StackItem(_) => RenderableKind::StackItem,
            Renderable::Component(_) => RenderableKind::Component,
        }
    }

    pub fn as_xy_container(&self) -> Option<&XyContainer> {
        match self {
            Renderable::XyContainer(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_xy_container_mut(&mut self) -> Option<&mut XyContainer> {
        match self {
            Renderable::XyContainer(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_xy_item(&self) -> Option<&XyItem> {
        match self {
            Renderable::XyItem(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_xy_item_mut(&mut self) -> Option<&mut XyItem> {
        match self {
            Renderable::XyItem(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_stack(&self) -> Option<&Stack> {
        match self {
            Renderable::Stack(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_stack_mut(&mut self) -> Option<&mut Stack> {
        match self {
            Renderable::Stack(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_stack_item(&self) -> Option<&StackItem> {
        match self {
            Renderable::StackItem(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_stack_item_mut(&mut self) -> Option<&mut StackItem> {
        match self {
            Renderable::StackItem(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentPane> {
        match self {
            Renderable::Component(c) => Some(c),
            _ => None,
        }
    }
}

/// A row (horizontal) or column (vertical) of [`XyItem`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct XyContainer {
    pub orientation: Orientation,
    /// Static containers are never collapsed or pruned when they empty out.
    pub is_static: bool,
    pub splitter_size: f64,
    /// `max(children - 1, 0)` entries; splitter `i` sits between items `i` and `i + 1`.
    pub splitters: Vec<Splitter>,
}

impl XyContainer {
    pub fn new(orientation: Orientation, splitter_size: f64) -> Self {
        XyContainer {
            orientation,
            is_static: false,
            splitter_size,
            splitters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Splitter {
    pub area: RenderableArea,
    /// Offset accumulated by the drag in progress.
    pub offset: Point,
    /// `(min, max)` offset along the container axis while a drag is running.
    pub drag_limits: Option<(f64, f64)>,
    pub disabled: bool,
}

/// Per-axis size limits in px.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub x: f64,
    pub y: f64,
}

impl AxisBounds {
    pub const ZERO: AxisBounds = AxisBounds { x: 0.0, y: 0.0 };
    pub const UNBOUNDED: AxisBounds = AxisBounds { x: f64::INFINITY, y: f64::INFINITY };

    pub fn along(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.x,
            Orientation::Vertical => self.y,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XyItem {
    /// Share of the container's free space in percent, `None` until the
    /// first layout pass allocates it.
    pub ratio: Option<f64>,
    pub min_size: AxisBounds,
    pub max_size: AxisBounds,
    pub is_minimized: bool,
    /// Size along the container axis before the item was minimized.
    pub last_size: Option<f64>,
}

impl Default for XyItem {
    fn default() -> Self {
        XyItem {
            ratio: None,
            min_size: AxisBounds::ZERO,
            max_size: AxisBounds::UNBOUNDED,
            is_minimized: false,
            last_size: None,
        }
    }
}

impl XyItem {
    pub fn with_ratio(ratio: f64) -> Self { XyItem { ratio: Some(ratio), ..Default::default() } }

    /// True when the item cannot change size along `orientation`.
    pub fn is_fixed(&self, orientation: Orientation) -> bool {
        self.min_size.along(orientation) == self.max_size.along(orientation)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    pub direction: Direction,
    /// Lay tabs out in reverse order.
    pub reverse: bool,
    pub active_index: usize,
    pub header: StackHeader,
}

impl Stack {
    pub fn new(header_size: f64, tab_width: f64) -> Self {
        Stack {
            direction: Direction::default(),
            reverse: false,
            active_index: 0,
            header: StackHeader {
                size: header_size,
                tab_width,
                ..Default::default()
            },
        }
    }

    pub fn active_item(&self) -> Option<NodeId> {
        self.header.tabs.get(self.active_index).map(|t| t.item)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackHeader {
    /// Thickness of the header strip.
    pub size: f64,
    pub tab_width: f64,
    pub area: RenderableArea,
    /// One tab per stack item, in item order.
    pub tabs: Vec<StackTab>,
    pub controls: Vec<Control>,
    /// Tab rectangles while a header drop is being previewed.
    pub preview: Option<Vec<RenderableArea>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackTab {
    pub item: NodeId,
    pub area: RenderableArea,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ItemFlags: u8 {
        const DRAGGABLE = 1 << 0;
        const DROPPABLE = 1 << 1;
        const CLOSEABLE = 1 << 2;
        /// Included in snapshots.
        const PERSIST = 1 << 3;
    }
}

impl Default for ItemFlags {
    fn default() -> Self { ItemFlags::all() }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackItem {
    pub title: String,
    pub flags: ItemFlags,
    pub tab_controls: Vec<Control>,
}

impl StackItem {
    pub fn new(title: impl Into<String>) -> Self {
        StackItem {
            title: title.into(),
            flags: ItemFlags::default(),
            tab_controls: Vec::new(),
        }
    }
}

/// Header or tab button.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Control {
    Close,
    Minimize,
    Maximize,
    Custom { id: String, label: Option<String> },
}

/// Leaf hosting an externally mounted component.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentPane {
    pub component: String,
    pub props: Value,
}
