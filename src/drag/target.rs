//! What can be dragged and where it can land.

use enum_dispatch::enum_dispatch;
use tracing::{debug, trace};

use super::DragEvent;
use crate::layout_engine::{
    AddOptions, DockError, DockLayout, ItemFlags, Region, RemoveOptions, RenderableKind,
    classify_region, region_highlight,
};
use crate::model::{NodeId, Point, RenderableArea};

/// Where a successful drop put the dragged item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Into a new stack beside the target.
    Docked { stack: NodeId, region: Region },
    /// Into the target stack's tab row.
    Tab { stack: NodeId, index: usize },
}

#[enum_dispatch]
pub trait DropTarget {
    fn node(&self) -> NodeId;

    /// Rectangle the highlight indicator should cover with the pointer at
    /// `pointer`, or `None` to hide it.
    fn highlight_coordinates(
        &self,
        dock: &mut DockLayout,
        area: &RenderableArea,
        pointer: Point,
    ) -> Option<RenderableArea>;

    fn on_drop_highlight_exit(&self, _dock: &mut DockLayout) {}

    fn handle_drop(
        &self,
        dock: &mut DockLayout,
        item: NodeId,
        drop_area: &RenderableArea,
        event: &DragEvent,
    ) -> Result<Placement, DockError>;
}

/// The content area of a stack's active item. Drops split the stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackRegionTarget {
    pub stack: NodeId,
}

impl DropTarget for StackRegionTarget {
    fn node(&self) -> NodeId { self.stack }

    fn highlight_coordinates(
        &self,
        _dock: &mut DockLayout,
        area: &RenderableArea,
        pointer: Point,
    ) -> Option<RenderableArea> {
        Some(region_highlight(area, classify_region(area, pointer)))
    }

    fn handle_drop(
        &self,
        dock: &mut DockLayout,
        item: NodeId,
        drop_area: &RenderableArea,
        event: &DragEvent,
    ) -> Result<Placement, DockError> {
        let region = classify_region(drop_area, event.position);
        let stack = dock.dock_item(self.stack, region, item)?;
        Ok(Placement::Docked { stack, region })
    }
}

/// A stack's tab row. Drops insert a tab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackHeaderTarget {
    pub stack: NodeId,
}

impl DropTarget for StackHeaderTarget {
    fn node(&self) -> NodeId { self.stack }

    fn highlight_coordinates(
        &self,
        dock: &mut DockLayout,
        _area: &RenderableArea,
        pointer: Point,
    ) -> Option<RenderableArea> {
        dock.preview_header_drop(self.stack, pointer).ok()
    }

    fn on_drop_highlight_exit(&self, dock: &mut DockLayout) {
        if let Err(err) = dock.clear_header_preview(self.stack) {
            trace!(stack = ?self.stack, "header gone before highlight exit: {err}");
        }
    }

    fn handle_drop(
        &self,
        dock: &mut DockLayout,
        item: NodeId,
        _drop_area: &RenderableArea,
        event: &DragEvent,
    ) -> Result<Placement, DockError> {
        let index = dock.drop_on_header(self.stack, event.position, item)?;
        Ok(Placement::Tab { stack: self.stack, index })
    }
}

#[enum_dispatch(DropTarget)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropTargetRef {
    StackRegion(StackRegionTarget),
    StackHeader(StackHeaderTarget),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropCandidate {
    pub target: DropTargetRef,
    pub area: RenderableArea,
}

/// Drop targets open to `dragged`: the header and the active item area of
/// every visible stack, skipping stacks inside the dragged node and items
/// that refuse drops.
pub fn drop_candidates(dock: &DockLayout, dragged: NodeId) -> Vec<DropCandidate> {
    let mut out = Vec::new();
    for stack in dock.descendants(dock.root()) {
        if dock.kind(stack) != Some(RenderableKind::Stack)
            || dock.contains(dragged, stack)
            || !dock.is_visible(stack)
        {
            continue;
        }
        let Ok(s) = dock.stack(stack) else { continue };
        let droppable = |n: NodeId| {
            dock.stack_item(n).is_ok_and(|i| i.flags.contains(ItemFlags::DROPPABLE))
        };
        if let Some(active) = s.active_item()
            && (active != dragged || s.header.tabs.len() > 1)
            && droppable(active)
            && let Some(area) = dock.area(active)
        {
            out.push(DropCandidate {
                target: StackRegionTarget { stack }.into(),
                area,
            });
        }
        out.push(DropCandidate {
            target: StackHeaderTarget { stack }.into(),
            area: s.header.area,
        });
    }
    out
}

/// Where a dragged node sat before [`DragSource::handle_drop_cleanup`] took
/// it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragOrigin {
    pub parent: NodeId,
    pub index: usize,
}

/// Something a [`super::DragHost`] session can carry.
pub trait DragSource {
    fn node(&self) -> NodeId;

    fn is_draggable(&self, dock: &DockLayout) -> bool;

    /// Releases the dragged node from where it sat so `target` can take it.
    /// Returns the spot it left, if it had to leave one.
    fn handle_drop_cleanup(
        &self,
        dock: &mut DockLayout,
        target: &DropTargetRef,
    ) -> Result<Option<DragOrigin>, DockError>;

    /// Puts the node back after the target refused it.
    fn restore(&self, dock: &mut DockLayout, origin: DragOrigin) -> Result<(), DockError>;
}

/// A stack item dragged by its tab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabDragSource {
    pub item: NodeId,
}

impl DragSource for TabDragSource {
    fn node(&self) -> NodeId { self.item }

    fn is_draggable(&self, dock: &DockLayout) -> bool {
        dock.stack_item(self.item).is_ok_and(|i| i.flags.contains(ItemFlags::DRAGGABLE))
    }

    fn handle_drop_cleanup(
        &self,
        dock: &mut DockLayout,
        target: &DropTargetRef,
    ) -> Result<Option<DragOrigin>, DockError> {
        let Some(parent) = dock.parent(self.item) else { return Ok(None) };
        // Reordering within one header keeps the tab in place so the insertion
        // index is taken over the same tabs the preview laid out.
        if let DropTargetRef::StackHeader(header) = target
            && header.stack == parent
        {
            return Ok(None);
        }
        let index = dock.children(parent).iter().position(|&c| c == self.item).unwrap_or_default();
        // The target stack must survive losing its last tab to this drop.
        let previous = dock.keep_alive.replace(target.node());
        let result = dock.remove_child(parent, self.item, RemoveOptions { destroy: false, render: false });
        dock.keep_alive = previous;
        result?;
        Ok(Some(DragOrigin { parent, index }))
    }

    fn restore(&self, dock: &mut DockLayout, origin: DragOrigin) -> Result<(), DockError> {
        if dock.kind(origin.parent) != Some(RenderableKind::Stack) {
            debug!(item = ?self.item, "origin stack is gone, dropping the tab");
            return dock.destroy(self.item);
        }
        let index = origin.index.min(dock.children(origin.parent).len());
        dock.add_child(origin.parent, self.item, AddOptions::at(index))?;
        dock.set_active_item(self.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBridge;
    use crate::common::config::Config;
    use crate::layout_engine::{NodeConfig, StackConfig, StackItemConfig};

    fn two_stacks() -> (DockLayout, NodeId, NodeId) {
        let mut dock = DockLayout::new(Config::default(), HeadlessBridge);
        let stack = |items: &[&str]| StackConfig {
            children: items.iter().map(|&n| StackItemConfig::new(n).titled(n)).collect(),
            ..Default::default()
        };
        let a = dock.create(&NodeConfig::Stack(stack(&["a1", "a2", "a3"]))).unwrap();
        let b = dock.create(&NodeConfig::Stack(stack(&["b1"]))).unwrap();
        (dock, a, b)
    }

    #[test]
    fn cleanup_leaves_own_header_reorders_alone() {
        let (mut dock, a, _) = two_stacks();
        let a1 = dock.children(a)[0];
        let source = TabDragSource { item: a1 };
        let origin = source.handle_drop_cleanup(&mut dock, &StackHeaderTarget { stack: a }.into());
        assert_eq!(origin.unwrap(), None);
        assert_eq!(dock.parent(a1), Some(a));
    }

    #[test]
    fn restore_puts_the_tab_back() {
        let (mut dock, a, b) = two_stacks();
        let a2 = dock.children(a)[1];
        let source = TabDragSource { item: a2 };
        let origin = source
            .handle_drop_cleanup(&mut dock, &StackRegionTarget { stack: b }.into())
            .unwrap()
            .unwrap();
        assert_eq!(origin, DragOrigin { parent: a, index: 1 });
        assert_eq!(dock.parent(a2), None);

        source.restore(&mut dock, origin).unwrap();
        assert_eq!(dock.children(a)[1], a2);
        assert_eq!(dock.active_item(a).unwrap(), Some(a2));
    }
}
