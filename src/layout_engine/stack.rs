//! Tabbed stacks: header layout, the active tab, and docking items into
//! or next to a stack.

use tracing::{debug, instrument};

use super::dock::{AddOptions, DockLayout, RemoveOptions};
use super::error::DockError;
use super::events::ActiveTabChanged;
use super::graph::{Direction, Orientation, Region, RenderableKind};
use super::renderable::XyItem;
use crate::model::{NodeId, Point, RenderableArea};

/// Region of `area` the pointer falls in. The outer thirds of the width are
/// west and east; the middle third splits at half height.
pub fn classify_region(area: &RenderableArea, pointer: Point) -> Region {
    let x = pointer.x - area.x();
    let y = pointer.y - area.y();
    if x < area.width() / 3.0 {
        Region::West
    } else if x > area.width() * 2.0 / 3.0 {
        Region::East
    } else if y < area.height() / 2.0 {
        Region::North
    } else {
        Region::South
    }
}

/// The half of `area` an item dropped into `region` ends up in.
pub fn region_highlight(area: &RenderableArea, region: Region) -> RenderableArea {
    let axis = region.orientation();
    let half = area.size_along(axis) / 2.0;
    if region.is_leading() {
        area.slice(axis, 0.0, half)
    } else {
        area.slice(axis, half, half)
    }
}

/// Position of tab `index` along the header, counted from its start.
fn visual_index(reverse: bool, count: usize, index: usize) -> usize {
    if reverse { count - 1 - index } else { index }
}

fn shift(area: RenderableArea, axis: Orientation, by: f64) -> RenderableArea {
    match axis {
        Orientation::Horizontal => area.translate(by, 0.0),
        Orientation::Vertical => area.translate(0.0, by),
    }
}

impl DockLayout {
    /// Splits `area` into header and content, places the tabs and gives
    /// every item the content area.
    pub(crate) fn layout_stack(&mut self, node: NodeId, area: RenderableArea) {
        let Ok(stack) = self.stack_mut(node) else { return };
        let axis = stack.direction.header_axis();
        let cross = axis.cross();
        let extent = area.size_along(cross);
        let thickness = stack.header.size.clamp(0.0, extent.max(0.0));
        let (header, content) = match stack.direction {
            Direction::Up | Direction::Left => (
                area.slice(cross, 0.0, thickness),
                area.slice(cross, thickness, extent - thickness),
            ),
            Direction::Down | Direction::Right => (
                area.slice(cross, extent - thickness, thickness),
                area.slice(cross, 0.0, extent - thickness),
            ),
        };
        let (width, reverse, count) = (stack.header.tab_width, stack.reverse, stack.header.tabs.len());
        for (i, tab) in stack.header.tabs.iter_mut().enumerate() {
            let v = visual_index(reverse, count, i);
            tab.area = header.slice(axis, v as f64 * width, width);
        }
        stack.header.area = header;

        for child in self.children(node).to_vec() {
            self.layout_subtree(child, content);
        }
    }

    pub fn active_item(&self, stack: NodeId) -> Result<Option<NodeId>, DockError> {
        Ok(self.stack(stack)?.active_item())
    }

    /// Shows the item at `index` and hides the previously active one.
    #[instrument(skip(self))]
    pub fn set_active(&mut self, stack: NodeId, index: usize) -> Result<(), DockError> {
        let s = self.stack_mut(stack)?;
        let Some(item) = s.header.tabs.get(index).map(|t| t.item) else {
            return Err(DockError::IndexOutOfRange { node: stack, index });
        };
        if s.active_index == index {
            return Ok(());
        }
        s.active_index = index;
        self.refresh_visibility();
        self.emit(stack, &mut ActiveTabChanged { stack, index, item });
        self.request_render();
        Ok(())
    }

    pub fn set_active_item(&mut self, item: NodeId) -> Result<(), DockError> {
        self.stack_item(item)?;
        let stack = self.parent(item).ok_or(DockError::NotAttached(item))?;
        let index = self.children(stack).iter().position(|&c| c == item).unwrap_or(0);
        self.set_active(stack, index)
    }

    /// Moves the tab at `from` to `to` within one stack. The active item
    /// stays active.
    #[instrument(skip(self))]
    pub fn move_tab(&mut self, stack: NodeId, from: usize, to: usize) -> Result<(), DockError> {
        let s = self.stack(stack)?;
        let count = s.header.tabs.len();
        let active = s.active_item();
        let item = s
            .header
            .tabs
            .get(from)
            .map(|t| t.item)
            .ok_or(DockError::IndexOutOfRange { node: stack, index: from })?;
        if to >= count {
            return Err(DockError::IndexOutOfRange { node: stack, index: to });
        }
        self.add_child(stack, item, AddOptions { index: Some(to), resize: true, render: false })?;
        if let Some(active) = active
            && let Some(index) = self.children(stack).iter().position(|&c| c == active)
        {
            self.stack_mut(stack)?.active_index = index;
            self.refresh_visibility();
        }
        self.request_render();
        Ok(())
    }

    // Docking

    /// Drops `item` beside `target`. The item moves into a fresh stack that
    /// either joins the row or column around `target`, or shares a new
    /// row/column with it. Returns the new stack.
    #[instrument(skip(self))]
    pub fn dock_item(&mut self, target: NodeId, region: Region, item: NodeId) -> Result<NodeId, DockError> {
        let template = self.stack(target)?.clone();
        self.stack_item(item)?;
        if self.parent(target).is_none() {
            return Err(DockError::NotAttached(target));
        }
        if let Some(parent) = self.parent(item) {
            let previous = self.keep_alive.replace(target);
            let result = self.remove_child(parent, item, RemoveOptions { destroy: false, render: false });
            self.keep_alive = previous;
            result?;
        }
        // Pruning the item's old stack may have moved the target.
        let wrapper = self.parent(target).ok_or(DockError::NotAttached(target))?;

        let new_stack = self.create_stack();
        if let Ok(stack) = self.stack_mut(new_stack) {
            stack.direction = template.direction;
            stack.header.size = template.header.size;
            stack.header.tab_width = template.header.tab_width;
        }
        let no_side_effects = AddOptions { index: None, resize: false, render: false };
        let result = self.add_child(new_stack, item, no_side_effects);
        self.discard_on_err(new_stack, result)?;

        let axis = region.orientation();
        let container = self.parent(wrapper).filter(|_| self.kind(wrapper) == Some(RenderableKind::XyItem));
        let same_axis = container.filter(|&c| self.xy_container(c).is_ok_and(|c| c.orientation == axis));

        if let Some(container) = same_axis {
            let index = self.children(container).iter().position(|&c| c == wrapper).unwrap_or(0);
            let half = self.xy_item(wrapper)?.ratio.map(|r| r / 2.0);
            self.xy_item_mut(wrapper)?.ratio = half;
            let new_item = self.wrap_in_xy_item(new_stack, XyItem { ratio: half, ..Default::default() })?;
            let at = if region.is_leading() { index } else { index + 1 };
            debug!(?container, at, "docking into existing split");
            self.add_child(container, new_item, AddOptions { index: Some(at), resize: false, render: false })?;
        } else {
            let split = self.create_xy_container(axis);
            let target_item = self.create_xy_item(XyItem::with_ratio(50.0));
            let new_item = self.create_xy_item(XyItem::with_ratio(50.0));
            new_stack.detach(&mut self.tree).push_back(new_item);
            split.detach(&mut self.tree).replace(target);
            target.detach(&mut self.tree).push_back(target_item);
            let order = if region.is_leading() {
                [new_item, target_item]
            } else {
                [target_item, new_item]
            };
            for node in order {
                node.detach(&mut self.tree).push_back(split);
            }
            debug!(?split, ?axis, "docking into new split");
            if self.is_attached(new_stack) {
                self.notify_attached(new_stack);
            }
        }

        self.prune(target);
        self.resize();
        self.refresh_visibility();
        self.request_render();
        Ok(new_stack)
    }

    // Header drops

    /// Tab index an item dropped at `pointer` would be inserted at.
    pub fn header_insertion_index(&self, stack: NodeId, pointer: Point) -> Result<usize, DockError> {
        let s = self.stack(stack)?;
        let axis = s.direction.header_axis();
        let n = s.header.tabs.len();
        let along = pointer.along(axis) - s.header.area.start_along(axis);
        let visual = (0..n).filter(|&v| (v as f64 + 0.5) * s.header.tab_width < along).count();
        Ok(if s.reverse { n - visual } else { visual })
    }

    /// Shifts the tabs after the insertion point by one tab width and returns
    /// the free slot the dropped tab would take.
    pub fn preview_header_drop(&mut self, stack: NodeId, pointer: Point) -> Result<RenderableArea, DockError> {
        let index = self.header_insertion_index(stack, pointer)?;
        let s = self.stack_mut(stack)?;
        let axis = s.direction.header_axis();
        let n = s.header.tabs.len();
        let width = s.header.tab_width;
        let reverse = s.reverse;
        let slot = if reverse { n - index } else { index };
        let preview = s
            .header
            .tabs
            .iter()
            .enumerate()
            .map(|(i, tab)| {
                if visual_index(reverse, n, i) >= slot { shift(tab.area, axis, width) } else { tab.area }
            })
            .collect();
        s.header.preview = Some(preview);
        let area = s.header.area.slice(axis, slot as f64 * width, width);
        self.request_render();
        Ok(area)
    }

    pub fn clear_header_preview(&mut self, stack: NodeId) -> Result<(), DockError> {
        if self.stack_mut(stack)?.header.preview.take().is_some() {
            self.request_render();
        }
        Ok(())
    }

    /// Inserts `item` into the stack at the tab nearest `pointer`. Returns the
    /// index it landed at.
    #[instrument(skip(self))]
    pub fn drop_on_header(&mut self, stack: NodeId, pointer: Point, item: NodeId) -> Result<usize, DockError> {
        self.stack_item(item)?;
        let mut index = self.header_insertion_index(stack, pointer)?;
        if self.parent(item) == Some(stack)
            && let Some(current) = self.children(stack).iter().position(|&c| c == item)
            && current < index
        {
            index -= 1;
        }
        self.add_child(stack, item, AddOptions { index: Some(index), resize: true, render: false })?;
        self.stack_mut(stack)?.header.preview = None;
        if self.settings.stack.activate_on_drop {
            self.set_active(stack, index)?;
        }
        self.request_render();
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_by_thirds_then_halves() {
        let area = RenderableArea::from_size(0.0, 0.0, 300.0, 200.0);
        assert_eq!(classify_region(&area, Point::new(150.0, 50.0)), Region::North);
        assert_eq!(classify_region(&area, Point::new(150.0, 150.0)), Region::South);
        assert_eq!(classify_region(&area, Point::new(99.0, 10.0)), Region::West);
        assert_eq!(classify_region(&area, Point::new(99.0, 190.0)), Region::West);
        assert_eq!(classify_region(&area, Point::new(201.0, 100.0)), Region::East);
    }

    #[test]
    fn regions_are_relative_to_the_area() {
        let area = RenderableArea::from_size(100.0, 50.0, 90.0, 40.0);
        assert_eq!(classify_region(&area, Point::new(110.0, 60.0)), Region::West);
        assert_eq!(classify_region(&area, Point::new(145.0, 80.0)), Region::South);
    }

    #[test]
    fn highlight_covers_half() {
        let area = RenderableArea::from_size(0.0, 0.0, 200.0, 100.0);
        assert_eq!(
            region_highlight(&area, Region::West),
            RenderableArea::from_size(0.0, 0.0, 100.0, 100.0)
        );
        assert_eq!(
            region_highlight(&area, Region::South),
            RenderableArea::from_size(0.0, 50.0, 200.0, 50.0)
        );
    }
}
