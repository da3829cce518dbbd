//! Resizing two neighbors by dragging the splitter between them.

use tracing::{debug, instrument};

use super::dock::DockLayout;
use super::error::DockError;
use super::graph::Orientation;
use crate::drag::{DragEvent, DragPhase};
use crate::model::{NodeId, Point};

struct Neighbors {
    axis: Orientation,
    before: NodeId,
    after: NodeId,
}

impl DockLayout {
    fn neighbors(&self, container: NodeId, index: usize) -> Result<Neighbors, DockError> {
        let c = self.xy_container(container)?;
        let splitter = c.splitters.get(index).ok_or(DockError::NoSuchSplitter { container, index })?;
        if splitter.disabled {
            return Err(DockError::SplitterDisabled { container, index });
        }
        let children = self.children(container);
        match (children.get(index), children.get(index + 1)) {
            (Some(&before), Some(&after)) => Ok(Neighbors { axis: c.orientation, before, after }),
            _ => Err(DockError::NoSuchSplitter { container, index }),
        }
    }

    fn size_along(&self, node: NodeId, axis: Orientation) -> Result<f64, DockError> {
        Ok(self.node_ref(node)?.area.size_along(axis))
    }

    /// Starts a drag of splitter `index` and returns the `(min, max)` offset
    /// it may move along the container axis.
    #[instrument(skip(self))]
    pub fn begin_splitter_drag(&mut self, container: NodeId, index: usize) -> Result<(f64, f64), DockError> {
        let Neighbors { axis, before, after } = self.neighbors(container, index)?;
        let (b_size, a_size) = (self.size_along(before, axis)?, self.size_along(after, axis)?);
        let b = self.xy_item(before)?;
        let a = self.xy_item(after)?;
        let min = f64::max(
            -(b_size - b.min_size.along(axis)),
            -(a.max_size.along(axis) - a_size),
        );
        let max = f64::min(a_size - a.min_size.along(axis), b.max_size.along(axis) - b_size);
        let limits = (min.min(0.0), max.max(0.0));

        let splitter = &mut self.xy_container_mut(container)?.splitters[index];
        splitter.offset = Point::ZERO;
        splitter.drag_limits = Some(limits);
        debug!(?limits, "splitter drag started");
        Ok(limits)
    }

    /// Moves the splitter by `delta` from where the drag started, clamped to
    /// the drag limits. Returns the offset along the container axis.
    pub fn drag_splitter(&mut self, container: NodeId, index: usize, delta: Point) -> Result<f64, DockError> {
        let axis = self.xy_container(container)?.orientation;
        let limits = match self
            .xy_container(container)?
            .splitters
            .get(index)
            .and_then(|s| s.drag_limits)
        {
            Some(limits) => limits,
            None => self.begin_splitter_drag(container, index)?,
        };
        let offset = delta.along(axis).clamp(limits.0, limits.1);
        self.xy_container_mut(container)?.splitters[index].offset = match axis {
            Orientation::Horizontal => Point::new(offset, 0.0),
            Orientation::Vertical => Point::new(0.0, offset),
        };
        self.request_render();
        Ok(offset)
    }

    /// Turns the pending offset into new ratios for the two neighbors and
    /// lays the container out again.
    #[instrument(skip(self))]
    pub fn end_splitter_drag(&mut self, container: NodeId, index: usize) -> Result<(), DockError> {
        let Neighbors { axis, before, after } = self.neighbors(container, index)?;
        let splitter = &mut self.xy_container_mut(container)?.splitters[index];
        if splitter.drag_limits.take().is_none() {
            return Ok(());
        }
        let offset = std::mem::take(&mut splitter.offset).along(axis);

        let (b_size, a_size) = (self.size_along(before, axis)?, self.size_along(after, axis)?);
        let total = b_size + a_size;
        if offset != 0.0 && total > 0.0 {
            let b_ratio = self.xy_item(before)?.ratio.unwrap_or(0.0);
            let a_ratio = self.xy_item(after)?.ratio.unwrap_or(0.0);
            let combined = b_ratio + a_ratio;
            self.xy_item_mut(before)?.ratio = Some(combined * (b_size + offset) / total);
            self.xy_item_mut(after)?.ratio = Some(combined * (a_size - offset) / total);
        }
        debug!(offset, "splitter drag finished");
        self.resize_node(container);
        self.request_render();
        Ok(())
    }

    /// Feeds one drag event of a splitter handle through the three steps above.
    pub fn handle_splitter_drag(
        &mut self,
        container: NodeId,
        index: usize,
        event: &DragEvent,
    ) -> Result<(), DockError> {
        match event.phase {
            DragPhase::Start => {
                self.begin_splitter_drag(container, index)?;
                self.drag_splitter(container, index, event.delta)?;
            }
            DragPhase::Move => {
                self.drag_splitter(container, index, event.delta)?;
            }
            DragPhase::Stop => {
                self.drag_splitter(container, index, event.delta)?;
                self.end_splitter_drag(container, index)?;
            }
        }
        Ok(())
    }
}
