//! Ratio-based sizing of rows and columns.
//!
//! Every non-minimized item of a container owns a percentage of the
//! container's free space (its size minus splitters and minimized items).
//! A layout pass runs three steps: allocate missing ratios, clamp ratios to
//! each item's min/max and hand the excess or deficit to items that can
//! still move, then convert ratios to whole pixels.

use tracing::{instrument, trace};

use super::dock::DockLayout;
use super::error::DockError;
use super::events::Resized;
use super::graph::{Orientation, RenderableKind};
use crate::model::{NodeId, RenderableArea};

pub(crate) const EPSILON: f64 = 1e-6;

/// Sizing input for one non-minimized item. Bounds are in px.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Slot {
    pub ratio: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl Slot {
    fn ratio(&self) -> f64 { self.ratio.unwrap_or(0.0) }
}

/// Gives unallocated slots an even share of what is left and normalizes
/// proportionally when the total exceeds 100.
pub(crate) fn allocate(slots: &mut [Slot]) {
    if slots.is_empty() {
        return;
    }
    let allocated: f64 = slots.iter().filter_map(|s| s.ratio).sum();
    let unallocated = slots.iter().filter(|s| s.ratio.is_none()).count();
    if unallocated > 0 {
        let mut share = (100.0 - allocated) / unallocated as f64;
        if share <= EPSILON {
            share = 100.0 / slots.len() as f64;
        }
        for slot in slots.iter_mut().filter(|s| s.ratio.is_none()) {
            slot.ratio = Some(share);
        }
    }

    let total: f64 = slots.iter().map(Slot::ratio).sum();
    if total <= EPSILON {
        let even = 100.0 / slots.len() as f64;
        slots.iter_mut().for_each(|s| s.ratio = Some(even));
    } else if total > 100.0 + EPSILON {
        slots.iter_mut().for_each(|s| s.ratio = Some(s.ratio() / total * 100.0));
    }
}

/// Clamps ratios to each slot's bounds and spreads the resulting excess or
/// deficit evenly over the slots that still have room, capped by that room.
///
/// Runs at most `max_passes` passes. If the constraints cannot be met the
/// ratios are rescaled to sum to 100 at the end.
pub(crate) fn distribute(slots: &mut [Slot], free: f64, max_passes: usize) {
    if slots.is_empty() || free <= 0.0 {
        return;
    }
    let bounds: Vec<(f64, f64)> = slots
        .iter()
        .map(|s| {
            let lo = s.min / free * 100.0;
            let hi = (s.max / free * 100.0).max(lo);
            (lo, hi)
        })
        .collect();

    for pass in 0..max_passes {
        for (slot, &(lo, hi)) in slots.iter_mut().zip(&bounds) {
            slot.ratio = Some(slot.ratio().clamp(lo, hi));
        }
        let diff = slots.iter().map(Slot::ratio).sum::<f64>() - 100.0;
        if diff.abs() <= EPSILON {
            return;
        }
        let grow = diff < 0.0;
        let room = |slot: &Slot, (lo, hi): (f64, f64)| {
            if grow { hi - slot.ratio() } else { slot.ratio() - lo }
        };

        let mut residual = diff.abs();
        let mut open: Vec<usize> =
            (0..slots.len()).filter(|&i| room(&slots[i], bounds[i]) > EPSILON).collect();
        while residual > EPSILON && !open.is_empty() {
            let share = residual / open.len() as f64;
            let mut still_open = Vec::with_capacity(open.len());
            for i in open {
                let available = room(&slots[i], bounds[i]);
                let step = share.min(available);
                let ratio = slots[i].ratio();
                slots[i].ratio = Some(if grow { ratio + step } else { ratio - step });
                residual -= step;
                if available - step > EPSILON {
                    still_open.push(i);
                }
            }
            open = still_open;
        }
        trace!(pass, residual, "redistributed ratios");
        if residual > EPSILON {
            break;
        }
    }

    let total: f64 = slots.iter().map(Slot::ratio).sum();
    if total > 0.0 && (total - 100.0).abs() > EPSILON {
        slots.iter_mut().for_each(|s| s.ratio = Some(s.ratio() / total * 100.0));
    }
}

/// Converts ratios into whole pixels of `free`. Pixels lost to flooring go,
/// one each, to the first slots that can still grow.
pub(crate) fn to_pixels(slots: &[Slot], free: f64) -> Vec<f64> {
    let free = free.max(0.0).floor();
    let mut px: Vec<f64> = slots
        .iter()
        .map(|s| (s.ratio() / 100.0 * free + EPSILON).floor().max(0.0))
        .collect();
    let mut remainder = free - px.iter().sum::<f64>();
    for (size, slot) in px.iter_mut().zip(slots) {
        if remainder < 1.0 {
            break;
        }
        if *size + 1.0 <= slot.max {
            *size += 1.0;
            remainder -= 1.0;
        }
    }
    px
}

pub(crate) fn solve(slots: &mut [Slot], free: f64, max_passes: usize) -> Vec<f64> {
    allocate(slots);
    distribute(slots, free, max_passes);
    to_pixels(slots, free)
}

impl DockLayout {
    /// Lays out the whole tree inside the host bounds.
    #[instrument(skip(self))]
    pub fn resize(&mut self) {
        let root = self.root();
        self.layout_subtree(root, self.bounds());
    }

    /// Lays out `node` again inside its current area. Detached subtrees get
    /// an empty area.
    pub fn resize_node(&mut self, node: NodeId) {
        if node == self.root() {
            return self.resize();
        }
        let area = match (self.parent(node), self.area(node)) {
            (Some(_), Some(area)) => area,
            _ => RenderableArea::default(),
        };
        self.layout_subtree(node, area);
    }

    pub(crate) fn layout_subtree(&mut self, node: NodeId, area: RenderableArea) {
        let Some(kind) = self.kind(node) else { return };
        self.set_area(node, area);
        match kind {
            RenderableKind::XyContainer => self.layout_xy(node, area),
            RenderableKind::Stack => self.layout_stack(node, area),
            RenderableKind::Component => {}
            _ => {
                for child in self.children(node).to_vec() {
                    self.layout_subtree(child, area);
                }
            }
        }
    }

    fn set_area(&mut self, node: NodeId, area: RenderableArea) {
        let data = &mut self.tree.data.nodes[node];
        if data.area == area {
            return;
        }
        data.area = area;
        if let Some(handle) = self.tree.data.handles.get_mut(node) {
            handle.on_resize(area);
        }
        self.emit(node, &mut Resized { node, area });
    }

    /// Pixels a minimized item keeps along its container's axis: the header
    /// of a stack, nothing otherwise.
    fn minimized_size(&self, item: NodeId) -> f64 {
        self.children(item)
            .first()
            .and_then(|&c| self.stack(c).ok())
            .map(|s| s.header.size)
            .unwrap_or(0.0)
    }

    /// Space shared out by ratio among the non-minimized items.
    pub fn free_space(&self, container: NodeId) -> Result<f64, DockError> {
        let c = self.xy_container(container)?;
        let area = self.node_ref(container)?.area;
        let mut free = area.size_along(c.orientation) - c.splitter_size * c.splitters.len() as f64;
        for &item in self.children(container) {
            if self.xy_item(item)?.is_minimized {
                free -= self.minimized_size(item);
            }
        }
        Ok(free.max(0.0))
    }

    fn layout_xy(&mut self, container: NodeId, area: RenderableArea) {
        let Ok(c) = self.xy_container(container) else { return };
        let (axis, splitter_size) = (c.orientation, c.splitter_size);
        let items = self.children(container).to_vec();
        let free = self.free_space(container).unwrap_or(0.0);

        let mut active = Vec::new();
        let mut slots = Vec::new();
        for &node in &items {
            let Ok(item) = self.xy_item(node) else { continue };
            if !item.is_minimized {
                active.push(node);
                slots.push(Slot {
                    ratio: item.ratio,
                    min: item.min_size.along(axis),
                    max: item.max_size.along(axis),
                });
            }
        }
        let passes = self.settings.layout.max_distribution_passes.max(1);
        let px = solve(&mut slots, free, passes);

        let mut sizes = Vec::with_capacity(items.len());
        for &node in &items {
            let size = match active.iter().position(|&n| n == node) {
                Some(k) => {
                    if let Ok(item) = self.xy_item_mut(node) {
                        item.ratio = slots[k].ratio;
                    }
                    px[k]
                }
                None => self.minimized_size(node),
            };
            sizes.push(size);
        }

        let mut offset = 0.0;
        let mut splitters = Vec::with_capacity(items.len().saturating_sub(1));
        for (i, (&node, &size)) in items.iter().zip(&sizes).enumerate() {
            self.layout_subtree(node, area.slice(axis, offset, size));
            offset += size;
            if i + 1 < items.len() {
                let disabled = [node, items[i + 1]].iter().any(|&n| {
                    self.xy_item(n).is_ok_and(|it| it.is_minimized || it.is_fixed(axis))
                });
                splitters.push((area.slice(axis, offset, splitter_size), disabled));
                offset += splitter_size;
            }
        }
        if let Ok(c) = self.xy_container_mut(container) {
            for (splitter, (area, disabled)) in c.splitters.iter_mut().zip(splitters) {
                splitter.area = area;
                splitter.disabled = disabled;
            }
        }
    }

    fn container_of(&self, item: NodeId) -> Result<(NodeId, Orientation), DockError> {
        self.xy_item(item)?;
        let container = self.parent(item).ok_or(DockError::NodeNotFound(item))?;
        Ok((container, self.xy_container(container)?.orientation))
    }

    fn ensure_allocated(&mut self, container: NodeId) {
        let unallocated = self
            .children(container)
            .iter()
            .any(|&n| self.xy_item(n).is_ok_and(|i| i.ratio.is_none()));
        if unallocated {
            self.resize_node(container);
        }
    }

    /// Resizes `item` to `size` px along its container's axis, taking the
    /// difference from the next non-minimized sibling (or the previous one
    /// for the last item).
    #[instrument(skip(self))]
    pub fn set_size_of(&mut self, item: NodeId, size: f64) -> Result<(), DockError> {
        let (container, axis) = self.container_of(item)?;
        self.ensure_allocated(container);
        let current = self.xy_item(item)?.clone();
        if current.is_minimized {
            self.xy_item_mut(item)?.last_size = Some(size);
            return Ok(());
        }
        let free = self.free_space(container)?;
        if free <= 0.0 {
            return Ok(());
        }
        let min = current.min_size.along(axis);
        let size = size.clamp(min, current.max_size.along(axis).max(min));
        let target = size / free * 100.0;
        let delta = target - current.ratio.unwrap_or(0.0);

        let siblings = self.children(container).to_vec();
        let index = siblings.iter().position(|&n| n == item).unwrap_or(0);
        let movable = |n: &&NodeId| self.xy_item(**n).is_ok_and(|i| !i.is_minimized);
        let neighbor = siblings[index + 1..]
            .iter()
            .find(movable)
            .or_else(|| siblings[..index].iter().rev().find(movable))
            .copied();

        self.xy_item_mut(item)?.ratio = Some(target);
        if let Some(neighbor) = neighbor {
            let n = self.xy_item_mut(neighbor)?;
            n.ratio = Some(n.ratio.unwrap_or(0.0) - delta);
        }
        self.resize_node(container);
        self.request_render();
        Ok(())
    }

    /// Minimizes or restores an item. A restored item gets back the size it
    /// had before minimizing when known.
    #[instrument(skip(self))]
    pub fn set_minimized(&mut self, item: NodeId, minimized: bool) -> Result<(), DockError> {
        let (container, axis) = self.container_of(item)?;
        if self.xy_item(item)?.is_minimized == minimized {
            return Ok(());
        }
        if minimized {
            let size = self.node_ref(item)?.area.size_along(axis);
            let it = self.xy_item_mut(item)?;
            it.last_size = Some(size);
            it.is_minimized = true;
            self.resize_node(container);
        } else {
            let active = self
                .children(container)
                .iter()
                .filter(|&&n| self.xy_item(n).is_ok_and(|i| !i.is_minimized))
                .count();
            let it = self.xy_item_mut(item)?;
            it.is_minimized = false;
            let last = it.last_size.take();
            if it.ratio.is_none() {
                it.ratio = Some(100.0 / (active + 1) as f64);
            }
            self.resize_node(container);
            if let Some(last) = last {
                self.set_size_of(item, last)?;
            }
        }
        self.refresh_visibility();
        self.request_render();
        Ok(())
    }

    /// Ratios of a container's items in order, `None` for unallocated ones.
    pub fn ratios(&self, container: NodeId) -> Result<Vec<Option<f64>>, DockError> {
        self.xy_container(container)?;
        self.children(container)
            .iter()
            .map(|&n| self.xy_item(n).map(|i| i.ratio))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(ratio: Option<f64>) -> Slot { Slot { ratio, min: 0.0, max: f64::INFINITY } }

    fn ratios(slots: &[Slot]) -> Vec<f64> { slots.iter().map(|s| s.ratio()).collect() }

    fn sum(values: &[f64]) -> f64 { values.iter().sum() }

    #[test]
    fn allocate_even_shares() {
        let mut slots = vec![slot(None), slot(None), slot(None), slot(None)];
        allocate(&mut slots);
        assert_eq!(ratios(&slots), vec![25.0; 4]);
    }

    #[test]
    fn allocate_remainder_to_unallocated() {
        let mut slots = vec![slot(Some(60.0)), slot(None), slot(None)];
        allocate(&mut slots);
        assert_eq!(ratios(&slots), vec![60.0, 20.0, 20.0]);
    }

    #[test]
    fn allocate_into_full_container_normalizes() {
        let mut slots = vec![slot(Some(50.0)), slot(Some(50.0)), slot(None)];
        allocate(&mut slots);
        let r = ratios(&slots);
        assert!((sum(&r) - 100.0).abs() < EPSILON);
        assert!((r[0] - 37.5).abs() < EPSILON);
        assert!((r[2] - 25.0).abs() < EPSILON);
    }

    #[test]
    fn allocate_normalizes_overflow() {
        let mut slots = vec![slot(Some(150.0)), slot(Some(50.0))];
        allocate(&mut slots);
        assert_eq!(ratios(&slots), vec![75.0, 25.0]);
    }

    #[test]
    fn distribute_respects_min() {
        let mut slots = vec![
            Slot { ratio: Some(10.0), min: 50.0, max: f64::INFINITY },
            slot(Some(90.0)),
        ];
        distribute(&mut slots, 200.0, 8);
        let r = ratios(&slots);
        assert!((r[0] - 25.0).abs() < EPSILON);
        assert!((r[1] - 75.0).abs() < EPSILON);
    }

    #[test]
    fn distribute_caps_by_headroom() {
        // Deficit of 40 split over two slots, one of which can only take 5.
        let mut slots = vec![
            Slot { ratio: Some(20.0), min: 0.0, max: 25.0 },
            slot(Some(20.0)),
            Slot { ratio: Some(20.0), min: 0.0, max: 20.0 },
        ];
        distribute(&mut slots, 100.0, 8);
        let r = ratios(&slots);
        assert!((r[0] - 25.0).abs() < EPSILON);
        assert!((r[1] - 55.0).abs() < EPSILON);
        assert!((r[2] - 20.0).abs() < EPSILON);
    }

    #[test]
    fn distribute_shrinks_excess() {
        let mut slots = vec![
            Slot { ratio: Some(80.0), min: 0.0, max: 50.0 },
            Slot { ratio: Some(40.0), min: 40.0, max: f64::INFINITY },
            slot(Some(30.0)),
        ];
        distribute(&mut slots, 100.0, 8);
        let r = ratios(&slots);
        assert!((r[0] - 40.0).abs() < EPSILON);
        assert!((r[1] - 40.0).abs() < EPSILON);
        assert!((r[2] - 20.0).abs() < EPSILON);
    }

    #[test]
    fn distribute_infeasible_still_sums_to_100() {
        let mut slots = vec![
            Slot { ratio: Some(50.0), min: 80.0, max: f64::INFINITY },
            Slot { ratio: Some(50.0), min: 80.0, max: f64::INFINITY },
        ];
        distribute(&mut slots, 100.0, 8);
        let r = ratios(&slots);
        assert!((sum(&r) - 100.0).abs() < EPSILON);
        assert!((r[0] - r[1]).abs() < EPSILON);
    }

    #[test]
    fn distribute_is_stable_for_valid_input() {
        let mut slots = vec![slot(Some(100.0 / 3.0)), slot(Some(100.0 / 3.0)), slot(Some(100.0 / 3.0))];
        let before = slots.clone();
        distribute(&mut slots, 295.0, 8);
        assert_eq!(before, slots);
    }

    #[test]
    fn pixels_fill_free_space() {
        let slots = vec![slot(Some(100.0 / 3.0)), slot(Some(100.0 / 3.0)), slot(Some(100.0 / 3.0))];
        assert_eq!(to_pixels(&slots, 100.0), vec![34.0, 33.0, 33.0]);
    }

    #[test]
    fn pixels_skip_items_at_max() {
        let slots = vec![
            Slot { ratio: Some(100.0 / 3.0), min: 0.0, max: 33.0 },
            slot(Some(100.0 / 3.0)),
            slot(Some(100.0 / 3.0)),
        ];
        assert_eq!(to_pixels(&slots, 100.0), vec![33.0, 34.0, 33.0]);
    }

    #[test]
    fn pixels_tolerate_float_error() {
        let slots = vec![slot(Some(100.0 / 295.0 * 100.0)), slot(Some(195.0 / 295.0 * 100.0))];
        assert_eq!(to_pixels(&slots, 295.0), vec![100.0, 195.0]);
    }

    #[test]
    fn solve_zero_free_space() {
        let mut slots = vec![slot(None), slot(None)];
        assert_eq!(solve(&mut slots, 0.0, 8), vec![0.0, 0.0]);
        assert_eq!(ratios(&slots), vec![50.0, 50.0]);
    }
}
