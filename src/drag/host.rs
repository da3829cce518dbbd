//! The single active drag session: target hit-testing, the highlight
//! indicator and the final drop.

use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, instrument, trace, warn};

use super::target::{DragSource, DropCandidate, DropTarget, DropTargetRef, Placement, drop_candidates};
use super::{DragEvent, DragPhase, Draggable};
use crate::layout_engine::{DockError, DockLayout, RenderableKind};
use crate::model::{NodeId, Point, RenderableArea};

#[derive(Debug, Error)]
pub enum DragError {
    #[error("A drag session is already running for {0:?}")]
    SessionActive(NodeId),
    #[error("{0:?} cannot be dragged")]
    NotDraggable(NodeId),
    #[error("No drag session is running")]
    NoSession,
    #[error("Drop failed: {0}")]
    Drop(#[from] DockError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    Dropped {
        item: NodeId,
        target: DropTargetRef,
        placement: Placement,
    },
    /// Released over nothing, or the draggable went away. The item is
    /// still where it started.
    Failed { item: NodeId },
}

struct DragSession {
    source: Box<dyn DragSource>,
    events: UnboundedReceiver<DragEvent>,
    drag_area: RenderableArea,
    candidates: Vec<DropCandidate>,
    active: Option<usize>,
    delta: Point,
}

#[derive(Default)]
pub struct DragHost {
    bounds: Option<RenderableArea>,
    session: Option<DragSession>,
    highlight: Option<RenderableArea>,
}

impl DragHost {
    pub fn new() -> Self { Self::default() }

    /// Pointer positions are clamped to `bounds` while dragging.
    pub fn set_bounds(&mut self, bounds: Option<RenderableArea>) { self.bounds = bounds; }

    pub fn is_dragging(&self) -> bool { self.session.is_some() }

    /// Where the highlight indicator should be drawn, if anywhere.
    pub fn highlight(&self) -> Option<RenderableArea> { self.highlight }

    /// The dragged area moved along with the pointer.
    pub fn ghost(&self) -> Option<RenderableArea> {
        self.session.as_ref().map(|s| s.drag_area.translate(s.delta.x, s.delta.y))
    }

    pub fn candidates(&self) -> &[DropCandidate] {
        self.session.as_ref().map(|s| s.candidates.as_slice()).unwrap_or_default()
    }

    pub fn active_target(&self) -> Option<DropTargetRef> {
        let session = self.session.as_ref()?;
        session.active.map(|i| session.candidates[i].target)
    }

    /// Starts a session carrying `source`, listening to `draggable`.
    #[instrument(skip(self, dock, source, draggable))]
    pub fn initialize(
        &mut self,
        dock: &mut DockLayout,
        source: impl DragSource + 'static,
        draggable: &mut Draggable,
        drag_area: RenderableArea,
    ) -> Result<(), DragError> {
        let running = self.session.as_ref().map(|s| s.source.node());
        if let Some(dragged) = running.or(dock.active_drag) {
            return Err(DragError::SessionActive(dragged));
        }
        let node = source.node();
        if !source.is_draggable(dock) {
            return Err(DragError::NotDraggable(node));
        }
        let candidates = drop_candidates(dock, node);
        debug!(?node, candidates = candidates.len(), "drag session started");
        dock.active_drag = Some(node);
        self.session = Some(DragSession {
            source: Box::new(source),
            events: draggable.subscribe(),
            drag_area,
            candidates,
            active: None,
            delta: Point::ZERO,
        });
        Ok(())
    }

    /// Handles every drag event received so far. Returns the outcome once the
    /// session has ended.
    pub fn pump(&mut self, dock: &mut DockLayout) -> Result<Option<DragOutcome>, DragError> {
        loop {
            let session = self.session.as_mut().ok_or(DragError::NoSession)?;
            match session.events.try_recv() {
                Ok(event) => {
                    if let Some(outcome) = self.handle_event(dock, event)? {
                        return Ok(Some(outcome));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return self.fail(dock).map(Some),
            }
        }
    }

    /// Waits for the session to end.
    pub async fn run(&mut self, dock: &mut DockLayout) -> Result<DragOutcome, DragError> {
        loop {
            let session = self.session.as_mut().ok_or(DragError::NoSession)?;
            let Some(event) = session.events.recv().await else {
                return self.fail(dock);
            };
            if let Some(outcome) = self.handle_event(dock, event)? {
                return Ok(outcome);
            }
        }
    }

    fn handle_event(&mut self, dock: &mut DockLayout, event: DragEvent) -> Result<Option<DragOutcome>, DragError> {
        match event.phase {
            DragPhase::Start | DragPhase::Move => {
                self.track(dock, event);
                Ok(None)
            }
            DragPhase::Stop => {
                self.track(dock, event);
                self.finish(dock, event).map(Some)
            }
        }
    }

    fn pointer(&self, dock: &DockLayout, position: Point) -> Point {
        match self.bounds {
            Some(bounds) if dock.settings().drag.clamp_to_host => bounds.clamp(position),
            _ => position,
        }
    }

    /// Picks the smallest candidate under the pointer and moves the highlight.
    fn track(&mut self, dock: &mut DockLayout, event: DragEvent) {
        let pointer = self.pointer(dock, event.position);
        let Some(session) = self.session.as_mut() else { return };
        session.delta = event.delta;

        let mut best: Option<usize> = None;
        for (i, candidate) in session.candidates.iter().enumerate() {
            if !candidate.area.contains(pointer) {
                continue;
            }
            if best.is_none_or(|b| candidate.area.surface() < session.candidates[b].area.surface()) {
                best = Some(i);
            }
        }

        if best != session.active {
            if let Some(previous) = session.active {
                trace!(candidate = ?session.candidates[previous].target, "highlight exit");
                session.candidates[previous].target.on_drop_highlight_exit(dock);
            }
            session.active = best;
        }
        self.highlight = best.and_then(|i| {
            let candidate = session.candidates[i];
            candidate.target.highlight_coordinates(dock, &candidate.area, pointer)
        });
    }

    fn finish(&mut self, dock: &mut DockLayout, event: DragEvent) -> Result<DragOutcome, DragError> {
        let session = self.end_session(dock)?;
        let item = session.source.node();
        let Some(candidate) = session.active.map(|i| session.candidates[i]) else {
            debug!(?item, "dropped outside every target");
            return Ok(DragOutcome::Failed { item });
        };
        candidate.target.on_drop_highlight_exit(dock);
        if dock.kind(candidate.target.node()) != Some(RenderableKind::Stack) {
            debug!(?item, target = ?candidate.target, "drop target went away");
            return Ok(DragOutcome::Failed { item });
        }

        let origin = session.source.handle_drop_cleanup(dock, &candidate.target)?;
        match candidate.target.handle_drop(dock, item, &candidate.area, &event) {
            Ok(placement) => {
                debug!(?item, ?placement, "dropped");
                Ok(DragOutcome::Dropped { item, target: candidate.target, placement })
            }
            Err(err) => {
                if let Some(origin) = origin
                    && let Err(restore_err) = session.source.restore(dock, origin)
                {
                    warn!(?item, "could not put the item back: {restore_err}");
                }
                Err(err.into())
            }
        }
    }

    fn fail(&mut self, dock: &mut DockLayout) -> Result<DragOutcome, DragError> {
        let session = self.end_session(dock)?;
        if let Some(previous) = session.active {
            session.candidates[previous].target.on_drop_highlight_exit(dock);
        }
        debug!(item = ?session.source.node(), "drag events ended without a drop");
        Ok(DragOutcome::Failed { item: session.source.node() })
    }

    fn end_session(&mut self, dock: &mut DockLayout) -> Result<DragSession, DragError> {
        let session = self.session.take().ok_or(DragError::NoSession)?;
        self.highlight = None;
        if dock.active_drag == Some(session.source.node()) {
            dock.active_drag = None;
        }
        Ok(session)
    }
}
