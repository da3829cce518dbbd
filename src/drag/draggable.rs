//! Raw pointer drag tracking.
//!
//! A press only turns into a drag once the pointer has moved at least the
//! threshold away from where it went down. Until then nothing is emitted,
//! so plain clicks never reach drag listeners.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::trace;

use crate::common::config::DragSettings;
use crate::model::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragPhase {
    Start,
    Move,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragEvent {
    pub phase: DragPhase,
    /// Where the pointer went down.
    pub origin: Point,
    pub position: Point,
    /// `position - origin`.
    pub delta: Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    Pressed { origin: Point, threshold: f64 },
    Dragging { origin: Point },
}

#[derive(Debug)]
pub struct Draggable {
    threshold: f64,
    state: State,
    subscribers: Vec<UnboundedSender<DragEvent>>,
}

impl Draggable {
    pub fn new(threshold: f64) -> Self {
        Draggable {
            threshold,
            state: State::Idle,
            subscribers: Vec::new(),
        }
    }

    pub fn from_settings(settings: &DragSettings) -> Self { Self::new(settings.threshold) }

    pub fn threshold(&self) -> f64 { self.threshold }

    pub fn is_dragging(&self) -> bool { matches!(self.state, State::Dragging { .. }) }

    /// A receiver for every drag event emitted from now on.
    pub fn subscribe(&mut self) -> UnboundedReceiver<DragEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// [`Draggable::subscribe`] as a stream. It ends on [`Draggable::destroy`].
    pub fn events(&mut self) -> UnboundedReceiverStream<DragEvent> {
        UnboundedReceiverStream::new(self.subscribe())
    }

    pub fn pointer_down(&mut self, at: Point) { self.pointer_down_with_threshold(at, self.threshold) }

    pub fn pointer_down_with_threshold(&mut self, at: Point, threshold: f64) {
        self.state = State::Pressed { origin: at, threshold };
    }

    pub fn pointer_move(&mut self, at: Point) -> Option<DragEvent> {
        match self.state {
            State::Idle => None,
            State::Pressed { origin, threshold } => {
                if at.distance(origin) < threshold {
                    return None;
                }
                self.state = State::Dragging { origin };
                Some(self.broadcast(DragPhase::Start, origin, at))
            }
            State::Dragging { origin } => Some(self.broadcast(DragPhase::Move, origin, at)),
        }
    }

    /// Ends the press. Emits a stop only when the press had become a drag.
    pub fn pointer_up(&mut self, at: Point) -> Option<DragEvent> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Dragging { origin } => Some(self.broadcast(DragPhase::Stop, origin, at)),
            State::Idle | State::Pressed { .. } => None,
        }
    }

    /// Drops every subscriber, completing their streams.
    pub fn destroy(&mut self) {
        self.state = State::Idle;
        self.subscribers.clear();
    }

    fn broadcast(&mut self, phase: DragPhase, origin: Point, position: Point) -> DragEvent {
        let event = DragEvent {
            phase,
            origin,
            position,
            delta: position.delta_from(origin),
        };
        trace!(?event, "drag event");
        self.subscribers.retain(|tx| tx.send(event).is_ok());
        event
    }
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;

    #[test]
    fn below_threshold_emits_nothing() {
        let mut drag = Draggable::new(25.0);
        let mut rx = drag.subscribe();
        drag.pointer_down(Point::new(10.0, 10.0));
        assert_eq!(drag.pointer_move(Point::new(20.0, 20.0)), None);
        assert_eq!(drag.pointer_up(Point::new(20.0, 20.0)), None);
        assert!(rx.try_recv().is_err());
        assert!(!drag.is_dragging());
    }

    #[test]
    fn start_move_stop() {
        let mut drag = Draggable::new(25.0);
        let mut rx = drag.subscribe();
        drag.pointer_down(Point::new(0.0, 0.0));
        let start = drag.pointer_move(Point::new(30.0, 0.0)).unwrap();
        assert_eq!(start.phase, DragPhase::Start);
        assert_eq!(start.delta, Point::new(30.0, 0.0));
        assert!(drag.is_dragging());

        drag.pointer_move(Point::new(40.0, 5.0));
        let stop = drag.pointer_up(Point::new(50.0, 5.0)).unwrap();
        assert_eq!(stop.phase, DragPhase::Stop);
        assert_eq!(stop.delta, Point::new(50.0, 5.0));

        let phases: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.phase).collect();
        assert_eq!(phases, vec![DragPhase::Start, DragPhase::Move, DragPhase::Stop]);
    }

    #[test]
    fn threshold_per_press() {
        let mut drag = Draggable::new(25.0);
        drag.pointer_down_with_threshold(Point::ZERO, 0.0);
        assert_eq!(drag.pointer_move(Point::new(1.0, 0.0)).map(|e| e.phase), Some(DragPhase::Start));
        drag.pointer_up(Point::new(1.0, 0.0));

        drag.pointer_down(Point::ZERO);
        assert_eq!(drag.pointer_move(Point::new(1.0, 0.0)), None);
    }

    #[test]
    fn move_without_press_is_ignored() {
        let mut drag = Draggable::new(0.0);
        assert_eq!(drag.pointer_move(Point::new(100.0, 100.0)), None);
    }

    #[tokio::test]
    async fn destroy_completes_streams() {
        let mut drag = Draggable::new(0.0);
        let mut events = drag.events();
        drag.pointer_down(Point::ZERO);
        drag.pointer_move(Point::new(3.0, 4.0));
        drag.destroy();

        let first = events.next().await.unwrap();
        assert_eq!(first.phase, DragPhase::Start);
        assert_eq!(first.position.distance(first.origin), 5.0);
        assert_eq!(events.next().await, None);
    }
}
