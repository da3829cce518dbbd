//! Per-node event buses with local, downward and upward dispatch.
//!
//! Handlers are keyed by the concrete event type. A dispatch walks a list of
//! nodes; any handler may stop the walk after its node is done.

use std::any::{Any, TypeId};

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::common::collections::HashMap;
use crate::model::tree::NodeId;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub(crate) u64);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Propagation {
    stopped: bool,
}

impl Propagation {
    /// Halts the dispatch once the current node's handlers have run.
    pub fn stop_propagation(&mut self) { self.stopped = true; }

    pub fn is_stopped(&self) -> bool { self.stopped }
}

type Handler = Box<dyn FnMut(&mut dyn Any, &mut Propagation)>;

#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<TypeId, Vec<(HandlerId, Handler)>>,
}

impl EventBus {
    pub fn on<E: Any>(
        &mut self,
        id: HandlerId,
        mut handler: impl FnMut(&mut E, &mut Propagation) + 'static,
    ) {
        let erased: Handler = Box::new(move |event, propagation| {
            if let Some(event) = event.downcast_mut::<E>() {
                handler(event, propagation);
            }
        });
        self.handlers.entry(TypeId::of::<E>()).or_default().push((id, erased));
    }

    pub fn off(&mut self, id: HandlerId) -> bool {
        let mut found = false;
        for list in self.handlers.values_mut() {
            let before = list.len();
            list.retain(|(h, _)| *h != id);
            found |= list.len() != before;
        }
        found
    }

    pub fn has_handlers<E: Any>(&self) -> bool {
        self.handlers.get(&TypeId::of::<E>()).is_some_and(|l| !l.is_empty())
    }

    /// Runs every handler registered for `E`, in registration order.
    pub fn dispatch<E: Any>(&mut self, event: &mut E, propagation: &mut Propagation) {
        let Some(list) = self.handlers.get_mut(&TypeId::of::<E>()) else {
            return;
        };
        for (_, handler) in list.iter_mut() {
            handler(event, propagation);
        }
    }
}

/// Dispatches `event` along `path`, stopping after the first node whose
/// handlers call [`Propagation::stop_propagation`].
pub fn dispatch<E: Any>(
    buses: &mut SecondaryMap<NodeId, EventBus>,
    path: impl IntoIterator<Item = NodeId>,
    event: &mut E,
) -> Propagation {
    let mut propagation = Propagation::default();
    for node in path {
        if let Some(bus) = buses.get_mut(node) {
            bus.dispatch(event, &mut propagation);
        }
        if propagation.is_stopped() {
            break;
        }
    }
    propagation
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::model::tree::Tree;

    #[derive(Debug, PartialEq)]
    struct Ping(Vec<&'static str>);

    struct Pong;

    fn recorder(
        log: &Rc<RefCell<Vec<&'static str>>>,
        name: &'static str,
    ) -> impl FnMut(&mut Ping, &mut Propagation) + 'static {
        let log = log.clone();
        move |ping, _| {
            ping.0.push(name);
            log.borrow_mut().push(name);
        }
    }

    #[test]
    fn dispatch_runs_handlers_in_order() {
        let log = Rc::new(RefCell::new(vec![]));
        let mut bus = EventBus::default();
        bus.on(HandlerId(1), recorder(&log, "a"));
        bus.on(HandlerId(2), recorder(&log, "b"));
        let mut ping = Ping(vec![]);
        bus.dispatch(&mut ping, &mut Propagation::default());
        assert_eq!(ping, Ping(vec!["a", "b"]));
        assert!(bus.has_handlers::<Ping>());
        assert!(!bus.has_handlers::<Pong>());
    }

    #[test]
    fn off_removes_handler() {
        let log = Rc::new(RefCell::new(vec![]));
        let mut bus = EventBus::default();
        bus.on(HandlerId(1), recorder(&log, "a"));
        bus.on(HandlerId(2), recorder(&log, "b"));
        assert!(bus.off(HandlerId(1)));
        assert!(!bus.off(HandlerId(1)));
        bus.dispatch(&mut Ping(vec![]), &mut Propagation::default());
        assert_eq!(*log.borrow(), vec!["b"]);
    }

    #[test]
    fn stop_propagation_finishes_current_node() {
        let mut tree = Tree::new();
        let root = tree.mk_node().into_id();
        let child = tree.mk_node().push_back(root);
        let leaf = tree.mk_node().push_back(child);

        let log = Rc::new(RefCell::new(vec![]));
        let mut buses = SecondaryMap::new();
        let mut bus = EventBus::default();
        bus.on(HandlerId(1), |_: &mut Ping, p: &mut Propagation| p.stop_propagation());
        bus.on(HandlerId(2), recorder(&log, "child"));
        buses.insert(child, bus);
        let mut root_bus = EventBus::default();
        root_bus.on(HandlerId(3), recorder(&log, "root"));
        buses.insert(root, root_bus);

        let path: Vec<_> = leaf.ancestors(&tree.map).collect();
        let propagation = dispatch(&mut buses, path, &mut Ping(vec![]));
        assert!(propagation.is_stopped());
        assert_eq!(*log.borrow(), vec!["child"]);

        let down: Vec<_> = root.traverse_preorder(&tree.map).collect();
        dispatch(&mut buses, down, &mut Ping(vec![]));
        assert_eq!(*log.borrow(), vec!["child", "root", "child"]);
    }
}
