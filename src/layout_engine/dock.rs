use std::any::Any;
use std::collections::BTreeSet;

use serde_json::Value;
use slotmap::SecondaryMap;
use tracing::{debug, instrument, trace, warn};

use super::config::{ContentConfig, NodeConfig, SplitConfig, SplitItemConfig, StackConfig};
use super::error::DockError;
use super::events::{Attached, BeforeClose, Detached, VisibilityChanged};
use super::graph::{Orientation, RenderableKind};
use super::renderable::{
    ComponentPane, ItemFlags, NodeData, Renderable, Splitter, Stack, StackItem, StackTab,
    XyContainer, XyItem,
};
use crate::backend::{
    ComponentBridge, ComponentHandle, RenderBackend, RenderDescription, RenderHeader, RenderNode,
    RenderSplitter, RenderTab,
};
use crate::common::config::Config;
use crate::model::cancellable::{Cancellable, Settled};
use crate::model::event::{self, EventBus, HandlerId, Propagation};
use crate::model::tree::{NodeMap, Observer, Tree};
use crate::model::{NodeId, RenderableArea};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOptions {
    /// Insert position among the parent's children; appends when `None`.
    pub index: Option<usize>,
    pub resize: bool,
    pub render: bool,
}

impl Default for AddOptions {
    fn default() -> Self { AddOptions { index: None, resize: true, render: true } }
}

impl AddOptions {
    pub fn at(index: usize) -> Self { AddOptions { index: Some(index), ..Default::default() } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOptions {
    pub destroy: bool,
    pub render: bool,
}

impl Default for RemoveOptions {
    fn default() -> Self { RemoveOptions { destroy: true, render: true } }
}

impl RemoveOptions {
    pub fn keep() -> Self { RemoveOptions { destroy: false, ..Default::default() } }
}

/// The docking layout: a tree of renderables under a single root.
pub struct DockLayout {
    pub(crate) tree: Tree<Components>,
    root: NodeId,
    bounds: RenderableArea,
    pub(crate) settings: Config,
    bridge: Box<dyn ComponentBridge>,
    backend: Option<Box<dyn RenderBackend>>,
    next_handler: u64,
    /// Stack exempt from pruning while a drop into it is being completed.
    pub(crate) keep_alive: Option<NodeId>,
    /// Node carried by the drag session running on this layout, if any.
    pub(crate) active_drag: Option<NodeId>,
}

#[derive(Default)]
pub(crate) struct Components {
    pub(crate) nodes: SecondaryMap<NodeId, NodeData>,
    pub(crate) buses: SecondaryMap<NodeId, EventBus>,
    pub(crate) handles: SecondaryMap<NodeId, Box<dyn ComponentHandle>>,
}

#[derive(Debug, Clone, Copy)]
enum TreeEvent {
    AddedToParent(NodeId),
    RemovingFromParent(NodeId),
    RemovedFromForest(NodeId),
}

impl Observer for Components {
    fn added_to_forest(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId) {
        self.handle_event(map, TreeEvent::AddedToParent(node))
    }

    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId) {
        self.handle_event(map, TreeEvent::RemovingFromParent(node))
    }

    fn removed_from_forest(&mut self, map: &NodeMap, node: NodeId) {
        self.handle_event(map, TreeEvent::RemovedFromForest(node))
    }
}

impl Components {
    /// Keeps splitters and tabs in step with the children they belong to.
    fn handle_event(&mut self, map: &NodeMap, event: TreeEvent) {
        match event {
            TreeEvent::AddedToParent(node) => {
                let Some(parent) = node.parent(map) else { return };
                let index = node.index_in_parent(map).unwrap_or(0);
                let count = parent.child_count(map);
                match self.nodes.get_mut(parent).map(|d| &mut d.renderable) {
                    Some(Renderable::XyContainer(c)) => {
                        c.splitters.resize_with(count.saturating_sub(1), Splitter::default)
                    }
                    Some(Renderable::Stack(s)) => {
                        let index = index.min(s.header.tabs.len());
                        s.header.tabs.insert(index, StackTab {
                            item: node,
                            area: RenderableArea::default(),
                        });
                        if count > 1 && index <= s.active_index {
                            s.active_index += 1;
                        }
                    }
                    _ => {}
                }
            }
            TreeEvent::RemovingFromParent(node) => {
                let Some(parent) = node.parent(map) else { return };
                let remaining = parent.child_count(map).saturating_sub(1);
                match self.nodes.get_mut(parent).map(|d| &mut d.renderable) {
                    Some(Renderable::XyContainer(c)) => {
                        c.splitters.truncate(remaining.saturating_sub(1))
                    }
                    Some(Renderable::Stack(s)) => {
                        if let Some(pos) = s.header.tabs.iter().position(|t| t.item == node) {
                            s.header.tabs.remove(pos);
                            if pos < s.active_index {
                                s.active_index -= 1;
                            }
                        }
                        s.active_index = s.active_index.min(s.header.tabs.len().saturating_sub(1));
                    }
                    _ => {}
                }
            }
            TreeEvent::RemovedFromForest(node) => {
                if let Some(mut handle) = self.handles.remove(node) {
                    handle.on_before_destroy();
                }
                self.nodes.remove(node);
                self.buses.remove(node);
            }
        }
    }
}

fn wrong_kind(node: NodeId, found: Option<RenderableKind>, expected: RenderableKind) -> DockError {
    match found {
        Some(found) => DockError::WrongKind { node, expected, found },
        None => DockError::NodeNotFound(node),
    }
}

impl DockLayout {
    pub fn new(settings: Config, bridge: impl ComponentBridge + 'static) -> Self {
        let mut tree = Tree::with_observer(Components::default());
        let root = tree.mk_node().into_id();
        let mut data = NodeData::new(Renderable::Root);
        data.shown = true;
        tree.data.nodes.insert(root, data);
        DockLayout {
            tree,
            root,
            bounds: RenderableArea::default(),
            settings,
            bridge: Box::new(bridge),
            backend: None,
            next_handler: 0,
            keep_alive: None,
            active_drag: None,
        }
    }

    pub fn set_backend(&mut self, backend: impl RenderBackend + 'static) {
        self.backend = Some(Box::new(backend));
    }

    pub fn settings(&self) -> &Config { &self.settings }

    pub fn root(&self) -> NodeId { self.root }

    /// The node filling the root, if any.
    pub fn content(&self) -> Option<NodeId> { self.root.first_child(&self.tree.map) }

    pub fn bounds(&self) -> RenderableArea { self.bounds }

    pub fn active_drag(&self) -> Option<NodeId> { self.active_drag }

    #[instrument(skip(self))]
    pub fn set_bounds(&mut self, bounds: RenderableArea) {
        self.bounds = bounds;
        self.resize();
        self.request_render();
    }

    // Construction

    fn insert_node(&mut self, renderable: Renderable, tags: &[String]) -> NodeId {
        let node = self.tree.mk_node().into_id();
        let mut data = NodeData::new(renderable);
        data.tags = tags.iter().cloned().collect();
        self.tree.data.nodes.insert(node, data);
        node
    }

    pub fn create_xy_container(&mut self, orientation: Orientation) -> NodeId {
        let container = XyContainer::new(orientation, self.settings.layout.splitter_size);
        self.insert_node(Renderable::XyContainer(container), &[])
    }

    pub fn create_xy_item(&mut self, item: XyItem) -> NodeId {
        self.insert_node(Renderable::XyItem(item), &[])
    }

    pub fn create_stack(&mut self) -> NodeId {
        let stack = Stack::new(self.settings.stack.header_size, self.settings.stack.tab_width);
        self.insert_node(Renderable::Stack(stack), &[])
    }

    pub fn create_stack_item(&mut self, item: StackItem) -> NodeId {
        self.insert_node(Renderable::StackItem(item), &[])
    }

    /// Creates a component pane and mounts its content through the bridge.
    pub fn create_component(&mut self, component: &str, props: Value) -> Result<NodeId, DockError> {
        let node = self.insert_node(
            Renderable::Component(ComponentPane {
                component: component.to_string(),
                props: props.clone(),
            }),
            &[],
        );
        match self.bridge.mount(component, &props, node) {
            Ok(handle) => {
                self.tree.data.handles.insert(node, handle);
                Ok(node)
            }
            Err(err) => {
                node.remove_root(&mut self.tree);
                Err(DockError::NoCreatableContent {
                    component: component.to_string(),
                    reason: format!("{err:#}"),
                })
            }
        }
    }

    /// Materializes `config` as a detached subtree and returns its top node.
    ///
    /// Nothing is left behind when any part fails to build.
    #[instrument(skip(self, config))]
    pub fn create(&mut self, config: &NodeConfig) -> Result<NodeId, DockError> {
        match config {
            NodeConfig::Row(split) => self.build_split(Orientation::Horizontal, split),
            NodeConfig::Column(split) => self.build_split(Orientation::Vertical, split),
            NodeConfig::Stack(stack) => self.build_stack(stack),
            NodeConfig::Component(c) => {
                let node = self.create_component(&c.component, c.props.clone())?;
                self.tree.data.nodes[node].tags = c.tags.iter().cloned().collect();
                Ok(node)
            }
        }
    }

    fn create_content(&mut self, content: &ContentConfig) -> Result<NodeId, DockError> {
        match content {
            ContentConfig::Component(name) => self.create_component(name, Value::Null),
            ContentConfig::Node(node) => self.create(node),
        }
    }

    pub(crate) fn discard_on_err<T>(&mut self, node: NodeId, result: Result<T, DockError>) -> Result<T, DockError> {
        if result.is_err() && self.tree.map.contains(node) {
            node.remove_root(&mut self.tree);
        }
        result
    }

    fn build_split(&mut self, orientation: Orientation, config: &SplitConfig) -> Result<NodeId, DockError> {
        let mut container = XyContainer::new(
            orientation,
            config.splitter_size.unwrap_or(self.settings.layout.splitter_size),
        );
        container.is_static = config.is_static;
        let node = self.insert_node(Renderable::XyContainer(container), &config.tags);
        for child in &config.children {
            let item = self.build_split_item(child);
            let item = self.discard_on_err(node, item)?;
            item.detach(&mut self.tree).push_back(node);
        }
        Ok(node)
    }

    fn build_split_item(&mut self, config: &SplitItemConfig) -> Result<NodeId, DockError> {
        let content = self.create_content(&config.content)?;
        let item = XyItem {
            ratio: config.ratio,
            min_size: config.min_size(),
            max_size: config.max_size(),
            is_minimized: config.minimized,
            last_size: config.last_size,
        };
        let node = self.insert_node(Renderable::XyItem(item), &config.tags);
        content.detach(&mut self.tree).push_back(node);
        Ok(node)
    }

    fn build_stack(&mut self, config: &StackConfig) -> Result<NodeId, DockError> {
        let mut stack = Stack::new(
            config.header_size.unwrap_or(self.settings.stack.header_size),
            config.tab_width.unwrap_or(self.settings.stack.tab_width),
        );
        stack.direction = config.direction;
        stack.reverse = config.reverse;
        stack.header.controls = config.controls.clone();
        let node = self.insert_node(Renderable::Stack(stack), &config.tags);
        for child in &config.children {
            let content = self.create_content(&child.content);
            let content = self.discard_on_err(node, content)?;
            let item = StackItem {
                title: child.display_title(),
                flags: child.flags(),
                tab_controls: child.tab_controls.clone(),
            };
            let item = self.insert_node(Renderable::StackItem(item), &child.tags);
            content.detach(&mut self.tree).push_back(item);
            item.detach(&mut self.tree).push_back(node);
        }
        if let Some(stack) = self.tree.data.nodes[node].renderable.as_stack_mut() {
            stack.active_index = config.active_index.min(stack.header.tabs.len().saturating_sub(1));
        }
        Ok(node)
    }

    /// Replaces the root content with a tree built from `config`.
    #[instrument(skip(self, config))]
    pub fn load(&mut self, config: &NodeConfig) -> Result<NodeId, DockError> {
        let content = self.create(config)?;
        if let Some(old) = self.content() {
            self.remove_child(self.root, old, RemoveOptions { destroy: true, render: false })?;
        }
        self.add_child(self.root, content, AddOptions::default())?;
        debug!(?content, "layout loaded");
        Ok(content)
    }

    // Structure

    fn accepts(parent: RenderableKind, child: RenderableKind) -> bool {
        match parent {
            RenderableKind::Root | RenderableKind::XyItem | RenderableKind::StackItem => {
                child.is_content()
            }
            RenderableKind::XyContainer => child == RenderableKind::XyItem,
            RenderableKind::Stack => child == RenderableKind::StackItem,
            RenderableKind::Component => false,
        }
    }

    /// Inserts `child` under `parent`, moving it out of its current parent first.
    #[instrument(skip(self))]
    pub fn add_child(&mut self, parent: NodeId, child: NodeId, opts: AddOptions) -> Result<(), DockError> {
        let parent_kind = self.kind(parent).ok_or(DockError::NodeNotFound(parent))?;
        let child_kind = self.kind(child).ok_or(DockError::NodeNotFound(child))?;
        if !Self::accepts(parent_kind, child_kind) {
            return Err(DockError::InvalidChild { parent: parent_kind, child: child_kind });
        }
        if child == parent || child.contains(&self.tree.map, parent) {
            return Err(DockError::Cycle(child));
        }
        if parent_kind.is_wrapper()
            && parent.first_child(&self.tree.map).is_some_and(|c| c != child)
        {
            return Err(DockError::Occupied(parent));
        }

        if let Some(old_parent) = child.parent(&self.tree.map) {
            if old_parent != parent {
                self.remove_child(old_parent, child, RemoveOptions { destroy: false, render: false })?;
                if !self.tree.map.contains(parent) {
                    return Err(DockError::NodeNotFound(parent));
                }
            }
        }

        let was_attached = self.is_attached(child);
        let index = opts.index.unwrap_or(usize::MAX);
        child.detach(&mut self.tree).insert_at(parent, index);
        trace!(?parent, ?child, "child added");

        if !was_attached && self.is_attached(child) {
            self.notify_attached(child);
        }
        if opts.resize {
            if self.is_attached(parent) {
                self.resize();
            } else {
                self.resize_node(parent);
            }
        }
        self.refresh_visibility();
        if opts.render {
            self.request_render();
        }
        Ok(())
    }

    /// Detaches `child` from `parent`, destroying it unless `opts.destroy` is
    /// false. Containers left empty or with a single item are pruned.
    #[instrument(skip(self))]
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId, opts: RemoveOptions) -> Result<(), DockError> {
        if child.parent(&self.tree.map) != Some(parent) {
            return Err(DockError::NotAChild { parent, child });
        }
        let was_attached = self.is_attached(child);
        if was_attached {
            self.notify_detached(child);
        }
        if opts.destroy {
            child.detach(&mut self.tree).remove();
        } else {
            child.detach(&mut self.tree).unlink();
        }
        trace!(?parent, ?child, destroy = opts.destroy, "child removed");
        self.prune(parent);
        if was_attached {
            self.resize();
            self.refresh_visibility();
        }
        if opts.render {
            self.request_render();
        }
        Ok(())
    }

    /// Destroys `node` and its subtree wherever it is.
    pub fn destroy(&mut self, node: NodeId) -> Result<(), DockError> {
        if node == self.root {
            return Err(DockError::RootRemoval);
        }
        match node.parent(&self.tree.map) {
            Some(parent) => self.remove_child(parent, node, RemoveOptions::default()),
            None if self.tree.map.contains(node) => {
                node.remove_root(&mut self.tree);
                Ok(())
            }
            None => Err(DockError::NodeNotFound(node)),
        }
    }

    /// Wraps a content node in a new item so it can join a row or column.
    pub fn wrap_in_xy_item(&mut self, content: NodeId, item: XyItem) -> Result<NodeId, DockError> {
        let wrapper = self.create_xy_item(item);
        let result = self.add_child(wrapper, content, AddOptions { index: None, resize: false, render: false });
        self.discard_on_err(wrapper, result)?;
        Ok(wrapper)
    }

    /// Wraps a content node in a new tab item so it can join a stack.
    pub fn wrap_in_stack_item(&mut self, content: NodeId, item: StackItem) -> Result<NodeId, DockError> {
        let wrapper = self.create_stack_item(item);
        let result = self.add_child(wrapper, content, AddOptions { index: None, resize: false, render: false });
        self.discard_on_err(wrapper, result)?;
        Ok(wrapper)
    }

    pub(crate) fn prune(&mut self, node: NodeId) {
        if !self.tree.map.contains(node) || self.keep_alive == Some(node) {
            return;
        }
        enum Prune {
            Wrapper,
            Empty,
            Collapse,
        }
        let count = node.child_count(&self.tree.map);
        let action = match &self.tree.data.nodes[node].renderable {
            Renderable::XyItem(_) | Renderable::StackItem(_) if count == 0 => Prune::Wrapper,
            Renderable::XyContainer(c) if !c.is_static && count == 0 => Prune::Empty,
            Renderable::XyContainer(c) if !c.is_static && count == 1 => Prune::Collapse,
            Renderable::Stack(_) if count == 0 => Prune::Empty,
            _ => return,
        };
        match action {
            Prune::Wrapper => {
                if let Some(parent) = node.parent(&self.tree.map) {
                    trace!(?node, "removing empty wrapper");
                    node.detach(&mut self.tree).remove();
                    self.prune(parent);
                }
            }
            Prune::Empty => self.remove_empty(node),
            Prune::Collapse => self.collapse(node),
        }
    }

    fn remove_empty(&mut self, node: NodeId) {
        let Some(wrapper) = node.parent(&self.tree.map) else { return };
        if wrapper == self.root {
            return;
        }
        debug!(?node, "removing empty container");
        node.detach(&mut self.tree).remove();
        self.prune(wrapper);
    }

    /// Replaces a container holding a single item with that item's content.
    fn collapse(&mut self, container: NodeId) {
        if container.parent(&self.tree.map).is_none() {
            return;
        }
        let Some(item) = container.first_child(&self.tree.map) else { return };
        let Some(content) = item.first_child(&self.tree.map) else { return };
        debug!(?container, ?content, "collapsing single-item container");
        content.detach(&mut self.tree).replace(container);
        container.remove_root(&mut self.tree);
    }

    // Queries

    pub fn node_data(&self, node: NodeId) -> Option<&NodeData> { self.tree.data.nodes.get(node) }

    pub fn renderable(&self, node: NodeId) -> Option<&Renderable> {
        self.node_data(node).map(|d| &d.renderable)
    }

    pub fn kind(&self, node: NodeId) -> Option<RenderableKind> {
        self.renderable(node).map(Renderable::kind)
    }

    pub fn area(&self, node: NodeId) -> Option<RenderableArea> { self.node_data(node).map(|d| d.area) }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> { node.parent(&self.tree.map) }

    pub fn children(&self, node: NodeId) -> &[NodeId] { node.child_ids(&self.tree.map) }

    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        node.descendants(&self.tree.map).collect()
    }

    /// Strict ancestors nearest first, optionally only those of `kind`.
    pub fn parents(&self, node: NodeId, kind: Option<RenderableKind>) -> Vec<NodeId> {
        node.ancestors(&self.tree.map)
            .skip(1)
            .filter(|&n| kind.is_none_or(|k| self.kind(n) == Some(k)))
            .collect()
    }

    /// Nearest strict ancestor of `kind`.
    pub fn parent_of_kind(&self, node: NodeId, kind: RenderableKind) -> Option<NodeId> {
        node.ancestors(&self.tree.map).skip(1).find(|&n| self.kind(n) == Some(kind))
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor.contains(&self.tree.map, node)
    }

    /// True when `node` is part of the tree under the layout root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.tree.map.contains(node) && node.root(&self.tree.map) == self.root
    }

    /// True when `node` and every ancestor up to the root are shown.
    pub fn is_visible(&self, node: NodeId) -> bool {
        self.is_attached(node) && node.ancestors(&self.tree.map).all(|n| self.self_visible(n))
    }

    fn self_visible(&self, node: NodeId) -> bool {
        let map = &self.tree.map;
        let minimized_wrapper = |n: NodeId| {
            n.parent(map)
                .and_then(|p| self.renderable(p))
                .and_then(Renderable::as_xy_item)
                .is_some_and(|i| i.is_minimized)
        };
        match self.renderable(node) {
            Some(Renderable::StackItem(_)) => {
                let Some(stack_node) = node.parent(map) else { return true };
                let active = self
                    .renderable(stack_node)
                    .and_then(Renderable::as_stack)
                    .and_then(Stack::active_item);
                active == Some(node) && !minimized_wrapper(stack_node)
            }
            Some(Renderable::Component(_)) => !minimized_wrapper(node),
            Some(_) => true,
            None => false,
        }
    }

    pub(crate) fn node_ref(&self, node: NodeId) -> Result<&NodeData, DockError> {
        self.tree.data.nodes.get(node).ok_or(DockError::NodeNotFound(node))
    }

    pub fn xy_container(&self, node: NodeId) -> Result<&XyContainer, DockError> {
        self.renderable(node)
            .and_then(Renderable::as_xy_container)
            .ok_or_else(|| wrong_kind(node, self.kind(node), RenderableKind::XyContainer))
    }

    pub(crate) fn xy_container_mut(&mut self, node: NodeId) -> Result<&mut XyContainer, DockError> {
        let found = self.kind(node);
        self.tree
            .data
            .nodes
            .get_mut(node)
            .and_then(|d| d.renderable.as_xy_container_mut())
            .ok_or_else(|| wrong_kind(node, found, RenderableKind::XyContainer))
    }

    pub fn xy_item(&self, node: NodeId) -> Result<&XyItem, DockError> {
        self.renderable(node)
            .and_then(Renderable::as_xy_item)
            .ok_or_else(|| wrong_kind(node, self.kind(node), RenderableKind::XyItem))
    }

    pub(crate) fn xy_item_mut(&mut self, node: NodeId) -> Result<&mut XyItem, DockError> {
        let found = self.kind(node);
        self.tree
            .data
            .nodes
            .get_mut(node)
            .and_then(|d| d.renderable.as_xy_item_mut())
            .ok_or_else(|| wrong_kind(node, found, RenderableKind::XyItem))
    }

    pub fn stack(&self, node: NodeId) -> Result<&Stack, DockError> {
        self.renderable(node)
            .and_then(Renderable::as_stack)
            .ok_or_else(|| wrong_kind(node, self.kind(node), RenderableKind::Stack))
    }

    pub(crate) fn stack_mut(&mut self, node: NodeId) -> Result<&mut Stack, DockError> {
        let found = self.kind(node);
        self.tree
            .data
            .nodes
            .get_mut(node)
            .and_then(|d| d.renderable.as_stack_mut())
            .ok_or_else(|| wrong_kind(node, found, RenderableKind::Stack))
    }

    pub fn stack_item(&self, node: NodeId) -> Result<&StackItem, DockError> {
        self.renderable(node)
            .and_then(Renderable::as_stack_item)
            .ok_or_else(|| wrong_kind(node, self.kind(node), RenderableKind::StackItem))
    }

    pub fn stack_item_mut(&mut self, node: NodeId) -> Result<&mut StackItem, DockError> {
        let found = self.kind(node);
        self.tree
            .data
            .nodes
            .get_mut(node)
            .and_then(|d| d.renderable.as_stack_item_mut())
            .ok_or_else(|| wrong_kind(node, found, RenderableKind::StackItem))
    }

    // Tags

    pub fn tags(&self, node: NodeId) -> Option<&BTreeSet<String>> {
        self.node_data(node).map(|d| &d.tags)
    }

    pub fn add_tag(&mut self, node: NodeId, tag: impl Into<String>) -> Result<bool, DockError> {
        let data = self.tree.data.nodes.get_mut(node).ok_or(DockError::NodeNotFound(node))?;
        Ok(data.tags.insert(tag.into()))
    }

    pub fn remove_tag(&mut self, node: NodeId, tag: &str) -> Result<bool, DockError> {
        let data = self.tree.data.nodes.get_mut(node).ok_or(DockError::NodeNotFound(node))?;
        Ok(data.tags.remove(tag))
    }

    pub fn has_tag(&self, node: NodeId, tag: &str) -> bool {
        self.tags(node).is_some_and(|t| t.contains(tag))
    }

    /// Attached nodes carrying `tag`, in document order.
    pub fn find_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.root
            .traverse_preorder(&self.tree.map)
            .filter(|&n| self.has_tag(n, tag))
            .collect()
    }

    // Events

    pub fn on<E: Any>(
        &mut self,
        node: NodeId,
        handler: impl FnMut(&mut E, &mut Propagation) + 'static,
    ) -> Result<HandlerId, DockError> {
        if !self.tree.map.contains(node) {
            return Err(DockError::NodeNotFound(node));
        }
        let id = HandlerId(self.next_handler);
        let entry = self.tree.data.buses.entry(node).ok_or(DockError::NodeNotFound(node))?;
        entry.or_default().on(id, handler);
        self.next_handler += 1;
        Ok(id)
    }

    pub fn off(&mut self, node: NodeId, handler: HandlerId) -> bool {
        self.tree.data.buses.get_mut(node).is_some_and(|bus| bus.off(handler))
    }

    /// Dispatches on `node` only.
    pub fn emit<E: Any>(&mut self, node: NodeId, event: &mut E) -> Propagation {
        event::dispatch(&mut self.tree.data.buses, [node], event)
    }

    /// Dispatches on `node` and then its descendants in document order.
    pub fn emit_down<E: Any>(&mut self, node: NodeId, event: &mut E) -> Propagation {
        let path: Vec<_> = node.traverse_preorder(&self.tree.map).collect();
        event::dispatch(&mut self.tree.data.buses, path, event)
    }

    /// Dispatches on `node` and then each ancestor up to the root.
    pub fn emit_up<E: Any>(&mut self, node: NodeId, event: &mut E) -> Propagation {
        let path: Vec<_> = node.ancestors(&self.tree.map).collect();
        event::dispatch(&mut self.tree.data.buses, path, event)
    }

    pub(crate) fn notify_attached(&mut self, node: NodeId) {
        let subtree: Vec<_> = node.traverse_preorder(&self.tree.map).collect();
        for n in subtree {
            if let Some(handle) = self.tree.data.handles.get_mut(n) {
                handle.on_attach();
            }
        }
        self.emit_down(node, &mut Attached { node });
    }

    fn notify_detached(&mut self, node: NodeId) {
        self.emit_down(node, &mut Detached { node });
        let subtree: Vec<_> = node.traverse_preorder(&self.tree.map).collect();
        for n in subtree {
            let was_shown = std::mem::replace(&mut self.tree.data.nodes[n].shown, false);
            if let Some(handle) = self.tree.data.handles.get_mut(n) {
                if was_shown {
                    handle.on_visibility_change(false);
                }
                handle.on_detach();
            }
            if was_shown {
                self.emit(n, &mut VisibilityChanged { node: n, visible: false });
            }
        }
    }

    /// Recomputes effective visibility below the root and reports changes.
    pub(crate) fn refresh_visibility(&mut self) {
        let mut changes = Vec::new();
        let mut pending = vec![(self.root, true)];
        while let Some((node, parent_visible)) = pending.pop() {
            let visible = parent_visible && self.self_visible(node);
            let data = &mut self.tree.data.nodes[node];
            if data.shown != visible {
                data.shown = visible;
                changes.push((node, visible));
            }
            pending.extend(node.children(&self.tree.map).rev().map(|c| (c, visible)));
        }
        for (node, visible) in changes {
            trace!(?node, visible, "visibility changed");
            if let Some(handle) = self.tree.data.handles.get_mut(node) {
                handle.on_visibility_change(visible);
            }
            self.emit(node, &mut VisibilityChanged { node, visible });
        }
    }

    // Closing

    /// Asks the item's listeners for permission, then removes and destroys it.
    ///
    /// Returns `Ok(false)` when a listener vetoed the close.
    #[instrument(skip(self))]
    pub async fn close(&mut self, item: NodeId) -> Result<bool, DockError> {
        if !self.stack_item(item)?.flags.contains(ItemFlags::CLOSEABLE) {
            return Err(DockError::NotCloseable(item));
        }
        let mut event = Cancellable::new(BeforeClose { item });
        self.emit_up(item, &mut event);
        match event.settle().await {
            Settled::Resolved(_) => {
                let parent = self.parent(item).ok_or(DockError::NodeNotFound(item))?;
                self.remove_child(parent, item, RemoveOptions::default())?;
                Ok(true)
            }
            Settled::Cancelled => {
                debug!(?item, "close vetoed");
                Ok(false)
            }
            Settled::Failed(err) => {
                warn!(?item, "close gate failed: {err:#}");
                Err(DockError::CloseFailed { node: item, reason: format!("{err:#}") })
            }
        }
    }

    // Rendering

    pub fn request_render(&mut self) {
        if self.backend.is_none() {
            return;
        }
        let description = self.describe();
        if let Some(backend) = self.backend.as_mut() {
            backend.render(&description);
        }
    }

    pub fn describe(&self) -> RenderDescription {
        RenderDescription {
            bounds: self.bounds,
            root: self.describe_node(self.root),
        }
    }

    fn describe_node(&self, node: NodeId) -> RenderNode {
        let data = &self.tree.data.nodes[node];
        let mut out = RenderNode {
            id: node,
            kind: data.renderable.kind(),
            area: data.area,
            visible: data.shown,
            label: None,
            splitters: Vec::new(),
            header: None,
            children: node.children(&self.tree.map).map(|c| self.describe_node(c)).collect(),
        };
        match &data.renderable {
            Renderable::XyContainer(c) => {
                out.splitters = c
                    .splitters
                    .iter()
                    .map(|s| RenderSplitter {
                        area: s.area.translate(s.offset.x, s.offset.y),
                        disabled: s.disabled,
                    })
                    .collect();
            }
            Renderable::Stack(s) => {
                let tabs = s.header.preview.as_ref();
                out.header = Some(RenderHeader {
                    area: s.header.area,
                    tabs: s
                        .header
                        .tabs
                        .iter()
                        .enumerate()
                        .map(|(i, tab)| RenderTab {
                            item: tab.item,
                            title: self.stack_item(tab.item).map(|t| t.title.clone()).unwrap_or_default(),
                            area: tabs.and_then(|p| p.get(i).copied()).unwrap_or(tab.area),
                            active: i == s.active_index,
                        })
                        .collect(),
                });
            }
            Renderable::StackItem(item) => out.label = Some(item.title.clone()),
            Renderable::Component(pane) => out.label = Some(pane.component.clone()),
            Renderable::Root | Renderable::XyItem(_) => {}
        }
        out
    }

    pub fn draw_tree(&self) -> String {
        let tree = self.get_ascii_tree(self.root);
        let mut out = String::new();
        if ascii_tree::write_tree(&mut out, &tree).is_err() {
            warn!("failed to draw layout tree");
        }
        out
    }

    fn get_ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let data = &self.tree.data.nodes[node];
        let area = data.area;
        let geometry = format!(
            "[{} {} {}x{}]",
            area.x(),
            area.y(),
            area.width(),
            area.height()
        );
        let desc = match &data.renderable {
            Renderable::Root => format!("root {geometry}"),
            Renderable::XyContainer(c) => {
                let name = match c.orientation {
                    Orientation::Horizontal => "row",
                    Orientation::Vertical => "column",
                };
                format!("{name} {geometry}")
            }
            Renderable::XyItem(i) => {
                let ratio = i.ratio.map(|r| format!("{r:.2}%")).unwrap_or_else(|| "unallocated".into());
                let minimized = if i.is_minimized { " minimized" } else { "" };
                format!("item {ratio}{minimized} {geometry}")
            }
            Renderable::Stack(s) => format!("stack active={} {geometry}", s.active_index),
            Renderable::StackItem(item) => {
                let status = if data.shown { "☒" } else { "☐" };
                format!("{status} {:?} {geometry}", item.title)
            }
            Renderable::Component(pane) => format!("component {} {geometry}", pane.component),
        };
        let desc = if data.tags.is_empty() {
            desc
        } else {
            let tags: Vec<_> = data.tags.iter().map(String::as_str).collect();
            format!("{desc} #{}", tags.join(" #"))
        };
        let children: Vec<_> =
            node.children(&self.tree.map).map(|c| self.get_ascii_tree(c)).collect();
        if children.is_empty() {
            ascii_tree::Tree::Leaf(vec![desc])
        } else {
            ascii_tree::Tree::Node(desc, children)
        }
    }
}
