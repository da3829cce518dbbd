use std::ops::Index;

use slotmap::SlotMap;

/// N-ary tree with ordered children.
pub struct Tree<O> {
    pub map: NodeMap,
    pub data: O,
}

impl Tree<()> {
    pub fn new() -> Self { Self::with_observer(()) }
}

impl<O: Observer> Tree<O> {
    pub fn with_observer(data: O) -> Self { Tree { map: NodeMap::new(), data } }

    pub fn mk_node(&mut self) -> UnattachedNode<'_, O> {
        let id = self.map.map.insert(Node::default());
        self.data.added_to_forest(&self.map, id);
        UnattachedNode { id, tree: self }
    }
}

/// Map that holds the structure of the tree.
///
/// Several roots can live in one map. Subtrees that are built before being
/// attached, or that were detached and not yet destroyed, are roots too.
pub struct NodeMap {
    map: SlotMap<NodeId, Node>,
}

impl NodeMap {
    fn new() -> NodeMap { NodeMap { map: SlotMap::default() } }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn contains(&self, id: NodeId) -> bool { self.map.contains_key(id) }
}

impl Index<NodeId> for NodeMap {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output { &self.map[index] }
}

slotmap::new_key_type! {
    /// Represents a node somewhere in the tree.
    pub struct NodeId;
}

impl NodeId {
    #[track_caller]
    pub fn detach<'a, O: Observer>(self, tree: &'a mut Tree<O>) -> DetachedNode<'a, O> {
        DetachedNode { id: self, tree }
    }

    pub fn parent(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.parent)
    }

    pub fn children(self, map: &NodeMap) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.child_ids(map).iter().copied()
    }

    pub fn child_ids(self, map: &NodeMap) -> &[NodeId] {
        map.map.get(self).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_count(self, map: &NodeMap) -> usize { self.child_ids(map).len() }

    pub fn child_at(self, map: &NodeMap, index: usize) -> Option<NodeId> {
        self.child_ids(map).get(index).copied()
    }

    pub fn first_child(self, map: &NodeMap) -> Option<NodeId> {
        self.child_ids(map).first().copied()
    }

    pub fn last_child(self, map: &NodeMap) -> Option<NodeId> { self.child_ids(map).last().copied() }

    pub fn is_empty(self, map: &NodeMap) -> bool { self.child_ids(map).is_empty() }

    /// Position of this node among its parent's children.
    pub fn index_in_parent(self, map: &NodeMap) -> Option<usize> {
        let parent = self.parent(map)?;
        parent.child_ids(map).iter().position(|&c| c == self)
    }

    pub fn next_sibling(self, map: &NodeMap) -> Option<NodeId> {
        let parent = self.parent(map)?;
        parent.child_at(map, self.index_in_parent(map)? + 1)
    }

    pub fn prev_sibling(self, map: &NodeMap) -> Option<NodeId> {
        let parent = self.parent(map)?;
        let index = self.index_in_parent(map)?;
        index.checked_sub(1).and_then(|i| parent.child_at(map, i))
    }

    pub fn traverse_postorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PostorderTraversal { map, stack: vec![(self, false)] }
    }

    pub fn traverse_preorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PreorderTraversal { map, stack: vec![self] }
    }

    /// Every node below this one in preorder, excluding itself.
    pub fn descendants(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        self.traverse_preorder(map).skip(1)
    }

    /// Returns an iterator over all ancestors of the current node, including itself.
    pub fn ancestors(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = map.contains(self).then_some(self);
        std::iter::from_fn(move || {
            let node = next;
            next = node.and_then(|n| n.parent(map));
            node
        })
    }

    /// True when `other` is a strict descendant of this node.
    pub fn contains(self, map: &NodeMap, other: NodeId) -> bool {
        other != self && other.ancestors(map).any(|a| a == self)
    }

    /// The topmost ancestor of this node.
    pub fn root(self, map: &NodeMap) -> NodeId { self.ancestors(map).last().unwrap_or(self) }

    #[track_caller]
    pub fn remove_root<O: Observer>(self, tree: &mut Tree<O>) {
        assert!(
            self.parent(&tree.map).is_none(),
            "remove_root called on non-root node"
        );
        delete_recursive(tree, self);
    }
}

pub trait Observer
where Self: Sized {
    fn added_to_forest(&mut self, map: &NodeMap, node: NodeId);
    /// Called after `node` is linked; its parent and index are visible in `map`.
    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId);
    /// Called before `node` is unlinked from its parent.
    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId);
    /// Called for every node of a destroyed subtree, children first, while
    /// the node is still in `map`.
    fn removed_from_forest(&mut self, map: &NodeMap, node: NodeId);
}

impl Observer for () {
    fn added_to_forest(&mut self, _forest: &NodeMap, _node: NodeId) {}

    fn added_to_parent(&mut self, _forest: &NodeMap, _node: NodeId) {}

    fn removing_from_parent(&mut self, _forest: &NodeMap, _node: NodeId) {}

    fn removed_from_forest(&mut self, _forest: &NodeMap, _node: NodeId) {}
}

#[must_use = "Unattached nodes should be inserted into the tree or kept as a root"]
pub struct UnattachedNode<'a, O> {
    id: NodeId,
    tree: &'a mut Tree<O>,
}

impl<'a, O: Observer> UnattachedNode<'a, O> {
    /// Keeps the node in the forest as a root until attached or removed.
    pub fn into_id(self) -> NodeId { self.id }

    #[track_caller]
    pub fn push_back(self, parent: NodeId) -> NodeId {
        let index = parent.child_count(&self.tree.map);
        self.insert_at(parent, index)
    }

    #[track_caller]
    pub fn insert_at(self, parent: NodeId, index: usize) -> NodeId {
        link(&mut self.tree.map, self.id, parent, index);
        self.tree.data.added_to_parent(&self.tree.map, self.id);
        self.id
    }
}

#[must_use = "Detached nodes should be reattached to the tree or removed"]
pub struct DetachedNode<'a, O> {
    id: NodeId,
    tree: &'a mut Tree<O>,
}

impl<'a, O: Observer> DetachedNode<'a, O> {
    #[track_caller]
    pub fn push_back(mut self, parent: NodeId) -> NodeId {
        self.unlink_from_parent();
        let index = parent.child_count(&self.tree.map);
        self.attach(parent, index)
    }

    /// Moves the node to `index` under `parent`. The index is interpreted
    /// after the node has left its previous position.
    #[track_caller]
    pub fn insert_at(mut self, parent: NodeId, index: usize) -> NodeId {
        self.unlink_from_parent();
        self.attach(parent, index)
    }

    /// Puts this node where `old` sits in its parent; `old` becomes a root.
    ///
    /// The node is unlinked first, so `old` may be one of its ancestors.
    #[track_caller]
    pub fn replace(mut self, old: NodeId) -> NodeId {
        self.unlink_from_parent();
        if old == self.id {
            return self.id;
        }
        let Some(parent) = old.parent(&self.tree.map) else {
            return self.id;
        };
        let index = old.index_in_parent(&self.tree.map).unwrap_or(0);
        DetachedNode { id: old, tree: &mut *self.tree }.unlink_from_parent();
        self.attach(parent, index)
    }

    /// Unlinks the node and keeps its subtree in the forest as a root.
    pub fn unlink(mut self) -> NodeId {
        self.unlink_from_parent();
        self.id
    }

    /// Unlinks the node and destroys its whole subtree.
    pub fn remove(mut self) {
        self.unlink_from_parent();
        delete_recursive(self.tree, self.id);
    }

    fn unlink_from_parent(&mut self) -> Option<NodeId> {
        let parent = self.id.parent(&self.tree.map)?;
        self.tree.data.removing_from_parent(&self.tree.map, self.id);
        self.tree.map.map[parent].children.retain(|&c| c != self.id);
        self.tree.map.map[self.id].parent = None;
        Some(parent)
    }

    #[track_caller]
    fn attach(self, parent: NodeId, index: usize) -> NodeId {
        assert!(
            !parent.ancestors(&self.tree.map).any(|a| a == self.id),
            "cannot attach a node below itself"
        );
        link(&mut self.tree.map, self.id, parent, index);
        self.tree.data.added_to_parent(&self.tree.map, self.id);
        self.id
    }
}

#[derive(Default, PartialEq, Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[track_caller]
fn link(map: &mut NodeMap, id: NodeId, parent: NodeId, index: usize) {
    debug_assert!(map.map[id].parent.is_none(), "node is already linked");
    let siblings = &mut map.map[parent].children;
    let index = index.min(siblings.len());
    siblings.insert(index, id);
    map.map[id].parent = Some(parent);
}

fn delete_recursive<O: Observer>(tree: &mut Tree<O>, id: NodeId) {
    let order: Vec<NodeId> = id.traverse_postorder(&tree.map).collect();
    for node in &order {
        tree.data.removed_from_forest(&tree.map, *node);
    }
    for node in order {
        tree.map.map.remove(node);
    }
}

struct PreorderTraversal<'a> {
    map: &'a NodeMap,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for PreorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children(self.map).rev());
        Some(node)
    }
}

struct PostorderTraversal<'a> {
    map: &'a NodeMap,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> Iterator for PostorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, expanded) = self.stack.pop()?;
            if expanded || node.is_empty(self.map) {
                return Some(node);
            }
            self.stack.push((node, true));
            self.stack.extend(node.children(self.map).rev().map(|c| (c, false)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A tree with the following structure:
    /// ```text
    ///         [tree]              [other_tree]
    ///        __root__              other_root
    ///       /    |   \
    /// child1  child2  child3
    ///            |
    ///           gc1
    /// ```
    struct TestTree {
        tree: Tree<Events>,
        root: NodeId,
        child1: NodeId,
        child2: NodeId,
        child3: NodeId,
        gc1: NodeId,
        other_root: NodeId,
    }

    impl TestTree {
        #[rustfmt::skip]
        fn new() -> Self {
            let mut tree = Tree::with_observer(Events(vec![]));

            let root = tree.mk_node().into_id();
            let child1 = tree.mk_node().push_back(root);
            let child2 = tree.mk_node().push_back(root);
            let child3 = tree.mk_node().push_back(root);

            let gc1 = tree.mk_node().push_back(child2);
            let other_root = tree.mk_node().into_id();

            let mut t = TestTree { tree, root, child1, child2, child3, gc1, other_root };
            t.clear_events();
            t
        }

        fn get_children(&self, node: NodeId) -> Vec<NodeId> {
            node.children(&self.tree.map).collect()
        }

        #[track_caller]
        fn assert_children_are<const N: usize>(&self, children: [NodeId; N], parent: NodeId) {
            assert_eq!(children.as_slice(), self.get_children(parent), "children did not match");
            for child in self.get_children(parent) {
                assert_eq!(
                    child.parent(&self.tree.map),
                    Some(parent),
                    "child has incorrect parent"
                );
            }
        }

        #[track_caller]
        fn assert_events_are<const N: usize>(&mut self, events: [TreeEvent; N]) {
            let actual: Vec<_> = self.tree.data.0.drain(..).collect();
            pretty_assertions::assert_eq!(events.as_slice(), actual);
        }

        fn clear_events(&mut self) { self.tree.data.0.clear(); }
    }

    #[derive(Clone, PartialEq, Debug)]
    enum TreeEvent {
        AddedToForest(NodeId),
        AddedToParent(NodeId, NodeId, usize),
        RemovingFromParent(NodeId, NodeId),
        RemovedFromForest(NodeId),
    }
    use TreeEvent::*;

    struct Events(Vec<TreeEvent>);

    impl Observer for Events {
        fn added_to_forest(&mut self, _map: &NodeMap, node: NodeId) {
            self.0.push(AddedToForest(node))
        }

        fn added_to_parent(&mut self, map: &NodeMap, node: NodeId) {
            let parent = node.parent(map).expect("added_to_parent called on unlinked node");
            let index = node.index_in_parent(map).expect("node missing from parent");
            self.0.push(AddedToParent(node, parent, index))
        }

        fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId) {
            let parent =
                node.parent(map).expect("removing_from_parent called on node without parent");
            self.0.push(RemovingFromParent(node, parent))
        }

        fn removed_from_forest(&mut self, map: &NodeMap, node: NodeId) {
            assert!(map.contains(node));
            self.0.push(RemovedFromForest(node))
        }
    }

    #[test]
    fn iterator() {
        let t = TestTree::new();
        assert_eq!([t.child1, t.child2, t.child3], *t.get_children(t.root));
        assert!(t.get_children(t.child1).is_empty());
        assert_eq!([t.gc1], *t.get_children(t.child2));
        assert!(t.get_children(t.other_root).is_empty());
        assert_eq!(3, t.root.child_count(&t.tree.map));
        assert_eq!(Some(t.child3), t.root.last_child(&t.tree.map));
    }

    #[test]
    fn siblings_and_index() {
        let t = TestTree::new();
        let map = &t.tree.map;
        assert_eq!(Some(1), t.child2.index_in_parent(map));
        assert_eq!(None, t.root.index_in_parent(map));
        assert_eq!(Some(t.child3), t.child2.next_sibling(map));
        assert_eq!(Some(t.child1), t.child2.prev_sibling(map));
        assert_eq!(None, t.child1.prev_sibling(map));
        assert_eq!(None, t.child3.next_sibling(map));
    }

    #[test]
    fn ancestors() {
        let t = TestTree::new();
        let ancestors = |node: NodeId| node.ancestors(&t.tree.map).collect::<Vec<_>>();
        assert_eq!([t.child1, t.root], *ancestors(t.child1));
        assert_eq!([t.gc1, t.child2, t.root], *ancestors(t.gc1));
        assert_eq!([t.root], *ancestors(t.root));
        assert_eq!([t.other_root], *ancestors(t.other_root));
        assert_eq!(t.root, t.gc1.root(&t.tree.map));
    }

    #[test]
    fn contains_is_strict() {
        let t = TestTree::new();
        let map = &t.tree.map;
        assert!(t.root.contains(map, t.gc1));
        assert!(t.child2.contains(map, t.gc1));
        assert!(!t.child1.contains(map, t.gc1));
        assert!(!t.root.contains(map, t.root));
        assert!(!t.root.contains(map, t.other_root));
    }

    #[test]
    fn traverse_postorder() {
        let t = TestTree::new();
        let traverse = |node: NodeId| node.traverse_postorder(&t.tree.map).collect::<Vec<_>>();
        assert_eq!([t.child1, t.gc1, t.child2, t.child3, t.root], *traverse(t.root));
        assert_eq!([t.child1], *traverse(t.child1));
    }

    #[test]
    fn traverse_preorder() {
        let t = TestTree::new();
        let traverse = |node: NodeId| node.traverse_preorder(&t.tree.map).collect::<Vec<_>>();
        assert_eq!([t.root, t.child1, t.child2, t.gc1, t.child3], *traverse(t.root));
        let descendants = t.child2.descendants(&t.tree.map).collect::<Vec<_>>();
        assert_eq!([t.gc1], *descendants);
    }

    #[test]
    fn insert_at_index() {
        let mut t = TestTree::new();
        let n = t.tree.mk_node().insert_at(t.root, 1);
        t.assert_children_are([t.child1, n, t.child2, t.child3], t.root);
        t.assert_events_are([AddedToForest(n), AddedToParent(n, t.root, 1)]);

        let last = t.tree.mk_node().insert_at(t.root, 99);
        assert_eq!(Some(last), t.root.last_child(&t.tree.map));
    }

    #[test]
    fn move_within_parent() {
        let mut t = TestTree::new();
        t.child1.detach(&mut t.tree).insert_at(t.root, 2);
        t.assert_children_are([t.child2, t.child3, t.child1], t.root);
        t.assert_events_are([
            RemovingFromParent(t.child1, t.root),
            AddedToParent(t.child1, t.root, 2),
        ]);
    }

    #[test]
    fn move_across_trees() {
        let mut t = TestTree::new();
        t.child2.detach(&mut t.tree).push_back(t.other_root);
        t.assert_children_are([t.child1, t.child3], t.root);
        t.assert_children_are([t.child2], t.other_root);
        t.assert_children_are([t.gc1], t.child2);
    }

    #[test]
    fn unlink_keeps_subtree() {
        let mut t = TestTree::new();
        let id = t.child2.detach(&mut t.tree).unlink();
        assert_eq!(None, id.parent(&t.tree.map));
        assert!(t.tree.map.contains(t.gc1));
        t.assert_children_are([t.child1, t.child3], t.root);
        t.assert_events_are([RemovingFromParent(t.child2, t.root)]);
    }

    #[test]
    fn replace_takes_position() {
        let mut t = TestTree::new();
        let n = t.tree.mk_node().into_id();
        t.clear_events();
        n.detach(&mut t.tree).replace(t.child2);
        t.assert_children_are([t.child1, n, t.child3], t.root);
        assert_eq!(None, t.child2.parent(&t.tree.map));
        t.assert_events_are([RemovingFromParent(t.child2, t.root), AddedToParent(n, t.root, 1)]);
    }

    #[test]
    fn replace_ancestor_with_descendant() {
        let mut t = TestTree::new();
        t.gc1.detach(&mut t.tree).replace(t.child2);
        t.assert_children_are([t.child1, t.gc1, t.child3], t.root);
        assert!(t.child2.is_empty(&t.tree.map));
    }

    #[test]
    fn remove_destroys_children_first() {
        let mut t = TestTree::new();
        t.child2.detach(&mut t.tree).remove();
        t.assert_children_are([t.child1, t.child3], t.root);
        assert!(!t.tree.map.contains(t.child2));
        assert!(!t.tree.map.contains(t.gc1));
        t.assert_events_are([
            RemovingFromParent(t.child2, t.root),
            RemovedFromForest(t.gc1),
            RemovedFromForest(t.child2),
        ]);
    }

    #[test]
    fn remove_root() {
        let mut t = TestTree::new();
        t.root.remove_root(&mut t.tree);
        assert_eq!(1, t.tree.map.len());
        assert!(t.tree.map.contains(t.other_root));
    }

    #[test]
    #[should_panic]
    fn attach_below_itself() {
        let mut t = TestTree::new();
        t.child2.detach(&mut t.tree).push_back(t.gc1);
    }
}
