#![forbid(unsafe_code)]

//! One context's history: a node arena, its root, and the current node.
//!
//! ```text
//!            root (Full baseline)
//!              │
//!              a ──────── b'        b' is an abandoned redo branch,
//!              │                    still reachable with goto_node
//!              b
//!              │
//!              c  ◄── current       root → c is the spine
//! ```
//!
//! The tree only tracks topology. Pixels move through the
//! [`CheckpointManager`](crate::CheckpointManager).

use std::fmt;

use crate::node::{HistoryNode, NodeId, NodeStore};

/// Topology of one context's history.
#[derive(Clone)]
pub struct HistoryTree {
    store: NodeStore,
    root: NodeId,
    current: NodeId,
    max_nodes: usize,
}

impl fmt::Debug for HistoryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryTree")
            .field("root", &self.root)
            .field("current", &self.current)
            .field("nodes", &self.store.len())
            .field("max_nodes", &self.max_nodes)
            .finish()
    }
}

impl HistoryTree {
    /// Create a tree holding only a root, with room for `max_nodes` nodes
    /// plus the one being recorded before eviction runs.
    #[must_use]
    pub fn new(max_nodes: usize) -> Self {
        let mut store = NodeStore::new(max_nodes.saturating_add(1));
        let root = store.create_root();
        Self {
            store,
            root,
            current: root,
            max_nodes,
        }
    }

    /// Root handle.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Current handle.
    #[inline]
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Node budget.
    #[inline]
    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Underlying arena.
    #[inline]
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    #[inline]
    pub(crate) fn store_mut(&mut self) -> &mut NodeStore {
        &mut self.store
    }

    /// Node behind `id`.
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&HistoryNode> {
        self.store.get(id)
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut HistoryNode> {
        self.store.get_mut(id)
    }

    /// The current node.
    pub fn current_node(&self) -> Option<&HistoryNode> {
        self.store.get(self.current)
    }

    /// Whether `id` is a live node of this tree.
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.store.is_alive(id)
    }

    /// Parent of `id`.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.store.parent(id)
    }

    /// Live nodes, root included.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    /// Depth of the current node.
    pub fn current_depth(&self) -> u64 {
        self.current_node().map_or(0, HistoryNode::depth)
    }

    /// True when the root holds its baseline snapshot.
    pub fn has_baseline(&self) -> bool {
        self.store.get(self.root).is_some_and(|n| n.full().is_some())
    }

    /// True when nothing has been recorded since the last reset.
    pub fn is_pristine(&self) -> bool {
        self.store.len() == 1 && !self.has_baseline()
    }

    /// Whether undo has somewhere to go.
    #[inline]
    pub fn can_undo(&self) -> bool {
        self.current != self.root
    }

    /// Whether implicit redo has somewhere to go.
    #[inline]
    pub fn can_redo(&self) -> bool {
        !self.store.children(self.current).is_empty()
    }

    /// Number of children of the current node.
    #[inline]
    pub fn redo_branch_count(&self) -> usize {
        self.store.children(self.current).len()
    }

    /// Child implicit redo moves to: the last visited child, or the most
    /// recently created one when none was visited.
    pub fn redo_target(&self) -> Option<NodeId> {
        let node = self.store.get(self.current)?;
        if let Some(hint) = node.last_visited_child() {
            if self.store.parent(hint) == Some(self.current) {
                return Some(hint);
            }
        }
        node.children()
            .iter()
            .copied()
            .max_by_key(|&c| self.store.get(c).map_or(0, HistoryNode::serial))
    }

    /// Handles from the root to `id`, both inclusive.
    pub fn path_to(&self, id: NodeId) -> Option<Vec<NodeId>> {
        let mut path = vec![id];
        let mut cursor = self.store.get(id)?.parent();
        while let Some(p) = cursor {
            path.push(p);
            cursor = self.store.parent(p);
        }
        path.reverse();
        Some(path)
    }

    /// The spine: root to current, both inclusive.
    pub fn spine(&self) -> Vec<NodeId> {
        self.path_to(self.current).unwrap_or_else(|| vec![self.root])
    }

    /// Every live node in breadth-first order from the root.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.store.breadth_first(self.root)
    }

    /// Bytes held by snapshots.
    pub fn snapshot_bytes(&self) -> usize {
        self.store.iter().map(|(_, n)| n.snapshot_bytes()).sum()
    }

    /// Bytes held by nodes, strokes, and snapshots.
    pub fn memory_usage(&self) -> usize {
        self.store.iter().map(|(_, n)| n.size_bytes()).sum()
    }

    /// Drop all history and start over from a fresh root.
    pub fn reset(&mut self) {
        self.root = self.store.create_root();
        self.current = self.root;
    }

    pub(crate) fn set_current(&mut self, id: NodeId) {
        debug_assert!(self.store.is_alive(id));
        self.current = id;
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        debug_assert!(self.store.parent(id).is_none());
        self.root = id;
    }

    /// Point every node on `path` at its successor for implicit redo.
    pub(crate) fn mark_visited(&mut self, path: &[NodeId]) {
        for pair in path.windows(2) {
            if let Some(node) = self.store.get_mut(pair[0]) {
                node.set_last_visited_child(Some(pair[1]));
            }
        }
    }
}
