#![forbid(unsafe_code)]

//! History node arena with generational handles.
//!
//! Nodes live in a slot vector addressed by [`NodeId`]. Freed slots are
//! recycled through a free list; each reuse bumps the slot's generation so a
//! handle to an evicted node can never alias its successor.
//!
//! # Ownership
//!
//! Children lists are the only ownership edges. `parent` is a lookup-only
//! back-reference, and `last_visited_child` is a hint that is cleared when
//! the child it names is freed.
//!
//! # Invariants
//!
//! 1. `len` equals the number of occupied slots.
//! 2. A live node's `parent` is live and lists the node among its children.
//! 3. `depth(child) == depth(parent) + 1`.
//! 4. `len <= capacity` after every operation.
//! 5. Every handle carries the tag of the store that issued it; another
//!    store's handle never resolves, even when slot and generation match.

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU32, Ordering};

use inkcel_core::StrokeCommand;

use crate::error::HistoryError;
use crate::snapshot::CanvasSnapshot;

/// Source of per-store tags.
static NEXT_STORE_TAG: AtomicU32 = AtomicU32::new(0);

/// A stable handle to a node in a [`NodeStore`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    tree: u32,
    idx: u32,
    generation: u32,
}

impl NodeId {
    /// Tag of the store that issued the handle.
    #[inline]
    #[must_use]
    pub const fn tree(self) -> u32 {
        self.tree
    }

    /// Raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Generation counter of the slot when the handle was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

/// One state in the history: the canvas after applying `stroke` to the
/// parent's state.
#[derive(Debug, Clone)]
pub struct HistoryNode {
    serial: u64,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    last_visited_child: Option<NodeId>,
    stroke: Option<StrokeCommand>,
    delta: Option<CanvasSnapshot>,
    full: Option<CanvasSnapshot>,
    depth: u64,
}

impl HistoryNode {
    /// Creation order within the owning tree.
    #[inline]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Parent handle, `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in creation order.
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Child that implicit redo moves to.
    #[inline]
    pub fn last_visited_child(&self) -> Option<NodeId> {
        self.last_visited_child
    }

    /// Stroke that produced this state; `None` only for the root.
    #[inline]
    pub fn stroke(&self) -> Option<&StrokeCommand> {
        self.stroke.as_ref()
    }

    /// Pre-stroke pixels of the stroke footprint.
    #[inline]
    pub fn delta(&self) -> Option<&CanvasSnapshot> {
        self.delta.as_ref()
    }

    /// Whole-canvas checkpoint of this state.
    #[inline]
    pub fn full(&self) -> Option<&CanvasSnapshot> {
        self.full.as_ref()
    }

    /// Strokes applied since the blank baseline.
    #[inline]
    pub fn depth(&self) -> u64 {
        self.depth
    }

    /// True for the tree root.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Number of redo branches.
    #[inline]
    pub fn branch_count(&self) -> usize {
        self.children.len()
    }

    /// Bytes held by this node's snapshots.
    pub fn snapshot_bytes(&self) -> usize {
        self.delta.as_ref().map_or(0, CanvasSnapshot::byte_len)
            + self.full.as_ref().map_or(0, CanvasSnapshot::byte_len)
    }

    /// Size in bytes for memory accounting.
    pub fn size_bytes(&self) -> usize {
        mem::size_of::<Self>()
            + self.children.capacity() * mem::size_of::<NodeId>()
            + self.stroke.as_ref().map_or(0, StrokeCommand::size_bytes)
            + self.snapshot_bytes()
    }

    pub(crate) fn set_delta(&mut self, snapshot: CanvasSnapshot) {
        debug_assert!(!snapshot.is_full(), "delta slot holds region snapshots");
        self.delta = Some(snapshot);
    }

    pub(crate) fn set_full(&mut self, snapshot: CanvasSnapshot) {
        debug_assert!(snapshot.is_full(), "full slot holds whole-canvas snapshots");
        self.full = Some(snapshot);
    }

    pub(crate) fn take_full(&mut self) -> Option<CanvasSnapshot> {
        self.full.take()
    }

    pub(crate) fn set_last_visited_child(&mut self, child: Option<NodeId>) {
        self.last_visited_child = child;
    }

    /// Turn this node into a root holding `baseline`.
    pub(crate) fn become_root(&mut self, baseline: CanvasSnapshot) {
        self.parent = None;
        self.stroke = None;
        self.delta = None;
        self.full = Some(baseline);
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<HistoryNode>,
}

/// Arena of history nodes.
#[derive(Debug, Clone)]
pub struct NodeStore {
    tag: u32,
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    len: usize,
    capacity: usize,
    next_serial: u64,
}

impl NodeStore {
    /// Create an empty store holding at most `capacity` live nodes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            tag: NEXT_STORE_TAG.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            capacity,
            next_serial: 0,
        }
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Drop every node and allocate a fresh parentless root.
    ///
    /// The root always fits, whatever the capacity.
    pub fn create_root(&mut self) -> NodeId {
        self.clear();
        self.alloc_unchecked(HistoryNode {
            serial: 0,
            parent: None,
            children: Vec::new(),
            last_visited_child: None,
            stroke: None,
            delta: None,
            full: None,
            depth: 0,
        })
    }

    /// Allocate a child of `parent` holding `stroke`.
    ///
    /// Fails with [`HistoryError::InvalidNodeId`] for a stale parent and with
    /// [`HistoryError::CapacityExceeded`] when the arena is full.
    pub fn create_node(
        &mut self,
        parent: NodeId,
        stroke: StrokeCommand,
    ) -> Result<NodeId, HistoryError> {
        let depth = self
            .get(parent)
            .ok_or(HistoryError::InvalidNodeId(parent))?
            .depth
            + 1;
        let id = self.alloc(HistoryNode {
            serial: 0,
            parent: Some(parent),
            children: Vec::new(),
            last_visited_child: None,
            stroke: Some(stroke),
            delta: None,
            full: None,
            depth,
        })?;
        if let Some(p) = self.get_mut(parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    fn alloc(&mut self, node: HistoryNode) -> Result<NodeId, HistoryError> {
        if self.is_full() {
            return Err(HistoryError::CapacityExceeded {
                max_nodes: self.capacity,
                nodes: self.len,
            });
        }
        Ok(self.alloc_unchecked(node))
    }

    fn alloc_unchecked(&mut self, mut node: HistoryNode) -> NodeId {
        node.serial = self.next_serial;
        self.next_serial += 1;
        self.len += 1;

        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.node = Some(node);
            return NodeId {
                tree: self.tag,
                idx,
                generation: slot.generation,
            };
        }

        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            tree: self.tag,
            idx,
            generation: 0,
        }
    }

    /// Free a single slot. Children must already be gone or re-homed.
    fn free(&mut self, id: NodeId) -> Option<HistoryNode> {
        let slot = self.slot_mut(id)?;
        let node = slot.node.take()?;
        self.free_list.push(id.idx);
        self.len -= 1;
        Some(node)
    }

    /// Remove `id` and all its descendants. Returns the number of freed nodes.
    ///
    /// The node is unlinked from its parent, and the parent's redo hint is
    /// cleared if it pointed at the removed branch.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        let Some(parent) = self.get(id).map(|n| n.parent) else {
            return 0;
        };
        if let Some(p) = parent.and_then(|p| self.get_mut(p)) {
            p.children.retain(|&c| c != id);
            if p.last_visited_child == Some(id) {
                p.last_visited_child = None;
            }
        }

        let mut freed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.free(next) {
                stack.extend(node.children);
                freed += 1;
            }
        }
        freed
    }

    /// Free `id` alone, detaching it from its parent and orphaning nothing:
    /// every child except `keep` is removed with its subtree, and `keep`
    /// becomes parentless.
    pub(crate) fn remove_keeping(&mut self, id: NodeId, keep: NodeId) -> usize {
        let children = match self.get(id) {
            Some(node) => node.children.clone(),
            None => return 0,
        };
        let mut freed = 0;
        for child in children {
            if child != keep {
                freed += self.remove_subtree(child);
            }
        }
        if let Some(k) = self.get_mut(keep) {
            k.parent = None;
        }
        if let Some(p) = self.get(id).and_then(|n| n.parent) {
            if let Some(p) = self.get_mut(p) {
                p.children.retain(|&c| c != id);
            }
        }
        if self.free(id).is_some() {
            freed += 1;
        }
        freed
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.free_list = (0..self.slots.len() as u32).rev().collect();
        self.len = 0;
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[inline]
    fn slot(&self, id: NodeId) -> Option<&Slot> {
        if id.tree != self.tag {
            return None;
        }
        self.slots
            .get(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
    }

    #[inline]
    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Slot> {
        if id.tree != self.tag {
            return None;
        }
        self.slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
    }

    /// Node behind `id`, if still alive in this store.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&HistoryNode> {
        self.slot(id)?.node.as_ref()
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut HistoryNode> {
        self.slot_mut(id)?.node.as_mut()
    }

    /// Whether `id` refers to a live node.
    #[inline]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Parent of `id`.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Children of `id` (empty for stale handles).
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| &n.children)
    }

    /// Live node count.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no nodes are live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum live node count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when another allocation would fail.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// All live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &HistoryNode)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeId {
                        tree: self.tag,
                        idx: idx as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }

    /// Breadth-first walk from `root`.
    pub fn breadth_first(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.len);
        let mut queue = VecDeque::new();
        if self.is_alive(root) {
            queue.push_back(root);
        }
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.children(id).iter().copied());
        }
        order
    }
}

// ============================================================================
// Tests
// ============================================================================
