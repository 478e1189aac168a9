#![forbid(unsafe_code)]

//! One history tree per animation frame.
//!
//! Trees never share nodes or snapshots. Switching contexts only changes
//! which tree operations are routed to; swapping pixels is the frame
//! store's job.

use crate::error::HistoryError;
use crate::tree::HistoryTree;

const TARGET: &str = "inkcel.history";

/// Ordered set of independent history trees with one active.
#[derive(Debug, Clone)]
pub struct ContextSet {
    trees: Vec<HistoryTree>,
    active: usize,
    max_nodes: usize,
}

impl ContextSet {
    /// Create `count` empty contexts (at least one).
    #[must_use]
    pub fn new(count: usize, max_nodes: usize) -> Self {
        let count = count.max(1);
        Self {
            trees: (0..count).map(|_| HistoryTree::new(max_nodes)).collect(),
            active: 0,
            max_nodes,
        }
    }

    /// Number of contexts.
    #[inline]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Always false; a set holds at least one context.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Index of the active context.
    #[inline]
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// The active tree.
    #[inline]
    pub fn active(&self) -> &HistoryTree {
        &self.trees[self.active]
    }

    /// The active tree, mutably.
    #[inline]
    pub fn active_mut(&mut self) -> &mut HistoryTree {
        &mut self.trees[self.active]
    }

    /// Tree of context `index`.
    pub fn get(&self, index: usize) -> Option<&HistoryTree> {
        self.trees.get(index)
    }

    /// All trees in context order.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryTree> + '_ {
        self.trees.iter()
    }

    /// Grow or shrink to `count` contexts (at least one).
    ///
    /// New contexts start empty. Dropped contexts lose their history, and
    /// the active index is clamped to the new range. Returns the number of
    /// contexts dropped.
    pub fn set_count(&mut self, count: usize) -> usize {
        let count = count.max(1);
        let before = self.trees.len();
        if count > before {
            let max_nodes = self.max_nodes;
            self.trees.resize_with(count, || HistoryTree::new(max_nodes));
        } else {
            self.trees.truncate(count);
        }
        self.active = self.active.min(count - 1);
        let dropped = before.saturating_sub(count);
        tracing::debug!(target: TARGET, before, after = count, dropped, "context count set");
        dropped
    }

    /// Grow so that `index` is a valid context.
    pub fn ensure(&mut self, index: usize) {
        if index >= self.trees.len() {
            self.set_count(index + 1);
        }
    }

    /// Make `index` the active context.
    pub fn switch(&mut self, index: usize) -> Result<(), HistoryError> {
        if index >= self.trees.len() {
            return Err(HistoryError::ContextOutOfRange {
                index,
                count: self.trees.len(),
            });
        }
        self.active = index;
        Ok(())
    }

    /// Drop the history of context `index`.
    pub fn reset(&mut self, index: usize) -> Result<(), HistoryError> {
        let count = self.trees.len();
        let tree = self
            .trees
            .get_mut(index)
            .ok_or(HistoryError::ContextOutOfRange { index, count })?;
        let dropped = tree.node_count().saturating_sub(1);
        tree.reset();
        tracing::info!(target: TARGET, context = index, dropped, "context reset");
        Ok(())
    }

    /// Strokes held across every context.
    pub fn total_strokes(&self) -> usize {
        self.trees
            .iter()
            .map(|t| t.node_count().saturating_sub(1))
            .sum()
    }
}
