#![forbid(unsafe_code)]

//! Bounding a tree's node count and snapshot bytes.
//!
//! Runs after every recorded stroke. Escalation order:
//!
//! 1. Drop abandoned redo branches (whole off-spine subtrees), oldest
//!    branch point first.
//! 2. Fold the oldest spine nodes into the root. The new root's baseline is
//!    rebuilt in memory from a later full snapshot and the deltas between.
//! 3. Demote spine checkpoints to delta-only nodes, oldest first.
//!
//! The root baseline and the delta of `current` are never dropped.

use std::collections::HashSet;

use inkcel_core::{Canvas, PixelBuffer};

use crate::error::HistoryError;
use crate::node::NodeId;
use crate::snapshot::CanvasSnapshot;
use crate::tree::HistoryTree;

const TARGET: &str = "inkcel.history";

/// What one eviction pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Off-spine subtrees dropped.
    pub subtrees_evicted: usize,
    /// Nodes freed with those subtrees.
    pub nodes_evicted: usize,
    /// Spine nodes folded into the root.
    pub nodes_folded: usize,
    /// Full snapshots dropped from spine nodes.
    pub checkpoints_demoted: usize,
    /// Set when the node budget could not be met.
    pub shortfall: Option<HistoryError>,
}

impl EvictionReport {
    /// True when the pass changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.subtrees_evicted == 0
            && self.nodes_folded == 0
            && self.checkpoints_demoted == 0
            && self.shortfall.is_none()
    }

    /// Add the counts of a later pass; its shortfall replaces this one.
    pub(crate) fn absorb(&mut self, later: EvictionReport) {
        self.subtrees_evicted += later.subtrees_evicted;
        self.nodes_evicted += later.nodes_evicted;
        self.nodes_folded += later.nodes_folded;
        self.checkpoints_demoted += later.checkpoints_demoted;
        self.shortfall = later.shortfall;
    }
}

/// Per-context memory budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    max_nodes: usize,
    max_snapshot_bytes: usize,
}

impl EvictionPolicy {
    /// Budget of `max_nodes` nodes and `max_snapshot_bytes` bytes
    /// (0 = unlimited bytes).
    #[must_use]
    pub const fn new(max_nodes: usize, max_snapshot_bytes: usize) -> Self {
        Self {
            max_nodes,
            max_snapshot_bytes,
        }
    }

    /// Node budget.
    #[inline]
    pub const fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Byte budget (0 = unlimited).
    #[inline]
    pub const fn max_snapshot_bytes(&self) -> usize {
        self.max_snapshot_bytes
    }

    fn over_nodes(&self, tree: &HistoryTree) -> bool {
        tree.node_count() > self.max_nodes
    }

    fn over_bytes(&self, tree: &HistoryTree) -> bool {
        self.max_snapshot_bytes > 0 && tree.snapshot_bytes() > self.max_snapshot_bytes
    }

    /// Whether `tree` is over either budget.
    pub fn is_over_budget(&self, tree: &HistoryTree) -> bool {
        self.over_nodes(tree) || self.over_bytes(tree)
    }

    /// Bring `tree` back under budget.
    ///
    /// `canvas` must show the tree's current node. It is only read, and only
    /// when spine folding finds no full snapshot at or below the new root.
    pub fn enforce<C>(&self, tree: &mut HistoryTree, canvas: &mut C) -> EvictionReport
    where
        C: Canvas + ?Sized,
    {
        let mut report = EvictionReport::default();
        if !self.is_over_budget(tree) {
            return report;
        }

        let span = tracing::debug_span!(
            "history.evict",
            nodes = tree.node_count(),
            max_nodes = self.max_nodes,
            evicted = tracing::field::Empty,
            folded = tracing::field::Empty,
            demoted = tracing::field::Empty,
        );
        let _guard = span.enter();

        self.evict_branches(tree, &mut report);
        if self.over_nodes(tree) {
            self.fold_spine(tree, canvas, &mut report);
        }
        if self.over_bytes(tree) {
            self.demote_checkpoints(tree, &mut report);
        }

        span.record("evicted", report.nodes_evicted);
        span.record("folded", report.nodes_folded);
        span.record("demoted", report.checkpoints_demoted);
        report
    }

    fn evict_branches(&self, tree: &mut HistoryTree, report: &mut EvictionReport) {
        let spine = tree.spine();
        let on_spine: HashSet<NodeId> = spine.iter().copied().collect();

        // (branch point depth, child serial, child)
        let mut candidates: Vec<(u64, u64, NodeId)> = Vec::new();
        for &id in &spine {
            let Some(node) = tree.node(id) else { continue };
            for &child in node.children() {
                if on_spine.contains(&child) {
                    continue;
                }
                let serial = tree.node(child).map_or(0, |c| c.serial());
                candidates.push((node.depth(), serial, child));
            }
        }
        candidates.sort_unstable_by_key(|&(depth, serial, _)| (depth, serial));

        for (depth, _, child) in candidates {
            if !self.is_over_budget(tree) {
                break;
            }
            let freed = tree.store_mut().remove_subtree(child);
            report.subtrees_evicted += 1;
            report.nodes_evicted += freed;
            tracing::debug!(
                target: TARGET,
                branch_depth = depth,
                node = ?child,
                freed,
                "evicted redo branch"
            );
        }
    }

    fn fold_spine<C>(&self, tree: &mut HistoryTree, canvas: &mut C, report: &mut EvictionReport)
    where
        C: Canvas + ?Sized,
    {
        let spine = tree.spine();
        let need = spine.len().saturating_sub(self.max_nodes);
        // The current node always survives.
        let need = need.min(spine.len().saturating_sub(1));
        if need == 0 {
            return;
        }

        let baseline = match self.rebuild_baseline(tree, canvas, &spine, need) {
            Ok(baseline) => baseline,
            Err(reason) => {
                tracing::warn!(
                    target: TARGET,
                    nodes = tree.node_count(),
                    max_nodes = self.max_nodes,
                    reason = %reason,
                    "spine cannot be folded, history over budget"
                );
                report.shortfall = Some(HistoryError::CapacityExceeded {
                    max_nodes: self.max_nodes,
                    nodes: tree.node_count(),
                });
                return;
            }
        };

        let new_root = spine[need];
        for pair in spine[..=need].windows(2) {
            let branches = tree.store().children(pair[0]).len().saturating_sub(1);
            let freed = tree.store_mut().remove_keeping(pair[0], pair[1]);
            if freed == 0 {
                continue;
            }
            // One spine node, the rest hung off it.
            report.nodes_folded += 1;
            report.nodes_evicted += freed - 1;
            report.subtrees_evicted += branches;
        }
        if let Some(node) = tree.node_mut(new_root) {
            node.become_root(CanvasSnapshot::full(baseline));
        }
        tree.set_root(new_root);

        tracing::info!(
            target: TARGET,
            folded = report.nodes_folded,
            root = ?new_root,
            root_depth = tree.node(new_root).map_or(0, |n| n.depth()),
            "folded spine into root"
        );
    }

    /// Pixels of `spine[at]`, built without writing to the canvas.
    fn rebuild_baseline<C>(
        &self,
        tree: &HistoryTree,
        canvas: &mut C,
        spine: &[NodeId],
        at: usize,
    ) -> Result<PixelBuffer, String>
    where
        C: Canvas + ?Sized,
    {
        let anchor = spine[at..]
            .iter()
            .position(|&id| tree.node(id).is_some_and(|n| n.full().is_some()))
            .map(|offset| at + offset);

        let (mut pixels, from) = match anchor {
            Some(idx) => {
                let full = tree
                    .node(spine[idx])
                    .and_then(|n| n.full())
                    .ok_or_else(|| "checkpoint vanished".to_string())?;
                (full.buffer().clone(), idx)
            }
            None => {
                let pixels = canvas.capture_full().map_err(|e| e.to_string())?;
                (pixels, spine.len() - 1)
            }
        };

        // Each delta turns its node's pixels into its parent's.
        for &id in spine[at + 1..=from].iter().rev() {
            let delta = tree
                .node(id)
                .and_then(|n| n.delta())
                .ok_or_else(|| format!("node {id:?} has no delta"))?;
            let region = delta.region();
            if region.is_empty() {
                continue;
            }
            pixels
                .blit(delta.buffer(), region.x, region.y)
                .map_err(|e| e.to_string())?;
        }
        Ok(pixels)
    }

    fn demote_checkpoints(&self, tree: &mut HistoryTree, report: &mut EvictionReport) {
        let spine = tree.spine();
        for &id in spine.iter().skip(1) {
            if !self.over_bytes(tree) {
                break;
            }
            let Some(node) = tree.node_mut(id) else { continue };
            if node.take_full().is_some() {
                report.checkpoints_demoted += 1;
                tracing::debug!(target: TARGET, node = ?id, "demoted checkpoint");
            }
        }
        if self.over_bytes(tree) {
            tracing::warn!(
                target: TARGET,
                bytes = tree.snapshot_bytes(),
                max_bytes = self.max_snapshot_bytes,
                "snapshot bytes over budget after demotion"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointManager;
    use inkcel_core::Rgba;
    use inkcel_harness::{SoftCanvas, StampBrush, dot};

    struct Rig {
        tree: HistoryTree,
        canvas: SoftCanvas,
        brush: StampBrush,
        manager: CheckpointManager,
    }

    impl Rig {
        fn new(max_nodes: usize, interval: u64) -> Self {
            Self {
                tree: HistoryTree::new(max_nodes),
                canvas: SoftCanvas::new(48, 48),
                brush: StampBrush::new(),
                manager: CheckpointManager::new(interval),
            }
        }

        fn record(&mut self, i: usize) -> NodeId {
            let x = 4.0 + (i % 10) as f32 * 4.0;
            let y = 4.0 + (i / 10) as f32 * 4.0;
            self.manager
                .record_stroke(
                    &mut self.tree,
                    &mut self.canvas,
                    &mut self.brush,
                    dot(x, y, 3.0, Rgba::BLACK),
                )
                .unwrap()
        }

        fn undo(&mut self) {
            let parent = self.tree.parent(self.tree.current()).unwrap();
            self.manager
                .restore_to_node(&mut self.tree, &mut self.canvas, &mut self.brush, parent)
                .unwrap();
        }
    }

    #[test]
    fn under_budget_is_noop() {
        let mut rig = Rig::new(10, 5);
        rig.record(0);
        let report = EvictionPolicy::new(10, 0).enforce(&mut rig.tree, &mut rig.canvas);
        assert!(report.is_noop());
    }

    #[test]
    fn oldest_branch_goes_first() {
        let mut rig = Rig::new(10, 0);
        let old_branch = rig.record(0); // depth 1, later abandoned
        rig.undo();
        let keep = rig.record(1);
        let young_branch = rig.record(2); // depth 2, later abandoned
        rig.undo();
        rig.record(3);

        // root, old, keep, young, current
        assert_eq!(rig.tree.node_count(), 5);
        let report = EvictionPolicy::new(4, 0).enforce(&mut rig.tree, &mut rig.canvas);
        assert_eq!(report.subtrees_evicted, 1);
        assert!(!rig.tree.contains(old_branch));
        assert!(rig.tree.contains(young_branch));
        assert!(rig.tree.contains(keep));
    }

    #[test]
    fn spine_folds_into_root() {
        let mut rig = Rig::new(30, 0);
        for i in 0..8 {
            rig.record(i);
        }
        let spine = rig.tree.spine();
        let live = rig.canvas.checksum();

        let report = EvictionPolicy::new(5, 0).enforce(&mut rig.tree, &mut rig.canvas);
        assert_eq!(report.nodes_folded, 4);
        assert!(report.shortfall.is_none());
        assert_eq!(rig.tree.node_count(), 5);
        assert_eq!(rig.tree.root(), spine[4]);

        let root = rig.tree.node(rig.tree.root()).unwrap();
        assert_eq!(root.depth(), 4);
        assert!(root.stroke().is_none());
        assert!(root.delta().is_none());
        assert!(root.full().is_some());
        assert_eq!(rig.canvas.checksum(), live, "folding must not touch the canvas");
    }

    #[test]
    fn folded_baseline_matches_history() {
        let mut rig = Rig::new(30, 0);
        for i in 0..6 {
            rig.record(i);
        }
        // Pixels of depth 3, reached by undoing live.
        let mut undone = rig.clone_state();
        for _ in 0..3 {
            undone.undo();
        }
        let depth3 = undone.canvas.checksum();

        EvictionPolicy::new(4, 0).enforce(&mut rig.tree, &mut rig.canvas);
        let root = rig.tree.node(rig.tree.root()).unwrap();
        assert_eq!(root.depth(), 3);
        let baseline = root.full().unwrap().buffer();
        assert_eq!(inkcel_harness::checksum_buffer(baseline), depth3);
    }

    #[test]
    fn fold_counts_branches_as_evicted() {
        let mut rig = Rig::new(30, 0);
        let a = rig.record(0);
        let stale = rig.record(1);
        rig.undo();
        let b = rig.record(2);
        rig.record(3);
        rig.record(4);

        // root, a, stale, b, c, d; the spine is root, a, b, c, d
        assert_eq!(rig.tree.node_count(), 6);
        let mut report = EvictionReport::default();
        EvictionPolicy::new(3, 0).fold_spine(&mut rig.tree, &mut rig.canvas, &mut report);

        assert_eq!(report.nodes_folded, 2);
        assert_eq!(report.nodes_evicted, 1);
        assert_eq!(report.subtrees_evicted, 1);
        assert!(report.shortfall.is_none());
        assert_eq!(rig.tree.root(), b);
        assert!(!rig.tree.contains(a));
        assert!(!rig.tree.contains(stale));
        assert_eq!(rig.tree.node_count(), 3);
    }

    #[test]
    fn byte_budget_demotes_checkpoints() {
        let mut rig = Rig::new(50, 1);
        for i in 0..4 {
            rig.record(i);
        }
        let full = 48 * 48 * 4;
        // Room for the root baseline, one more full, and the deltas.
        let budget = full * 2 + 4096;
        let report = EvictionPolicy::new(50, budget).enforce(&mut rig.tree, &mut rig.canvas);
        assert_eq!(report.checkpoints_demoted, 3);
        assert!(rig.tree.has_baseline());
        assert!(rig.tree.snapshot_bytes() <= budget);
        // The newest checkpoint survives.
        assert!(rig.tree.current_node().unwrap().full().is_some());
    }

    impl Rig {
        fn clone_state(&self) -> Self {
            Self {
                tree: self.tree.clone(),
                canvas: self.canvas.clone(),
                brush: self.brush.clone(),
                manager: self.manager,
            }
        }
    }
}
