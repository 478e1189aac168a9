#![forbid(unsafe_code)]

//! The public undo engine.
//!
//! [`UndoEngine`] owns the canvas, the brush renderer, and one history tree
//! per context. Every operation acts on the active context.
//!
//! # Invariants
//!
//! 1. Between calls the canvas shows the active tree's current node.
//! 2. `node_count() <= config.max_nodes` after every successful record,
//!    unless the returned report carries a shortfall.
//! 3. A failed undo/redo/goto leaves pixels and `current` untouched.

use std::fmt;

use inkcel_core::{BrushRenderer, Canvas, FrameStore, StrokeCommand};

use crate::checkpoint::{CheckpointManager, RestoreStats};
use crate::config::{ConfigError, HistoryConfig};
use crate::context::ContextSet;
use crate::error::HistoryError;
use crate::eviction::{EvictionPolicy, EvictionReport};
use crate::node::{HistoryNode, NodeId};
use crate::tree::HistoryTree;

const TARGET: &str = "inkcel.history";

/// Result of a successful [`UndoEngine::record_stroke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// The new current node.
    pub node: NodeId,
    /// What eviction did afterwards.
    pub eviction: EvictionReport,
}

impl RecordOutcome {
    /// Budget violation eviction could not resolve, if any.
    pub fn shortfall(&self) -> Option<&HistoryError> {
        self.eviction.shortfall.as_ref()
    }
}

/// Point-in-time summary of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStats {
    /// Number of contexts.
    pub contexts: usize,
    /// Active context index.
    pub active: usize,
    /// Live nodes in the active context, root included.
    pub nodes: usize,
    /// Depth of the active context's current node.
    pub depth: u64,
    /// Nodes carrying a full snapshot in the active context.
    pub checkpoints: usize,
    /// Snapshot bytes in the active context.
    pub snapshot_bytes: usize,
    /// Strokes held across all contexts.
    pub total_strokes: usize,
    /// Bytes held across all contexts.
    pub memory_bytes: usize,
}

/// Branching, checkpointed undo/redo over a raster canvas.
pub struct UndoEngine<C, B> {
    config: HistoryConfig,
    contexts: ContextSet,
    checkpoints: CheckpointManager,
    eviction: EvictionPolicy,
    canvas: C,
    brush: B,
    last_restore: Option<RestoreStats>,
}

impl<C, B> fmt::Debug for UndoEngine<C, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoEngine")
            .field("contexts", &self.contexts.len())
            .field("active", &self.contexts.active_index())
            .field("nodes", &self.contexts.active().node_count())
            .field("depth", &self.contexts.active().current_depth())
            .field("config", &self.config)
            .finish()
    }
}

impl<C, B> UndoEngine<C, B>
where
    C: Canvas,
    B: BrushRenderer<C>,
{
    /// Create an engine around `canvas` and `brush`.
    ///
    /// The canvas content at the first recorded stroke becomes each
    /// context's baseline.
    pub fn new(config: HistoryConfig, canvas: C, brush: B) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        tracing::debug!(
            target: TARGET,
            contexts = config.context_count,
            interval = config.checkpoint_interval,
            max_nodes = config.max_nodes,
            "undo engine created"
        );
        Ok(Self {
            contexts: ContextSet::new(config.context_count, config.max_nodes),
            checkpoints: CheckpointManager::new(config.checkpoint_interval),
            eviction: EvictionPolicy::new(config.max_nodes, config.max_snapshot_bytes),
            config,
            canvas,
            brush,
            last_restore: None,
        })
    }

    /// Shorthand for [`UndoEngine::new`] with the three core tunables.
    pub fn init(
        context_count: usize,
        checkpoint_interval: u64,
        max_nodes: usize,
        canvas: C,
        brush: B,
    ) -> Result<Self, ConfigError> {
        Self::new(
            HistoryConfig::new(context_count, checkpoint_interval, max_nodes),
            canvas,
            brush,
        )
    }

    // ========================================================================
    // Recording and navigation
    // ========================================================================

    /// Render `stroke` and append it to the active history.
    ///
    /// After an undo the stroke starts a new branch; the old redo branch is
    /// kept until eviction needs the room.
    ///
    /// A tree left full by an earlier failed fold gets another eviction pass
    /// first; [`HistoryError::CapacityExceeded`] is returned only when that
    /// pass frees nothing either.
    pub fn record_stroke(&mut self, stroke: StrokeCommand) -> Result<RecordOutcome, HistoryError> {
        let tree = self.contexts.active_mut();
        let mut eviction = EvictionReport::default();
        if !stroke.is_empty() && tree.store().is_full() {
            eviction = self.eviction.enforce(tree, &mut self.canvas);
            tracing::debug!(
                target: TARGET,
                nodes = tree.node_count(),
                recovered = eviction.shortfall.is_none(),
                "evicted before record"
            );
        }
        let node = self
            .checkpoints
            .record_stroke(tree, &mut self.canvas, &mut self.brush, stroke)?;
        eviction.absorb(self.eviction.enforce(tree, &mut self.canvas));
        if let Some(shortfall) = &eviction.shortfall {
            tracing::warn!(target: TARGET, error = %shortfall, "history over budget");
        }
        Ok(RecordOutcome { node, eviction })
    }

    /// Step back one stroke. `Ok(false)` at the root.
    pub fn undo(&mut self) -> Result<bool, HistoryError> {
        let tree = self.contexts.active();
        let Some(parent) = tree.parent(tree.current()) else {
            return Ok(false);
        };
        self.restore(parent).map(|_| true)
    }

    /// Step forward along the last visited branch, or the newest one.
    /// `Ok(false)` at a leaf.
    pub fn redo(&mut self) -> Result<bool, HistoryError> {
        let Some(child) = self.contexts.active().redo_target() else {
            return Ok(false);
        };
        self.restore(child).map(|_| true)
    }

    /// Step forward into child `index` of the current node (creation order).
    /// `Ok(false)` when there is no such child.
    pub fn redo_branch(&mut self, index: usize) -> Result<bool, HistoryError> {
        let tree = self.contexts.active();
        let Some(&child) = tree.store().children(tree.current()).get(index) else {
            return Ok(false);
        };
        self.restore(child).map(|_| true)
    }

    /// Jump to any node of the active history.
    ///
    /// `Ok(false)` for handles that are stale or belong to another context;
    /// nothing changes in that case.
    pub fn goto_node(&mut self, id: NodeId) -> Result<bool, HistoryError> {
        if !self.contexts.active().contains(id) {
            tracing::debug!(target: TARGET, node = ?id, "goto ignored, unknown node");
            return Ok(false);
        }
        self.restore(id).map(|_| true)
    }

    /// Rebuild the canvas for the current node from the nearest checkpoint.
    pub fn resync(&mut self) -> Result<RestoreStats, HistoryError> {
        let tree = self.contexts.active_mut();
        let stats = self
            .checkpoints
            .resync(tree, &mut self.canvas, &mut self.brush)?;
        self.last_restore = Some(stats);
        Ok(stats)
    }

    /// Clear the canvas to the blank colour and drop the active history.
    pub fn new_drawing(&mut self) -> Result<(), HistoryError> {
        self.canvas.clear(self.config.blank_color)?;
        self.contexts.reset(self.contexts.active_index())?;
        self.last_restore = None;
        Ok(())
    }

    fn restore(&mut self, target: NodeId) -> Result<RestoreStats, HistoryError> {
        let tree = self.contexts.active_mut();
        let stats = self
            .checkpoints
            .restore_to_node(tree, &mut self.canvas, &mut self.brush, target)?;
        self.last_restore = Some(stats);
        Ok(stats)
    }

    // ========================================================================
    // Contexts
    // ========================================================================

    /// Route operations to context `index`. Pixels are not touched.
    pub fn switch_context(&mut self, index: usize) -> Result<(), HistoryError> {
        let _span = tracing::debug_span!(
            "history.switch",
            from = self.contexts.active_index(),
            to = index,
        )
        .entered();
        self.contexts.switch(index)?;
        tracing::debug!(target: TARGET, context = index, "context switched");
        Ok(())
    }

    /// Park the canvas in `frames`, switch to `index`, and load its pixels.
    ///
    /// When `frames` has nothing for `index`, the canvas is rebuilt from
    /// history, or cleared to the blank colour if there is none.
    pub fn switch_frame<F>(&mut self, index: usize, frames: &mut F) -> Result<(), HistoryError>
    where
        F: FrameStore<C> + ?Sized,
    {
        let from = self.contexts.active_index();
        let count = self.contexts.len();
        if index >= count {
            return Err(HistoryError::ContextOutOfRange { index, count });
        }
        if index == from {
            return Ok(());
        }

        let span = tracing::debug_span!(
            "history.switch",
            from,
            to = index,
            loaded = tracing::field::Empty,
        );
        let _guard = span.enter();

        frames.save(from, &mut self.canvas)?;
        self.contexts.switch(index)?;
        let loaded = frames.load(index, &mut self.canvas)?;
        span.record("loaded", loaded);

        if !loaded {
            if self.contexts.active().is_pristine() {
                self.canvas.clear(self.config.blank_color)?;
            } else {
                self.resync()?;
            }
        }
        tracing::debug!(target: TARGET, from, to = index, loaded, "frame switched");
        Ok(())
    }

    /// Grow or shrink the context set. Returns the number of contexts
    /// dropped.
    pub fn set_context_count(&mut self, count: usize) -> usize {
        self.config.context_count = count.max(1);
        self.contexts.set_count(count)
    }

    /// Grow the context set so `index` exists.
    pub fn ensure_context(&mut self, index: usize) {
        self.contexts.ensure(index);
        self.config.context_count = self.contexts.len();
    }

    /// Drop the history of context `index`. Pixels are not touched.
    pub fn reset_context(&mut self, index: usize) -> Result<(), HistoryError> {
        self.contexts.reset(index)
    }

    /// Number of contexts.
    #[inline]
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Active context index.
    #[inline]
    pub fn active_context(&self) -> usize {
        self.contexts.active_index()
    }
}

impl<C, B> UndoEngine<C, B> {
    // ========================================================================
    // Queries
    // ========================================================================

    /// Depth of the current node.
    pub fn current_depth(&self) -> u64 {
        self.contexts.active().current_depth()
    }

    /// Live nodes in the active context, root included.
    pub fn node_count(&self) -> usize {
        self.contexts.active().node_count()
    }

    /// Whether undo would move.
    pub fn can_undo(&self) -> bool {
        self.contexts.active().can_undo()
    }

    /// Whether redo would move.
    pub fn can_redo(&self) -> bool {
        self.contexts.active().can_redo()
    }

    /// Children of the current node.
    pub fn redo_branch_count(&self) -> usize {
        self.contexts.active().redo_branch_count()
    }

    /// Handle of the current node.
    pub fn current_node(&self) -> NodeId {
        self.contexts.active().current()
    }

    /// Handles from the root to `id`.
    pub fn path_to(&self, id: NodeId) -> Option<Vec<NodeId>> {
        self.contexts.active().path_to(id)
    }

    /// Every live node of the active context, breadth-first.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.contexts.active().nodes()
    }

    /// Node `id` of the active context.
    pub fn node(&self, id: NodeId) -> Option<&HistoryNode> {
        self.contexts.active().node(id)
    }

    /// Bytes held by history across all contexts.
    pub fn memory_usage(&self) -> usize {
        self.contexts.iter().map(HistoryTree::memory_usage).sum()
    }

    /// Summary of the engine state.
    pub fn stats(&self) -> HistoryStats {
        let tree = self.contexts.active();
        HistoryStats {
            contexts: self.contexts.len(),
            active: self.contexts.active_index(),
            nodes: tree.node_count(),
            depth: tree.current_depth(),
            checkpoints: tree
                .store()
                .iter()
                .filter(|(_, n)| n.full().is_some())
                .count(),
            snapshot_bytes: tree.snapshot_bytes(),
            total_strokes: self.contexts.total_strokes(),
            memory_bytes: self.memory_usage(),
        }
    }

    /// How the last successful restore went.
    pub fn last_restore(&self) -> Option<RestoreStats> {
        self.last_restore
    }

    /// The active history tree.
    pub fn tree(&self) -> &HistoryTree {
        self.contexts.active()
    }

    /// All contexts.
    pub fn contexts(&self) -> &ContextSet {
        &self.contexts
    }

    /// Effective configuration.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    // ========================================================================
    // Collaborator access
    // ========================================================================

    /// The canvas.
    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    /// The canvas, mutably.
    ///
    /// Pixels written here are not in history. Call [`UndoEngine::resync`]
    /// to discard them.
    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    /// The brush renderer.
    pub fn brush(&self) -> &B {
        &self.brush
    }

    /// The brush renderer, mutably.
    pub fn brush_mut(&mut self) -> &mut B {
        &mut self.brush
    }

    /// Take back the canvas and brush.
    pub fn into_parts(self) -> (C, B) {
        (self.canvas, self.brush)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::RestorePath;
    use inkcel_core::Rgba;
    use inkcel_harness::{SoftCanvas, StampBrush, dot, horizontal_line};

    fn engine(interval: u64, max_nodes: usize) -> UndoEngine<SoftCanvas, StampBrush> {
        UndoEngine::init(1, interval, max_nodes, SoftCanvas::new(64, 64), StampBrush::new()).unwrap()
    }

    #[test]
    fn test_new_engine() {
        let engine = engine(10, 50);
        assert_eq!(engine.current_depth(), 0);
        assert_eq!(engine.node_count(), 1);
        assert!(!engine.can_undo());
        assert!(!engine.can_redo());
        assert!(engine.last_restore().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = UndoEngine::init(0, 10, 50, SoftCanvas::new(4, 4), StampBrush::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_record_enables_undo() {
        let mut engine = engine(10, 50);
        engine.record_stroke(dot(10.0, 10.0, 4.0, Rgba::BLACK)).unwrap();
        assert_eq!(engine.current_depth(), 1);
        assert!(engine.can_undo());
        assert!(!engine.can_redo());
    }

    #[test]
    fn test_undo_at_root_is_false() {
        let mut engine = engine(10, 50);
        assert!(!engine.undo().unwrap());
        assert!(!engine.redo().unwrap());
    }

    #[test]
    fn test_undo_uses_delta() {
        let mut engine = engine(10, 50);
        engine.record_stroke(dot(10.0, 10.0, 4.0, Rgba::BLACK)).unwrap();
        assert!(engine.undo().unwrap());
        assert_eq!(engine.last_restore().unwrap().path, RestorePath::DeltaUndo);
        assert_eq!(engine.canvas().count_not(Rgba::WHITE), 0);
    }

    #[test]
    fn test_redo_replays_forward() {
        let mut engine = engine(10, 50);
        engine.record_stroke(dot(10.0, 10.0, 4.0, Rgba::BLACK)).unwrap();
        let drawn = engine.canvas().checksum();
        engine.undo().unwrap();
        assert!(engine.redo().unwrap());
        let stats = engine.last_restore().unwrap();
        assert_eq!(stats.path, RestorePath::ForwardReplay);
        assert_eq!(stats.strokes_replayed, 1);
        assert_eq!(engine.canvas().checksum(), drawn);
    }

    #[test]
    fn test_empty_stroke_rejected() {
        let mut engine = engine(10, 50);
        let empty = StrokeCommand::new(Vec::new(), Default::default());
        assert_eq!(engine.record_stroke(empty), Err(HistoryError::EmptyStroke));
        assert_eq!(engine.node_count(), 1);
    }

    #[test]
    fn test_goto_current_is_idempotent() {
        let mut engine = engine(10, 50);
        engine.record_stroke(horizontal_line(20.0, 64)).unwrap();
        let before = engine.canvas().checksum();
        let current = engine.current_node();
        assert!(engine.goto_node(current).unwrap());
        assert_eq!(engine.canvas().checksum(), before);
        assert_eq!(engine.last_restore().unwrap().path, RestorePath::AlreadyThere);
    }

    #[test]
    fn test_goto_stale_node_is_false() {
        let mut engine = engine(10, 50);
        let node = engine.record_stroke(dot(5.0, 5.0, 2.0, Rgba::BLACK)).unwrap().node;
        engine.new_drawing().unwrap();
        assert!(!engine.goto_node(node).unwrap());
        assert_eq!(engine.current_depth(), 0);
    }

    #[test]
    fn test_new_drawing_clears() {
        let mut engine = engine(10, 50);
        engine.record_stroke(horizontal_line(20.0, 64)).unwrap();
        engine.new_drawing().unwrap();
        assert_eq!(engine.node_count(), 1);
        assert_eq!(engine.canvas().count_not(Rgba::WHITE), 0);
        assert!(!engine.can_undo());
    }

    #[test]
    fn test_switch_context_out_of_range() {
        let mut engine = engine(10, 50);
        assert_eq!(
            engine.switch_context(1),
            Err(HistoryError::ContextOutOfRange { index: 1, count: 1 })
        );
    }

    #[test]
    fn test_set_context_count() {
        let mut engine = engine(10, 50);
        assert_eq!(engine.set_context_count(3), 0);
        assert_eq!(engine.context_count(), 3);
        engine.switch_context(2).unwrap();
        assert_eq!(engine.set_context_count(1), 2);
        assert_eq!(engine.active_context(), 0);
        engine.ensure_context(4);
        assert_eq!(engine.context_count(), 5);
    }

    #[test]
    fn test_stats_and_memory() {
        let mut engine = engine(2, 50);
        for i in 0..4 {
            engine
                .record_stroke(dot(8.0 + i as f32 * 10.0, 8.0, 4.0, Rgba::BLACK))
                .unwrap();
        }
        let stats = engine.stats();
        assert_eq!(stats.nodes, 5);
        assert_eq!(stats.depth, 4);
        // root baseline + depths 2 and 4
        assert_eq!(stats.checkpoints, 3);
        assert_eq!(stats.total_strokes, 4);
        assert!(stats.memory_bytes >= stats.snapshot_bytes);
        assert_eq!(engine.memory_usage(), stats.memory_bytes);
    }

    #[test]
    fn test_debug_impl() {
        let engine = engine(10, 50);
        let dbg = format!("{engine:?}");
        assert!(dbg.contains("UndoEngine"));
        assert!(dbg.contains("depth: 0"));
    }

    #[test]
    fn test_into_parts() {
        let mut engine = engine(10, 50);
        engine.record_stroke(dot(5.0, 5.0, 4.0, Rgba::BLACK)).unwrap();
        let (canvas, brush) = engine.into_parts();
        assert!(canvas.count_not(Rgba::WHITE) > 0);
        assert!(brush.dab_count() > 0);
    }
}
