#![forbid(unsafe_code)]

//! Snapshot capture on record, and pixel restore on undo/redo/goto.
//!
//! # Restore paths
//!
//! | Path            | When                                   | Cost          |
//! |-----------------|----------------------------------------|---------------|
//! | `DeltaUndo`     | target is current's parent             | O(region)     |
//! | `ForwardReplay` | target is a child of current           | 1 stroke      |
//! | `Checkpoint`    | anything else, and every resync        | O(canvas) + k strokes |
//!
//! Every path is atomic: on failure the canvas is put back the way it was
//! and `current` does not move.

use inkcel_core::{BrushRenderer, Canvas, CanvasError, PixelBuffer, Rect, StrokeCommand};

use crate::error::{HistoryError, ReplayCause};
use crate::node::NodeId;
use crate::replay::{apply_stroke, replay_path};
use crate::snapshot::CanvasSnapshot;
use crate::tree::HistoryTree;

const TARGET: &str = "inkcel.history";

/// How a restore reached its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePath {
    /// Target was already current.
    AlreadyThere,
    /// The current node's delta was written back.
    DeltaUndo,
    /// The target's stroke was rendered on top of the canvas.
    ForwardReplay,
    /// A full snapshot was restored and strokes replayed from it.
    Checkpoint {
        /// Depth of the node holding the full snapshot.
        depth: u64,
    },
}

/// Outcome of a successful restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreStats {
    /// Path taken.
    pub path: RestorePath,
    /// Strokes re-rendered.
    pub strokes_replayed: usize,
    /// Depth of the node restored to.
    pub depth: u64,
}

impl RestoreStats {
    fn new(path: RestorePath, strokes_replayed: usize, depth: u64) -> Self {
        Self {
            path,
            strokes_replayed,
            depth,
        }
    }
}

/// Captures snapshots when strokes are recorded and restores them on
/// navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointManager {
    interval: u64,
}

impl CheckpointManager {
    /// Take a full snapshot every `interval` levels of depth (0 disables).
    #[must_use]
    pub const fn new(interval: u64) -> Self {
        Self { interval }
    }

    /// Checkpoint interval.
    #[inline]
    pub const fn interval(&self) -> u64 {
        self.interval
    }

    /// Whether a node at `depth` gets a full snapshot.
    #[inline]
    pub const fn is_checkpoint_depth(&self, depth: u64) -> bool {
        self.interval > 0 && depth % self.interval == 0
    }

    /// Capture the root baseline if the tree does not have one yet.
    pub fn ensure_baseline<C>(&self, tree: &mut HistoryTree, canvas: &mut C) -> Result<(), CanvasError>
    where
        C: Canvas + ?Sized,
    {
        if tree.has_baseline() {
            return Ok(());
        }
        let baseline = canvas.capture_full()?;
        let root = tree.root();
        if let Some(node) = tree.node_mut(root) {
            node.set_full(CanvasSnapshot::full(baseline));
        }
        tracing::debug!(target: TARGET, root = ?root, "captured root baseline");
        Ok(())
    }

    /// Render `stroke` onto the canvas and append it under the current node.
    ///
    /// The pre-stroke pixels of the footprint become the new node's delta.
    /// On a render failure the footprint is written back and no node is
    /// created.
    pub fn record_stroke<C, B>(
        &self,
        tree: &mut HistoryTree,
        canvas: &mut C,
        brush: &mut B,
        stroke: StrokeCommand,
    ) -> Result<NodeId, HistoryError>
    where
        C: Canvas + ?Sized,
        B: BrushRenderer<C> + ?Sized,
    {
        let span = tracing::debug_span!(
            "history.record",
            points = stroke.point_count(),
            node = tracing::field::Empty,
            depth = tracing::field::Empty,
            checkpoint = tracing::field::Empty,
        );
        let _guard = span.enter();

        if stroke.is_empty() {
            return Err(HistoryError::EmptyStroke);
        }
        if tree.store().is_full() {
            return Err(HistoryError::CapacityExceeded {
                max_nodes: tree.max_nodes(),
                nodes: tree.node_count(),
            });
        }

        self.ensure_baseline(tree, canvas)?;

        let region = brush.footprint(&stroke, canvas.size());
        let before = canvas.capture_region(region)?;
        let rendered = apply_stroke(canvas, brush, &stroke)
            .map_err(HistoryError::from)
            .and_then(|()| canvas.flush().map_err(HistoryError::from));
        if let Err(err) = rendered {
            put_back_region(canvas, &before, region);
            return Err(err);
        }

        let parent = tree.current();
        let node = match tree.store_mut().create_node(parent, stroke) {
            Ok(node) => node,
            Err(err) => {
                put_back_region(canvas, &before, region);
                return Err(err);
            }
        };
        let depth = tree.node(node).map_or(0, |n| n.depth());
        if let Some(n) = tree.node_mut(node) {
            n.set_delta(CanvasSnapshot::delta(region, before));
        }

        let mut checkpoint = false;
        if self.is_checkpoint_depth(depth) {
            match canvas.capture_full() {
                Ok(buffer) => {
                    if let Some(n) = tree.node_mut(node) {
                        n.set_full(CanvasSnapshot::full(buffer));
                    }
                    checkpoint = true;
                }
                Err(err) => tracing::warn!(
                    target: TARGET,
                    depth,
                    error = %err,
                    "checkpoint capture failed"
                ),
            }
        }

        tree.mark_visited(&[parent, node]);
        tree.set_current(node);

        span.record("node", tracing::field::debug(node));
        span.record("depth", depth);
        span.record("checkpoint", checkpoint);
        tracing::debug!(
            target: TARGET,
            node = ?node,
            depth,
            region = ?region,
            checkpoint,
            "stroke recorded"
        );
        Ok(node)
    }

    /// Make the canvas show `target` and move `current` there.
    pub fn restore_to_node<C, B>(
        &self,
        tree: &mut HistoryTree,
        canvas: &mut C,
        brush: &mut B,
        target: NodeId,
    ) -> Result<RestoreStats, HistoryError>
    where
        C: Canvas + ?Sized,
        B: BrushRenderer<C> + ?Sized,
    {
        let Some(depth) = tree.node(target).map(|n| n.depth()) else {
            return Err(HistoryError::InvalidNodeId(target));
        };
        let current = tree.current();
        if target == current {
            return Ok(RestoreStats::new(RestorePath::AlreadyThere, 0, depth));
        }

        let span = tracing::debug_span!(
            "history.restore",
            node = ?target,
            path = tracing::field::Empty,
            replayed = tracing::field::Empty,
        );
        let _guard = span.enter();

        let stats = if tree.parent(current) == Some(target)
            && tree.node(current).is_some_and(|n| n.delta().is_some())
        {
            self.undo_delta(tree, canvas, target, depth)?
        } else if tree.parent(target) == Some(current) {
            self.redo_forward(tree, canvas, brush, target, depth)?
        } else {
            self.restore_from_checkpoint(tree, canvas, brush, target)?
        };

        span.record("path", tracing::field::debug(stats.path));
        span.record("replayed", stats.strokes_replayed);
        tracing::debug!(
            target: TARGET,
            node = ?target,
            depth,
            path = ?stats.path,
            replayed = stats.strokes_replayed,
            "restored"
        );
        Ok(stats)
    }

    /// Rebuild the canvas for `current` from its nearest checkpoint.
    ///
    /// Used when the canvas content cannot be trusted, for instance after a
    /// context switch with no stored frame.
    pub fn resync<C, B>(
        &self,
        tree: &mut HistoryTree,
        canvas: &mut C,
        brush: &mut B,
    ) -> Result<RestoreStats, HistoryError>
    where
        C: Canvas + ?Sized,
        B: BrushRenderer<C> + ?Sized,
    {
        if tree.is_pristine() {
            return Ok(RestoreStats::new(RestorePath::AlreadyThere, 0, tree.current_depth()));
        }
        let span = tracing::debug_span!("history.restore", node = ?tree.current(), resync = true);
        let _guard = span.enter();
        let current = tree.current();
        self.restore_from_checkpoint(tree, canvas, brush, current)
    }

    fn undo_delta<C>(
        &self,
        tree: &mut HistoryTree,
        canvas: &mut C,
        target: NodeId,
        depth: u64,
    ) -> Result<RestoreStats, HistoryError>
    where
        C: Canvas + ?Sized,
    {
        let current = tree.current();
        let Some(delta) = tree.node(current).and_then(|n| n.delta()) else {
            return Err(HistoryError::divergence(target, ReplayCause::MissingCheckpoint));
        };
        canvas
            .restore_region(delta.buffer(), delta.region())
            .map_err(|e| HistoryError::divergence(target, e))?;
        tree.mark_visited(&[target, current]);
        tree.set_current(target);
        Ok(RestoreStats::new(RestorePath::DeltaUndo, 0, depth))
    }

    fn redo_forward<C, B>(
        &self,
        tree: &mut HistoryTree,
        canvas: &mut C,
        brush: &mut B,
        target: NodeId,
        depth: u64,
    ) -> Result<RestoreStats, HistoryError>
    where
        C: Canvas + ?Sized,
        B: BrushRenderer<C> + ?Sized,
    {
        let Some(stroke) = tree.node(target).and_then(|n| n.stroke()) else {
            return Err(HistoryError::InvalidNodeId(target));
        };
        let region = brush.footprint(stroke, canvas.size());
        let backup = canvas
            .capture_region(region)
            .map_err(|e| HistoryError::divergence(target, e))?;
        if let Err(cause) = render_and_flush(canvas, brush, stroke) {
            put_back_region(canvas, &backup, region);
            tracing::warn!(target: TARGET, node = ?target, error = %cause, "redo failed");
            return Err(HistoryError::divergence(target, cause));
        }
        let current = tree.current();
        tree.mark_visited(&[current, target]);
        tree.set_current(target);
        Ok(RestoreStats::new(RestorePath::ForwardReplay, 1, depth))
    }

    fn restore_from_checkpoint<C, B>(
        &self,
        tree: &mut HistoryTree,
        canvas: &mut C,
        brush: &mut B,
        target: NodeId,
    ) -> Result<RestoreStats, HistoryError>
    where
        C: Canvas + ?Sized,
        B: BrushRenderer<C> + ?Sized,
    {
        let path = tree
            .path_to(target)
            .ok_or(HistoryError::InvalidNodeId(target))?;
        let anchor_at = path
            .iter()
            .rposition(|&id| tree.node(id).is_some_and(|n| n.full().is_some()))
            .ok_or_else(|| HistoryError::divergence(target, ReplayCause::MissingCheckpoint))?;
        let Some(anchor) = tree.node(path[anchor_at]) else {
            return Err(HistoryError::InvalidNodeId(path[anchor_at]));
        };
        let Some(snapshot) = anchor.full() else {
            return Err(HistoryError::divergence(target, ReplayCause::MissingCheckpoint));
        };
        let anchor_depth = anchor.depth();

        let actual = canvas.size();
        if snapshot.canvas_size() != Some(actual) {
            let expected = snapshot.buffer().size();
            tracing::warn!(
                target: TARGET,
                node = ?target,
                %expected,
                %actual,
                "canvas resized since checkpoint"
            );
            return Err(HistoryError::divergence(
                target,
                CanvasError::DimensionMismatch { expected, actual },
            ));
        }

        let backup = canvas
            .capture_full()
            .map_err(|e| HistoryError::divergence(target, e))?;

        let strokes = path[anchor_at + 1..]
            .iter()
            .filter_map(|&id| tree.node(id).and_then(|n| n.stroke()));
        let replayed = match restore_and_replay(canvas, brush, snapshot.buffer(), strokes) {
            Ok(n) => n,
            Err(cause) => {
                if let Err(err) = canvas.restore_full(&backup) {
                    tracing::warn!(target: TARGET, error = %err, "backup restore failed");
                }
                tracing::warn!(
                    target: TARGET,
                    node = ?target,
                    error = %cause,
                    "checkpoint restore failed"
                );
                return Err(HistoryError::divergence(target, cause));
            }
        };

        let depth = tree.node(target).map_or(0, |n| n.depth());
        tree.mark_visited(&path);
        tree.set_current(target);
        Ok(RestoreStats::new(
            RestorePath::Checkpoint { depth: anchor_depth },
            replayed,
            depth,
        ))
    }
}

fn render_and_flush<C, B>(canvas: &mut C, brush: &mut B, stroke: &StrokeCommand) -> Result<(), ReplayCause>
where
    C: Canvas + ?Sized,
    B: BrushRenderer<C> + ?Sized,
{
    apply_stroke(canvas, brush, stroke)?;
    canvas.flush()?;
    Ok(())
}

fn restore_and_replay<'a, C, B, I>(
    canvas: &mut C,
    brush: &mut B,
    checkpoint: &PixelBuffer,
    strokes: I,
) -> Result<usize, ReplayCause>
where
    C: Canvas + ?Sized,
    B: BrushRenderer<C> + ?Sized,
    I: IntoIterator<Item = &'a StrokeCommand>,
{
    canvas.restore_full(checkpoint)?;
    let replayed = replay_path(canvas, brush, strokes)?;
    canvas.flush()?;
    Ok(replayed)
}

fn put_back_region<C: Canvas + ?Sized>(canvas: &mut C, buffer: &PixelBuffer, region: Rect) {
    if let Err(err) = canvas.restore_region(buffer, region) {
        tracing::warn!(target: TARGET, region = ?region, error = %err, "region restore failed");
    }
}
