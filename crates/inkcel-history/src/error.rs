#![forbid(unsafe_code)]

//! Error types for history operations.

use inkcel_core::{BrushError, CanvasError};
use thiserror::Error;

use crate::node::NodeId;

/// Why a restore could not reproduce the target state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayCause {
    /// The canvas rejected a capture or restore.
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    /// The brush renderer failed while re-issuing a stroke.
    #[error(transparent)]
    Brush(#[from] BrushError),
    /// No full snapshot exists on the path to the target.
    #[error("no checkpoint on the path to the target")]
    MissingCheckpoint,
}

/// Errors raised by the history engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// The node budget is exhausted and eviction could not free a slot.
    ///
    /// Non-fatal: history stays usable, the caller may clear it and retry.
    #[error("history holds {nodes} nodes, budget is {max_nodes}")]
    CapacityExceeded {
        /// Configured per-context node budget.
        max_nodes: usize,
        /// Live nodes in the tree when the budget was checked.
        nodes: usize,
    },

    /// A restore failed part-way. The canvas and current node are unchanged.
    #[error("restore to {node:?} failed: {cause}")]
    ReplayDivergence {
        /// Restore target.
        node: NodeId,
        /// Underlying failure.
        #[source]
        cause: ReplayCause,
    },

    /// The handle does not name a live node of the active tree.
    #[error("unknown history node {0:?}")]
    InvalidNodeId(NodeId),

    /// Context index past the end of the context set.
    #[error("context {index} out of range (count {count})")]
    ContextOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of contexts.
        count: usize,
    },

    /// A stroke with no samples cannot be recorded.
    #[error("stroke has no samples")]
    EmptyStroke,

    /// Canvas failure outside a restore.
    #[error(transparent)]
    Canvas(#[from] CanvasError),

    /// Brush failure outside a restore.
    #[error(transparent)]
    Brush(#[from] BrushError),
}

impl HistoryError {
    /// Wrap a restore failure for `node`.
    pub(crate) fn divergence(node: NodeId, cause: impl Into<ReplayCause>) -> Self {
        Self::ReplayDivergence {
            node,
            cause: cause.into(),
        }
    }

    /// True for errors after which the engine is fully usable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Canvas(CanvasError::Backend(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn divergence_exposes_source() {
        let mut store = crate::node::NodeStore::new(1);
        let id = store.create_root();
        let err = HistoryError::divergence(id, BrushError::Backend("lost".into()));
        assert!(err.to_string().contains("brush backend: lost"));
        assert!(err.source().is_some());
    }

    #[test]
    fn transparent_variants_keep_message() {
        let err: HistoryError = CanvasError::Backend("readback".into()).into();
        assert_eq!(err.to_string(), "canvas backend: readback");
        assert!(!err.is_recoverable());
        assert!(HistoryError::EmptyStroke.is_recoverable());
    }

    #[test]
    fn capacity_message() {
        let err = HistoryError::CapacityExceeded {
            max_nodes: 20,
            nodes: 21,
        };
        assert_eq!(err.to_string(), "history holds 21 nodes, budget is 20");
    }
}
