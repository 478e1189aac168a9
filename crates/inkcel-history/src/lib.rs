#![forbid(unsafe_code)]

//! Branching undo/redo for multi-frame raster drawing.
//!
//! Each animation frame (a *context*) has its own history tree. Every
//! recorded stroke becomes a node holding the stroke itself plus the pixels
//! it covered before it was drawn, so single-step undo writes back one
//! small region. Every `checkpoint_interval` levels a node also carries a
//! full-canvas snapshot; any other node is reached by restoring the nearest
//! checkpoint above it and replaying strokes through the brush renderer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          UndoEngine                              │
//! │  ┌────────────────────────────┐   ┌───────────────────────────┐  │
//! │  │ ContextSet                 │   │ CheckpointManager         │  │
//! │  │  [0] HistoryTree ◄─active  │──►│  record / restore / resync│  │
//! │  │  [1] HistoryTree           │   └─────────────┬─────────────┘  │
//! │  │  ...                       │                 │ replay         │
//! │  │  NodeStore (arena)         │   ┌─────────────▼─────────────┐  │
//! │  └─────────────▲──────────────┘   │ apply_stroke / replay_path│  │
//! │                │ after record     └─────────────┬─────────────┘  │
//! │  ┌─────────────┴──────────────┐                 │                │
//! │  │ EvictionPolicy             │                 ▼                │
//! │  │  branches → fold → demote  │      Canvas  ◄── BrushRenderer   │
//! │  └────────────────────────────┘                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use inkcel_history::UndoEngine;
//!
//! let mut engine = UndoEngine::init(12, 10, 120, canvas, brush)?;
//! engine.record_stroke(stroke)?;
//! engine.undo()?;
//! engine.redo()?;
//! engine.switch_frame(3, &mut frames)?;
//! ```
//!
//! # Module Structure
//!
//! - [`node`]: generational node arena
//! - [`snapshot`]: full and delta pixel snapshots
//! - [`tree`]: one context's topology and current node
//! - [`checkpoint`]: snapshot capture and the three restore paths
//! - [`replay`]: re-rendering recorded strokes
//! - [`eviction`]: node and byte budgets
//! - [`context`]: per-frame trees
//! - [`engine`]: the public facade
//! - [`config`]: tunables, optionally loaded from TOML or JSON
//!
//! # Branches
//!
//! Recording after an undo starts a sibling branch. The abandoned branch is
//! kept and stays reachable through [`UndoEngine::goto_node`] and
//! [`UndoEngine::redo_branch`] until eviction needs the room. Plain redo
//! follows the branch visited last.
//!
//! # Logging
//!
//! Spans `history.record`, `history.restore`, `history.evict`, and
//! `history.switch` wrap the corresponding operations. Events use the
//! `inkcel.history` target.

pub mod checkpoint;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod eviction;
pub mod node;
pub mod replay;
pub mod snapshot;
pub mod tree;

pub use checkpoint::{CheckpointManager, RestorePath, RestoreStats};
pub use config::{ConfigError, HistoryConfig};
pub use context::ContextSet;
pub use engine::{HistoryStats, RecordOutcome, UndoEngine};
pub use error::{HistoryError, ReplayCause};
pub use eviction::{EvictionPolicy, EvictionReport};
pub use node::{HistoryNode, NodeId, NodeStore};
pub use replay::{apply_stroke, replay_path};
pub use snapshot::CanvasSnapshot;
pub use tree::HistoryTree;
