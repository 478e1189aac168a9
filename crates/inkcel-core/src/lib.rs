#![forbid(unsafe_code)]

//! Core: stroke data, opaque pixel buffers, and collaborator contracts.
//!
//! # Role in inkcel
//! `inkcel-core` is the vocabulary shared between the undo engine
//! (`inkcel-history`) and the host application. It owns no history state.
//!
//! # Primary responsibilities
//! - **StrokeCommand**: an immutable, replayable record of one gesture.
//! - **PixelBuffer**: opaque, tightly packed pixel rows with region copy and
//!   blit helpers. Pixel values are never interpreted.
//! - **Canvas / BrushRenderer / FrameStore**: the traits a host implements so
//!   the engine can capture, restore, and re-render canvas state.
//!
//! # How it fits in the system
//! The history crate drives a [`Canvas`] and a [`BrushRenderer`] it does not
//! know the internals of. Test doubles for both live in `inkcel-harness`.

pub mod brush;
pub mod canvas;
pub mod frame_store;
pub mod geometry;
pub mod pixel;
pub mod stroke;

pub use brush::{BrushError, BrushRenderer};
pub use canvas::{Canvas, CanvasError};
pub use frame_store::FrameStore;
pub use geometry::{Rect, Size};
pub use pixel::{PixelBuffer, Rgba};
pub use stroke::{BrushFlags, BrushKind, BrushSettings, StrokeCommand, StrokePoint};
