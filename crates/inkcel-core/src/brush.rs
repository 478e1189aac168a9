#![forbid(unsafe_code)]

//! The brush renderer collaborator.
//!
//! Replay correctness rests on one property: rendering is a pure function of
//! (canvas before, stroke, settings, seed). A renderer must not read clocks,
//! global RNGs, or uninitialised scratch state, and must only write pixels
//! inside [`BrushRenderer::footprint`].

use thiserror::Error;

use crate::geometry::{Rect, Size};
use crate::stroke::{BrushSettings, StrokeCommand, StrokePoint};

/// Errors raised while rendering a stroke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrushError {
    /// `add_point`/`end` called with no stroke in progress.
    #[error("no stroke in progress")]
    NotStarted,
    /// Backend-specific failure.
    #[error("brush backend: {0}")]
    Backend(String),
}

/// Renders stroke samples onto a canvas of type `C`.
///
/// The canvas is lent for each call, so the renderer and the undo engine are
/// never both writing pixels at once.
pub trait BrushRenderer<C: ?Sized> {
    /// Start a stroke at `point`.
    fn begin(
        &mut self,
        canvas: &mut C,
        point: StrokePoint,
        settings: &BrushSettings,
        seed: u32,
    ) -> Result<(), BrushError>;

    /// Extend the stroke in progress.
    fn add_point(&mut self, canvas: &mut C, point: StrokePoint) -> Result<(), BrushError>;

    /// Finish the stroke in progress.
    fn end(&mut self, canvas: &mut C) -> Result<(), BrushError>;

    /// Pixels the stroke may touch on a canvas of `canvas` size.
    fn footprint(&self, stroke: &StrokeCommand, canvas: Size) -> Rect {
        stroke.footprint(canvas)
    }
}
