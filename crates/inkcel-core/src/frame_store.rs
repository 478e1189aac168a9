#![forbid(unsafe_code)]

//! Per-context pixel persistence across context switches.
//!
//! Only one context's pixels live on the canvas at a time. When the host
//! switches animation frames it parks the outgoing pixels in a frame store
//! and loads the incoming ones. The undo engine does not persist pixels
//! beyond its own snapshots.

use crate::canvas::CanvasError;

/// Saves and loads rasterized pixels for each context index.
pub trait FrameStore<C: ?Sized> {
    /// Save the canvas content as context `context`'s pixels.
    fn save(&mut self, context: usize, canvas: &mut C) -> Result<(), CanvasError>;

    /// Load context `context`'s pixels onto the canvas.
    ///
    /// Returns `Ok(false)` when nothing is stored for that context; the
    /// canvas is left untouched in that case.
    fn load(&mut self, context: usize, canvas: &mut C) -> Result<bool, CanvasError>;

    /// Forget anything stored for `context`.
    fn discard(&mut self, context: usize);
}
