#![forbid(unsafe_code)]

//! The canvas collaborator.
//!
//! The undo engine never owns pixels beyond the snapshots it stores. It asks
//! the host canvas to capture and restore regions, and it lends the canvas to
//! the brush renderer when strokes are replayed.
//!
//! # Contract
//!
//! - `capture_*` must observe every write issued before it. Hosts with
//!   asynchronous GPU work implement [`Canvas::flush`] to wait for it; the
//!   engine calls `flush` after applying a stroke and before capturing.
//! - `restore_region(capture_region(r), r)` must be an exact no-op on pixels.
//! - Buffers returned by captures must use one fixed `bytes_per_pixel`.

use thiserror::Error;

use crate::geometry::{Rect, Size};
use crate::pixel::{PixelBuffer, Rgba};

/// Errors raised by canvas operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanvasError {
    /// A full buffer does not match the canvas dimensions.
    #[error("canvas is {actual}, buffer expects {expected}")]
    DimensionMismatch {
        /// Dimensions the buffer was captured at.
        expected: Size,
        /// Current canvas dimensions.
        actual: Size,
    },
    /// A region lies (partly) outside the canvas.
    #[error("region {region:?} exceeds canvas {canvas}")]
    RegionOutOfBounds {
        /// Offending region.
        region: Rect,
        /// Canvas dimensions.
        canvas: Size,
    },
    /// A buffer's byte length does not match its dimensions or format.
    #[error("buffer holds {actual} bytes, {expected} expected")]
    BufferSize {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },
    /// Backend-specific failure (GPU readback, device loss, ...).
    #[error("canvas backend: {0}")]
    Backend(String),
}

/// A raster surface the engine can snapshot and restore.
pub trait Canvas {
    /// Current dimensions.
    fn size(&self) -> Size;

    /// Copy the pixels of `region`.
    fn capture_region(&mut self, region: Rect) -> Result<PixelBuffer, CanvasError>;

    /// Copy the whole canvas.
    fn capture_full(&mut self) -> Result<PixelBuffer, CanvasError>;

    /// Write `buffer` back at `region`. The buffer must be `region`-sized.
    fn restore_region(&mut self, buffer: &PixelBuffer, region: Rect) -> Result<(), CanvasError>;

    /// Replace the whole canvas. The buffer must match [`Canvas::size`].
    fn restore_full(&mut self, buffer: &PixelBuffer) -> Result<(), CanvasError>;

    /// Fill the whole canvas with `color`.
    fn clear(&mut self, color: Rgba) -> Result<(), CanvasError>;

    /// Block until all previously issued rendering has landed.
    fn flush(&mut self) -> Result<(), CanvasError> {
        Ok(())
    }
}

impl<C: Canvas + ?Sized> Canvas for &mut C {
    fn size(&self) -> Size {
        (**self).size()
    }

    fn capture_region(&mut self, region: Rect) -> Result<PixelBuffer, CanvasError> {
        (**self).capture_region(region)
    }

    fn capture_full(&mut self) -> Result<PixelBuffer, CanvasError> {
        (**self).capture_full()
    }

    fn restore_region(&mut self, buffer: &PixelBuffer, region: Rect) -> Result<(), CanvasError> {
        (**self).restore_region(buffer, region)
    }

    fn restore_full(&mut self, buffer: &PixelBuffer) -> Result<(), CanvasError> {
        (**self).restore_full(buffer)
    }

    fn clear(&mut self, color: Rgba) -> Result<(), CanvasError> {
        (**self).clear(color)
    }

    fn flush(&mut self) -> Result<(), CanvasError> {
        (**self).flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = CanvasError::DimensionMismatch {
            expected: Size::new(10, 10),
            actual: Size::new(20, 10),
        };
        assert_eq!(err.to_string(), "canvas is 20x10, buffer expects 10x10");

        let err = CanvasError::BufferSize {
            expected: 16,
            actual: 4,
        };
        assert_eq!(err.to_string(), "buffer holds 4 bytes, 16 expected");

        let err = CanvasError::Backend("device lost".into());
        assert_eq!(err.to_string(), "canvas backend: device lost");
    }
}
