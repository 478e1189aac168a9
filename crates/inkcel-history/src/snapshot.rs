#![forbid(unsafe_code)]

//! Canvas snapshots stored on history nodes.
//!
//! ```text
//! Full   ┌──────────────────────┐   origin (0,0), whole canvas
//!        │                      │   restore: O(canvas)
//!        └──────────────────────┘
//! Delta  ┌──────────────────────┐
//!        │      ┌─────┐         │   stroke footprint only, captured
//!        │      │  Δ  │         │   *before* the stroke was applied
//!        │      └─────┘         │   restore: O(region)
//!        └──────────────────────┘
//! ```

use inkcel_core::{PixelBuffer, Rect, Size};

/// Pixels captured from the canvas at some history node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasSnapshot {
    /// The whole canvas.
    Full(PixelBuffer),
    /// One region of the canvas.
    Delta {
        /// Where the buffer sits on the canvas.
        region: Rect,
        /// `region`-sized pixels.
        buffer: PixelBuffer,
    },
}

impl CanvasSnapshot {
    /// Wrap a whole-canvas capture.
    #[must_use]
    pub fn full(buffer: PixelBuffer) -> Self {
        Self::Full(buffer)
    }

    /// Wrap a region capture.
    #[must_use]
    pub fn delta(region: Rect, buffer: PixelBuffer) -> Self {
        Self::Delta { region, buffer }
    }

    /// True for whole-canvas snapshots.
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Canvas area the snapshot covers.
    #[must_use]
    pub fn region(&self) -> Rect {
        match self {
            Self::Full(buffer) => Rect::from_size(buffer.size()),
            Self::Delta { region, .. } => *region,
        }
    }

    /// Captured pixels.
    #[must_use]
    pub fn buffer(&self) -> &PixelBuffer {
        match self {
            Self::Full(buffer) | Self::Delta { buffer, .. } => buffer,
        }
    }

    /// Canvas size a full snapshot was taken at.
    #[must_use]
    pub fn canvas_size(&self) -> Option<Size> {
        match self {
            Self::Full(buffer) => Some(buffer.size()),
            Self::Delta { .. } => None,
        }
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.buffer().byte_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_covers_whole_buffer() {
        let snap = CanvasSnapshot::full(PixelBuffer::new(8, 4, 4));
        assert!(snap.is_full());
        assert_eq!(snap.region(), Rect::new(0, 0, 8, 4));
        assert_eq!(snap.canvas_size(), Some(Size::new(8, 4)));
        assert_eq!(snap.byte_len(), 128);
    }

    #[test]
    fn delta_keeps_its_origin() {
        let region = Rect::new(3, 5, 2, 2);
        let snap = CanvasSnapshot::delta(region, PixelBuffer::new(2, 2, 4));
        assert!(!snap.is_full());
        assert_eq!(snap.region(), region);
        assert_eq!(snap.canvas_size(), None);
        assert_eq!(snap.byte_len(), 16);
    }
}
