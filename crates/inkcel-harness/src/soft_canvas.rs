#![forbid(unsafe_code)]

//! Software RGBA8 canvas.
//!
//! Stands in for the GPU canvas in tests. Captures are plain copies, so the
//! region round-trip contract holds exactly. One-shot faults can be armed to
//! exercise the engine's failure paths.

use inkcel_core::{Canvas, CanvasError, PixelBuffer, Rect, Rgba, Size};

use crate::checksum::checksum_buffer;

/// Bytes per pixel of [`SoftCanvas`].
pub const BYTES_PER_PIXEL: u32 = 4;

/// Canvas operation a fault can be armed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasOp {
    /// [`Canvas::capture_region`].
    CaptureRegion,
    /// [`Canvas::capture_full`].
    CaptureFull,
    /// [`Canvas::restore_region`].
    RestoreRegion,
    /// [`Canvas::restore_full`].
    RestoreFull,
    /// [`Canvas::flush`].
    Flush,
}

/// An in-memory canvas of RGBA8 pixels.
#[derive(Debug, Clone)]
pub struct SoftCanvas {
    pixels: PixelBuffer,
    flushes: u64,
    fault: Option<(CanvasOp, u32)>,
}

impl SoftCanvas {
    /// Opaque white canvas.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba::WHITE)
    }

    /// Canvas filled with `color`.
    #[must_use]
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        Self {
            pixels: PixelBuffer::filled(width, height, &color.to_rgba8()),
            flushes: 0,
            fault: None,
        }
    }

    /// Current pixels.
    #[inline]
    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// Pixel at (`x`, `y`), or `None` off-canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if !self.pixels.size().bounds().contains(x, y) {
            return None;
        }
        let at = y as usize * self.pixels.row_stride() + x as usize * BYTES_PER_PIXEL as usize;
        let px = self.pixels.data().get(at..at + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Overwrite the pixel at (`x`, `y`). Off-canvas writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if !self.pixels.size().bounds().contains(x, y) {
            return;
        }
        let at = y as usize * self.pixels.row_stride() + x as usize * BYTES_PER_PIXEL as usize;
        self.pixels.data_mut()[at..at + 4].copy_from_slice(&rgba);
    }

    /// Pixels that differ from `color`.
    pub fn count_not(&self, color: Rgba) -> usize {
        let rgba = color.to_rgba8();
        self.pixels.data().chunks_exact(4).filter(|px| *px != rgba).count()
    }

    /// BLAKE3 checksum of the pixels.
    pub fn checksum(&self) -> String {
        checksum_buffer(&self.pixels)
    }

    /// Replace the canvas with a `width`x`height` one filled with `color`.
    pub fn resize(&mut self, width: u32, height: u32, color: Rgba) {
        self.pixels = PixelBuffer::filled(width, height, &color.to_rgba8());
    }

    /// Number of `flush` calls so far.
    #[inline]
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    /// Make the `skip + 1`-th next call to `op` fail with a backend error.
    pub fn fail_on(&mut self, op: CanvasOp, skip: u32) {
        self.fault = Some((op, skip));
    }

    /// Disarm any pending fault.
    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    fn check(&mut self, op: CanvasOp) -> Result<(), CanvasError> {
        match self.fault {
            Some((armed, 0)) if armed == op => {
                self.fault = None;
                tracing::debug!(op = ?op, "injected canvas fault");
                Err(CanvasError::Backend(format!("injected {op:?} fault")))
            }
            Some((armed, skip)) if armed == op => {
                self.fault = Some((armed, skip - 1));
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl Canvas for SoftCanvas {
    fn size(&self) -> Size {
        self.pixels.size()
    }

    fn capture_region(&mut self, region: Rect) -> Result<PixelBuffer, CanvasError> {
        self.check(CanvasOp::CaptureRegion)?;
        if region.is_empty() {
            return Ok(PixelBuffer::new(0, 0, BYTES_PER_PIXEL));
        }
        self.pixels.copy_region(region)
    }

    fn capture_full(&mut self) -> Result<PixelBuffer, CanvasError> {
        self.check(CanvasOp::CaptureFull)?;
        Ok(self.pixels.clone())
    }

    fn restore_region(&mut self, buffer: &PixelBuffer, region: Rect) -> Result<(), CanvasError> {
        self.check(CanvasOp::RestoreRegion)?;
        if region.is_empty() {
            return Ok(());
        }
        if buffer.size() != region.size() {
            return Err(CanvasError::BufferSize {
                expected: region.area() as usize * BYTES_PER_PIXEL as usize,
                actual: buffer.byte_len(),
            });
        }
        self.pixels.blit(buffer, region.x, region.y)
    }

    fn restore_full(&mut self, buffer: &PixelBuffer) -> Result<(), CanvasError> {
        self.check(CanvasOp::RestoreFull)?;
        if buffer.size() != self.size() {
            return Err(CanvasError::DimensionMismatch {
                expected: buffer.size(),
                actual: self.size(),
            });
        }
        if buffer.bytes_per_pixel() != BYTES_PER_PIXEL {
            return Err(CanvasError::BufferSize {
                expected: self.pixels.byte_len(),
                actual: buffer.byte_len(),
            });
        }
        self.pixels = buffer.clone();
        Ok(())
    }

    fn clear(&mut self, color: Rgba) -> Result<(), CanvasError> {
        let size = self.size();
        self.pixels = PixelBuffer::filled(size.width, size.height, &color.to_rgba8());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CanvasError> {
        self.check(CanvasOp::Flush)?;
        self.flushes += 1;
        Ok(())
    }
}
