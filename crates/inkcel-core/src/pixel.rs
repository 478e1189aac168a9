#![forbid(unsafe_code)]

//! Opaque pixel buffers and colours.
//!
//! A [`PixelBuffer`] is a rectangle of tightly packed rows. The engine only
//! copies rows between buffers, so the pixel format is whatever the host
//! canvas uses, described solely by `bytes_per_pixel`.

use crate::canvas::CanvasError;
use crate::geometry::{Rect, Size};

/// Straight-alpha colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgba {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Rgba {
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a colour from float components.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a colour from 8-bit components.
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }

    /// Quantize to 8-bit components, clamping out-of-range values.
    #[inline]
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// Tightly packed pixel rows.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes_per_pixel", &self.bytes_per_pixel)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl PixelBuffer {
    /// Create a zero-filled buffer.
    #[must_use]
    pub fn new(width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        let len = width as usize * height as usize * bytes_per_pixel as usize;
        Self {
            width,
            height,
            bytes_per_pixel,
            data: vec![0; len],
        }
    }

    /// Create a buffer where every pixel equals `pixel`.
    #[must_use]
    pub fn filled(width: u32, height: u32, pixel: &[u8]) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            bytes_per_pixel: pixel.len() as u32,
            data: pixel.repeat(count),
        }
    }

    /// Wrap existing bytes, checking the length matches the dimensions.
    pub fn from_raw(
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
        data: Vec<u8>,
    ) -> Result<Self, CanvasError> {
        let expected = width as usize * height as usize * bytes_per_pixel as usize;
        if data.len() != expected {
            return Err(CanvasError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bytes_per_pixel,
            data,
        })
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions.
    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Bytes per pixel.
    #[inline]
    pub fn bytes_per_pixel(&self) -> u32 {
        self.bytes_per_pixel
    }

    /// Bytes per row.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.width as usize * self.bytes_per_pixel as usize
    }

    /// Total payload size in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Raw bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes, mutable.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume into raw bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Copy `region` out into a new buffer.
    pub fn copy_region(&self, region: Rect) -> Result<PixelBuffer, CanvasError> {
        if !self.size().bounds().contains_rect(&region) {
            return Err(CanvasError::RegionOutOfBounds {
                region,
                canvas: self.size(),
            });
        }
        let bpp = self.bytes_per_pixel as usize;
        let stride = self.row_stride();
        let row_len = region.width as usize * bpp;
        let mut out = Vec::with_capacity(row_len * region.height as usize);
        for row in region.y..region.bottom() {
            let start = row as usize * stride + region.x as usize * bpp;
            out.extend_from_slice(&self.data[start..start + row_len]);
        }
        Ok(PixelBuffer {
            width: region.width,
            height: region.height,
            bytes_per_pixel: self.bytes_per_pixel,
            data: out,
        })
    }

    /// Overwrite the pixels at (`x`, `y`) with the whole of `src`.
    pub fn blit(&mut self, src: &PixelBuffer, x: u32, y: u32) -> Result<(), CanvasError> {
        if src.bytes_per_pixel != self.bytes_per_pixel {
            return Err(CanvasError::BufferSize {
                expected: src.width as usize * src.height as usize * self.bytes_per_pixel as usize,
                actual: src.byte_len(),
            });
        }
        let region = Rect::new(x, y, src.width, src.height);
        if !self.size().bounds().contains_rect(&region) {
            return Err(CanvasError::RegionOutOfBounds {
                region,
                canvas: self.size(),
            });
        }
        let bpp = self.bytes_per_pixel as usize;
        let stride = self.row_stride();
        let src_stride = src.row_stride();
        for row in 0..src.height as usize {
            let dst = (y as usize + row) * stride + x as usize * bpp;
            let from = row * src_stride;
            self.data[dst..dst + src_stride].copy_from_slice(&src.data[from..from + src_stride]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let data = (0..width * height).map(|i| i as u8).collect();
        PixelBuffer::from_raw(width, height, 1, data).unwrap()
    }

    #[test]
    fn from_raw_rejects_wrong_length() {
        let err = PixelBuffer::from_raw(2, 2, 4, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            CanvasError::BufferSize {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn filled_repeats_pixel() {
        let buf = PixelBuffer::filled(3, 2, &[1, 2, 3, 4]);
        assert_eq!(buf.byte_len(), 24);
        assert_eq!(buf.bytes_per_pixel(), 4);
        assert!(buf.data().chunks(4).all(|px| px == [1, 2, 3, 4]));
    }

    #[test]
    fn copy_region_extracts_rows() {
        let buf = gradient(4, 4);
        let sub = buf.copy_region(Rect::new(1, 1, 2, 2)).unwrap();
        assert_eq!(sub.data(), &[5, 6, 9, 10]);
    }

    #[test]
    fn copy_region_out_of_bounds_fails() {
        let buf = gradient(4, 4);
        assert!(matches!(
            buf.copy_region(Rect::new(3, 3, 2, 2)),
            Err(CanvasError::RegionOutOfBounds { .. })
        ));
    }

    #[test]
    fn blit_round_trips_with_copy_region() {
        let src = gradient(4, 4);
        let patch = src.copy_region(Rect::new(0, 2, 3, 2)).unwrap();
        let mut dst = PixelBuffer::new(4, 4, 1);
        dst.blit(&patch, 1, 0).unwrap();
        assert_eq!(dst.copy_region(Rect::new(1, 0, 3, 2)).unwrap(), patch);
        assert_eq!(dst.data()[0], 0);
    }

    #[test]
    fn blit_rejects_format_mismatch() {
        let mut dst = PixelBuffer::new(4, 4, 4);
        let src = PixelBuffer::new(1, 1, 3);
        assert!(dst.blit(&src, 0, 0).is_err());
    }

    #[test]
    fn rgba8_round_trip() {
        let c = Rgba::from_rgba8(10, 128, 255, 0);
        assert_eq!(c.to_rgba8(), [10, 128, 255, 0]);
        assert_eq!(Rgba::new(2.0, -1.0, 0.5, 1.0).to_rgba8(), [255, 0, 128, 255]);
    }

    #[test]
    fn debug_omits_payload() {
        let dbg = format!("{:?}", PixelBuffer::new(2, 2, 4));
        assert!(dbg.contains("bytes: 16"));
    }
}
