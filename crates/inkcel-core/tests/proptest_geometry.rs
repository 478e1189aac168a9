#![forbid(unsafe_code)]

//! Property tests for rectangles, footprints, and pixel buffer copies.
//!
//! Validates:
//! - Clipped float boxes always lie on the canvas.
//! - A stroke's footprint covers every sample that is on the canvas.
//! - `copy_region` then `blit` at the same spot is the identity.
//! - `blit` only writes inside the destination rectangle.

use proptest::prelude::*;

use inkcel_core::{BrushSettings, PixelBuffer, Rect, Rgba, Size, StrokeCommand, StrokePoint};

// ============================================================================
// Strategy helpers
// ============================================================================

fn canvas_size() -> impl Strategy<Value = Size> {
    (1u32..64, 1u32..64).prop_map(|(w, h)| Size::new(w, h))
}

/// A canvas and a rectangle inside it.
fn size_and_region() -> impl Strategy<Value = (Size, Rect)> {
    canvas_size().prop_flat_map(|size| {
        (0..size.width, 0..size.height).prop_flat_map(move |(x, y)| {
            (1..=size.width - x, 1..=size.height - y)
                .prop_map(move |(w, h)| (size, Rect::new(x, y, w, h)))
        })
    })
}

fn noise(size: Size, seed: u8) -> PixelBuffer {
    let len = size.width as usize * size.height as usize * 4;
    let data = (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect();
    PixelBuffer::from_raw(size.width, size.height, 4, data).unwrap()
}

// ============================================================================
// Geometry
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn clipped_box_is_on_canvas(
        size in canvas_size(),
        x0 in -100.0f32..200.0,
        y0 in -100.0f32..200.0,
        w in 0.0f32..150.0,
        h in 0.0f32..150.0,
    ) {
        let rect = Rect::from_f32_clipped(x0, y0, x0 + w, y0 + h, size);
        prop_assert!(size.bounds().contains_rect(&rect), "{:?} off {:?}", rect, size);
    }

    #[test]
    fn footprint_covers_samples(
        size in canvas_size(),
        points in prop::collection::vec((0.0f32..64.0, 0.0f32..64.0), 1..12),
        brush_size in 0.5f32..30.0,
    ) {
        let samples = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| StrokePoint::new(x, y, 1.0, i as u64))
            .collect();
        let stroke = StrokeCommand::new(samples, BrushSettings::round(brush_size, Rgba::BLACK));
        let footprint = stroke.footprint(size);
        for &(x, y) in &points {
            let (px, py) = (x as u32, y as u32);
            if px < size.width && py < size.height {
                prop_assert!(footprint.contains(px, py), "({}, {}) outside {:?}", px, py, footprint);
            }
        }
    }
}

// ============================================================================
// Pixel buffers
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn copy_then_blit_is_identity((size, region) in size_and_region(), seed in any::<u8>()) {
        let mut buf = noise(size, seed);
        let original = buf.clone();
        let saved = buf.copy_region(region).unwrap();
        prop_assert_eq!(saved.size(), region.size());
        buf.blit(&saved, region.x, region.y).unwrap();
        prop_assert_eq!(buf, original);
    }

    #[test]
    fn blit_writes_only_inside_region((size, region) in size_and_region(), seed in any::<u8>()) {
        let mut buf = noise(size, seed);
        let original = buf.clone();
        let patch = PixelBuffer::filled(region.width, region.height, &[7, 7, 7, 7]);
        buf.blit(&patch, region.x, region.y).unwrap();

        let stride = buf.row_stride();
        for y in 0..size.height {
            for x in 0..size.width {
                let at = y as usize * stride + x as usize * 4;
                let px = &buf.data()[at..at + 4];
                if region.contains(x, y) {
                    prop_assert_eq!(px, &[7u8, 7, 7, 7][..]);
                } else {
                    prop_assert_eq!(px, &original.data()[at..at + 4]);
                }
            }
        }
    }

    #[test]
    fn out_of_bounds_region_is_rejected(size in canvas_size(), dx in 1u32..8) {
        let buf = noise(size, 0);
        let region = Rect::new(size.width - 1, 0, 1 + dx, 1);
        prop_assert!(buf.copy_region(region).is_err());
    }
}
