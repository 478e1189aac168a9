#![forbid(unsafe_code)]

//! Stroke fixtures.
//!
//! Seeded generators so property tests and benches draw the same strokes on
//! every run. Set `INKCEL_TEST_SEED` to reproduce a failure with a
//! different seed.

use inkcel_core::{BrushSettings, Rgba, Size, StrokeCommand, StrokePoint};

/// Seed from `INKCEL_TEST_SEED`, or `default`.
pub fn fixture_seed(default: u64) -> u64 {
    std::env::var("INKCEL_TEST_SEED")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// SplitMix64, used only to generate fixtures.
#[derive(Debug, Clone)]
pub struct FixtureRng(u64);

impl FixtureRng {
    /// Create a generator.
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Next raw value.
    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[lo, hi)`.
    pub fn range_f32(&mut self, lo: f32, hi: f32) -> f32 {
        let unit = (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32;
        lo + (hi - lo) * unit
    }

    /// Uniform in `0..n` (0 when `n == 0`).
    pub fn below(&mut self, n: u64) -> u64 {
        if n == 0 { 0 } else { self.next_u64() % n }
    }
}

/// Left-to-right line at height `y` across a `width`-wide canvas, drawn with
/// a hard black round brush.
pub fn horizontal_line(y: f32, width: u32) -> StrokeCommand {
    let end = width.saturating_sub(20) as f32;
    let mut points = Vec::new();
    let mut x = 20.0;
    let mut t = 0;
    while x <= end {
        points.push(StrokePoint::new(x, y, 1.0, t));
        x += 20.0;
        t += 16;
    }
    if points.is_empty() {
        points.push(StrokePoint::new(width as f32 * 0.5, y, 1.0, 0));
    }
    StrokeCommand::new(points, BrushSettings::round(6.0, Rgba::BLACK))
}

/// Single dab at (`x`, `y`).
pub fn dot(x: f32, y: f32, size: f32, color: Rgba) -> StrokeCommand {
    StrokeCommand::new(
        vec![StrokePoint::new(x, y, 1.0, 0)],
        BrushSettings::round(size, color),
    )
}

/// A short random stroke somewhere on a `canvas`-sized surface.
///
/// Brush size, colour, scatter, and jitter vary; the stroke seed is drawn
/// from `rng` too.
pub fn random_stroke(rng: &mut FixtureRng, canvas: Size) -> StrokeCommand {
    let w = canvas.width.max(1) as f32;
    let h = canvas.height.max(1) as f32;
    let samples = 1 + rng.below(8) as usize;
    let mut x = rng.range_f32(0.0, w);
    let mut y = rng.range_f32(0.0, h);
    let mut points = Vec::with_capacity(samples);
    for i in 0..samples {
        points.push(StrokePoint::new(x, y, rng.range_f32(0.2, 1.0), i as u64 * 16));
        x = (x + rng.range_f32(-12.0, 12.0)).clamp(0.0, w);
        y = (y + rng.range_f32(-12.0, 12.0)).clamp(0.0, h);
    }

    let color = Rgba::from_rgba8(
        rng.below(256) as u8,
        rng.below(256) as u8,
        rng.below(256) as u8,
        255,
    );
    let mut brush = BrushSettings::round(rng.range_f32(2.0, 10.0), color)
        .with_opacity(rng.range_f32(0.3, 1.0))
        .with_scatter(rng.range_f32(0.0, 0.5));
    brush.size_jitter = rng.range_f32(0.0, 0.3);

    StrokeCommand::new(points, brush)
        .with_seed(rng.next_u64() as u32)
        .with_start_time(rng.below(1_000_000))
}

/// `count` random strokes from `seed`.
pub fn stroke_batch(seed: u64, count: usize, canvas: Size) -> Vec<StrokeCommand> {
    let mut rng = FixtureRng::new(seed);
    (0..count).map(|_| random_stroke(&mut rng, canvas)).collect()
}
