#![forbid(unsafe_code)]

//! Stroke commands: the replayable record of one drawing gesture.
//!
//! A [`StrokeCommand`] is captured once, at pointer-up, and never mutated.
//! Everything a brush renderer needs to reproduce the gesture lives inside
//! it: the samples, the brush configuration, and the seed used for any
//! jitter or scatter.
//!
//! # Invariants
//!
//! - Samples are kept in capture order.
//! - `footprint()` covers every pixel a conforming renderer may touch.

use std::mem;

use bitflags::bitflags;

use crate::geometry::{Rect, Size};
use crate::pixel::Rgba;

/// One input sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrokePoint {
    /// Canvas x coordinate.
    pub x: f32,
    /// Canvas y coordinate.
    pub y: f32,
    /// Pen pressure, `0.0..=1.0`.
    pub pressure: f32,
    /// Milliseconds since the stroke started.
    pub t: u64,
}

impl StrokePoint {
    /// Create a sample.
    #[inline]
    pub const fn new(x: f32, y: f32, pressure: f32, t: u64) -> Self {
        Self { x, y, pressure, t }
    }
}

/// Brush family used for a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BrushKind {
    /// Hard or soft round tip.
    Round,
    /// Textured dry media.
    #[default]
    Crayon,
    /// Wet, pooling media.
    Watercolor,
    /// Flat, translucent marker.
    Marker,
}

bitflags! {
    /// Boolean brush options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct BrushFlags: u8 {
        /// Grain texture scrolls with the stroke instead of staying fixed to the canvas.
        const GRAIN_MOVING = 0b0000_0001;
        /// Shape texture reads black as opaque instead of white.
        const SHAPE_INVERTED = 0b0000_0010;
    }
}

impl Default for BrushFlags {
    fn default() -> Self {
        Self::GRAIN_MOVING
    }
}

/// Brush configuration active for a gesture.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BrushSettings {
    /// Brush family.
    pub kind: BrushKind,
    /// Tip diameter in pixels.
    pub size: f32,
    /// Edge hardness, `0.0` (soft) to `1.0` (hard).
    pub hardness: f32,
    /// Stroke opacity.
    pub opacity: f32,
    /// Dab spacing as a fraction of the tip size.
    pub spacing: f32,
    /// Paint flow per dab.
    pub flow: f32,
    /// Paint colour.
    pub color: Rgba,
    /// Tip shape texture (0 = none).
    pub shape_texture_id: i32,
    /// Grain texture (0 = none).
    pub grain_texture_id: i32,
    /// Grain texture scale.
    pub grain_scale: f32,
    /// Boolean options.
    pub flags: BrushFlags,
    /// Tip rotation in radians.
    pub rotation: f32,
    /// Random rotation per dab.
    pub rotation_jitter: f32,
    /// Random dab offset as a fraction of the tip size.
    pub scatter: f32,
    /// How strongly pressure scales the tip size.
    pub size_pressure: f32,
    /// How strongly pressure scales opacity.
    pub opacity_pressure: f32,
    /// How strongly pointer speed scales the tip size.
    pub size_velocity: f32,
    /// Random size variation per dab.
    pub size_jitter: f32,
    /// Random opacity variation per dab.
    pub opacity_jitter: f32,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            kind: BrushKind::default(),
            size: 20.0,
            hardness: 0.0,
            opacity: 1.0,
            spacing: 0.15,
            flow: 1.0,
            color: Rgba::BLACK,
            shape_texture_id: 0,
            grain_texture_id: 0,
            grain_scale: 1.0,
            flags: BrushFlags::default(),
            rotation: 0.0,
            rotation_jitter: 0.0,
            scatter: 0.0,
            size_pressure: 1.0,
            opacity_pressure: 0.0,
            size_velocity: 0.0,
            size_jitter: 0.0,
            opacity_jitter: 0.0,
        }
    }
}

impl BrushSettings {
    /// A round brush of the given diameter and colour.
    #[must_use]
    pub fn round(size: f32, color: Rgba) -> Self {
        Self {
            kind: BrushKind::Round,
            size,
            hardness: 1.0,
            color,
            ..Self::default()
        }
    }

    /// Set the tip diameter.
    #[must_use]
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// Set the paint colour.
    #[must_use]
    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }

    /// Set the opacity.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Set the scatter amount.
    #[must_use]
    pub fn with_scatter(mut self, scatter: f32) -> Self {
        self.scatter = scatter;
        self
    }

    /// Largest distance from a sample that a dab may reach, in pixels.
    ///
    /// Accounts for size jitter and scatter, plus one pixel of antialiasing.
    #[must_use]
    pub fn reach(&self) -> f32 {
        let radius = self.size.max(0.0) * 0.5 * (1.0 + self.size_jitter.max(0.0));
        let scatter = self.size.max(0.0) * self.scatter.max(0.0);
        radius + scatter + 1.0
    }
}

/// One complete gesture, pointer-down to pointer-up.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrokeCommand {
    points: Vec<StrokePoint>,
    brush: BrushSettings,
    start_time: u64,
    random_seed: u32,
}

impl StrokeCommand {
    /// Create a stroke from samples and the brush used to draw them.
    #[must_use]
    pub fn new(points: Vec<StrokePoint>, brush: BrushSettings) -> Self {
        Self {
            points,
            brush,
            start_time: 0,
            random_seed: 0,
        }
    }

    /// Set the absolute start time (ms).
    #[must_use]
    pub fn with_start_time(mut self, start_time: u64) -> Self {
        self.start_time = start_time;
        self
    }

    /// Set the seed used for jitter and scatter.
    #[must_use]
    pub fn with_seed(mut self, random_seed: u32) -> Self {
        self.random_seed = random_seed;
        self
    }

    /// Samples in capture order.
    #[inline]
    pub fn points(&self) -> &[StrokePoint] {
        &self.points
    }

    /// First sample, if any.
    #[inline]
    pub fn first_point(&self) -> Option<StrokePoint> {
        self.points.first().copied()
    }

    /// Brush configuration.
    #[inline]
    pub fn brush(&self) -> &BrushSettings {
        &self.brush
    }

    /// Absolute start time (ms).
    #[inline]
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Seed for deterministic randomness.
    #[inline]
    pub fn seed(&self) -> u32 {
        self.random_seed
    }

    /// True when the stroke has no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of samples.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Pixels this stroke may touch on a canvas of the given size.
    ///
    /// The sample bounding box inflated by [`BrushSettings::reach`], clipped
    /// to the canvas.
    #[must_use]
    pub fn footprint(&self, canvas: Size) -> Rect {
        if self.points.is_empty() {
            return Rect::default();
        }
        let reach = self.brush.reach();
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect::from_f32_clipped(min_x - reach, min_y - reach, max_x + reach, max_y + reach, canvas)
    }

    /// Size in bytes for memory accounting.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        mem::size_of::<Self>() + self.points.capacity() * mem::size_of::<StrokePoint>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(y: f32, brush: BrushSettings) -> StrokeCommand {
        let points = (0..5)
            .map(|i| StrokePoint::new(10.0 + i as f32 * 10.0, y, 1.0, i * 16))
            .collect();
        StrokeCommand::new(points, brush)
    }

    #[test]
    fn defaults_match_crayon_brush() {
        let brush = BrushSettings::default();
        assert_eq!(brush.kind, BrushKind::Crayon);
        assert_eq!(brush.size, 20.0);
        assert!(brush.flags.contains(BrushFlags::GRAIN_MOVING));
        assert!(!brush.flags.contains(BrushFlags::SHAPE_INVERTED));
    }

    #[test]
    fn footprint_inflates_by_reach() {
        let stroke = line(100.0, BrushSettings::round(8.0, Rgba::BLACK));
        // reach = 4 + 0 + 1
        assert_eq!(stroke.footprint(Size::new(200, 200)), Rect::new(5, 95, 50, 10));
    }

    #[test]
    fn footprint_grows_with_scatter() {
        let plain = line(100.0, BrushSettings::round(8.0, Rgba::BLACK));
        let scattered = line(100.0, BrushSettings::round(8.0, Rgba::BLACK).with_scatter(1.0));
        let canvas = Size::new(200, 200);
        assert!(scattered.footprint(canvas).contains_rect(&plain.footprint(canvas)));
        assert!(scattered.footprint(canvas).area() > plain.footprint(canvas).area());
    }

    #[test]
    fn footprint_of_empty_stroke_is_empty() {
        let stroke = StrokeCommand::new(Vec::new(), BrushSettings::default());
        assert!(stroke.is_empty());
        assert!(stroke.footprint(Size::new(10, 10)).is_empty());
    }

    #[test]
    fn builder_sets_seed_and_time() {
        let stroke = line(0.0, BrushSettings::default())
            .with_seed(7)
            .with_start_time(1_000);
        assert_eq!(stroke.seed(), 7);
        assert_eq!(stroke.start_time(), 1_000);
        assert_eq!(stroke.point_count(), 5);
        assert_eq!(stroke.first_point().map(|p| p.x), Some(10.0));
    }

    #[test]
    fn size_bytes_counts_samples() {
        let short = line(0.0, BrushSettings::default());
        let empty = StrokeCommand::new(Vec::new(), BrushSettings::default());
        assert!(short.size_bytes() > empty.size_bytes());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let stroke = line(3.0, BrushSettings::default()).with_seed(9);
        let json = serde_json::to_string(&stroke).unwrap();
        let back: StrokeCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stroke);
    }
}
