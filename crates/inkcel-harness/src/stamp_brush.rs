#![forbid(unsafe_code)]

//! Deterministic reference brush.
//!
//! [`StampBrush`] stamps anti-alias-free discs along the stroke path. Every
//! random choice (size jitter, scatter) comes from a xorshift generator
//! seeded by the stroke, so replaying a stroke on the same pixels always
//! yields the same pixels. Dabs never leave [`StrokeCommand::footprint`].

use inkcel_core::{BrushError, BrushRenderer, BrushSettings, Rect, Size, StrokeCommand, StrokePoint};

use crate::soft_canvas::SoftCanvas;

/// xorshift32 with a non-zero state.
#[derive(Debug, Clone, Copy)]
struct XorShift32(u32);

impl XorShift32 {
    fn new(seed: u32) -> Self {
        let state = seed ^ 0x9E37_79B9;
        Self(if state == 0 { 1 } else { state })
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }
}

#[derive(Debug, Clone)]
struct ActiveStroke {
    settings: BrushSettings,
    rng: XorShift32,
    last: StrokePoint,
    /// Distance walked since the last dab.
    carry: f32,
}

/// Stamps discs of the brush colour onto a [`SoftCanvas`].
#[derive(Debug, Clone, Default)]
pub struct StampBrush {
    active: Option<ActiveStroke>,
    dabs: u64,
}

impl StampBrush {
    /// Create an idle brush.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dabs stamped since creation.
    #[inline]
    pub fn dab_count(&self) -> u64 {
        self.dabs
    }

    /// True while a stroke is in progress.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn stamp(&mut self, canvas: &mut SoftCanvas, point: StrokePoint) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let s = &active.settings;
        let size = s.size.max(0.0);
        let pressure = point.pressure.clamp(0.0, 1.0);

        let pressure_scale = 1.0 - s.size_pressure.clamp(0.0, 1.0) * (1.0 - pressure);
        let jitter = 1.0 + s.size_jitter.max(0.0) * active.rng.unit();
        let radius = (size * 0.5 * pressure_scale * jitter).max(0.5);

        let spread = size * s.scatter.max(0.0);
        let cx = point.x + spread * (active.rng.unit() * 2.0 - 1.0);
        let cy = point.y + spread * (active.rng.unit() * 2.0 - 1.0);

        let opacity_scale = 1.0 - s.opacity_pressure.clamp(0.0, 1.0) * (1.0 - pressure);
        let alpha = (s.opacity * s.flow * opacity_scale).clamp(0.0, 1.0);
        let a = (alpha * 255.0).round() as u32;
        if a == 0 {
            return;
        }
        let src = s.color.to_rgba8();

        let size_px = canvas.pixels().size();
        let x0 = (cx - radius).floor().max(0.0) as u32;
        let y0 = (cy - radius).floor().max(0.0) as u32;
        let x1 = ((cx + radius).ceil().max(0.0) as u32).min(size_px.width);
        let y1 = ((cy + radius).ceil().max(0.0) as u32).min(size_px.height);
        let r2 = radius * radius;

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy > r2 {
                    continue;
                }
                let Some(dst) = canvas.pixel(x, y) else { continue };
                let out: [u8; 4] = std::array::from_fn(|i| {
                    ((u32::from(src[i]) * a + u32::from(dst[i]) * (255 - a) + 127) / 255) as u8
                });
                canvas.set_pixel(x, y, out);
            }
        }
        self.dabs += 1;
    }
}

impl BrushRenderer<SoftCanvas> for StampBrush {
    fn begin(
        &mut self,
        canvas: &mut SoftCanvas,
        point: StrokePoint,
        settings: &BrushSettings,
        seed: u32,
    ) -> Result<(), BrushError> {
        self.active = Some(ActiveStroke {
            settings: settings.clone(),
            rng: XorShift32::new(seed),
            last: point,
            carry: 0.0,
        });
        self.stamp(canvas, point);
        Ok(())
    }

    fn add_point(&mut self, canvas: &mut SoftCanvas, point: StrokePoint) -> Result<(), BrushError> {
        let Some(active) = self.active.as_ref() else {
            return Err(BrushError::NotStarted);
        };
        let step = (active.settings.size * active.settings.spacing).max(1.0);
        let from = active.last;
        let (dx, dy) = (point.x - from.x, point.y - from.y);
        let dist = (dx * dx + dy * dy).sqrt();

        let mut walked = step - active.carry;
        while walked <= dist {
            let t = walked / dist;
            let dab = StrokePoint::new(
                from.x + dx * t,
                from.y + dy * t,
                from.pressure + (point.pressure - from.pressure) * t,
                point.t,
            );
            self.stamp(canvas, dab);
            walked += step;
        }

        if let Some(active) = self.active.as_mut() {
            active.carry = dist - (walked - step);
            active.last = point;
        }
        Ok(())
    }

    fn end(&mut self, canvas: &mut SoftCanvas) -> Result<(), BrushError> {
        let Some(active) = self.active.as_ref() else {
            return Err(BrushError::NotStarted);
        };
        let last = active.last;
        // Close the stroke on its final sample.
        if active.carry > 0.0 {
            self.stamp(canvas, last);
        }
        self.active = None;
        Ok(())
    }
}

/// Wraps a brush and fails one call after a countdown.
///
/// Counts every `begin`, `add_point`, and `end` call once armed.
#[derive(Debug, Clone, Default)]
pub struct FlakyBrush<B> {
    inner: B,
    countdown: Option<u32>,
    failures: u32,
}

impl<B> FlakyBrush<B> {
    /// Wrap `inner`, disarmed.
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            countdown: None,
            failures: 0,
        }
    }

    /// Fail the call after `calls` more successful ones.
    pub fn fail_after(&mut self, calls: u32) {
        self.countdown = Some(calls);
    }

    /// Disarm.
    pub fn disarm(&mut self) {
        self.countdown = None;
    }

    /// Failures injected so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Wrapped brush.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn tick(&mut self) -> Result<(), BrushError> {
        match self.countdown {
            Some(0) => {
                self.countdown = None;
                self.failures += 1;
                Err(BrushError::Backend("injected brush fault".into()))
            }
            Some(n) => {
                self.countdown = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<C: ?Sized, B: BrushRenderer<C>> BrushRenderer<C> for FlakyBrush<B> {
    fn begin(
        &mut self,
        canvas: &mut C,
        point: StrokePoint,
        settings: &BrushSettings,
        seed: u32,
    ) -> Result<(), BrushError> {
        self.tick()?;
        self.inner.begin(canvas, point, settings, seed)
    }

    fn add_point(&mut self, canvas: &mut C, point: StrokePoint) -> Result<(), BrushError> {
        self.tick()?;
        self.inner.add_point(canvas, point)
    }

    fn end(&mut self, canvas: &mut C) -> Result<(), BrushError> {
        self.tick()?;
        self.inner.end(canvas)
    }

    fn footprint(&self, stroke: &StrokeCommand, canvas: Size) -> Rect {
        self.inner.footprint(stroke, canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkcel_core::{Canvas, Rgba};

    fn draw(canvas: &mut SoftCanvas, brush: &mut StampBrush, stroke: &StrokeCommand) {
        let (first, rest) = stroke.points().split_first().unwrap();
        brush.begin(canvas, *first, stroke.brush(), stroke.seed()).unwrap();
        for p in rest {
            brush.add_point(canvas, *p).unwrap();
        }
        brush.end(canvas).unwrap();
    }

    fn line(settings: BrushSettings, seed: u32) -> StrokeCommand {
        let points = vec![
            StrokePoint::new(10.0, 20.0, 1.0, 0),
            StrokePoint::new(50.0, 20.0, 0.5, 16),
            StrokePoint::new(50.0, 40.0, 1.0, 32),
        ];
        StrokeCommand::new(points, settings).with_seed(seed)
    }

    #[test]
    fn stamps_inside_footprint_only() {
        let settings = BrushSettings::round(6.0, Rgba::BLACK).with_scatter(0.5);
        let stroke = line(settings, 3);
        let mut canvas = SoftCanvas::new(64, 64);
        let mut brush = StampBrush::new();
        draw(&mut canvas, &mut brush, &stroke);

        let footprint = stroke.footprint(canvas.size());
        let mut painted = 0;
        for y in 0..64 {
            for x in 0..64 {
                if canvas.pixel(x, y) != Some([255, 255, 255, 255]) {
                    painted += 1;
                    assert!(footprint.contains(x, y), "({x},{y}) outside {footprint:?}");
                }
            }
        }
        assert!(painted > 0);
    }

    #[test]
    fn same_seed_same_pixels() {
        let settings = BrushSettings::default().with_scatter(1.0).with_size(8.0);
        let stroke = line(settings, 42);
        let mut a = SoftCanvas::new(64, 64);
        let mut b = SoftCanvas::new(64, 64);
        draw(&mut a, &mut StampBrush::new(), &stroke);
        draw(&mut b, &mut StampBrush::new(), &stroke);
        assert_eq!(a.checksum(), b.checksum());
    }

    #[test]
    fn different_seed_different_pixels() {
        let settings = BrushSettings::default().with_scatter(1.0).with_size(8.0);
        let mut a = SoftCanvas::new(64, 64);
        let mut b = SoftCanvas::new(64, 64);
        draw(&mut a, &mut StampBrush::new(), &line(settings.clone(), 1));
        draw(&mut b, &mut StampBrush::new(), &line(settings, 2));
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn add_point_without_begin_fails() {
        let mut canvas = SoftCanvas::new(4, 4);
        let mut brush = StampBrush::new();
        let err = brush
            .add_point(&mut canvas, StrokePoint::new(1.0, 1.0, 1.0, 0))
            .unwrap_err();
        assert_eq!(err, BrushError::NotStarted);
        assert_eq!(brush.end(&mut canvas), Err(BrushError::NotStarted));
    }

    #[test]
    fn flaky_brush_fails_once() {
        let mut canvas = SoftCanvas::new(16, 16);
        let mut brush = FlakyBrush::new(StampBrush::new());
        brush.fail_after(1);
        let p = StrokePoint::new(4.0, 4.0, 1.0, 0);
        brush
            .begin(&mut canvas, p, &BrushSettings::round(2.0, Rgba::BLACK), 0)
            .unwrap();
        assert!(brush.add_point(&mut canvas, p).is_err());
        assert!(brush.add_point(&mut canvas, p).is_ok());
        assert_eq!(brush.failures(), 1);
    }
}
