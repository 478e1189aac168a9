#![forbid(unsafe_code)]

//! Re-issuing recorded strokes to the brush renderer.
//!
//! Replay never touches snapshots. It only drives the renderer, which must be
//! a pure function of (canvas before, stroke, settings, seed) for a restored
//! checkpoint plus replay to reproduce live pixels exactly.

use inkcel_core::{BrushError, BrushRenderer, StrokeCommand};

/// Render one stroke: `begin` on the first sample, `add_point` for the rest,
/// then `end`.
///
/// An empty stroke renders nothing.
pub fn apply_stroke<C, B>(canvas: &mut C, brush: &mut B, stroke: &StrokeCommand) -> Result<(), BrushError>
where
    C: ?Sized,
    B: BrushRenderer<C> + ?Sized,
{
    let Some((first, rest)) = stroke.points().split_first() else {
        return Ok(());
    };
    brush.begin(canvas, *first, stroke.brush(), stroke.seed())?;
    for point in rest {
        brush.add_point(canvas, *point)?;
    }
    brush.end(canvas)
}

/// Render `strokes` in order. Returns the number of strokes replayed.
///
/// Stops at the first failure; the canvas is then partially drawn and the
/// caller is responsible for restoring it.
pub fn replay_path<'a, C, B, I>(canvas: &mut C, brush: &mut B, strokes: I) -> Result<usize, BrushError>
where
    C: ?Sized,
    B: BrushRenderer<C> + ?Sized,
    I: IntoIterator<Item = &'a StrokeCommand>,
{
    let mut replayed = 0;
    for stroke in strokes {
        apply_stroke(canvas, brush, stroke)?;
        replayed += 1;
    }
    Ok(replayed)
}
