#![forbid(unsafe_code)]

//! In-memory frame store.

use std::collections::BTreeMap;

use inkcel_core::{Canvas, CanvasError, FrameStore, PixelBuffer};

/// Keeps each context's pixels in a map keyed by context index.
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameStore {
    frames: BTreeMap<usize, PixelBuffer>,
    saves: u64,
    loads: u64,
}

impl MemoryFrameStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether pixels are stored for `context`.
    pub fn contains(&self, context: usize) -> bool {
        self.frames.contains_key(&context)
    }

    /// Stored pixels for `context`.
    pub fn get(&self, context: usize) -> Option<&PixelBuffer> {
        self.frames.get(&context)
    }

    /// Number of stored frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `(saves, loads)` performed so far. Loads of missing frames count.
    pub fn traffic(&self) -> (u64, u64) {
        (self.saves, self.loads)
    }
}

impl<C: Canvas + ?Sized> FrameStore<C> for MemoryFrameStore {
    fn save(&mut self, context: usize, canvas: &mut C) -> Result<(), CanvasError> {
        let pixels = canvas.capture_full()?;
        self.frames.insert(context, pixels);
        self.saves += 1;
        Ok(())
    }

    fn load(&mut self, context: usize, canvas: &mut C) -> Result<bool, CanvasError> {
        self.loads += 1;
        match self.frames.get(&context) {
            Some(pixels) => {
                canvas.restore_full(pixels)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn discard(&mut self, context: usize) {
        self.frames.remove(&context);
    }
}
