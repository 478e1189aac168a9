#![forbid(unsafe_code)]

//! Test harness and reference fixtures for inkcel.
//!
//! # Role in inkcel
//! Supplies software stand-ins for the host collaborators so the undo
//! engine can be exercised without a GPU:
//!
//! - [`SoftCanvas`]: RGBA8 canvas with exact region round-trips and
//!   injectable faults.
//! - [`StampBrush`]: deterministic disc-stamping brush; [`FlakyBrush`]
//!   wraps any brush and fails on demand.
//! - [`MemoryFrameStore`]: per-context pixel storage.
//! - [`fixtures`]: seeded stroke generators.
//! - [`checksum_buffer`]: BLAKE3 golden checksums.
//! - [`JsonlLog`]: structured event log for end-to-end tests.

pub mod checksum;
pub mod fixtures;
pub mod frame_store;
pub mod jsonl;
pub mod soft_canvas;
pub mod stamp_brush;

pub use checksum::checksum_buffer;
pub use fixtures::{FixtureRng, dot, fixture_seed, horizontal_line, random_stroke, stroke_batch};
pub use frame_store::MemoryFrameStore;
pub use jsonl::JsonlLog;
pub use soft_canvas::{BYTES_PER_PIXEL, CanvasOp, SoftCanvas};
pub use stamp_brush::{FlakyBrush, StampBrush};
