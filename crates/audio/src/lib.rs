//! Audio duration gating and audio-video sync planning
//!
//! The timing third of the pipeline:
//! - `AudioDurationManager` validates measured audio against the target
//!   duration and derives per-clip video durations (the hard gate)
//! - `SyncPlanner` aligns video clips to beats and voiced spans
//! - WAV measurement, silence padding and energy envelopes underneath

pub mod duration;
pub mod sync;
pub mod wav;

pub use duration::{AudioDurationAnalysis, AudioDurationManager, SegmentInfo};
pub use sync::{
    BeatStrategy, ClipSource, HybridStrategy, SyncPlan, SyncPlanner, SyncPoint, SyncPointKind,
    SyncStrategy, VoiceStrategy,
};
pub use wav::{EnergyEnvelope, WavInfo};
