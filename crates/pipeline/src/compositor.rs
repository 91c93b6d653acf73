//! Compositor seam
//!
//! Final assembly (ffmpeg or similar) is an external collaborator; the
//! pipeline only defines the contract it composes against.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use vidforge_audio::SyncPlan;
use vidforge_core::Result;
use vidforge_script::SubtitleStyle;

/// One text overlay, timed against the audio timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overlay {
    pub text: String,
    pub style: SubtitleStyle,
    pub start_s: f64,
    pub end_s: f64,
}

/// Everything the compositor needs to produce the final asset
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    /// Video clips in timeline order
    pub video_paths: Vec<PathBuf>,
    /// Single combined audio stream
    pub audio_path: PathBuf,
    /// Validated overlays
    pub overlays: Vec<Overlay>,
    /// Timeline plan with per-clip durations and speeds
    pub plan: SyncPlan,
    /// Where the final MP4 must land
    pub output_path: PathBuf,
}

/// External assembly stage producing the final MP4
#[async_trait]
pub trait Compositor: Send + Sync + 'static {
    async fn compose(&self, request: CompositionRequest) -> Result<PathBuf>;
}
