//! Audio-video sync planning
//!
//! Builds a timeline of video clips aligned to the audio: beats from
//! energy peaks, voiced spans from the energy floor, or both. The plan
//! carries per-clip durations and speed adjustments; re-encodes are
//! skipped when a clip is already within 10% of its slot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use vidforge_core::{Error, Result};

use crate::wav::{energy_envelope, EnergyEnvelope};

/// Minimum clip duration in the plan, seconds
const MIN_CLIP_DURATION: f64 = 0.5;
/// Speed deviation below which no adjustment is applied
const SPEED_DEADBAND: f64 = 0.1;
/// Clamp range for speed adjustments
const SPEED_RANGE: (f64, f64) = (0.5, 2.0);

/// What a sync point marks in the audio timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPointKind {
    Beat,
    Voice,
    Silence,
    Transition,
}

/// A timestamp at which a video transition is preferred
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPoint {
    pub audio_ts: f64,
    pub video_ts: f64,
    pub kind: SyncPointKind,
    pub confidence: f64,
}

/// A video clip as the planner sees it
#[derive(Debug, Clone)]
pub struct ClipSource {
    pub path: PathBuf,
    /// Current duration when known; `None` means unmeasurable
    pub duration_s: Option<f64>,
}

impl ClipSource {
    pub fn new(path: impl Into<PathBuf>, duration_s: Option<f64>) -> Self {
        Self {
            path: path.into(),
            duration_s,
        }
    }
}

/// Timeline plan aligning clips to the audio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPlan {
    pub clip_durations: Vec<f64>,
    pub sync_points: Vec<SyncPoint>,
    pub overall_score: f64,
    pub beat_score: f64,
    pub voice_score: f64,
    /// Per-clip playback speed; 1.0 means leave the clip alone
    pub speed_adjustments: Vec<f64>,
    pub recommendations: Vec<String>,
}

impl SyncPlan {
    /// Even-distribution plan used when planning fails outright
    pub fn even(num_clips: usize, target_duration: f64) -> Self {
        let per_clip = if num_clips > 0 {
            (target_duration / num_clips as f64).max(MIN_CLIP_DURATION)
        } else {
            0.0
        };
        Self {
            clip_durations: vec![per_clip; num_clips],
            sync_points: Vec::new(),
            overall_score: 0.5,
            beat_score: 0.5,
            voice_score: 0.5,
            speed_adjustments: vec![1.0; num_clips],
            recommendations: vec!["even distribution fallback plan".to_string()],
        }
    }
}

/// Strategy that extracts preferred transition points from the audio
pub trait SyncStrategy: Send + Sync {
    fn points(&self, energy: &EnergyEnvelope) -> Vec<SyncPoint>;
    fn name(&self) -> &'static str;
}

/// Beats from energy peaks: local maxima above mean + stddev
pub struct BeatStrategy;

impl SyncStrategy for BeatStrategy {
    fn points(&self, energy: &EnergyEnvelope) -> Vec<SyncPoint> {
        let threshold = energy.mean() + energy.stddev();
        let frames = &energy.frames;
        let mut points = Vec::new();

        for i in 1..frames.len().saturating_sub(1) {
            if frames[i] > threshold && frames[i] > frames[i - 1] && frames[i] > frames[i + 1] {
                let ts = energy.timestamp(i);
                points.push(SyncPoint {
                    audio_ts: ts,
                    video_ts: ts,
                    kind: SyncPointKind::Beat,
                    confidence: 0.9,
                });
            }
        }
        points
    }

    fn name(&self) -> &'static str {
        "beat"
    }
}

/// Voiced-span starts: energy above a floor, whole clip when nothing
/// crosses it
pub struct VoiceStrategy;

impl SyncStrategy for VoiceStrategy {
    fn points(&self, energy: &EnergyEnvelope) -> Vec<SyncPoint> {
        let floor = (energy.mean() * 0.5).max(1e-4);
        let mut points = Vec::new();
        let mut in_voice = false;

        for (i, &frame) in energy.frames.iter().enumerate() {
            let voiced = frame > floor;
            if voiced && !in_voice {
                let ts = energy.timestamp(i);
                points.push(SyncPoint {
                    audio_ts: ts,
                    video_ts: ts,
                    kind: SyncPointKind::Voice,
                    confidence: 0.85,
                });
            }
            in_voice = voiced;
        }

        if points.is_empty() {
            // Detection found nothing; treat the whole clip as voiced.
            points.push(SyncPoint {
                audio_ts: 0.0,
                video_ts: 0.0,
                kind: SyncPointKind::Voice,
                confidence: 0.85,
            });
        }
        points
    }

    fn name(&self) -> &'static str {
        "voice"
    }
}

/// Union of beat and voice points, sorted by audio timestamp
pub struct HybridStrategy;

impl SyncStrategy for HybridStrategy {
    fn points(&self, energy: &EnergyEnvelope) -> Vec<SyncPoint> {
        let mut points = BeatStrategy.points(energy);
        points.extend(VoiceStrategy.points(energy));
        points.sort_by(|a, b| a.audio_ts.total_cmp(&b.audio_ts));
        points
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}

/// Sync planner over a pluggable strategy
pub struct SyncPlanner {
    strategy: Box<dyn SyncStrategy>,
    max_clip_duration: f64,
}

impl SyncPlanner {
    pub fn new(strategy: Box<dyn SyncStrategy>, max_clip_duration: f64) -> Self {
        Self {
            strategy,
            max_clip_duration,
        }
    }

    pub fn beat(max_clip_duration: f64) -> Self {
        Self::new(Box::new(BeatStrategy), max_clip_duration)
    }

    pub fn voice(max_clip_duration: f64) -> Self {
        Self::new(Box::new(VoiceStrategy), max_clip_duration)
    }

    pub fn hybrid(max_clip_duration: f64) -> Self {
        Self::new(Box::new(HybridStrategy), max_clip_duration)
    }

    /// Build a plan aligning `clips` to the audio timeline.
    ///
    /// Unreadable audio surfaces `SyncFailure`; the driver then falls
    /// back to `SyncPlan::even`. A missing clip only zeroes its own
    /// scoring contribution and keeps speed 1.0.
    pub fn plan(
        &self,
        audio_files: &[PathBuf],
        clips: &[ClipSource],
        target_duration: f64,
    ) -> Result<SyncPlan> {
        let energy = energy_envelope(audio_files)
            .map_err(|e| Error::SyncFailure(format!("audio analysis failed: {e}")))?;
        let total_duration = energy.total_duration();

        let sync_points = self.strategy.points(&energy);
        tracing::debug!(
            strategy = self.strategy.name(),
            points = sync_points.len(),
            total_duration,
            "sync points computed"
        );

        let beat_score = score_for(&sync_points, SyncPointKind::Beat);
        let voice_score = score_for(&sync_points, SyncPointKind::Voice);
        let overall_score = 0.6 * beat_score + 0.4 * voice_score;

        let clip_durations =
            self.clip_durations(&sync_points, clips.len(), total_duration, target_duration);

        let mut recommendations = Vec::new();
        if beat_score < 0.7 {
            recommendations.push("adjust clip transitions to match audio beats".to_string());
        }
        if voice_score < 0.7 {
            recommendations.push("improve voice-to-visual synchronization".to_string());
        }

        let mut speed_adjustments = Vec::with_capacity(clips.len());
        for (i, clip) in clips.iter().enumerate() {
            let slot = clip_durations.get(i).copied().unwrap_or(MIN_CLIP_DURATION);
            let speed = match clip.duration_s {
                Some(current) if current > 0.0 => {
                    let ratio = current / slot;
                    if (ratio - 1.0).abs() > SPEED_DEADBAND {
                        ratio.clamp(SPEED_RANGE.0, SPEED_RANGE.1)
                    } else {
                        1.0
                    }
                }
                _ => {
                    tracing::warn!(clip = %clip.path.display(), "clip unmeasurable, left unchanged");
                    recommendations
                        .push(format!("clip {} could not be measured", clip.path.display()));
                    1.0
                }
            };
            speed_adjustments.push(speed);
        }

        Ok(SyncPlan {
            clip_durations,
            sync_points,
            overall_score,
            beat_score,
            voice_score,
            speed_adjustments,
            recommendations,
        })
    }

    /// Per-clip durations: consecutive sync-point gaps when there are
    /// enough points, even distribution otherwise. The last clip
    /// absorbs the remainder so the total matches the audio.
    fn clip_durations(
        &self,
        sync_points: &[SyncPoint],
        num_clips: usize,
        total_duration: f64,
        target_duration: f64,
    ) -> Vec<f64> {
        if num_clips == 0 {
            return Vec::new();
        }

        if sync_points.len() >= num_clips {
            let mut durations = Vec::with_capacity(num_clips);
            for i in 0..num_clips - 1 {
                let gap = if i + 1 < sync_points.len() {
                    sync_points[i + 1].audio_ts - sync_points[i].audio_ts
                } else {
                    target_duration / num_clips as f64
                };
                durations.push(gap.clamp(MIN_CLIP_DURATION, self.max_clip_duration));
            }
            let head: f64 = durations.iter().sum();
            durations.push((total_duration - head).max(MIN_CLIP_DURATION));
            durations
        } else {
            let per_clip = (target_duration / num_clips as f64).max(MIN_CLIP_DURATION);
            vec![per_clip; num_clips]
        }
    }
}

fn score_for(points: &[SyncPoint], kind: SyncPointKind) -> f64 {
    let confidences: Vec<f64> = points
        .iter()
        .filter(|p| p.kind == kind)
        .map(|p| p.confidence)
        .collect();
    if confidences.is_empty() {
        return 0.5;
    }
    (confidences.iter().sum::<f64>() / confidences.len() as f64).clamp(0.0, 1.0)
}
