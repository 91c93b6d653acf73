//! Audio duration gate
//!
//! Measures produced audio segments against the target video duration
//! and decides whether the pipeline may continue. Re-running speech is
//! orders of magnitude cheaper than rebuilding the full asset, so the
//! gate sits directly before video generation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vidforge_config::AudioSettings;
use vidforge_core::Result;

use crate::wav;

/// Per-segment measurement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub index: usize,
    pub file: String,
    pub duration: f64,
    pub is_too_short: bool,
    pub is_too_long: bool,
    pub quality_issues: Vec<String>,
}

/// Full gate verdict; a pure function of the measured inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDurationAnalysis {
    pub total_duration: f64,
    pub target_duration: f64,
    pub segment_durations: Vec<f64>,
    pub is_within_tolerance: bool,
    pub tolerance_percent: f64,
    pub duration_difference: f64,
    pub duration_ratio: f64,
    pub quality_score: f64,
    pub must_regenerate: bool,
    pub segments_info: Vec<SegmentInfo>,
    pub recommendation: String,
}

/// Duration gate configured from the audio settings block
pub struct AudioDurationManager {
    settings: AudioSettings,
}

impl AudioDurationManager {
    pub fn new(settings: AudioSettings) -> Self {
        tracing::debug!(
            tolerance = settings.tolerance_percent,
            min = settings.min_segment_duration,
            max = settings.max_segment_duration,
            padding = settings.padding_between_segments,
            "audio duration manager configured"
        );
        Self { settings }
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    /// Measure audio files and validate the total against the target.
    ///
    /// Unreadable files are logged and skipped, matching the lenient
    /// posture of the gate: a short total fails the tolerance check
    /// anyway.
    pub fn analyze(&self, audio_files: &[PathBuf], target_duration: f64) -> AudioDurationAnalysis {
        let mut segments_info = Vec::new();
        let mut segment_durations = Vec::new();
        let mut total_duration = 0.0f64;

        for (index, file) in audio_files.iter().enumerate() {
            let duration = match wav::duration(file) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "skipping unreadable audio segment");
                    continue;
                }
            };

            let is_too_short = duration < self.settings.min_segment_duration;
            let is_too_long = duration > self.settings.max_segment_duration;
            let mut quality_issues = Vec::new();
            if is_too_short {
                quality_issues.push(format!(
                    "too short ({duration:.1}s < {}s)",
                    self.settings.min_segment_duration
                ));
            }
            if is_too_long {
                quality_issues.push(format!(
                    "too long ({duration:.1}s > {}s)",
                    self.settings.max_segment_duration
                ));
            }

            segments_info.push(SegmentInfo {
                index,
                file: file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                duration,
                is_too_short,
                is_too_long,
                quality_issues,
            });
            segment_durations.push(duration);
            total_duration += duration;
        }

        // Inserted silence counts toward the total
        if segment_durations.len() > 1 {
            total_duration +=
                self.settings.padding_between_segments * (segment_durations.len() - 1) as f64;
        }

        let tolerance_range = target_duration * (self.settings.tolerance_percent / 100.0);
        let is_within_tolerance = (total_duration - target_duration).abs() <= tolerance_range;
        let duration_difference = total_duration - target_duration;
        let duration_ratio = if target_duration > 0.0 {
            total_duration / target_duration
        } else {
            0.0
        };

        let quality_issue_count: usize =
            segments_info.iter().map(|s| s.quality_issues.len()).sum();
        let duration_penalty = if target_duration > 0.0 {
            duration_difference.abs() / target_duration
        } else {
            1.0
        };
        let quality_score =
            (1.0 - (quality_issue_count as f64 * 0.1 + duration_penalty)).max(0.0);

        let must_regenerate = !is_within_tolerance
            || duration_ratio < 0.8
            || duration_ratio > 1.2
            || quality_score < 0.6;

        let recommendation = if is_within_tolerance && quality_score >= 0.8 {
            "audio duration is optimal, proceed with video generation".to_string()
        } else if must_regenerate {
            if total_duration < target_duration - tolerance_range {
                format!(
                    "audio is {:.1}s too short, regenerate with slower speech or more content",
                    duration_difference.abs()
                )
            } else if total_duration > target_duration + tolerance_range {
                format!(
                    "audio is {:.1}s too long, regenerate with faster speech or less content",
                    duration_difference.abs()
                )
            } else {
                format!("audio has quality issues (score {quality_score:.2}), regenerate")
            }
        } else {
            format!("audio duration acceptable but could be improved ({duration_difference:+.1}s)")
        };

        tracing::info!(
            total = total_duration,
            target = target_duration,
            within_tolerance = is_within_tolerance,
            quality = quality_score,
            must_regenerate,
            "audio duration analysis"
        );

        AudioDurationAnalysis {
            total_duration,
            target_duration,
            segment_durations,
            is_within_tolerance,
            tolerance_percent: self.settings.tolerance_percent,
            duration_difference,
            duration_ratio,
            quality_score,
            must_regenerate,
            segments_info,
            recommendation,
        }
    }

    /// Gate check before video generation. With `block_on_failure` the
    /// driver must loop back to script and speech regeneration when the
    /// analysis demands it.
    pub fn validate_before_video_generation(
        &self,
        audio_files: &[PathBuf],
        target_duration: f64,
        block_on_failure: bool,
    ) -> (bool, AudioDurationAnalysis) {
        let analysis = self.analyze(audio_files, target_duration);
        let can_proceed = !analysis.must_regenerate || !block_on_failure;

        if !can_proceed {
            tracing::error!(
                recommendation = %analysis.recommendation,
                "audio duration gate blocked video generation"
            );
        } else if analysis.must_regenerate {
            tracing::warn!(
                recommendation = %analysis.recommendation,
                "audio duration issues detected but proceeding"
            );
        }
        (can_proceed, analysis)
    }

    /// Derive per-clip video durations from the measured audio.
    ///
    /// When the segment count matches the clip count the measured
    /// durations are used directly. Otherwise the total is distributed
    /// with ±10% jitter, bounds enforced, and rounding absorbed into
    /// the last clip (rebalancing when that pushes it under the
    /// minimum). Deterministic for a given RNG seed.
    pub fn calculate_dynamic_clip_durations<R: Rng>(
        &self,
        analysis: &AudioDurationAnalysis,
        num_clips: usize,
        rng: &mut R,
    ) -> Vec<f64> {
        if num_clips == 0 {
            return Vec::new();
        }
        if analysis.segment_durations.len() == num_clips {
            return analysis.segment_durations.clone();
        }

        let total = analysis.total_duration;
        let base = total / num_clips as f64;
        let mut durations: Vec<f64> = (0..num_clips)
            .map(|_| {
                let jitter = rng.gen_range(0.9..1.1);
                (base * jitter).clamp(
                    self.settings.min_segment_duration,
                    self.settings.max_segment_duration,
                )
            })
            .collect();

        // Absorb rounding into the last clip
        let head: f64 = durations[..num_clips - 1].iter().sum();
        durations[num_clips - 1] = total - head;

        if durations[num_clips - 1] < self.settings.min_segment_duration && num_clips > 1 {
            let shortage = self.settings.min_segment_duration - durations[num_clips - 1];
            let share = shortage / (num_clips - 1) as f64;
            for d in &mut durations[..num_clips - 1] {
                *d -= share;
            }
            durations[num_clips - 1] = self.settings.min_segment_duration;
        }

        tracing::debug!(?durations, total, "dynamic clip durations");
        durations
    }

    /// Append the configured inter-segment silence after every segment
    /// except the last, writing padded copies into `output_dir`.
    pub fn add_padding_between_segments(
        &self,
        audio_files: &[PathBuf],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        if audio_files.len() <= 1 || self.settings.padding_between_segments <= 0.0 {
            return Ok(audio_files.to_vec());
        }
        std::fs::create_dir_all(output_dir)?;

        let mut padded = Vec::with_capacity(audio_files.len());
        for (i, file) in audio_files.iter().enumerate() {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("segment_{i}.wav"));
            let dst = output_dir.join(format!("padded_{name}"));

            let silence = if i < audio_files.len() - 1 {
                self.settings.padding_between_segments
            } else {
                0.0
            };
            wav::append_silence(file, &dst, silence)?;
            padded.push(dst);
        }
        Ok(padded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::testutil::tmp_wav;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn manager() -> AudioDurationManager {
        AudioDurationManager::new(AudioSettings::default())
    }

    fn analysis_for(durations: &[f64], target: f64) -> AudioDurationAnalysis {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = durations
            .iter()
            .enumerate()
            .map(|(i, &d)| tmp_wav(&dir, &format!("seg_{i}.wav"), d))
            .collect();
        manager().analyze(&files, target)
    }

    #[test]
    fn within_tolerance_passes() {
        // 4 x 7.2s + 3 x 0.3s padding = 29.7s against a 30s target
        let analysis = analysis_for(&[7.2, 7.2, 7.2, 7.2], 30.0);
        assert!(analysis.is_within_tolerance);
        assert!(!analysis.must_regenerate);
        assert!((analysis.total_duration - 29.7).abs() < 0.05);
        assert_eq!(analysis.segment_durations.len(), 4);
    }

    #[test]
    fn tolerance_definition_holds() {
        let analysis = analysis_for(&[7.2, 7.2, 7.2, 7.2], 30.0);
        let band = 30.0 * analysis.tolerance_percent / 100.0;
        assert_eq!(
            analysis.is_within_tolerance,
            (analysis.total_duration - 30.0).abs() <= band
        );
    }

    #[test]
    fn overrun_forces_regeneration() {
        // ~40s of audio against a 15s target
        let analysis = analysis_for(&[8.0, 8.0, 8.0, 8.0, 8.0], 15.0);
        assert!(!analysis.is_within_tolerance);
        assert!(analysis.must_regenerate);
        assert!(analysis.duration_ratio > 1.2);
        assert!(analysis.recommendation.contains("too long"));
    }

    #[test]
    fn short_segments_hurt_quality() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            tmp_wav(&dir, "a.wav", 0.4),
            tmp_wav(&dir, "b.wav", 0.4),
            tmp_wav(&dir, "c.wav", 0.4),
        ];
        let analysis = manager().analyze(&files, 2.0);
        assert!(analysis.segments_info.iter().all(|s| s.is_too_short));
        assert!(analysis.quality_score < 0.8);
        assert!(analysis.must_regenerate);
    }

    #[test]
    fn quality_score_formula() {
        let analysis = analysis_for(&[7.2, 7.2, 7.2, 7.2], 30.0);
        let expected = (1.0 - (30.0 - analysis.total_duration).abs() / 30.0).max(0.0);
        assert!((analysis.quality_score - expected).abs() < 1e-9);
    }

    #[test]
    fn missing_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            tmp_wav(&dir, "a.wav", 2.0),
            dir.path().join("missing.wav"),
        ];
        let analysis = manager().analyze(&files, 2.0);
        assert_eq!(analysis.segment_durations.len(), 1);
    }

    #[test]
    fn gate_blocks_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![tmp_wav(&dir, "a.wav", 5.0)];
        let (can_proceed, analysis) =
            manager().validate_before_video_generation(&files, 30.0, true);
        assert!(!can_proceed);
        assert!(analysis.must_regenerate);

        let (can_proceed, _) = manager().validate_before_video_generation(&files, 30.0, false);
        assert!(can_proceed);
    }

    #[test]
    fn matching_segment_count_uses_measured_durations() {
        let analysis = analysis_for(&[3.0, 4.0, 5.0], 12.0);
        let mut rng = StdRng::seed_from_u64(7);
        let durations = manager().calculate_dynamic_clip_durations(&analysis, 3, &mut rng);
        assert_eq!(durations.len(), 3);
        assert!((durations[0] - 3.0).abs() < 0.05);
        assert!((durations[2] - 5.0).abs() < 0.05);
    }

    #[test]
    fn distribution_is_seed_deterministic_and_sums_to_total() {
        let analysis = analysis_for(&[6.0, 6.0, 6.0], 18.0);
        let m = manager();

        let a = m.calculate_dynamic_clip_durations(&analysis, 4, &mut StdRng::seed_from_u64(42));
        let b = m.calculate_dynamic_clip_durations(&analysis, 4, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);

        let sum: f64 = a.iter().sum();
        assert!((sum - analysis.total_duration).abs() < 1e-6);
        for d in &a[..3] {
            assert!(*d >= 1.0 && *d <= 10.0);
        }
    }

    #[test]
    fn padding_extends_all_but_last() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            tmp_wav(&dir, "a.wav", 1.0),
            tmp_wav(&dir, "b.wav", 1.0),
            tmp_wav(&dir, "c.wav", 1.0),
        ];
        let out = dir.path().join("padded");
        let padded = manager().add_padding_between_segments(&files, &out).unwrap();

        assert_eq!(padded.len(), 3);
        assert!((wav::duration(&padded[0]).unwrap() - 1.3).abs() < 0.01);
        assert!((wav::duration(&padded[1]).unwrap() - 1.3).abs() < 0.01);
        assert!((wav::duration(&padded[2]).unwrap() - 1.0).abs() < 0.01);
    }

    #[test]
    fn single_file_needs_no_padding() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![tmp_wav(&dir, "a.wav", 1.0)];
        let padded = manager()
            .add_padding_between_segments(&files, dir.path())
            .unwrap();
        assert_eq!(padded, files);
    }
}
