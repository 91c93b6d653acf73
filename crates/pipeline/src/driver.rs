//! Pipeline driver
//!
//! Sequences the session workflow: mission parse, script processing,
//! speech fan-out, the duration gate (with bounded regeneration),
//! image and video fan-out, padding and audio assembly, sync planning,
//! overlay validation, and final composition.
//!
//! Fan-out stages run under a bounded in-flight window and preserve
//! input order; the duration gate is the sole barrier before video
//! work starts.

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

use vidforge_audio::{
    wav, AudioDurationAnalysis, AudioDurationManager, ClipSource, SyncPlan, SyncPlanner,
};
use vidforge_config::Settings;
use vidforge_core::{
    Error, ImageRequest, Language, Platform, Result, SpeechRequest, VideoRequest,
};
use vidforge_script::{
    MissionParser, ParsedMission, ProcessedScript, ScriptProcessor, SubtitleStyle, TextValidator,
    ValidationContext,
};
use vidforge_services::FallbackOrchestrator;

use crate::compositor::{CompositionRequest, Compositor, Overlay};
use crate::metadata::SessionMetadata;
use crate::session::SessionContext;

/// Final state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Completed,
    Failed,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    pub session_id: String,
    pub status: SessionStatus,
    pub asset_path: Option<PathBuf>,
    pub analysis: Option<AudioDurationAnalysis>,
    /// Completed but without meeting every duration/quality invariant
    pub degraded: bool,
    /// Human-readable gate recommendation on degraded runs
    pub recommendation: Option<String>,
    /// Machine-readable failure reason, e.g. "image:policy"
    pub reason: Option<String>,
    /// Stage that failed, e.g. "image-generation"
    pub stage: Option<String>,
}

/// Session-scoped pipeline driver
pub struct PipelineDriver {
    orchestrator: Arc<FallbackOrchestrator>,
    parser: MissionParser,
    processor: ScriptProcessor,
    durations: AudioDurationManager,
    validator: TextValidator,
    compositor: Arc<dyn Compositor>,
    settings: Settings,
}

impl PipelineDriver {
    pub fn new(
        orchestrator: Arc<FallbackOrchestrator>,
        compositor: Arc<dyn Compositor>,
        settings: Settings,
    ) -> Self {
        Self {
            parser: MissionParser::new(Arc::clone(&orchestrator)),
            processor: ScriptProcessor::new(Arc::clone(&orchestrator)),
            durations: AudioDurationManager::new(settings.audio.clone()),
            validator: TextValidator::new(),
            orchestrator,
            compositor,
            settings,
        }
    }

    /// Run the full pipeline for a mission, creating a fresh session.
    pub async fn run_pipeline(
        &self,
        mission: &str,
        language: Language,
        platform: Platform,
        target_duration: f64,
    ) -> SessionResult {
        let session = match SessionContext::new(
            &self.settings.output_root,
            language,
            platform,
            target_duration,
        ) {
            Ok(session) => session,
            Err(e) => {
                return SessionResult {
                    session_id: String::new(),
                    status: SessionStatus::Failed,
                    asset_path: None,
                    analysis: None,
                    degraded: false,
                    recommendation: None,
                    reason: Some(format!("session:init ({e})")),
                    stage: Some("session-init".to_string()),
                }
            }
        };
        self.run_in_session(&session, mission).await
    }

    /// Run the pipeline inside an existing session context. Exposed so
    /// callers can hold the cancel handle.
    pub async fn run_in_session(&self, session: &SessionContext, mission: &str) -> SessionResult {
        let target = session.target_duration;

        // Mission parse never fails; it degrades through its fallbacks.
        let parsed = self
            .parser
            .parse(mission, Some(session.platform), None)
            .await;

        // Script + speech + duration gate, with a bounded regeneration
        // loop that rescales the duration budget by the measured error.
        let mut effective_target = target;
        let mut attempt = 0u32;
        let (script, audio_paths, analysis, degraded) = loop {
            if session.is_cancelled() {
                return self.fail(session, "script-processing", "script", &cancelled());
            }

            let script = self
                .processor
                .process(&parsed.script_content, session.language, effective_target)
                .await;
            if script.segments.is_empty() {
                return self.fail(
                    session,
                    "script-processing",
                    "script",
                    &Error::InvalidRequest("no script segments produced".to_string()),
                );
            }

            let audio_paths = match self.generate_speech(session, &script).await {
                Ok(paths) => paths,
                Err(e) => return self.fail(session, "speech-generation", "speech", &e),
            };

            let (can_proceed, analysis) = self.durations.validate_before_video_generation(
                &audio_paths,
                target,
                self.settings.driver.block_on_duration_failure,
            );
            let _ = can_proceed;

            if !analysis.must_regenerate {
                break (script, audio_paths, analysis, false);
            }
            if attempt >= self.settings.driver.regeneration_retries {
                tracing::warn!(
                    session_id = %session.session_id,
                    "duration retries exhausted, proceeding degraded"
                );
                break (script, audio_paths, analysis, true);
            }
            attempt += 1;
            if analysis.total_duration > 0.0 {
                let scale = target / analysis.total_duration;
                effective_target = (effective_target * scale).clamp(target * 0.5, target * 1.5);
            }
            tracing::info!(
                session_id = %session.session_id,
                attempt,
                effective_target,
                "regenerating script for duration"
            );
        };

        // Per-clip durations derive from the measured audio; the jitter
        // RNG is seeded from the session id so re-runs are stable.
        let n_clips = self
            .settings
            .driver
            .clips_per_video
            .unwrap_or(script.segments.len())
            .max(1);
        let mut rng = StdRng::seed_from_u64(seed_from(&session.session_id));
        let clip_durations = self
            .durations
            .calculate_dynamic_clip_durations(&analysis, n_clips, &mut rng);

        if let Err(e) = self.generate_images(session, &parsed, &script, n_clips).await {
            return self.fail(session, "image-generation", "image", &e);
        }

        let video_paths = match self
            .generate_videos(session, &parsed, &script, &clip_durations)
            .await
        {
            Ok(paths) => paths,
            Err(e) => return self.fail(session, "video-generation", "video", &e),
        };

        // One combined audio stream for the compositor, padded between
        // segments.
        let audio_path = match self.assemble_audio(session, &audio_paths) {
            Ok(path) => path,
            Err(e) => return self.fail(session, "audio-assembly", "audio", &e),
        };

        // Sync planning is non-fatal: an even-distribution plan stands in.
        let clips: Vec<ClipSource> = video_paths
            .iter()
            .zip(clip_durations.iter())
            .map(|(path, &duration)| ClipSource::new(path.clone(), Some(duration)))
            .collect();
        let planner = SyncPlanner::hybrid(self.settings.audio.max_segment_duration);
        let plan = match planner.plan(&[audio_path.clone()], &clips, target) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "sync planning failed, using even distribution");
                SyncPlan::even(n_clips, target)
            }
        };

        let overlays = self.build_overlays(session, &script, &analysis);

        if session.is_cancelled() {
            return self.fail(session, "composition", "compositor", &cancelled());
        }
        let request = CompositionRequest {
            video_paths,
            audio_path,
            overlays,
            plan: plan.clone(),
            output_path: session.final_asset_path(),
        };
        let asset_path = match self.compositor.compose(request).await {
            Ok(path) => path,
            Err(e) => return self.fail(session, "composition", "compositor", &e),
        };

        let metadata = SessionMetadata {
            session_id: session.session_id.clone(),
            parsed_mission: parsed,
            processed_script: script,
            audio_analysis: analysis.clone(),
            sync_plan: plan,
        };
        if let Err(e) = metadata.write(&session.metadata_path()) {
            tracing::warn!(error = %e, "failed to write session metadata");
        }

        tracing::info!(
            session_id = %session.session_id,
            asset = %asset_path.display(),
            degraded,
            "session completed"
        );
        SessionResult {
            session_id: session.session_id.clone(),
            status: SessionStatus::Completed,
            asset_path: Some(asset_path),
            recommendation: degraded.then(|| analysis.recommendation.clone()),
            analysis: Some(analysis),
            degraded,
            reason: None,
            stage: None,
        }
    }

    /// Speech fan-out: one request per segment, bounded in-flight
    /// window, audio order equals segment order.
    async fn generate_speech(
        &self,
        session: &SessionContext,
        script: &ProcessedScript,
    ) -> Result<Vec<PathBuf>> {
        let semaphore = Arc::new(Semaphore::new(self.settings.driver.max_in_flight));
        let futures = script.segments.iter().enumerate().map(|(i, segment)| {
            let semaphore = Arc::clone(&semaphore);
            let request = SpeechRequest::new(segment.text.clone(), session.language)
                .with_output_path(session.audio_segment_path(i));
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| Error::transient("driver", "semaphore closed"))?;
                self.orchestrator.generate_speech(request).await
            }
        });

        let results = self.with_cancellation(session, join_all(futures)).await?;
        let mut paths = Vec::with_capacity(results.len());
        for result in results {
            paths.push(result?.audio_path);
        }
        Ok(paths)
    }

    /// Image fan-out: one keyframe per clip, prompts taken from the
    /// visual instructions with the spoken text as fallback.
    async fn generate_images(
        &self,
        session: &SessionContext,
        parsed: &ParsedMission,
        script: &ProcessedScript,
        n_clips: usize,
    ) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.settings.driver.max_in_flight));
        let futures = (0..n_clips).map(|i| {
            let semaphore = Arc::clone(&semaphore);
            let mut request = ImageRequest::new(self.visual_prompt(parsed, script, i))
                .with_aspect_ratio(session.platform.aspect_ratio())
                .with_output_dir(session.images_dir());
            if !parsed.style_notes.is_empty() {
                request = request.with_style(parsed.style_notes.clone());
            }
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| Error::transient("driver", "semaphore closed"))?;
                self.orchestrator.generate_image(request).await
            }
        });

        let results = self.with_cancellation(session, join_all(futures)).await?;
        for (i, result) in results.into_iter().enumerate() {
            let response = result?;
            // Providers pick their own file names; the session layout
            // wants stable per-index paths.
            if let Some(src) = response.first_image() {
                let stable = session.image_path(i);
                if *src != stable && src.exists() {
                    std::fs::rename(src, &stable)?;
                }
            }
        }
        Ok(())
    }

    /// Video fan-out: one clip per slot with its own measured duration.
    async fn generate_videos(
        &self,
        session: &SessionContext,
        parsed: &ParsedMission,
        script: &ProcessedScript,
        clip_durations: &[f64],
    ) -> Result<Vec<PathBuf>> {
        let semaphore = Arc::new(Semaphore::new(self.settings.driver.max_in_flight));
        let futures = clip_durations.iter().enumerate().map(|(i, &duration)| {
            let semaphore = Arc::clone(&semaphore);
            let mut request = VideoRequest::new(self.visual_prompt(parsed, script, i), duration)
                .with_aspect_ratio(session.platform.aspect_ratio())
                .with_output_path(session.clip_path(i));
            if !parsed.style_notes.is_empty() {
                request = request.with_style(parsed.style_notes.clone());
            }
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| Error::transient("driver", "semaphore closed"))?;
                self.orchestrator.generate_video(request).await
            }
        });

        let results = self.with_cancellation(session, join_all(futures)).await?;
        let mut paths = Vec::with_capacity(results.len());
        for (i, result) in results.into_iter().enumerate() {
            let response = result?;
            let produced = response.video_path.ok_or_else(|| {
                Error::AssetCorrupt(format!("clip {i} completed without an artifact"))
            })?;
            let stable = session.clip_path(i);
            if produced != stable && produced.exists() {
                std::fs::rename(&produced, &stable)?;
                paths.push(stable);
            } else {
                paths.push(produced);
            }
        }
        Ok(paths)
    }

    /// Prompt for clip `i`: its visual instruction, else its spoken
    /// sentence, else the mission itself.
    fn visual_prompt(&self, parsed: &ParsedMission, script: &ProcessedScript, i: usize) -> String {
        parsed
            .visual_instructions
            .get(i)
            .cloned()
            .or_else(|| script.segments.get(i).map(|s| s.text.clone()))
            .unwrap_or_else(|| parsed.original_mission.clone())
    }

    /// Pad between segments and concatenate into one stream.
    fn assemble_audio(
        &self,
        session: &SessionContext,
        audio_paths: &[PathBuf],
    ) -> Result<PathBuf> {
        let padded = self
            .durations
            .add_padding_between_segments(audio_paths, &session.audio_dir().join("padded"))?;
        let combined = session.combined_audio_path();
        wav::concatenate(&padded, &combined)?;
        Ok(combined)
    }

    /// Validate every subtitle text and time it against the measured
    /// segment durations.
    fn build_overlays(
        &self,
        session: &SessionContext,
        script: &ProcessedScript,
        analysis: &AudioDurationAnalysis,
    ) -> Vec<Overlay> {
        let padding = self.settings.audio.padding_between_segments;
        let mut overlays = Vec::new();
        let mut cursor = 0.0f64;

        for (i, segment) in script.segments.iter().enumerate() {
            let duration = analysis
                .segment_durations
                .get(i)
                .copied()
                .unwrap_or(segment.duration);
            let validation = self.validator.validate(
                &segment.text,
                ValidationContext::Subtitle,
                session.platform,
                Some(session.language),
            );
            if !validation.cleaned.is_empty() {
                overlays.push(Overlay {
                    text: validation.cleaned,
                    style: SubtitleStyle::for_text(validation.is_rtl),
                    start_s: cursor,
                    end_s: cursor + duration,
                });
            }
            cursor += duration + padding;
        }
        overlays
    }

    /// Race a stage against session cancellation.
    async fn with_cancellation<T>(
        &self,
        session: &SessionContext,
        fut: impl Future<Output = T>,
    ) -> Result<T> {
        let mut cancel = session.cancel_receiver();
        if *cancel.borrow() {
            return Err(cancelled());
        }
        tokio::select! {
            out = fut => Ok(out),
            _ = cancel.changed() => Err(cancelled()),
        }
    }

    /// Build a failure result; cancelled sessions also lose their
    /// partial artifacts.
    fn fail(
        &self,
        session: &SessionContext,
        stage: &str,
        kind: &str,
        error: &Error,
    ) -> SessionResult {
        let reason = if session.is_cancelled() {
            session.remove_artifacts();
            "cancelled".to_string()
        } else {
            failure_reason(kind, error)
        };
        tracing::error!(
            session_id = %session.session_id,
            stage,
            reason = %reason,
            error = %error,
            "session failed"
        );
        SessionResult {
            session_id: session.session_id.clone(),
            status: SessionStatus::Failed,
            asset_path: None,
            analysis: None,
            degraded: false,
            recommendation: None,
            reason: Some(reason),
            stage: Some(stage.to_string()),
        }
    }
}

fn cancelled() -> Error {
    Error::InvalidRequest("session cancelled".to_string())
}

/// Map an error to the machine-readable `kind:cause` reason
fn failure_reason(kind: &str, error: &Error) -> String {
    match error {
        Error::AllRefused { .. } => format!("{kind}:policy"),
        Error::AllFailed { .. } => format!("{kind}:unavailable"),
        Error::ConfigMissing(_) | Error::NoProvider { .. } => format!("{kind}:config"),
        Error::AssetCorrupt(_) | Error::Io(_) => format!("{kind}:corrupt"),
        Error::DurationMismatch(_) => format!("{kind}:duration"),
        _ => format!("{kind}:failed"),
    }
}

fn seed_from(session_id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    session_id.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reasons_are_machine_readable() {
        assert_eq!(
            failure_reason("image", &Error::AllRefused { operation: "x".into() }),
            "image:policy"
        );
        let all_failed = Error::AllFailed {
            operation: "synthesize".into(),
            source: Box::new(Error::transient("a", "503")),
        };
        assert_eq!(failure_reason("speech", &all_failed), "speech:unavailable");
        assert_eq!(
            failure_reason("video", &Error::AssetCorrupt("gone".into())),
            "video:corrupt"
        );
    }

    #[test]
    fn seed_is_stable_per_session() {
        assert_eq!(seed_from("abc"), seed_from("abc"));
        assert_ne!(seed_from("abc"), seed_from("abd"));
    }
}
