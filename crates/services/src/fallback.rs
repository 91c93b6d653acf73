//! Fallback orchestrator
//!
//! Executes an operation against a per-kind ordered provider chain
//! until one succeeds. Movement is strictly lateral: a failed provider
//! is never re-entered, and a non-transient error short-circuits the
//! chain. Parallelism lives at the request fan-out level, never inside
//! a single chain walk.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use vidforge_core::{
    Error, ImageRequest, ImageResponse, ProviderId, Result, ServiceKind, SpeechRequest,
    SpeechResponse, TextRequest, TextResponse, VideoRequest, VideoResponse, VideoStatus,
};

use crate::manager::ServiceManager;
use crate::registry::ServiceHandle;

/// Result of a chain walk, annotated with the provider that served it
#[derive(Debug, Clone)]
pub struct FallbackOutcome<T> {
    pub value: T,
    pub provider: ProviderId,
}

/// Per-kind fallback orchestration over the service manager
pub struct FallbackOrchestrator {
    manager: Arc<ServiceManager>,
    overrides: RwLock<HashMap<ServiceKind, Vec<ProviderId>>>,
}

impl FallbackOrchestrator {
    pub fn new(manager: Arc<ServiceManager>) -> Self {
        Self {
            manager,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    pub fn manager(&self) -> &Arc<ServiceManager> {
        &self.manager
    }

    /// Override the configured chain for a kind at runtime.
    /// An empty chain reverts to "default provider only".
    pub fn set_fallback_chain(&self, kind: ServiceKind, providers: Vec<ProviderId>) {
        self.overrides.write().insert(kind, providers);
    }

    /// Effective chain: runtime override, else configuration, else the
    /// default provider alone.
    pub fn chain(&self, kind: ServiceKind) -> Result<Vec<ProviderId>> {
        if let Some(chain) = self.overrides.read().get(&kind) {
            if !chain.is_empty() {
                return Ok(chain.clone());
            }
        }
        self.manager.fallback_chain(kind)
    }

    /// Walk the chain for `kind`, invoking `op` per provider until one
    /// succeeds. Transient and policy errors continue laterally; any
    /// other error short-circuits.
    pub async fn execute_with_fallback<T, F, Fut>(
        &self,
        kind: ServiceKind,
        operation: &str,
        op: F,
    ) -> Result<FallbackOutcome<T>>
    where
        F: Fn(ServiceHandle) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_filtered(kind, operation, |_| true, op).await
    }

    /// Like `execute_with_fallback`, but providers failing `filter` are
    /// skipped without counting as failures (capability gating).
    pub async fn execute_filtered<T, P, F, Fut>(
        &self,
        kind: ServiceKind,
        operation: &str,
        filter: P,
        op: F,
    ) -> Result<FallbackOutcome<T>>
    where
        P: Fn(&ServiceHandle) -> bool,
        F: Fn(ServiceHandle) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let chain = self.chain(kind)?;
        let mut last_error: Option<Error> = None;
        let mut attempts = 0usize;
        let mut refusals = 0usize;

        for provider in &chain {
            let handle = match self.manager.get(kind, Some(provider)) {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::warn!(%kind, %provider, operation, error = %e, "provider unavailable");
                    attempts += 1;
                    last_error = Some(e);
                    continue;
                }
            };

            if !filter(&handle) {
                tracing::debug!(%kind, %provider, operation, "provider skipped by capability filter");
                continue;
            }

            attempts += 1;
            match op(handle).await {
                Ok(value) => {
                    tracing::debug!(%kind, %provider, operation, "operation served");
                    return Ok(FallbackOutcome {
                        value,
                        provider: provider.clone(),
                    });
                }
                Err(e) if e.failover_eligible() => {
                    if e.is_policy_blocked() {
                        refusals += 1;
                    }
                    tracing::warn!(%kind, %provider, operation, error = %e, "provider failed, trying next");
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::error!(%kind, %provider, operation, error = %e, "fatal error, aborting chain");
                    return Err(e);
                }
            }
        }

        if attempts > 0 && refusals == attempts {
            return Err(Error::AllRefused {
                operation: operation.to_string(),
            });
        }
        Err(Error::AllFailed {
            operation: operation.to_string(),
            source: Box::new(last_error.unwrap_or_else(|| {
                Error::InvalidRequest(format!("no capable provider in {kind} chain"))
            })),
        })
    }

    /// Text generation through the chain
    pub async fn generate_text(&self, request: TextRequest) -> Result<TextResponse> {
        let outcome = self
            .execute_with_fallback(ServiceKind::Text, "generate", |handle| {
                let request = request.clone();
                async move { handle.as_text()?.generate(request).await }
            })
            .await?;
        let mut response = outcome.value;
        response.provider = outcome.provider;
        Ok(response)
    }

    /// Structured text generation through the chain
    pub async fn generate_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<FallbackOutcome<serde_json::Value>> {
        self.execute_with_fallback(ServiceKind::Text, "generate_structured", |handle| {
            let prompt = prompt.to_string();
            let schema = schema.clone();
            async move { handle.as_text()?.generate_structured(&prompt, &schema).await }
        })
        .await
    }

    /// Speech synthesis through the chain
    pub async fn generate_speech(&self, request: SpeechRequest) -> Result<SpeechResponse> {
        let outcome = self
            .execute_with_fallback(ServiceKind::Speech, "synthesize", |handle| {
                let request = request.clone();
                async move { handle.as_speech()?.synthesize(request).await }
            })
            .await?;
        let mut response = outcome.value;
        response.provider = outcome.provider;
        Ok(response)
    }

    /// Image generation through the chain
    pub async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse> {
        let outcome = self
            .execute_with_fallback(ServiceKind::Image, "generate_image", |handle| {
                let request = request.clone();
                async move { handle.as_image()?.generate_image(request).await }
            })
            .await?;
        let mut response = outcome.value;
        response.provider = outcome.provider;
        Ok(response)
    }

    /// Video generation through the chain.
    ///
    /// Providers that cannot satisfy the request (duration, style,
    /// resolution) are skipped rather than failed. Deferred jobs are
    /// polled to completion here so callers always see a terminal
    /// response; a failed or timed-out job counts as transient and the
    /// chain moves on.
    pub async fn generate_video(&self, request: VideoRequest) -> Result<VideoResponse> {
        let outcome = self
            .execute_filtered(
                ServiceKind::Video,
                "generate_video",
                |handle| match handle.as_video() {
                    Ok(video) => video.can_satisfy(&request),
                    Err(_) => false,
                },
                |handle| {
                    let request = request.clone();
                    async move {
                        let video = handle.as_video()?;
                        let provider = video.provider_id();
                        let response = video.generate_video(request).await?;

                        match response.status {
                            VideoStatus::Completed => Ok(response),
                            VideoStatus::Failed => Err(Error::transient(
                                provider.to_string(),
                                response.error.unwrap_or_else(|| "job failed".to_string()),
                            )),
                            VideoStatus::Pending | VideoStatus::Processing => {
                                let job_id = response.job_id.clone().ok_or_else(|| {
                                    Error::transient(
                                        provider.to_string(),
                                        "processing response without job id",
                                    )
                                })?;
                                let timeout = self
                                    .manager
                                    .timeout_for(ServiceKind::Video, &provider);
                                let status =
                                    video.wait_for_completion(&job_id, timeout).await?;
                                match status.status {
                                    VideoStatus::Completed => Ok(VideoResponse {
                                        video_path: status.video_path,
                                        job_id: Some(job_id),
                                        status: VideoStatus::Completed,
                                        provider,
                                        generation_ms: response.generation_ms,
                                        error: None,
                                    }),
                                    _ => Err(Error::transient(
                                        provider.to_string(),
                                        status.error.unwrap_or_else(|| "job failed".to_string()),
                                    )),
                                }
                            }
                        }
                    }
                },
            )
            .await?;
        let mut response = outcome.value;
        response.provider = outcome.provider;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vidforge_config::{KindSettings, ServicesSettings};
    use vidforge_core::{SpeechSynthesis, VideoGeneration, VideoJobStatus, VoiceInfo};

    use crate::registry::ProviderRegistry;

    /// Speech stub with a scripted failure mode
    struct ScriptedSpeech {
        name: &'static str,
        mode: Mode,
        calls: Arc<AtomicUsize>,
    }

    #[derive(Clone, Copy)]
    enum Mode {
        Ok,
        Transient,
        Policy,
        Invalid,
    }

    #[async_trait]
    impl SpeechSynthesis for ScriptedSpeech {
        async fn synthesize(&self, request: SpeechRequest) -> Result<SpeechResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                Mode::Ok => Ok(SpeechResponse {
                    audio_path: request
                        .output_path
                        .unwrap_or_else(|| PathBuf::from("out.wav")),
                    duration_s: 1.0,
                    sample_rate: 44_100,
                    channels: 1,
                    provider: self.name.into(),
                }),
                Mode::Transient => Err(Error::transient(self.name, "HTTP 503")),
                Mode::Policy => Err(Error::policy_blocked(self.name, "refused")),
                Mode::Invalid => Err(Error::InvalidRequest("bad voice".to_string())),
            }
        }

        fn voices(&self) -> &[VoiceInfo] {
            &[]
        }

        fn estimate_cost(&self, _request: &SpeechRequest) -> f64 {
            0.0
        }

        fn provider_id(&self) -> ProviderId {
            self.name.into()
        }
    }

    fn speech_orchestrator(
        chain: &[&str],
        modes: &[(&'static str, Mode)],
    ) -> (FallbackOrchestrator, HashMap<&'static str, Arc<AtomicUsize>>) {
        let registry = ProviderRegistry::new();
        let mut counters = HashMap::new();
        for (name, mode) in modes {
            let calls = Arc::new(AtomicUsize::new(0));
            counters.insert(*name, Arc::clone(&calls));
            let (name, mode) = (*name, *mode);
            registry.register_speech(name, move |_config| {
                Ok(Arc::new(ScriptedSpeech {
                    name,
                    mode,
                    calls: Arc::clone(&calls),
                }))
            });
        }

        let mut settings = ServicesSettings::default();
        settings.speech = KindSettings {
            fallback_chain: chain.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let manager = Arc::new(ServiceManager::new(registry, settings));
        (FallbackOrchestrator::new(manager), counters)
    }

    fn speech_request() -> SpeechRequest {
        SpeechRequest::new("Hello.", vidforge_core::Language::EnglishUs)
    }

    #[tokio::test]
    async fn first_success_stops_the_chain() {
        let (orch, counters) =
            speech_orchestrator(&["a", "b"], &[("a", Mode::Ok), ("b", Mode::Ok)]);
        let response = orch.generate_speech(speech_request()).await.unwrap();
        assert_eq!(response.provider.as_str(), "a");
        assert_eq!(counters["a"].load(Ordering::SeqCst), 1);
        assert_eq!(counters["b"].load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transient_failure_moves_laterally_without_retry() {
        let (orch, counters) =
            speech_orchestrator(&["a", "b"], &[("a", Mode::Transient), ("b", Mode::Ok)]);
        let response = orch.generate_speech(speech_request()).await.unwrap();
        assert_eq!(response.provider.as_str(), "b");
        // The failed provider is attempted exactly once per request
        assert_eq!(counters["a"].load(Ordering::SeqCst), 1);

        // A second request attempts the chain fresh, but still only
        // once each per request.
        orch.generate_speech(speech_request()).await.unwrap();
        assert_eq!(counters["a"].load(Ordering::SeqCst), 2);
        assert_eq!(counters["b"].load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fatal_error_short_circuits() {
        let (orch, counters) =
            speech_orchestrator(&["a", "b"], &[("a", Mode::Invalid), ("b", Mode::Ok)]);
        let err = orch.generate_speech(speech_request()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(counters["b"].load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_chain_carries_last_error() {
        let (orch, _) = speech_orchestrator(
            &["a", "b"],
            &[("a", Mode::Transient), ("b", Mode::Transient)],
        );
        let err = orch.generate_speech(speech_request()).await.unwrap_err();
        match err {
            Error::AllFailed { operation, source } => {
                assert_eq!(operation, "synthesize");
                match *source {
                    Error::Transient { provider, .. } => assert_eq!(provider, "b"),
                    other => panic!("unexpected inner error: {other}"),
                }
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unanimous_refusal_is_all_refused() {
        let (orch, _) =
            speech_orchestrator(&["a", "b"], &[("a", Mode::Policy), ("b", Mode::Policy)]);
        let err = orch.generate_speech(speech_request()).await.unwrap_err();
        assert!(matches!(err, Error::AllRefused { .. }));
    }

    #[tokio::test]
    async fn runtime_chain_override() {
        let (orch, counters) =
            speech_orchestrator(&["a", "b"], &[("a", Mode::Ok), ("b", Mode::Ok)]);
        orch.set_fallback_chain(ServiceKind::Speech, vec!["b".into()]);
        let response = orch.generate_speech(speech_request()).await.unwrap();
        assert_eq!(response.provider.as_str(), "b");
        assert_eq!(counters["a"].load(Ordering::SeqCst), 0);
    }

    /// Video stub with a capability ceiling and optional deferred jobs
    struct CappedVideo {
        name: &'static str,
        max_duration: f64,
        deferred: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl VideoGeneration for CappedVideo {
        async fn generate_video(&self, request: VideoRequest) -> Result<VideoResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.deferred {
                Ok(VideoResponse::processing("job-7", self.name))
            } else {
                Ok(VideoResponse::completed(
                    request.output_path.unwrap_or_else(|| PathBuf::from("clip.mp4")),
                    self.name,
                    50,
                ))
            }
        }

        async fn check_status(&self, job_id: &str) -> Result<VideoJobStatus> {
            Ok(VideoJobStatus {
                job_id: job_id.to_string(),
                status: VideoStatus::Completed,
                progress: Some(1.0),
                video_path: Some(PathBuf::from("deferred.mp4")),
                error: None,
            })
        }

        fn max_duration(&self) -> f64 {
            self.max_duration
        }

        fn estimate_cost(&self, request: &VideoRequest) -> f64 {
            request.duration_s * 0.1
        }

        fn provider_id(&self) -> ProviderId {
            self.name.into()
        }
    }

    fn video_orchestrator(
        specs: &[(&'static str, f64, bool)],
    ) -> (FallbackOrchestrator, HashMap<&'static str, Arc<AtomicUsize>>) {
        let registry = ProviderRegistry::new();
        let mut counters = HashMap::new();
        for (name, max_duration, deferred) in specs {
            let calls = Arc::new(AtomicUsize::new(0));
            counters.insert(*name, Arc::clone(&calls));
            let (name, max_duration, deferred) = (*name, *max_duration, *deferred);
            registry.register_video(name, move |_config| {
                Ok(Arc::new(CappedVideo {
                    name,
                    max_duration,
                    deferred,
                    calls: Arc::clone(&calls),
                }))
            });
        }

        let mut settings = ServicesSettings::default();
        settings.video = KindSettings {
            fallback_chain: specs.iter().map(|(n, _, _)| n.to_string()).collect(),
            ..Default::default()
        };
        let manager = Arc::new(ServiceManager::new(registry, settings));
        (FallbackOrchestrator::new(manager), counters)
    }

    #[tokio::test]
    async fn incapable_video_provider_is_skipped_not_failed() {
        let (orch, counters) =
            video_orchestrator(&[("short", 2.0, false), ("long", 30.0, false)]);
        let response = orch
            .generate_video(VideoRequest::new("clip", 10.0))
            .await
            .unwrap();
        assert_eq!(response.provider.as_str(), "long");
        assert_eq!(counters["short"].load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_skipped_is_all_failed_with_invalid_request() {
        let (orch, _) = video_orchestrator(&[("a", 2.0, false), ("b", 3.0, false)]);
        let err = orch
            .generate_video(VideoRequest::new("clip", 60.0))
            .await
            .unwrap_err();
        match err {
            Error::AllFailed { source, .. } => {
                assert!(matches!(*source, Error::InvalidRequest(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn deferred_video_job_is_polled_to_completion() {
        let (orch, _) = video_orchestrator(&[("deferred", 30.0, true)]);
        let response = orch
            .generate_video(VideoRequest::new("clip", 5.0))
            .await
            .unwrap();
        assert_eq!(response.status, VideoStatus::Completed);
        assert_eq!(response.video_path, Some(PathBuf::from("deferred.mp4")));
        assert_eq!(response.provider.as_str(), "deferred");
    }
}
