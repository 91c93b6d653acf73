//! Video generation interface
//!
//! Video backends are the one async-idiom kind: `generate_video` may
//! finish synchronously or hand back a job id, `check_status` is the
//! polling primitive, and `wait_for_completion` is the default poll
//! loop every provider inherits.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::service::ProviderId;
use crate::types::video::{VideoJobStatus, VideoRequest, VideoResponse};

/// Interval between status polls
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Video generation interface
#[async_trait]
pub trait VideoGeneration: Send + Sync + 'static {
    /// Generate a clip. May return a completed response or a
    /// `Processing` response carrying a job id.
    async fn generate_video(&self, request: VideoRequest) -> Result<VideoResponse>;

    /// Poll a deferred job
    async fn check_status(&self, job_id: &str) -> Result<VideoJobStatus>;

    /// Poll until the job reaches a terminal state or the deadline
    /// passes, in which case a `Failed` status with `"timeout"` is
    /// synthesised.
    async fn wait_for_completion(&self, job_id: &str, timeout: Duration) -> Result<VideoJobStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let status = self.check_status(job_id).await?;
            if status.status.is_terminal() {
                return Ok(status);
            }
            if tokio::time::Instant::now() + POLL_INTERVAL > deadline {
                tracing::warn!(job_id, timeout_s = timeout.as_secs(), "video job timed out");
                return Ok(VideoJobStatus::timed_out(job_id));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Whether the provider can also generate an audio track
    fn supports_audio(&self) -> bool {
        false
    }

    /// Whether the provider can honour a style hint
    fn supports_style(&self, style: &str) -> bool {
        let _ = style;
        true
    }

    /// Longest clip the provider can produce, in seconds
    fn max_duration(&self) -> f64;

    /// Resolutions the provider can emit; empty means unconstrained
    fn supported_resolutions(&self) -> &[&str] {
        &[]
    }

    /// Whether this provider can satisfy a request at all.
    ///
    /// The orchestrator skips (rather than fails) providers for which
    /// this returns false.
    fn can_satisfy(&self, request: &VideoRequest) -> bool {
        if request.duration_s > self.max_duration() {
            return false;
        }
        if let Some(style) = &request.style {
            if !self.supports_style(style) {
                return false;
            }
        }
        if let Some(resolution) = &request.resolution {
            let supported = self.supported_resolutions();
            if !supported.is_empty() && !supported.contains(&resolution.as_str()) {
                return false;
            }
        }
        true
    }

    /// Advisory cost estimate in USD
    fn estimate_cost(&self, request: &VideoRequest) -> f64;

    /// Provider identity propagated into every response
    fn provider_id(&self) -> ProviderId;
}

impl std::fmt::Debug for dyn VideoGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoGeneration").field("provider_id", &self.provider_id()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::video::VideoStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowVideo {
        polls_until_done: usize,
        polls: AtomicUsize,
    }

    #[async_trait]
    impl VideoGeneration for SlowVideo {
        async fn generate_video(&self, _request: VideoRequest) -> Result<VideoResponse> {
            Ok(VideoResponse::processing("job-1", self.provider_id()))
        }

        async fn check_status(&self, job_id: &str) -> Result<VideoJobStatus> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            let status = if n + 1 >= self.polls_until_done {
                VideoStatus::Completed
            } else {
                VideoStatus::Processing
            };
            Ok(VideoJobStatus {
                job_id: job_id.to_string(),
                status,
                progress: None,
                video_path: None,
                error: None,
            })
        }

        fn max_duration(&self) -> f64 {
            8.0
        }

        fn supported_resolutions(&self) -> &[&str] {
            &["1280x720"]
        }

        fn estimate_cost(&self, request: &VideoRequest) -> f64 {
            request.duration_s * 0.1
        }

        fn provider_id(&self) -> ProviderId {
            "slow-video".into()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn wait_polls_until_terminal() {
        let svc = SlowVideo { polls_until_done: 3, polls: AtomicUsize::new(0) };
        let status = svc
            .wait_for_completion("job-1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(status.status, VideoStatus::Completed);
        assert_eq!(svc.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_with_failed_status() {
        let svc = SlowVideo { polls_until_done: usize::MAX, polls: AtomicUsize::new(0) };
        let status = svc
            .wait_for_completion("job-1", Duration::from_secs(12))
            .await
            .unwrap();
        assert_eq!(status.status, VideoStatus::Failed);
        assert_eq!(status.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn capability_gate() {
        let svc = SlowVideo { polls_until_done: 0, polls: AtomicUsize::new(0) };
        assert!(svc.can_satisfy(&VideoRequest::new("ok", 5.0)));
        assert!(!svc.can_satisfy(&VideoRequest::new("too long", 20.0)));

        let mut req = VideoRequest::new("res", 5.0);
        req.resolution = Some("4096x2160".to_string());
        assert!(!svc.can_satisfy(&req));
        req.resolution = Some("1280x720".to_string());
        assert!(svc.can_satisfy(&req));
    }
}
