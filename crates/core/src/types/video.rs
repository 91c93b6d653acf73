//! Video generation request/response types
//!
//! Video backends are long-running: `generate_video` may return a
//! finished artifact or a job id still processing. `VideoJobStatus` is
//! the polling unit.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::service::ProviderId;

/// Video generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoRequest {
    /// Prompt text
    pub prompt: String,
    /// Requested clip duration in seconds
    pub duration_s: f64,
    /// Visual style hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Aspect ratio, e.g. "9:16"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    /// Resolution, e.g. "1920x1080"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Frames per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
    /// Negative prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Destination path; the driver derives this from the session layout
    /// so re-issued requests are idempotent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl VideoRequest {
    pub fn new(prompt: impl Into<String>, duration_s: f64) -> Self {
        Self {
            prompt: prompt.into(),
            duration_s,
            style: None,
            aspect_ratio: None,
            resolution: None,
            fps: None,
            negative_prompt: None,
            output_path: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(aspect_ratio.into());
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }
}

/// Lifecycle of a video generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl VideoStatus {
    /// Whether the job has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Video generation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoResponse {
    /// Artifact path when the job completed synchronously
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<PathBuf>,
    /// Job id when the backend is still processing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Job status at response time
    pub status: VideoStatus,
    /// Provider that served the request
    pub provider: ProviderId,
    /// Wall-clock generation time in milliseconds
    pub generation_ms: u64,
    /// Error detail when status is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VideoResponse {
    /// A synchronously completed response
    pub fn completed(
        video_path: impl Into<PathBuf>,
        provider: impl Into<ProviderId>,
        generation_ms: u64,
    ) -> Self {
        Self {
            video_path: Some(video_path.into()),
            job_id: None,
            status: VideoStatus::Completed,
            provider: provider.into(),
            generation_ms,
            error: None,
        }
    }

    /// A deferred response carrying a job id
    pub fn processing(job_id: impl Into<String>, provider: impl Into<ProviderId>) -> Self {
        Self {
            video_path: None,
            job_id: Some(job_id.into()),
            status: VideoStatus::Processing,
            provider: provider.into(),
            generation_ms: 0,
            error: None,
        }
    }
}

/// Polled status of a deferred video job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoJobStatus {
    pub job_id: String,
    pub status: VideoStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VideoJobStatus {
    /// Status synthesised when a poll deadline is reached
    pub fn timed_out(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: VideoStatus::Failed,
            progress: None,
            video_path: None,
            error: Some("timeout".to_string()),
        }
    }
}
