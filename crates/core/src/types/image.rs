//! Image generation request/response types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::service::ProviderId;

/// Image generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageRequest {
    /// Prompt text
    pub prompt: String,
    /// Visual style hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Aspect ratio, e.g. "16:9"
    pub aspect_ratio: String,
    /// Negative prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Number of images to produce
    pub count: u32,
    /// Directory the provider writes artifacts into; the driver derives
    /// this from the session layout so re-issued requests are idempotent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for ImageRequest {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            style: None,
            aspect_ratio: "1:1".to_string(),
            negative_prompt: None,
            count: 1,
            output_dir: None,
        }
    }
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// Image generation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    /// Paths of the generated artifacts, in request order
    pub image_paths: Vec<PathBuf>,
    /// Provider that served the request
    pub provider: ProviderId,
    /// Wall-clock generation time in milliseconds
    pub generation_ms: u64,
}

impl ImageResponse {
    /// First artifact, if any
    pub fn first_image(&self) -> Option<&PathBuf> {
        self.image_paths.first()
    }
}
