//! Core traits and types for the video synthesis pipeline
//!
//! This crate provides the foundational pieces used by every other crate:
//! - Capability interfaces for generation backends (text, image, speech, video)
//! - Typed request/response contracts per service kind
//! - Service kinds, provider identifiers and per-handle configuration
//! - Language definitions with script-aware text rules
//! - The process-wide error taxonomy

pub mod error;
pub mod json;
pub mod language;
pub mod platform;
pub mod service;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use json::extract_json;
pub use language::{detect_language, is_rtl_char, is_rtl_text, rtl_ratio, Language};
pub use platform::Platform;
pub use service::{ProviderId, ServiceConfig, ServiceKind};

pub use traits::{
    ApiKeyAuth, AuthProvider, AuthType, Credentials, ImageGeneration, SpeechSynthesis,
    TextGeneration, VideoGeneration,
};

pub use types::{
    AudioFormat, ChatMessage, ChatRole, ImageRequest, ImageResponse, ResponseFormat,
    SpeechRequest, SpeechResponse, TextRequest, TextResponse, TokenUsage, VideoJobStatus,
    VideoRequest, VideoResponse, VideoStatus, VoiceGender, VoiceInfo,
};
