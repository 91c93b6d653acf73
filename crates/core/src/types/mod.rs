//! Typed request/response contracts, one module per service kind

pub mod image;
pub mod speech;
pub mod text;
pub mod video;

pub use image::{ImageRequest, ImageResponse};
pub use speech::{AudioFormat, SpeechRequest, SpeechResponse, VoiceGender, VoiceInfo};
pub use text::{
    ChatMessage, ChatRole, ResponseFormat, TextRequest, TextResponse, TokenUsage,
};
pub use video::{VideoJobStatus, VideoRequest, VideoResponse, VideoStatus};
