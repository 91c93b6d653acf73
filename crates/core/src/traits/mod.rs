//! Capability interfaces for pluggable generation backends

pub mod auth;
pub mod image;
pub mod speech;
pub mod text;
pub mod video;

pub use auth::{ApiKeyAuth, AuthProvider, AuthType, Credentials};
pub use image::ImageGeneration;
pub use speech::SpeechSynthesis;
pub use text::TextGeneration;
pub use video::VideoGeneration;
