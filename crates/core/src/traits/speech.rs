//! Speech synthesis interface

use async_trait::async_trait;

use crate::error::Result;
use crate::language::Language;
use crate::service::ProviderId;
use crate::types::speech::{SpeechRequest, SpeechResponse, VoiceInfo};

/// Speech synthesis interface
#[async_trait]
pub trait SpeechSynthesis: Send + Sync + 'static {
    /// Synthesize speech for a request, writing the artifact to the
    /// request's output path (or a provider-chosen one) and reporting
    /// the measured duration.
    async fn synthesize(&self, request: SpeechRequest) -> Result<SpeechResponse>;

    /// Voices offered by this provider
    fn voices(&self) -> &[VoiceInfo];

    /// Default voice for a language
    fn default_voice(&self, language: Language) -> Option<&VoiceInfo> {
        self.voices().iter().find(|v| v.language == language)
    }

    /// Whether any voice covers the language
    fn supports_language(&self, language: Language) -> bool {
        self.voices().iter().any(|v| v.language == language)
    }

    /// Advisory cost estimate in USD
    fn estimate_cost(&self, request: &SpeechRequest) -> f64;

    /// Provider identity propagated into every response
    fn provider_id(&self) -> ProviderId;
}
