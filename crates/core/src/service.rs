//! Service kinds, provider identifiers and per-handle configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::traits::auth::Credentials;

/// The four generation modalities the pipeline multiplexes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Text,
    Image,
    Speech,
    Video,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Speech => "speech",
            Self::Video => "video",
        }
    }

    /// All kinds, in pipeline order.
    pub fn all() -> &'static [ServiceKind] {
        &[Self::Text, Self::Image, Self::Speech, Self::Video]
    }

    /// Default per-request timeout for this kind.
    ///
    /// Video jobs poll long-running backends and get a larger budget.
    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::Video => Duration::from_secs(300),
            _ => Duration::from_secs(60),
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier of a concrete backend (e.g. `veo`, `imagen`, `cloud-tts`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Configuration handed to a provider factory when a handle is built.
///
/// Immutable after construction; handles are cached per `(kind, provider)`
/// and shared by every concurrent caller.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Provider this config belongs to
    pub provider: ProviderId,
    /// Resolved credentials, if the provider needs any
    pub credentials: Option<Credentials>,
    /// Model name/ID at the provider
    pub model: String,
    /// Maximum retry attempts within a single provider
    pub max_retries: u32,
    /// Per-request timeout
    pub timeout: Duration,
    /// Provider-specific knobs
    pub custom: HashMap<String, serde_json::Value>,
}

impl ServiceConfig {
    /// Create a config with defaults for the given provider and model.
    pub fn new(provider: impl Into<ProviderId>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            credentials: None,
            model: model.into(),
            max_retries: 3,
            timeout: Duration::from_secs(60),
            custom: HashMap::new(),
        }
    }

    /// Attach resolved credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}
