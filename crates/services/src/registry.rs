//! Provider registry
//!
//! Maps `(ServiceKind, ProviderId)` to a factory that builds a live
//! handle from a `ServiceConfig`. Registration happens explicitly at
//! the composition root; duplicate registration replaces.

use dashmap::DashMap;
use std::sync::Arc;

use vidforge_core::{
    Error, ImageGeneration, ProviderId, Result, ServiceConfig, ServiceKind, SpeechSynthesis,
    TextGeneration, VideoGeneration,
};

/// A live, shareable handle for one `(kind, provider)` pair.
///
/// Handles are stateless with respect to requests, so one cached
/// instance serves every concurrent caller.
#[derive(Clone)]
pub enum ServiceHandle {
    Text(Arc<dyn TextGeneration>),
    Image(Arc<dyn ImageGeneration>),
    Speech(Arc<dyn SpeechSynthesis>),
    Video(Arc<dyn VideoGeneration>),
}

impl ServiceHandle {
    /// The kind this handle serves
    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::Text(_) => ServiceKind::Text,
            Self::Image(_) => ServiceKind::Image,
            Self::Speech(_) => ServiceKind::Speech,
            Self::Video(_) => ServiceKind::Video,
        }
    }

    /// Provider identity behind this handle
    pub fn provider_id(&self) -> ProviderId {
        match self {
            Self::Text(s) => s.provider_id(),
            Self::Image(s) => s.provider_id(),
            Self::Speech(s) => s.provider_id(),
            Self::Video(s) => s.provider_id(),
        }
    }

    pub fn as_text(&self) -> Result<Arc<dyn TextGeneration>> {
        match self {
            Self::Text(s) => Ok(Arc::clone(s)),
            other => Err(Error::InvalidRequest(format!(
                "expected a text handle, got {}",
                other.kind()
            ))),
        }
    }

    pub fn as_image(&self) -> Result<Arc<dyn ImageGeneration>> {
        match self {
            Self::Image(s) => Ok(Arc::clone(s)),
            other => Err(Error::InvalidRequest(format!(
                "expected an image handle, got {}",
                other.kind()
            ))),
        }
    }

    pub fn as_speech(&self) -> Result<Arc<dyn SpeechSynthesis>> {
        match self {
            Self::Speech(s) => Ok(Arc::clone(s)),
            other => Err(Error::InvalidRequest(format!(
                "expected a speech handle, got {}",
                other.kind()
            ))),
        }
    }

    pub fn as_video(&self) -> Result<Arc<dyn VideoGeneration>> {
        match self {
            Self::Video(s) => Ok(Arc::clone(s)),
            other => Err(Error::InvalidRequest(format!(
                "expected a video handle, got {}",
                other.kind()
            ))),
        }
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("kind", &self.kind())
            .field("provider", &self.provider_id())
            .finish()
    }
}

/// Factory that constructs a handle from a resolved config
pub type ServiceFactory = Arc<dyn Fn(ServiceConfig) -> Result<ServiceHandle> + Send + Sync>;

/// Registry of `(kind, provider) -> factory`
#[derive(Default)]
pub struct ProviderRegistry {
    entries: DashMap<(ServiceKind, ProviderId), ServiceFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; duplicate registration replaces.
    pub fn register(
        &self,
        kind: ServiceKind,
        provider: impl Into<ProviderId>,
        factory: ServiceFactory,
    ) {
        let provider = provider.into();
        tracing::debug!(%kind, %provider, "provider registered");
        self.entries.insert((kind, provider), factory);
    }

    /// Register a text backend constructor
    pub fn register_text<F>(&self, provider: impl Into<ProviderId>, build: F)
    where
        F: Fn(ServiceConfig) -> Result<Arc<dyn TextGeneration>> + Send + Sync + 'static,
    {
        self.register(
            ServiceKind::Text,
            provider,
            Arc::new(move |config| Ok(ServiceHandle::Text(build(config)?))),
        );
    }

    /// Register an image backend constructor
    pub fn register_image<F>(&self, provider: impl Into<ProviderId>, build: F)
    where
        F: Fn(ServiceConfig) -> Result<Arc<dyn ImageGeneration>> + Send + Sync + 'static,
    {
        self.register(
            ServiceKind::Image,
            provider,
            Arc::new(move |config| Ok(ServiceHandle::Image(build(config)?))),
        );
    }

    /// Register a speech backend constructor
    pub fn register_speech<F>(&self, provider: impl Into<ProviderId>, build: F)
    where
        F: Fn(ServiceConfig) -> Result<Arc<dyn SpeechSynthesis>> + Send + Sync + 'static,
    {
        self.register(
            ServiceKind::Speech,
            provider,
            Arc::new(move |config| Ok(ServiceHandle::Speech(build(config)?))),
        );
    }

    /// Register a video backend constructor
    pub fn register_video<F>(&self, provider: impl Into<ProviderId>, build: F)
    where
        F: Fn(ServiceConfig) -> Result<Arc<dyn VideoGeneration>> + Send + Sync + 'static,
    {
        self.register(
            ServiceKind::Video,
            provider,
            Arc::new(move |config| Ok(ServiceHandle::Video(build(config)?))),
        );
    }

    /// Factory for a `(kind, provider)` pair, if registered
    pub fn factory(&self, kind: ServiceKind, provider: &ProviderId) -> Option<ServiceFactory> {
        self.entries
            .get(&(kind, provider.clone()))
            .map(|e| Arc::clone(e.value()))
    }

    /// Providers registered for a kind
    pub fn available_providers(&self, kind: ServiceKind) -> Vec<ProviderId> {
        let mut providers: Vec<ProviderId> = self
            .entries
            .iter()
            .filter(|e| e.key().0 == kind)
            .map(|e| e.key().1.clone())
            .collect();
        providers.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        providers
    }
}
