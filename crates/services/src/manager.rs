//! Service manager
//!
//! Resolves `(kind, provider?)` to a live handle: looks up the factory,
//! materialises the per-provider config with credentials, and caches
//! the handle per `(kind, provider)`. Insertion takes a shard lock;
//! reads after that are effectively lock-free.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use vidforge_config::{credential_env_keys, ServicesSettings};
use vidforge_core::{
    AuthProvider, Credentials, Error, ProviderId, Result, ServiceKind,
};

use crate::registry::{ProviderRegistry, ServiceHandle};

/// Central manager for all generation services
pub struct ServiceManager {
    registry: ProviderRegistry,
    settings: ServicesSettings,
    cache: DashMap<(ServiceKind, ProviderId), ServiceHandle>,
}

impl ServiceManager {
    pub fn new(registry: ProviderRegistry, settings: ServicesSettings) -> Self {
        Self {
            registry,
            settings,
            cache: DashMap::new(),
        }
    }

    /// Providers registered for a kind
    pub fn available_providers(&self, kind: ServiceKind) -> Vec<ProviderId> {
        self.registry.available_providers(kind)
    }

    /// Ordered fallback chain for a kind. Empty configured chain means
    /// "default provider only".
    pub fn fallback_chain(&self, kind: ServiceKind) -> Result<Vec<ProviderId>> {
        let configured = &self.settings.kind(kind).fallback_chain;
        if configured.is_empty() {
            Ok(vec![self.default_provider(kind)?])
        } else {
            Ok(configured.iter().map(|p| p.as_str().into()).collect())
        }
    }

    /// Per-request timeout for a provider of a kind
    pub fn timeout_for(&self, kind: ServiceKind, provider: &ProviderId) -> Duration {
        self.settings
            .kind(kind)
            .service_config(kind, provider.as_str())
            .timeout
    }

    /// Default provider for a kind: the configured default, or the sole
    /// registered provider when exactly one exists.
    pub fn default_provider(&self, kind: ServiceKind) -> Result<ProviderId> {
        if let Some(name) = &self.settings.kind(kind).default_provider {
            return Ok(name.as_str().into());
        }
        let mut registered = self.registry.available_providers(kind);
        match registered.len() {
            0 => Err(Error::NoProvider { kind }),
            1 => Ok(registered.remove(0)),
            _ => Err(Error::ConfigMissing(format!(
                "no default provider configured for {kind}"
            ))),
        }
    }

    /// Get (or build and cache) the handle for a kind, using the default
    /// provider when none is named.
    pub fn get(&self, kind: ServiceKind, provider: Option<&ProviderId>) -> Result<ServiceHandle> {
        let provider = match provider {
            Some(p) => p.clone(),
            None => self.default_provider(kind)?,
        };

        if let Some(handle) = self.cache.get(&(kind, provider.clone())) {
            return Ok(handle.value().clone());
        }

        let factory = self
            .registry
            .factory(kind, &provider)
            .ok_or(Error::NoProvider { kind })?;

        let mut config = self
            .settings
            .kind(kind)
            .service_config(kind, provider.as_str());
        config.credentials = self.resolve_credentials(kind, &provider);

        // Entry API keeps construction single-writer per key.
        match self.cache.entry((kind, provider.clone())) {
            dashmap::mapref::entry::Entry::Occupied(entry) => Ok(entry.get().clone()),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let handle = factory(config)?;
                tracing::info!(%kind, %provider, "service handle created");
                entry.insert(handle.clone());
                Ok(handle)
            }
        }
    }

    /// Resolve credentials with the documented precedence: environment
    /// variables, then the explicit key from the settings file.
    fn resolve_credentials(&self, kind: ServiceKind, provider: &ProviderId) -> Option<Credentials> {
        for name in credential_env_keys(provider.as_str()) {
            if let Ok(value) = std::env::var(&name) {
                if !value.is_empty() {
                    return Some(Credentials::api_key(value));
                }
            }
        }
        self.settings
            .kind(kind)
            .providers
            .get(provider.as_str())
            .and_then(|p| p.api_key.clone())
            .map(Credentials::api_key)
    }
}

/// Single-flight credential refresh, keyed by `(provider, principal)`.
///
/// Concurrent callers for the same key share one refresh; the winner
/// populates the slot and everyone else reads it.
#[derive(Default)]
pub struct CredentialRefresher {
    slots: DashMap<String, Arc<tokio::sync::Mutex<Option<Credentials>>>>,
}

impl CredentialRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return valid credentials for the key, refreshing through `auth`
    /// at most once per expiry across all concurrent callers.
    pub async fn get_or_refresh(
        &self,
        key: &str,
        auth: &dyn AuthProvider,
    ) -> Result<Credentials> {
        let slot = self
            .slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None)))
            .clone();

        let mut guard = slot.lock().await;
        if let Some(credentials) = guard.as_ref() {
            if !credentials.is_expired() {
                return Ok(credentials.clone());
            }
        }
        let fresh = auth.ensure_valid(guard.take()).await?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }
}
