//! Credential resolution seam
//!
//! Concrete credential bootstrap (OAuth flows, metadata servers) lives
//! outside this crate; providers only see `Credentials` resolved through
//! an `AuthProvider`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the credentials were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    ApiKey,
    Oauth2,
    ServiceAccount,
    CloudToken,
}

/// Resolved authentication material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub auth_type: AuthType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Static API-key credentials that never expire
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::ApiKey,
            api_key: Some(key.into()),
            access_token: None,
            expires_at: None,
        }
    }

    /// Whether the credentials are past their expiry
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() > expires_at,
            None => false,
        }
    }
}

/// Abstraction over credential sources
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// Resolve credentials
    async fn get_credentials(&self) -> Result<Credentials>;

    /// Refresh expired credentials
    async fn refresh(&self, credentials: Credentials) -> Result<Credentials>;

    fn auth_type(&self) -> AuthType;

    /// Return valid credentials, refreshing if the given ones expired
    async fn ensure_valid(&self, credentials: Option<Credentials>) -> Result<Credentials> {
        match credentials {
            Some(c) if !c.is_expired() => Ok(c),
            Some(c) => self.refresh(c).await,
            None => self.get_credentials().await,
        }
    }
}

/// API-key auth resolved from an explicit key or an ordered list of
/// environment variables.
pub struct ApiKeyAuth {
    key: Option<String>,
    env_keys: Vec<String>,
}

impl ApiKeyAuth {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            env_keys: Vec::new(),
        }
    }

    /// Resolve from environment variables, first hit wins
    pub fn from_env(env_keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            key: None,
            env_keys: env_keys.into_iter().map(Into::into).collect(),
        }
    }

    fn resolve(&self) -> Option<String> {
        if let Some(key) = &self.key {
            return Some(key.clone());
        }
        self.env_keys
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
    }
}

#[async_trait]
impl AuthProvider for ApiKeyAuth {
    async fn get_credentials(&self) -> Result<Credentials> {
        self.resolve().map(Credentials::api_key).ok_or_else(|| {
            Error::ConfigMissing(format!(
                "no API key available (checked env: {})",
                self.env_keys.join(", ")
            ))
        })
    }

    async fn refresh(&self, _credentials: Credentials) -> Result<Credentials> {
        // Static keys do not expire; re-resolve in case the env changed.
        self.get_credentials().await
    }

    fn auth_type(&self) -> AuthType {
        AuthType::ApiKey
    }
}
