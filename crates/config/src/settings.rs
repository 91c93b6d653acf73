//! Pipeline settings
//!
//! One document declares, per service kind, the default provider and
//! fallback chain, plus per-provider model/timeout/retry maps. Audio
//! gate tolerances and driver knobs live here too.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vidforge_core::{ServiceConfig, ServiceKind};

use crate::ConfigError;

/// Root configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Per-kind provider configuration
    #[serde(default)]
    pub services: ServicesSettings,
    /// Audio duration gate policy
    #[serde(default)]
    pub audio: AudioSettings,
    /// Pipeline driver knobs
    #[serde(default)]
    pub driver: DriverSettings,
    /// Root directory for session outputs
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            services: ServicesSettings::default(),
            audio: AudioSettings::default(),
            driver: DriverSettings::default(),
            output_root: default_output_root(),
        }
    }
}

impl Settings {
    /// Parse a YAML document
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from("outputs")
}

/// Per-kind provider configuration, one block per `ServiceKind`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServicesSettings {
    #[serde(default)]
    pub text: KindSettings,
    #[serde(default)]
    pub image: KindSettings,
    #[serde(default)]
    pub speech: KindSettings,
    #[serde(default)]
    pub video: KindSettings,
}

impl ServicesSettings {
    /// Settings block for a service kind
    pub fn kind(&self, kind: ServiceKind) -> &KindSettings {
        match kind {
            ServiceKind::Text => &self.text,
            ServiceKind::Image => &self.image,
            ServiceKind::Speech => &self.speech,
            ServiceKind::Video => &self.video,
        }
    }
}

/// Provider selection for one service kind
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KindSettings {
    /// Provider used when the caller does not name one
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Ordered fallback chain; empty means "default provider only"
    #[serde(default)]
    pub fallback_chain: Vec<String>,
    /// Per-provider overrides
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
}

impl KindSettings {
    /// Build the immutable per-handle config for a provider of this kind.
    ///
    /// Credentials are resolved later by the service manager; this only
    /// materialises model/timeout/retry settings.
    pub fn service_config(&self, kind: ServiceKind, provider: &str) -> ServiceConfig {
        let overrides = self.providers.get(provider);
        let model = overrides
            .and_then(|p| p.model.clone())
            .unwrap_or_else(|| "default".to_string());
        let timeout = overrides
            .and_then(|p| p.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or_else(|| kind.default_timeout());
        let max_retries = overrides.and_then(|p| p.max_retries).unwrap_or(3);

        let mut config = ServiceConfig::new(provider, model)
            .with_timeout(timeout)
            .with_max_retries(max_retries);
        if let Some(overrides) = overrides {
            config.custom = overrides.custom.clone();
        }
        config
    }
}

/// Overrides for one provider
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderSettings {
    /// Model name/ID at the provider
    #[serde(default)]
    pub model: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Retry budget within the provider
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// Explicit API key; env vars take precedence
    #[serde(default)]
    pub api_key: Option<String>,
    /// Provider-specific knobs
    #[serde(default)]
    pub custom: HashMap<String, serde_json::Value>,
}

/// Audio duration gate policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Allowed deviation of total audio duration from target, percent
    pub tolerance_percent: f64,
    /// Shortest acceptable segment, seconds
    pub min_segment_duration: f64,
    /// Longest acceptable segment, seconds
    pub max_segment_duration: f64,
    /// Silence inserted between segments, seconds
    pub padding_between_segments: f64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            tolerance_percent: 5.0,
            min_segment_duration: 1.0,
            max_segment_duration: 10.0,
            padding_between_segments: 0.3,
        }
    }
}

/// Pipeline driver knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSettings {
    /// Bounded in-flight window for speech/image/video fan-out
    pub max_in_flight: usize,
    /// Script regeneration attempts when the duration gate rejects
    pub regeneration_retries: u32,
    /// Whether the duration gate blocks video generation
    pub block_on_duration_failure: bool,
    /// Clip count override; defaults to one clip per audio segment
    #[serde(default)]
    pub clips_per_video: Option<usize>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            regeneration_retries: 2,
            block_on_duration_failure: true,
            clips_per_video: None,
        }
    }
}

/// Environment variables checked, in order, when resolving credentials
/// for a provider. Platform-standard keys come after the provider's own.
pub fn credential_env_keys(provider: &str) -> Vec<String> {
    let canonical = provider.to_uppercase().replace('-', "_");
    vec![
        format!("{canonical}_API_KEY"),
        "GOOGLE_API_KEY".to_string(),
        "GOOGLE_APPLICATION_CREDENTIALS".to_string(),
    ]
}

/// Load settings from an optional file plus `VIDFORGE_`-prefixed
/// environment variables. Env vars win over the file; both win over
/// built-in defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("VIDFORGE")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;
    tracing::debug!(output_root = %settings.output_root.display(), "settings loaded");
    Ok(settings)
}
