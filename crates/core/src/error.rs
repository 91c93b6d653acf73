//! Error taxonomy shared by every pipeline stage
//!
//! The fallback orchestrator branches on these variants: transient and
//! policy failures move laterally across the provider chain, everything
//! else short-circuits.

use crate::service::ServiceKind;

/// Result alias used across all vidforge crates
pub type Result<T> = std::result::Result<T, Error>;

/// Process-wide error taxonomy
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Required configuration or credential is absent. Fatal, no retry.
    #[error("configuration missing: {0}")]
    ConfigMissing(String),

    /// No provider registered for the requested service kind. Fatal.
    #[error("no provider registered for {kind}")]
    NoProvider { kind: ServiceKind },

    /// Timeout, rate limit, 5xx or network failure. The orchestrator
    /// moves on to the next provider in the chain.
    #[error("transient failure from {provider}: {message}")]
    Transient { provider: String, message: String },

    /// Malformed or out-of-capability input. Fatal for the operation;
    /// the orchestrator short-circuits without trying further providers.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Provider refused the content. The orchestrator tries the next
    /// provider; if every provider refuses, `AllRefused` is surfaced.
    #[error("content blocked by {provider}: {message}")]
    PolicyBlocked { provider: String, message: String },

    /// A structured response did not parse against the requested schema.
    #[error("structured response did not match schema: {0}")]
    SchemaMismatch(String),

    /// Audio duration gate rejected the produced segments.
    #[error("audio duration mismatch: {0}")]
    DurationMismatch(String),

    /// Sync planner could not build a plan. Non-fatal; the driver falls
    /// back to an even-distribution plan.
    #[error("sync planning failed: {0}")]
    SyncFailure(String),

    /// An artifact is missing or unreadable on disk.
    #[error("asset missing or unreadable: {0}")]
    AssetCorrupt(String),

    /// Every provider in the chain failed; carries the last error seen.
    #[error("all providers failed for {operation}: {source}")]
    AllFailed {
        operation: String,
        #[source]
        source: Box<Error>,
    },

    /// Every provider in the chain refused the content.
    #[error("all providers refused {operation}")]
    AllRefused { operation: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Convenience constructor for transient provider failures.
    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for policy refusals.
    pub fn policy_blocked(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PolicyBlocked {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// True for timeout / rate-limit / 5xx / network failures.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// True when a provider refused the content.
    pub fn is_policy_blocked(&self) -> bool {
        matches!(self, Self::PolicyBlocked { .. })
    }

    /// Whether the fallback orchestrator may continue to the next
    /// provider after seeing this error.
    pub fn failover_eligible(&self) -> bool {
        self.is_transient() || self.is_policy_blocked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_failover_eligible() {
        let err = Error::transient("veo", "HTTP 503");
        assert!(err.is_transient());
        assert!(err.failover_eligible());
    }

    #[test]
    fn policy_block_is_failover_eligible() {
        let err = Error::policy_blocked("imagen", "unsafe content");
        assert!(!err.is_transient());
        assert!(err.failover_eligible());
    }

    #[test]
    fn invalid_request_short_circuits() {
        let err = Error::InvalidRequest("negative duration".into());
        assert!(!err.failover_eligible());
    }

    #[test]
    fn all_failed_carries_last_error() {
        let last = Error::transient("runway", "timed out");
        let err = Error::AllFailed {
            operation: "generate_video".into(),
            source: Box::new(last),
        };
        assert!(err.to_string().contains("generate_video"));
        assert!(err.to_string().contains("timed out"));
    }
}
